#![allow(dead_code)]

use probekit::dns::{Answer, DnsClient, Message, QueryClass, QueryType};
use probekit::http::{Headers, HttpClient, Response};
use probekit::net::Connector;
use probekit::settings::Settings;
use probekit::{Callback, Reactor, Result};

use std::cell::{Cell, RefCell};
use std::net::Ipv4Addr;

/// Installs the test logger. Safe to call from every test.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Builds an `A` answer.
pub fn a_record(name: &str, ttl: u32, address: Ipv4Addr) -> Answer {
    Answer {
        name: name.to_owned(),
        ttl,
        address: Some(address),
    }
}

/// A resolver answering every query with a canned result.
pub struct FakeDns {
    result: RefCell<Option<Result<Message>>>,
    pub seen: RefCell<Option<Settings>>,
    pub calls: Cell<usize>,
}

impl FakeDns {
    pub fn new(result: Result<Message>) -> Self {
        Self {
            result: RefCell::new(Some(result)),
            seen: RefCell::new(None),
            calls: Cell::new(0),
        }
    }
}

impl DnsClient for FakeDns {
    fn query(
        &self,
        _query_class: QueryClass,
        _query_type: QueryType,
        _query_name: &str,
        callback: Callback<Message>,
        options: &Settings,
        reactor: &Reactor,
    ) {
        self.calls.set(self.calls.get() + 1);
        *self.seen.borrow_mut() = Some(options.clone());

        let result = self
            .result
            .borrow_mut()
            .take()
            .expect("FakeDns queried more than once");
        reactor.call_soon(move || callback(result));
    }
}

/// An HTTP client answering every request with a canned result.
pub struct FakeHttp {
    result: RefCell<Option<Result<Response>>>,
    pub seen: RefCell<Option<Settings>>,
}

impl FakeHttp {
    pub fn new(result: Result<Response>) -> Self {
        Self {
            result: RefCell::new(Some(result)),
            seen: RefCell::new(None),
        }
    }

    pub fn responding(body: &[u8]) -> Self {
        Self::new(Ok(Response {
            headers: vec![("Content-Type".to_owned(), "text/plain".to_owned())],
            body: body.to_vec(),
            response_line: "HTTP/1.1 200 OK".to_owned(),
            status_code: 200,
        }))
    }
}

impl HttpClient for FakeHttp {
    fn request(
        &self,
        settings: &Settings,
        _headers: &Headers,
        _body: &[u8],
        callback: Callback<Response>,
        reactor: &Reactor,
    ) {
        *self.seen.borrow_mut() = Some(settings.clone());

        let result = self
            .result
            .borrow_mut()
            .take()
            .expect("FakeHttp requested more than once");
        reactor.call_soon(move || callback(result));
    }
}

/// A connector that records its calls and hands back the target.
#[derive(Default)]
pub struct FakeConnector {
    pub calls: RefCell<Vec<(String, u16)>>,
}

impl Connector for FakeConnector {
    type Transport = (String, u16);

    fn connect(
        &self,
        host: &str,
        port: u16,
        callback: Callback<(String, u16)>,
        _options: &Settings,
        reactor: &Reactor,
    ) {
        self.calls.borrow_mut().push((host.to_owned(), port));

        let target = (host.to_owned(), port);
        reactor.call_soon(move || callback(Ok(target)));
    }
}
