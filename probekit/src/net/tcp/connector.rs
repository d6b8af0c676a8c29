use crate::error::{Callback, Error, Result};
use crate::net::Connector;
use crate::reactor::platform::{sys_connect, sys_get_socket_error, sys_socket};
use crate::reactor::{Interest, IoWatch, Reactor, Timer};
use crate::settings::Settings;

use std::cell::RefCell;
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::os::fd::{AsRawFd, OwnedFd};
use std::rc::Rc;

/// Connect timeout used when `net/timeout` is not set, in seconds.
const DEFAULT_TIMEOUT: f64 = 10.0;

/// Non-blocking TCP connector.
///
/// Connects to address literals only: resolving a name would mean either
/// blocking the reactor thread or owning a resolver, and both belong to
/// the caller. A name is reported as a DNS lookup failure.
///
/// The stream handed to the callback is in non-blocking mode.
///
/// Recognised settings:
/// - `net/timeout`: seconds before giving up, default 10.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Transport = TcpStream;

    fn connect(
        &self,
        host: &str,
        port: u16,
        callback: Callback<TcpStream>,
        options: &Settings,
        reactor: &Reactor,
    ) {
        let literal = host.trim_start_matches('[').trim_end_matches(']');

        let Ok(ip) = literal.parse::<IpAddr>() else {
            let err = Error::DnsLookup(format!("{host} is not an address literal"));
            reactor.call_soon(move || callback(Err(err)));
            return;
        };

        let timeout = options.get_or("net/timeout", DEFAULT_TIMEOUT);
        start(SocketAddr::new(ip, port), timeout, callback, reactor);
    }
}

/// A connection in progress.
struct Attempt {
    fd: OwnedFd,
    callback: Callback<TcpStream>,
    watch: Option<IoWatch>,
    timer: Option<Timer>,
}

type Shared = Rc<RefCell<Option<Attempt>>>;

fn start(addr: SocketAddr, timeout: f64, callback: Callback<TcpStream>, reactor: &Reactor) {
    let fd = match sys_socket(&addr) {
        Ok(fd) => fd,
        Err(err) => {
            reactor.call_soon(move || callback(Err(err.into())));
            return;
        }
    };

    match sys_connect(fd.as_raw_fd(), &addr) {
        Ok(true) => {
            log::debug!("connect: {addr} connected immediately");
            reactor.call_soon(move || callback(Ok(TcpStream::from(fd))));
            return;
        }
        Ok(false) => {
            log::debug!("connect: {addr} in progress");
        }
        Err(err) => {
            log::debug!("connect: {addr} failed: {err}");
            reactor.call_soon(move || callback(Err(err.into())));
            return;
        }
    }

    let raw = fd.as_raw_fd();
    let attempt: Shared = Rc::new(RefCell::new(Some(Attempt {
        fd,
        callback,
        watch: None,
        timer: None,
    })));

    let watch = {
        let attempt = attempt.clone();
        reactor.watch(raw, Interest::WRITE, move |_| {
            let result = sys_get_socket_error(raw).map_err(Error::from);
            if let Err(err) = &result {
                log::debug!("connect: {addr} failed: {err}");
            }
            finish(&attempt, result);
        })
    };

    let timer = {
        let attempt = attempt.clone();
        reactor.schedule(timeout, move || {
            log::debug!("connect: {addr} timed out");
            finish(&attempt, Err(Error::Timeout));
        })
    };

    match (watch, timer) {
        (Ok(watch), Ok(timer)) => {
            if let Some(pending) = attempt.borrow_mut().as_mut() {
                pending.watch = Some(watch);
                pending.timer = Some(timer);
            }
        }
        (Err(err), _) | (_, Err(err)) => {
            reactor.call_soon(move || finish(&attempt, Err(err)));
        }
    }
}

/// Completes an attempt exactly once; later calls find it gone.
fn finish(attempt: &Shared, result: Result<()>) {
    let Some(Attempt {
        fd,
        callback,
        watch,
        timer,
    }) = attempt.borrow_mut().take()
    else {
        return;
    };

    // Deregister before the descriptor can be closed.
    drop(watch);
    drop(timer);

    match result {
        Ok(()) => callback(Ok(TcpStream::from(fd))),
        Err(err) => {
            drop(fd);
            callback(Err(err));
        }
    }
}
