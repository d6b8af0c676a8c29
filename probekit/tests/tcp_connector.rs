mod common;

use probekit::net::{Connector, TcpConnector};
use probekit::settings::Settings;
use probekit::templates::tcp_connect;
use probekit::{Error, Reactor};

use std::cell::RefCell;
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::os::fd::AsRawFd;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

type Slot = Rc<RefCell<Option<probekit::Result<TcpStream>>>>;

fn connect(reactor: &Reactor, host: &str, port: u16, options: Settings) -> Slot {
    let slot: Slot = Rc::new(RefCell::new(None));
    let s = slot.clone();

    TcpConnector.connect(
        host,
        port,
        Box::new(move |result| *s.borrow_mut() = Some(result)),
        &options,
        reactor,
    );

    slot
}

/// Binds a listener whose accept queue is already full, so further
/// handshakes are never answered. Keep both values alive for the test.
#[cfg(target_os = "linux")]
fn saturated_listener() -> (TcpListener, Vec<TcpStream>, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to get local address");

    // A zero backlog admits a single pending connection.
    let rc = unsafe { libc::listen(listener.as_raw_fd(), 0) };
    assert_eq!(rc, 0, "listen failed");

    let fillers = (0..2)
        .filter_map(|_| TcpStream::connect_timeout(&addr, Duration::from_millis(100)).ok())
        .collect();

    (listener, fillers, addr)
}

#[test]
fn test_connects_to_local_listener() {
    common::init_logger();

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to get local address");

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("Failed to accept connection");
        stream.write_all(b"hello").expect("Failed to write to stream");
    });

    let reactor = Reactor::new().unwrap();
    let slot = connect(&reactor, "127.0.0.1", addr.port(), Settings::new());

    assert!(slot.borrow().is_none());
    reactor.run_loop().unwrap();

    let mut stream = slot.borrow_mut().take().unwrap().expect("connect failed");
    assert_eq!(stream.peer_addr().unwrap(), addr);

    stream.set_nonblocking(false).unwrap();
    let mut buffer = [0; 5];
    stream.read_exact(&mut buffer).expect("Failed to read from stream");
    assert_eq!(&buffer, b"hello");

    handle.join().expect("Thread panicked");
}

#[test]
fn test_refused_port_reports_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        listener.local_addr().unwrap().port()
    };

    let reactor = Reactor::new().unwrap();
    let slot = connect(&reactor, "127.0.0.1", port, Settings::new());
    reactor.run_loop().unwrap();

    match slot.borrow_mut().take() {
        Some(Err(Error::Io(err))) => assert_eq!(err.kind(), ErrorKind::ConnectionRefused),
        Some(Err(err)) => panic!("unexpected error: {err}"),
        Some(Ok(_)) => panic!("connected to a closed port"),
        None => panic!("callback never ran"),
    }

    assert_eq!(reactor.pending_events(), 0);
}

#[test]
fn test_hostnames_are_not_resolved() {
    let reactor = Reactor::new().unwrap();
    let slot = connect(&reactor, "example.org", 80, Settings::new());
    reactor.run_loop().unwrap();

    assert!(matches!(slot.borrow_mut().take(), Some(Err(Error::DnsLookup(_)))));
}

#[test]
fn test_refused_port_failure_code() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        listener.local_addr().unwrap().port()
    };

    let reactor = Reactor::new().unwrap();
    let slot = connect(&reactor, "127.0.0.1", port, Settings::new());
    reactor.run_loop().unwrap();

    let err = slot.borrow_mut().take().unwrap().unwrap_err();
    assert_eq!(err.failure(), "connection_refused");
}

#[test]
fn test_through_template() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let addr = listener.local_addr().unwrap();

    let reactor = Reactor::new().unwrap();
    let slot: Slot = Rc::new(RefCell::new(None));

    let s = slot.clone();
    let options = Settings::new()
        .with("host", "127.0.0.1")
        .with("port", addr.port())
        .with("net/timeout", 5.0);

    tcp_connect(
        &TcpConnector,
        options,
        move |result| *s.borrow_mut() = Some(result),
        &reactor,
    );
    reactor.run_loop().unwrap();

    let stream = slot.borrow_mut().take().unwrap().expect("connect failed");
    assert_eq!(stream.peer_addr().unwrap(), addr);

    let (_accepted, _) = listener.accept().unwrap();
}

#[cfg(target_os = "linux")]
#[test]
fn test_unanswered_connect_times_out() {
    common::init_logger();

    let (_listener, _fillers, addr) = saturated_listener();

    let reactor = Reactor::new().unwrap();
    let options = Settings::new().with("net/timeout", 0.05);
    let slot = connect(&reactor, "127.0.0.1", addr.port(), options);

    assert_eq!(reactor.pending_events(), 2);
    reactor.run_loop().unwrap();

    assert!(matches!(slot.borrow_mut().take(), Some(Err(Error::Timeout))));
    assert_eq!(reactor.pending_events(), 0);
}

#[cfg(target_os = "linux")]
#[test]
fn test_invalid_timeout_is_reported_through_callback() {
    let (_listener, _fillers, addr) = saturated_listener();

    let reactor = Reactor::new().unwrap();
    let options = Settings::new().with("net/timeout", -1.0);
    let slot = connect(&reactor, "127.0.0.1", addr.port(), options);

    assert!(slot.borrow().is_none());
    // Only the deferred completion is left; the watch is already gone.
    assert_eq!(reactor.pending_events(), 1);

    reactor.run_loop().unwrap();

    assert!(matches!(slot.borrow_mut().take(), Some(Err(Error::Scheduling(_)))));
    assert_eq!(reactor.pending_events(), 0);
}
