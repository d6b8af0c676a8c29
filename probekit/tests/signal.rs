//! SIGINT handling is process-wide, so everything touching it lives in
//! one test.

mod common;

use probekit::{Error, Reactor};

use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_sigint_breaks_loop() {
    common::init_logger();

    let reactor = Reactor::new().unwrap();
    reactor.break_loop_on_sigint(true).unwrap();
    // Arming twice is harmless.
    reactor.break_loop_on_sigint(true).unwrap();

    // The bridge alone does not keep the loop running.
    assert_eq!(reactor.pending_events(), 0);
    reactor.run_loop().unwrap();

    let other = Reactor::new().unwrap();
    assert!(matches!(
        other.break_loop_on_sigint(true),
        Err(Error::SignalRegistration(_))
    ));

    let _far = reactor.schedule(30.0, || panic!("SIGINT did not break the loop")).unwrap();

    let after = Rc::new(Cell::new(false));
    let a = after.clone();
    reactor.call_soon(|| unsafe {
        libc::raise(libc::SIGINT);
    });
    let _next = reactor.schedule(0.5, move || a.set(true)).unwrap();

    reactor.run_loop().unwrap();
    assert!(!after.get());

    reactor.break_loop_on_sigint(false).unwrap();
    reactor.break_loop_on_sigint(false).unwrap();

    // Released: another reactor may take over.
    other.break_loop_on_sigint(true).unwrap();
    drop(other);

    reactor.break_loop_on_sigint(true).unwrap();
    drop(reactor);
}

