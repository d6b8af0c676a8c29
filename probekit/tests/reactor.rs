mod common;

use probekit::{Error, Interest, Reactor};

use std::cell::{Cell, RefCell};
use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

#[probekit::test]
fn test_timer_fires_once_after_delay() {
    common::init_logger();

    let fired = Rc::new(Cell::new(0));
    let start = Instant::now();

    let f = fired.clone();
    let timer = reactor
        .schedule(0.05, move || {
            assert!(start.elapsed() >= Duration::from_millis(50));
            f.set(f.get() + 1);
        })
        .unwrap();

    assert!(timer.is_pending());
    reactor.run_loop().unwrap();

    assert_eq!(fired.get(), 1);
    assert!(!timer.is_pending());
    assert_eq!(reactor.pending_events(), 0);
}

#[probekit::test]
fn test_dropped_timer_never_fires() {
    common::init_logger();

    let fired = Rc::new(Cell::new(false));

    let f = fired.clone();
    let timer = reactor.schedule(0.01, move || f.set(true)).unwrap();
    assert_eq!(reactor.pending_events(), 1);

    drop(timer);
    assert_eq!(reactor.pending_events(), 0);

    reactor.run_loop().unwrap();
    assert!(!fired.get());
}

#[probekit::test]
fn test_cancel_from_another_callback() {
    let fired = Rc::new(Cell::new(false));

    let f = fired.clone();
    let victim = reactor.schedule(0.05, move || f.set(true)).unwrap();

    let _killer = reactor.schedule(0.0, move || victim.cancel()).unwrap();

    reactor.run_loop().unwrap();
    assert!(!fired.get());
}

#[probekit::test]
fn test_invalid_delays_are_rejected() {
    for delay in [-1.0, f64::NAN, f64::INFINITY] {
        let result = reactor.schedule(delay, || panic!("must not run"));
        assert!(matches!(result, Err(Error::Scheduling(_))), "delay {delay}");
    }

    assert_eq!(reactor.pending_events(), 0);
}

#[probekit::test]
fn test_equal_deadlines_fire_in_scheduling_order() {
    let order = Rc::new(RefCell::new(Vec::new()));

    for i in 0..5 {
        let order = order.clone();
        reactor.call_soon(move || order.borrow_mut().push(i));
    }

    reactor.run_loop().unwrap();
    assert_eq!(*order.borrow(), vec![0, 1, 2, 3, 4]);
}

#[probekit::test]
fn test_break_loop_stops_after_current_callback() {
    let ran = Rc::new(Cell::new(0));

    for _ in 0..3 {
        let ran = ran.clone();
        let r = reactor.clone();
        reactor.call_soon(move || {
            ran.set(ran.get() + 1);
            r.break_loop().unwrap();
        });
    }

    reactor.run_loop().unwrap();
    assert_eq!(ran.get(), 1);
    assert_eq!(reactor.pending_events(), 2);

    reactor.run_loop().unwrap();
    assert_eq!(ran.get(), 2);
}

#[test]
fn test_break_loop_while_idle_fails() {
    let reactor = Reactor::new().unwrap();
    assert!(matches!(reactor.break_loop(), Err(Error::Break)));
    assert!(!reactor.is_running());
}

#[probekit::test]
fn test_nested_loop_is_rejected() {
    let nested = Rc::new(RefCell::new(None));

    let n = nested.clone();
    let r = reactor.clone();
    reactor.call_soon(move || {
        assert!(r.is_running());
        *n.borrow_mut() = Some(r.run_loop());
    });

    reactor.run_loop().unwrap();
    assert!(matches!(*nested.borrow(), Some(Err(Error::ReentrantLoop))));
    assert!(!reactor.is_running());

    // The reactor is still usable afterwards.
    let fired = Rc::new(Cell::new(false));
    let f = fired.clone();
    reactor.call_soon(move || f.set(true));

    reactor.run_loop().unwrap();
    assert!(fired.get());
}

#[test]
fn test_interrupter_breaks_from_another_thread() {
    common::init_logger();

    let reactor = Reactor::new().unwrap();
    let _far = reactor.schedule(30.0, || panic!("loop was not interrupted")).unwrap();

    let interrupter = reactor.interrupter();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        interrupter.interrupt();
    });

    let start = Instant::now();
    reactor.run_loop().unwrap();

    assert!(start.elapsed() < Duration::from_secs(10));
    handle.join().unwrap();
}

#[test]
fn test_interrupt_before_loop_is_remembered() {
    let reactor = Reactor::new().unwrap();
    let _far = reactor.schedule(30.0, || panic!("loop was not interrupted")).unwrap();

    reactor.interrupter().interrupt();
    reactor.run_loop().unwrap();

    assert_eq!(reactor.pending_events(), 1);
}

#[probekit::test]
fn test_watch_reports_readable() {
    common::init_logger();

    let (mut tx, rx) = UnixStream::pair().unwrap();
    rx.set_nonblocking(true).unwrap();

    let received = Rc::new(RefCell::new(Vec::new()));
    let watch_slot = Rc::new(RefCell::new(None));

    let watch = {
        let received = received.clone();
        let slot = watch_slot.clone();
        let mut rx = rx.try_clone().unwrap();

        reactor
            .watch(rx.as_raw_fd(), Interest::READ, move |readiness| {
                assert!(readiness.readable);

                let mut buf = [0; 16];
                let n = rx.read(&mut buf).unwrap();
                received.borrow_mut().extend_from_slice(&buf[..n]);

                // Dropping its own watch from inside the handler is allowed.
                slot.borrow_mut().take();
            })
            .unwrap()
    };

    assert!(watch.is_active());
    *watch_slot.borrow_mut() = Some(watch);

    tx.write_all(b"ping").unwrap();
    reactor.run_loop().unwrap();

    assert_eq!(*received.borrow(), b"ping");
    assert_eq!(reactor.pending_events(), 0);
}

#[test]
fn test_dropping_reactor_discards_pending_work() {
    let fired = Rc::new(Cell::new(false));

    let reactor = Reactor::new().unwrap();
    let f = fired.clone();
    let timer = reactor.schedule(0.0, move || f.set(true)).unwrap();

    drop(reactor);

    assert!(!timer.is_pending());
    drop(timer);
    assert!(!fired.get());
}

#[test]
fn test_idle_reactor_drops_silently() {
    let reactor = Reactor::new().unwrap();
    let clone = reactor.clone();

    drop(reactor);
    clone.run_loop().unwrap();
    drop(clone);
}

#[test]
fn test_dns_context_is_mutable() {
    let reactor = Reactor::new().unwrap();

    reactor.dns_context_mut().attempts = 1;
    assert_eq!(reactor.dns_context().attempts, 1);
}
