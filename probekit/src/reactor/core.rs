use super::event::Event;
use super::interrupt::Interrupter;
use super::io::{IoEntry, IoWatch};
use super::poller::common::{Interest, Readiness};
use super::poller::{Poller, Waker};
use super::resolver::DnsContext;
use super::signal::SignalBridge;
use super::timer::{Timer, TimerQueue};
use crate::error::{Error, Result};
use crate::utils::{Key, Slab};

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::mem;
use std::os::fd::RawFd;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// The reactor.
///
/// A single-threaded event loop multiplexing I/O readiness and timers.
/// Everything it dispatches runs on the thread that called
/// [`run_loop`](Self::run_loop):
/// - timer actions scheduled with [`schedule`](Self::schedule) or
///   [`call_soon`](Self::call_soon),
/// - readiness callbacks registered with [`watch`](Self::watch),
/// - and through them, the completions of every probe.
///
/// `Reactor` is a cheap handle: clones refer to the same loop, which is
/// torn down when the last handle goes away. Callbacks commonly capture a
/// clone so they can schedule follow-up work.
///
/// # Examples
///
/// ```rust,ignore
/// let reactor = Reactor::new()?;
///
/// let r = reactor.clone();
/// reactor.call_soon(move || {
///     println!("tick");
///     r.break_loop().unwrap();
/// });
///
/// reactor.run_loop()?;
/// ```
#[derive(Clone)]
pub struct Reactor {
    inner: Rc<Inner>,
}

/// State shared by every handle to one reactor.
pub(crate) struct Inner {
    /// Platform-specific poller (epoll, poll).
    pub(crate) poller: RefCell<Poller>,

    /// Buffer used to collect I/O events from the poller.
    events: RefCell<Vec<Event>>,

    /// Pending timers ordered by deadline.
    pub(crate) timers: RefCell<TimerQueue>,

    /// Slab storing active watchers indexed by poller tokens.
    pub(crate) io: RefCell<Slab<IoEntry>>,

    /// Name-resolution context handed to DNS collaborators.
    dns: RefCell<DnsContext>,

    /// Whether `run_loop` is currently on the stack.
    running: Cell<bool>,

    /// Set by `break_loop`, consumed by the loop.
    break_requested: Cell<bool>,

    /// Set by any `Interrupter`, possibly from another thread.
    interrupt: Arc<AtomicBool>,

    /// Wakes the poller out of a blocking wait.
    waker: Arc<Waker>,

    /// Armed SIGINT bridge, if any.
    signal: RefCell<Option<SignalBridge>>,
}

/// Clears the running flag however the loop exits, panics included.
struct LoopGuard<'a>(&'a Cell<bool>);

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Reactor {
    /// Creates a new reactor with its poller and name-resolution context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`] if the OS refuses to create the
    /// poller resources. Nothing is leaked in that case.
    pub fn new() -> Result<Self> {
        let poller = Poller::new().map_err(Error::Allocation)?;
        let waker = poller.waker();

        let inner = Inner {
            poller: RefCell::new(poller),
            events: RefCell::new(Vec::with_capacity(64)),
            timers: RefCell::new(TimerQueue::new()),
            io: RefCell::new(Slab::new(64)),
            dns: RefCell::new(DnsContext::system()),
            running: Cell::new(false),
            break_requested: Cell::new(false),
            interrupt: Arc::new(AtomicBool::new(false)),
            waker,
            signal: RefCell::new(None),
        };

        log::debug!("reactor: created");

        Ok(Self {
            inner: Rc::new(inner),
        })
    }

    /// Runs the event loop on the calling thread.
    ///
    /// Dispatches ready I/O and expired timers until one of:
    /// - [`break_loop`](Self::break_loop) is called from a callback,
    /// - an [`Interrupter`] (or SIGINT, when bridged) fires,
    /// - no timers or watchers remain registered.
    ///
    /// The last case returns `Ok` but logs a warning, since a loop with
    /// nothing to wait for usually means the caller forgot to schedule
    /// something.
    ///
    /// # Errors
    ///
    /// - [`Error::ReentrantLoop`] if a loop is already running on this
    ///   reactor. The running loop is not affected.
    /// - [`Error::Dispatch`] if the poller fails.
    pub fn run_loop(&self) -> Result<()> {
        let inner = &*self.inner;

        if inner.running.get() {
            return Err(Error::ReentrantLoop);
        }

        inner.running.set(true);
        let _guard = LoopGuard(&inner.running);
        inner.break_requested.set(false);

        loop {
            if self.should_stop() {
                return Ok(());
            }

            if self.pending_events() == 0 {
                log::warn!("loop: no pending and/or active events");
                return Ok(());
            }

            let timeout = inner
                .timers
                .borrow_mut()
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(Instant::now()));

            let ready = self.poll(timeout)?;

            for (key, readiness) in ready {
                if self.should_stop() {
                    return Ok(());
                }
                self.dispatch_io(key, readiness);
            }

            let now = Instant::now();

            loop {
                if self.should_stop() {
                    return Ok(());
                }

                let action = inner.timers.borrow_mut().pop_expired(now);
                match action {
                    Some(action) => action(),
                    None => break,
                }
            }
        }
    }

    /// Asks the running loop to return once the current callback finishes.
    ///
    /// Other events that are already ready stay pending and are dispatched
    /// by the next [`run_loop`](Self::run_loop).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Break`] if no loop is running.
    pub fn break_loop(&self) -> Result<()> {
        if !self.inner.running.get() {
            return Err(Error::Break);
        }

        self.inner.break_requested.set(true);
        Ok(())
    }

    /// Schedules `action` to run once, `delay` seconds from now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Scheduling`] if `delay` is negative, not finite or
    /// too large to represent. The action is dropped without running.
    pub fn schedule<F>(&self, delay: f64, action: F) -> Result<Timer>
    where
        F: FnOnce() + 'static,
    {
        let delay = Duration::try_from_secs_f64(delay)
            .map_err(|err| Error::Scheduling(format!("invalid delay {delay}: {err}")))?;

        let deadline = Instant::now()
            .checked_add(delay)
            .ok_or_else(|| Error::Scheduling(format!("delay {delay:?} overflows the clock")))?;

        Ok(self.insert_timer(deadline, Box::new(action)))
    }

    /// Runs `action` on the next loop iteration.
    ///
    /// This is how results are delivered "asynchronously" even when they
    /// are known at call time: the caller's stack has always unwound
    /// before its callback runs.
    pub fn call_soon<F>(&self, action: F)
    where
        F: FnOnce() + 'static,
    {
        self.insert_timer(Instant::now(), Box::new(action)).detach();
    }

    /// Watches `fd` for `interest` readiness.
    ///
    /// `handler` runs each time the poller reports the descriptor ready,
    /// until the returned [`IoWatch`] is dropped. The descriptor must be
    /// non-blocking, must stay open while watched and may be watched at
    /// most once at a time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Scheduling`] if the poller rejects the descriptor.
    pub fn watch<F>(&self, fd: RawFd, interest: Interest, handler: F) -> Result<IoWatch>
    where
        F: FnMut(Readiness) + 'static,
    {
        let key = self.inner.io.borrow_mut().insert(IoEntry {
            fd,
            interest,
            handler: Some(Box::new(handler)),
        });

        let registered = self
            .inner
            .poller
            .borrow_mut()
            .register(fd, key.index, interest);

        if let Err(err) = registered {
            let entry = self.inner.io.borrow_mut().remove(key);
            drop(entry);
            return Err(Error::Scheduling(format!("cannot watch fd {fd}: {err}")));
        }

        Ok(IoWatch::new(Rc::downgrade(&self.inner), key))
    }

    /// Returns a thread-safe handle that can break the loop.
    pub fn interrupter(&self) -> Interrupter {
        Interrupter::new(self.inner.interrupt.clone(), self.inner.waker.clone())
    }

    /// Arms or disarms breaking the loop on SIGINT.
    ///
    /// SIGINT disposition is process-wide, so only one reactor at a time
    /// can have the bridge armed; it is released when disarmed or when
    /// the reactor is dropped. Arming twice is a no-op. The bridge does
    /// not count as a pending event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SignalRegistration`] if the handler cannot be
    /// installed or removed, or another reactor already owns it.
    pub fn break_loop_on_sigint(&self, enable: bool) -> Result<()> {
        let mut slot = self.inner.signal.borrow_mut();

        if enable {
            if slot.is_none() {
                *slot = Some(SignalBridge::enable(self.inner.waker.clone())?);
            }
            return Ok(());
        }

        match slot.take() {
            Some(bridge) => bridge.disable(),
            None => Ok(()),
        }
    }

    /// Returns the name-resolution context.
    pub fn dns_context(&self) -> Ref<'_, DnsContext> {
        self.inner.dns.borrow()
    }

    /// Returns the name-resolution context for modification.
    pub fn dns_context_mut(&self) -> RefMut<'_, DnsContext> {
        self.inner.dns.borrow_mut()
    }

    /// Number of live timers and watchers.
    pub fn pending_events(&self) -> usize {
        self.inner.timers.borrow().len() + self.inner.io.borrow().len()
    }

    /// Returns `true` while [`run_loop`](Self::run_loop) is on the stack.
    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    fn insert_timer(&self, deadline: Instant, action: Box<dyn FnOnce()>) -> Timer {
        let key = self.inner.timers.borrow_mut().insert(deadline, action);
        Timer::new(Rc::downgrade(&self.inner), key)
    }

    /// Consumes any pending stop request.
    fn should_stop(&self) -> bool {
        let inner = &*self.inner;

        let signalled = inner
            .signal
            .borrow()
            .as_ref()
            .is_some_and(|bridge| bridge.take_pending());

        if signalled {
            log::debug!("loop: interrupted by SIGINT");
        }

        inner.break_requested.replace(false)
            | inner.interrupt.swap(false, Ordering::AcqRel)
            | signalled
    }

    /// Waits for readiness and resolves every event to its watcher key.
    ///
    /// Keys are resolved for the whole batch before any callback runs, so
    /// a callback that drops one watcher and registers another cannot have
    /// the new one receive the old one's event.
    fn poll(&self, timeout: Option<Duration>) -> Result<Vec<(Key, Readiness)>> {
        let mut events = mem::take(&mut *self.inner.events.borrow_mut());

        let polled = self.inner.poller.borrow_mut().poll(&mut events, timeout);

        let ready = {
            let io = self.inner.io.borrow();
            events
                .iter()
                .filter_map(|event| {
                    let key = io.key_at(event.token)?;
                    let interest = io.get(key)?.interest;
                    let readiness = Readiness {
                        readable: event.readable && interest.read,
                        writable: event.writable && interest.write,
                    };
                    (readiness.readable || readiness.writable).then_some((key, readiness))
                })
                .collect()
        };

        *self.inner.events.borrow_mut() = events;

        polled.map_err(Error::Dispatch)?;
        Ok(ready)
    }

    /// Runs the handler of one ready watcher.
    ///
    /// The handler is taken out of the table while it runs, so it can
    /// freely register, drop or replace watchers, including its own.
    fn dispatch_io(&self, key: Key, readiness: Readiness) {
        let handler = self
            .inner
            .io
            .borrow_mut()
            .get_mut(key)
            .and_then(|entry| entry.handler.take());

        let Some(mut handler) = handler else {
            return;
        };

        handler(readiness);

        let leftover = {
            let mut io = self.inner.io.borrow_mut();
            match io.get_mut(key) {
                Some(entry) => {
                    entry.handler = Some(handler);
                    None
                }
                None => Some(handler),
            }
        };

        drop(leftover);
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(bridge) = self.signal.get_mut().take() {
            if let Err(err) = bridge.disable() {
                log::warn!("reactor: {err}");
            }
        }

        // Pending actions may own watchers and timers of this reactor;
        // drop them while the rest of the state is still intact.
        let actions = self.timers.get_mut().drain();
        drop(actions);

        let watchers = self.io.get_mut().drain();
        for watcher in &watchers {
            self.poller.get_mut().deregister(watcher.fd);
        }
        drop(watchers);

        log::debug!("reactor: destroyed");
    }
}
