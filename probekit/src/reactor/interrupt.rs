use super::poller::Waker;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A thread-safe request to break the reactor loop.
///
/// The reactor itself is confined to one thread. An `Interrupter` is the
/// only handle that may cross threads: [`interrupt`](Self::interrupt) sets
/// a flag that the loop checks between callbacks, and wakes the poller in
/// case it is blocked waiting for events.
///
/// A request made while no loop is running is kept, and makes the next
/// [`Reactor::run_loop`](crate::Reactor::run_loop) return immediately.
#[derive(Clone)]
pub struct Interrupter {
    requested: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl Interrupter {
    pub(crate) fn new(requested: Arc<AtomicBool>, waker: Arc<Waker>) -> Self {
        Self { requested, waker }
    }

    /// Asks the loop to return as soon as the current callback finishes.
    pub fn interrupt(&self) {
        self.requested.store(true, Ordering::Release);
        self.waker.wake();
    }
}
