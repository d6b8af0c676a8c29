use super::core::Inner;
use crate::reactor::poller::common::{Interest, Readiness};
use crate::utils::Key;

use std::os::fd::RawFd;
use std::rc::Weak;

/// Callback invoked each time a watched descriptor becomes ready.
pub(crate) type Handler = Box<dyn FnMut(Readiness) + 'static>;

/// A descriptor registered with the reactor for readiness.
pub(crate) struct IoEntry {
    /// The watched file descriptor. Not owned.
    pub(crate) fd: RawFd,

    /// Readiness the watcher asked for.
    pub(crate) interest: Interest,

    /// The handler, or `None` while the reactor is running it.
    pub(crate) handler: Option<Handler>,
}

/// A readiness registration for one file descriptor.
///
/// Returned by [`Reactor::watch`](crate::Reactor::watch). The callback
/// runs on every readiness edge reported by the poller until the watch is
/// dropped. Dropping it deregisters the descriptor synchronously; it does
/// not close the descriptor, which stays owned by the caller.
#[must_use = "dropping an IoWatch deregisters it"]
pub struct IoWatch {
    reactor: Weak<Inner>,
    key: Key,
}

impl IoWatch {
    pub(crate) fn new(reactor: Weak<Inner>, key: Key) -> Self {
        Self { reactor, key }
    }

    /// Returns `true` while the watch is registered with a live reactor.
    pub fn is_active(&self) -> bool {
        self.reactor
            .upgrade()
            .is_some_and(|inner| inner.io.borrow().contains(self.key))
    }
}

impl Drop for IoWatch {
    fn drop(&mut self) {
        let Some(inner) = self.reactor.upgrade() else {
            return;
        };

        let entry = inner.io.borrow_mut().remove(self.key);

        if let Some(entry) = entry {
            inner.poller.borrow_mut().deregister(entry.fd);
            drop(entry);
        }
    }
}
