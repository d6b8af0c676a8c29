//! The process-wide default reactor.
//!
//! Code that does not carry a [`Reactor`] around can reach a shared one
//! through [`global_reactor`]. The reactor is single-threaded, so the
//! default instance belongs to the first thread that asks for it and is
//! refused to every other thread. It is created lazily and torn down
//! with its owning thread.

use crate::error::{Error, Result};
use crate::reactor::Reactor;

use std::cell::RefCell;
use std::sync::OnceLock;
use std::thread::{self, ThreadId};

/// The thread allowed to use the default reactor.
static OWNER: OnceLock<ThreadId> = OnceLock::new();

thread_local! {
    /// The default reactor, only ever populated on [`OWNER`].
    static DEFAULT_REACTOR: RefCell<Option<Reactor>> = const { RefCell::new(None) };
}

/// Returns a handle to the default reactor, creating it on first use.
///
/// # Errors
///
/// - [`Error::ForeignThread`] when called from a thread other than the
///   one that first called it.
/// - [`Error::Allocation`] if the reactor cannot be created. A later
///   call retries.
pub fn global_reactor() -> Result<Reactor> {
    let current = thread::current().id();

    if *OWNER.get_or_init(|| current) != current {
        return Err(Error::ForeignThread);
    }

    DEFAULT_REACTOR.with(|slot| {
        let mut slot = slot.borrow_mut();

        if let Some(reactor) = slot.as_ref() {
            return Ok(reactor.clone());
        }

        let reactor = Reactor::new()?;
        log::debug!("registry: default reactor created");
        *slot = Some(reactor.clone());
        Ok(reactor)
    })
}

/// Runs the default reactor's loop. See [`Reactor::run_loop`].
pub fn global_loop() -> Result<()> {
    global_reactor()?.run_loop()
}

/// Breaks the default reactor's loop. See [`Reactor::break_loop`].
pub fn global_break() -> Result<()> {
    global_reactor()?.break_loop()
}
