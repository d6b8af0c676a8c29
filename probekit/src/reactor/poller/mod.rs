//! OS readiness backends.
//!
//! `epoll` on Linux, `poll(2)` on every other Unix, chosen at compile
//! time behind the [`Poller`] alias. Both expose the same inherent API:
//! `new`, `waker`, `register`, `deregister` and `poll`.

pub(crate) mod common;

pub(crate) use common::{Waker, wake_fd};

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(all(unix, not(target_os = "linux")))]
mod poll;

#[cfg(target_os = "linux")]
pub(crate) type Poller = epoll::EpollPoller;

#[cfg(all(unix, not(target_os = "linux")))]
pub(crate) type Poller = poll::PollPoller;

pub(crate) mod unix;

pub(crate) use unix as platform;
