//! Reactor core and event handling.
//!
//! This module implements the single-threaded reactor at the heart of
//! the crate. The reactor is responsible for:
//! - driving I/O readiness through the platform poller,
//! - firing one-shot timers in deadline order,
//! - breaking out of its loop on request, from a callback, from another
//!   thread, or on SIGINT.
//!
//! Nothing here spawns threads. Work is expressed as callbacks, and a
//! callback only ever runs inside [`Reactor::run_loop`].

mod core;
mod event;
mod interrupt;
mod io;
mod resolver;
mod timer;

pub(crate) mod poller;
pub(crate) mod signal;

pub use self::core::Reactor;
pub use interrupt::Interrupter;
pub use io::IoWatch;
pub use poller::common::{Interest, Readiness};
pub use resolver::DnsContext;
pub use timer::Timer;

pub(crate) use poller::platform;
