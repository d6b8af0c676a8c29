//! # probekit
//!
//! **probekit** is the asynchronous core of a network-measurement toolkit:
//! a single-threaded, callback-driven reactor plus the measurement
//! templates that turn DNS lookups, HTTP requests and TCP connects into
//! report entries used to detect network interference.
//!
//! It offers:
//!
//! - A **reactor** multiplexing I/O readiness (epoll on Linux, `poll(2)` on
//!   other Unix systems) and one-shot, cancellable timers
//! - An **interrupter** and an optional **SIGINT bridge** to stop a running
//!   loop from another thread or from the terminal
//! - A **process-wide default reactor** for code that does not pass one
//!   around
//! - **Measurement templates** recording every exchange into a shared,
//!   privacy-redacted [`ReportEntry`](report::ReportEntry)
//! - A non-blocking [`TcpConnector`](net::TcpConnector) and the
//!   collaborator traits DNS and HTTP clients plug into
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use probekit::Reactor;
//!
//! fn main() -> probekit::Result<()> {
//!     let reactor = Reactor::new()?;
//!
//!     let r = reactor.clone();
//!     let _timer = reactor.schedule(0.5, move || {
//!         println!("half a second later");
//!         r.break_loop().unwrap();
//!     })?;
//!
//!     reactor.run_loop()
//! }
//! ```
//!
//! ## Modules
//!
//! - [`templates`] — `dns_query`, `http_request` and `tcp_connect`
//! - [`net`] — Endpoints, the connector contract and the TCP connector
//! - [`dns`] / [`http`] — Result types and client contracts
//! - [`report`] — Report entries, redaction and byte representation
//! - [`settings`] — Typed access to probe settings

mod error;
mod reactor;
mod registry;
mod utils;

pub mod dns;
pub mod http;
pub mod net;
pub mod report;
pub mod settings;
pub mod templates;

pub use error::{Callback, Error, Result};
pub use reactor::{DnsContext, Interest, Interrupter, IoWatch, Reactor, Readiness, Timer};
pub use registry::{global_break, global_loop, global_reactor};

pub use probekit_macros::test;
