//! TCP networking implementation.
//!
//! Connections are started with a non-blocking `connect(2)` and completed
//! from a reactor readiness callback, racing a timeout timer.

mod connector;

pub use connector::TcpConnector;
