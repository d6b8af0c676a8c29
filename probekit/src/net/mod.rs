//! Transport-level networking.
//!
//! This module provides:
//! - the endpoint parser used for nameserver and target strings,
//! - the [`Connector`] contract the `tcp_connect` template is written
//!   against,
//! - [`TcpConnector`], a non-blocking TCP connector driven by the reactor.

mod endpoint;
mod tcp;

use crate::error::Callback;
use crate::reactor::Reactor;
use crate::settings::Settings;

pub use endpoint::{Endpoint, parse_endpoint};
pub use tcp::TcpConnector;

/// Establishes transport connections.
///
/// Implementations must deliver exactly one result through `callback`,
/// from the reactor thread and never before `connect` has returned.
pub trait Connector {
    /// The connected transport handed to the callback.
    type Transport: 'static;

    fn connect(
        &self,
        host: &str,
        port: u16,
        callback: Callback<Self::Transport>,
        options: &Settings,
        reactor: &Reactor,
    );
}
