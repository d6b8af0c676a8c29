//! Error type shared by the reactor, the collaborators and the templates.
//!
//! Every failure carries a stable *failure code* (see [`Error::failure`])
//! which is what ends up in the `failure` field of a report entry.

use std::io;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Completion callback handed to asynchronous operations.
///
/// Exactly one `Result` is delivered, always from the reactor thread.
pub type Callback<T> = Box<dyn FnOnce(Result<T>) + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot allocate reactor resource: {0}")]
    Allocation(#[source] io::Error),

    #[error("cannot schedule event: {0}")]
    Scheduling(String),

    #[error("cannot break loop: no loop is running")]
    Break,

    #[error("event dispatch failed: {0}")]
    Dispatch(#[source] io::Error),

    #[error("loop is already running on this reactor")]
    ReentrantLoop,

    #[error("the global reactor belongs to another thread")]
    ForeignThread,

    #[error("cannot register interrupt handler: {0}")]
    SignalRegistration(String),

    #[error("cannot parse endpoint: {0}")]
    EndpointParse(String),

    #[error("missing required host")]
    MissingRequiredHost,

    #[error("missing or invalid port")]
    MissingOrInvalidPort,

    #[error("missing setting `{0}`")]
    MissingSetting(String),

    #[error("setting `{key}` is not a valid {expected}")]
    InvalidSetting { key: String, expected: &'static str },

    #[error("operation timed out")]
    Timeout,

    #[error("dns lookup failed: {0}")]
    DnsLookup(String),

    #[error("http request failed: {0}")]
    Http(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Returns the report-compatible failure code for this error.
    ///
    /// Collaborator I/O failures are classified by their kind; anything
    /// unrecognised falls back to `unknown_failure: <message>`.
    pub fn failure(&self) -> String {
        let code = match self {
            Error::Allocation(_) => "allocation_error",
            Error::Scheduling(_) => "scheduling_error",
            Error::Break => "break_error",
            Error::Dispatch(_) => "dispatch_error",
            Error::ReentrantLoop => "reentrant_loop_error",
            Error::ForeignThread => "foreign_thread_error",
            Error::SignalRegistration(_) => "signal_registration_error",
            Error::EndpointParse(_) => "endpoint_parse_error",
            Error::MissingRequiredHost => "missing_required_host_error",
            Error::MissingOrInvalidPort => "missing_or_invalid_port_error",
            Error::MissingSetting(_) => "missing_setting_error",
            Error::InvalidSetting { .. } => "invalid_setting_error",
            Error::Timeout => "generic_timeout_error",
            Error::DnsLookup(_) => "dns_lookup_error",
            Error::Http(_) => "http_error",
            Error::Io(err) => return io_failure(err),
        };

        code.to_owned()
    }
}

fn io_failure(err: &io::Error) -> String {
    let code = match err.kind() {
        io::ErrorKind::ConnectionRefused => "connection_refused",
        io::ErrorKind::ConnectionReset => "connection_reset",
        io::ErrorKind::TimedOut => "generic_timeout_error",
        io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
            "network_unreachable"
        }
        _ => return format!("unknown_failure: {err}"),
    };

    code.to_owned()
}
