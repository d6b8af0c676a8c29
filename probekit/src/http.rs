//! HTTP result types and the client contract.

use crate::error::Callback;
use crate::reactor::Reactor;
use crate::settings::Settings;

/// Ordered header list. Duplicate names are allowed.
pub type Headers = Vec<(String, String)>;

/// A decoded HTTP response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Response {
    pub headers: Headers,
    pub body: Vec<u8>,
    /// The raw status line, e.g. `HTTP/1.1 200 OK`.
    pub response_line: String,
    pub status_code: u16,
}

/// Sends HTTP requests.
///
/// The target comes from `http/url` and the verb from `http/method`.
/// Implementations must deliver exactly one result through `callback`
/// from the reactor thread.
pub trait HttpClient {
    fn request(
        &self,
        settings: &Settings,
        headers: &Headers,
        body: &[u8],
        callback: Callback<Response>,
        reactor: &Reactor,
    );
}
