use crate::error::{Error, Result};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A host and port pair, as written in settings.
///
/// The host is kept as written (a name or an address literal, without
/// IPv6 brackets); resolving it is up to whoever connects.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub hostname: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hostname.contains(':') {
            write!(f, "[{}]:{}", self.hostname, self.port)
        } else {
            write!(f, "{}:{}", self.hostname, self.port)
        }
    }
}

/// Parses `host`, `host:port`, `[v6]`, `[v6]:port` or a bare IPv6 literal.
///
/// `default_port` is used when the string carries no port.
///
/// # Errors
///
/// Returns [`Error::EndpointParse`] for an empty host, an unterminated
/// bracket, garbage after the bracket, or a port outside `0..=65535`.
pub fn parse_endpoint(s: &str, default_port: u16) -> Result<Endpoint> {
    let invalid = |why: &str| Error::EndpointParse(format!("{s:?}: {why}"));

    let (hostname, port) = if let Some(rest) = s.strip_prefix('[') {
        let (host, rest) = rest
            .split_once(']')
            .ok_or_else(|| invalid("missing closing bracket"))?;

        match rest {
            "" => (host, None),
            _ => {
                let port = rest
                    .strip_prefix(':')
                    .ok_or_else(|| invalid("unexpected text after bracket"))?;
                (host, Some(port))
            }
        }
    } else {
        match s.split_once(':') {
            None => (s, None),
            // More than one colon and no brackets: an IPv6 literal.
            Some((_, rest)) if rest.contains(':') => (s, None),
            Some((host, port)) => (host, Some(port)),
        }
    };

    if hostname.is_empty() {
        return Err(invalid("empty host"));
    }

    let port = match port {
        None => default_port,
        Some(port) => port.parse().map_err(|_| invalid("invalid port"))?,
    };

    Ok(Endpoint {
        hostname: hostname.to_owned(),
        port,
    })
}
