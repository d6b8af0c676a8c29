use crate::net::{Endpoint, parse_endpoint};

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

const RESOLV_CONF: &str = "/etc/resolv.conf";

/// Name-resolution context bound to a reactor.
///
/// Holds the resolver configuration DNS-issuing collaborators start from:
/// which nameservers to ask, how many attempts to make and how long to
/// wait for each. Probes override it per query through their settings.
#[derive(Clone, Debug, PartialEq)]
pub struct DnsContext {
    pub nameservers: Vec<Endpoint>,
    pub attempts: u32,
    pub timeout: Duration,
}

impl Default for DnsContext {
    fn default() -> Self {
        Self {
            nameservers: Vec::new(),
            attempts: 3,
            timeout: Duration::from_secs(5),
        }
    }
}

impl DnsContext {
    /// Loads the system configuration.
    ///
    /// An unreadable `/etc/resolv.conf` is not an error: the context
    /// simply starts without nameservers.
    pub fn system() -> Self {
        match Self::from_resolv_conf(RESOLV_CONF) {
            Ok(context) => context,
            Err(err) => {
                log::debug!("dns: cannot read {RESOLV_CONF}: {err}");
                Self::default()
            }
        }
    }

    /// Loads a `resolv.conf`-formatted file.
    pub fn from_resolv_conf(path: impl AsRef<Path>) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(Self::parse(&contents))
    }

    /// Parses `resolv.conf` contents.
    ///
    /// Understands `nameserver` lines plus the `attempts:` and `timeout:`
    /// options. Everything else, and any malformed value, is skipped.
    pub fn parse(contents: &str) -> Self {
        let mut context = Self::default();

        for line in contents.lines() {
            let line = line.split(['#', ';']).next().unwrap_or_default();
            let mut words = line.split_whitespace();

            match words.next() {
                Some("nameserver") => {
                    if let Some(endpoint) = words.next().and_then(|w| parse_endpoint(w, 53).ok()) {
                        context.nameservers.push(endpoint);
                    }
                }
                Some("options") => {
                    for option in words {
                        if let Some(n) = option.strip_prefix("attempts:") {
                            if let Ok(n) = n.parse() {
                                context.attempts = n;
                            }
                        } else if let Some(n) = option.strip_prefix("timeout:") {
                            if let Ok(n) = n.parse() {
                                context.timeout = Duration::from_secs(n);
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        context
    }
}

#[cfg(test)]
mod tests {
    use super::DnsContext;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_parse_nameservers_and_options() {
        let context = DnsContext::parse(
            "# generated\n\
             nameserver 8.8.8.8\n\
             nameserver 2001:4860:4860::8888\n\
             search example.org\n\
             options attempts:2 timeout:1 rotate\n",
        );

        assert_eq!(context.nameservers.len(), 2);
        assert_eq!(context.nameservers[0].hostname, "8.8.8.8");
        assert_eq!(context.nameservers[0].port, 53);
        assert_eq!(context.nameservers[1].hostname, "2001:4860:4860::8888");
        assert_eq!(context.attempts, 2);
        assert_eq!(context.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let context = DnsContext::parse("nameserver\noptions attempts:x\nnameserver 1.1.1.1:5353 ; c\n");

        assert_eq!(context.nameservers.len(), 1);
        assert_eq!(context.nameservers[0].port, 5353);
        assert_eq!(context.attempts, 3);
    }

    #[test]
    fn test_from_resolv_conf_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "nameserver 9.9.9.9").unwrap();

        let context = DnsContext::from_resolv_conf(file.path()).unwrap();

        assert_eq!(context.nameservers[0].hostname, "9.9.9.9");
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DnsContext::from_resolv_conf(dir.path().join("absent")).is_err());
    }
}
