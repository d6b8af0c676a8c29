//! DNS result types and the resolver contract.
//!
//! The wire format lives with whoever implements [`DnsClient`]; the
//! templates only look at the decoded [`Message`].

use crate::error::Callback;
use crate::reactor::Reactor;
use crate::settings::Settings;

use std::fmt;
use std::net::Ipv4Addr;

/// Resource record types a query may ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryType {
    A,
    Ns,
    Cname,
    Soa,
    Ptr,
    Mx,
    Txt,
    Aaaa,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryType::A => "A",
            QueryType::Ns => "NS",
            QueryType::Cname => "CNAME",
            QueryType::Soa => "SOA",
            QueryType::Ptr => "PTR",
            QueryType::Mx => "MX",
            QueryType::Txt => "TXT",
            QueryType::Aaaa => "AAAA",
        };
        f.write_str(name)
    }
}

/// Query classes. Only `IN` is used in practice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum QueryClass {
    #[default]
    In,
    Cs,
    Ch,
    Hs,
}

/// One answer record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Answer {
    pub name: String,
    pub ttl: u32,
    /// Set for `A` records.
    pub address: Option<Ipv4Addr>,
}

/// A decoded DNS response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    pub answers: Vec<Answer>,
}

/// Issues DNS queries.
///
/// Implementations read the resolver to use from the `dns/nameserver`,
/// `dns/port`, `dns/engine` and `dns/attempts` settings, falling back to
/// [`Reactor::dns_context`], and must deliver exactly one result through
/// `callback` from the reactor thread.
pub trait DnsClient {
    fn query(
        &self,
        query_class: QueryClass,
        query_type: QueryType,
        query_name: &str,
        callback: Callback<Message>,
        options: &Settings,
        reactor: &Reactor,
    );
}
