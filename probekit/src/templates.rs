//! Measurement templates.
//!
//! Each template issues one asynchronous protocol call through a
//! collaborator, records what happened into a shared [`ReportEntry`] and
//! then hands the outcome, untouched, to the caller's callback. Inputs
//! that are invalid before anything is sent are reported through
//! [`Reactor::call_soon`], so a callback never runs before its template
//! has returned.

use crate::dns::{DnsClient, Message, QueryClass, QueryType};
use crate::error::{Error, Result};
use crate::http::{Headers, HttpClient, Response};
use crate::net::{Connector, parse_endpoint};
use crate::reactor::Reactor;
use crate::report::{ReportEntry, redact, represent_string};
use crate::settings::Settings;

use serde_json::{Map, Value, json};

/// Resolves `query_name` against `nameserver` and records the query.
///
/// `nameserver` is `host`, `host:port`, `[v6]` or `[v6]:port`; the port
/// defaults to 53. The resolver and its port are forced into `options`
/// together with a single attempt on the system engine, so the record
/// describes exactly the exchange that happened.
///
/// One record is appended to `entry["queries"]` per completed query. A
/// `nameserver` that does not parse records nothing and reports
/// [`Error::EndpointParse`].
#[allow(clippy::too_many_arguments)]
pub fn dns_query<C, F>(
    client: &C,
    entry: &ReportEntry,
    query_type: QueryType,
    query_class: QueryClass,
    query_name: &str,
    nameserver: &str,
    callback: F,
    mut options: Settings,
    reactor: &Reactor,
) where
    C: DnsClient + ?Sized,
    F: FnOnce(Result<Message>) + 'static,
{
    let endpoint = match parse_endpoint(nameserver, 53) {
        Ok(endpoint) => endpoint,
        Err(err) => {
            log::debug!(target: "probekit::templates", "dns_query: {err}");
            reactor.call_soon(move || callback(Err(err)));
            return;
        }
    };

    options.set("dns/nameserver", endpoint.hostname.as_str());
    options.set("dns/port", endpoint.port);
    options.set("dns/engine", "system");
    options.set("dns/attempts", 1u32);

    let entry = entry.clone();
    let hostname = query_name.to_owned();

    let on_response = move |result: Result<Message>| {
        log::debug!(target: "probekit::templates", "dns_query: got response");

        let mut record = json!({
            "resolver_hostname": endpoint.hostname,
            "resolver_port": endpoint.port,
            "failure": null,
            "answers": [],
        });

        if query_type == QueryType::A {
            record["query_type"] = json!("A");
            record["hostname"] = json!(hostname);
        }

        match &result {
            Ok(message) if query_type == QueryType::A => {
                let answers = message
                    .answers
                    .iter()
                    .map(|answer| {
                        json!({
                            "ttl": answer.ttl,
                            "address": answer.address.map(|ip| ip.to_string()),
                            "answer_type": "A",
                        })
                    })
                    .collect();
                record["answers"] = Value::Array(answers);
            }
            Ok(_) => {}
            Err(err) => record["failure"] = json!(err.failure()),
        }

        entry.append("queries", record);

        log::debug!(target: "probekit::templates", "dns_query: callbacking");
        callback(result);
    };

    client.query(
        query_class,
        query_type,
        query_name,
        Box::new(on_response),
        &options,
        reactor,
    );
}

/// Sends an HTTP request and records the exchange.
///
/// Sets the entry's `agent` and `socksproxy` fields, defaults
/// `http/method` to `GET`, and appends one record to
/// `entry["requests"]` when the request completes. Every string taken
/// from the wire or from the caller goes through redaction first and
/// [`represent_string`] second.
pub fn http_request<C, F>(
    client: &C,
    entry: &ReportEntry,
    mut settings: Settings,
    headers: Headers,
    body: Vec<u8>,
    callback: F,
    reactor: &Reactor,
) where
    C: HttpClient + ?Sized,
    F: FnOnce(Result<Response>) + 'static,
{
    entry.set("agent", "agent");
    entry.set("socksproxy", Value::Null);

    if !settings.contains("http/method") {
        settings.set("http/method", "GET");
    }

    let scrubber = Scrubber::from_settings(&settings);
    let url = settings.get_or("http/url", String::new());
    let method = settings.get_or("http/method", String::from("GET"));

    let entry = entry.clone();
    let request_headers = headers.clone();
    let request_body = body.clone();

    let on_response = move |result: Result<Response>| {
        log::debug!(target: "probekit::templates", "http_request: got response");

        let mut record = json!({
            "request": {
                "headers": scrubber.headers(&request_headers),
                "body": scrubber.represent(&request_body),
                "url": url,
                "method": method,
            },
            "method": method,
        });

        match &result {
            Ok(response) => {
                record["response"] = json!({
                    "headers": scrubber.headers(&response.headers),
                    "body": scrubber.represent(&response.body),
                    "response_line": scrubber.represent(response.response_line.as_bytes()),
                    "code": response.status_code,
                });
                record["failure"] = Value::Null;
            }
            Err(err) => record["failure"] = json!(err.failure()),
        }

        entry.append("requests", record);

        log::debug!(target: "probekit::templates", "http_request: callbacking");
        callback(result);
    };

    client.request(&settings, &headers, &body, Box::new(on_response), reactor);
}

/// Opens a transport to `host`:`port` as read from `options`.
///
/// Validation happens before the connector is involved: a missing or
/// out-of-range `port` reports [`Error::MissingOrInvalidPort`], a missing
/// or empty `host` reports [`Error::MissingRequiredHost`]. Otherwise the
/// connector's outcome is forwarded unchanged. Nothing is recorded.
pub fn tcp_connect<C, F>(connector: &C, options: Settings, callback: F, reactor: &Reactor)
where
    C: Connector + ?Sized,
    F: FnOnce(Result<C::Transport>) + 'static,
{
    let port = match options.get::<u16>("port") {
        Ok(port) => port,
        Err(err) => {
            log::debug!(target: "probekit::templates", "tcp_connect: {err}");
            reactor.call_soon(move || callback(Err(Error::MissingOrInvalidPort)));
            return;
        }
    };

    let host = options.get_or("host", String::new());
    if host.is_empty() {
        log::debug!(target: "probekit::templates", "tcp_connect: no host");
        reactor.call_soon(move || callback(Err(Error::MissingRequiredHost)));
        return;
    }

    log::debug!(target: "probekit::templates", "tcp_connect: {host}:{port}");
    connector.connect(&host, port, Box::new(callback), &options, reactor);
}

/// Removes the probe's own address from recorded strings.
struct Scrubber {
    probe_ip: Option<String>,
}

impl Scrubber {
    fn from_settings(settings: &Settings) -> Self {
        let probe_ip = settings.get_or("real_probe_ip_", String::new());
        let keep = settings.get_or("save_real_probe_ip", false);

        Self {
            probe_ip: (!probe_ip.is_empty() && !keep).then_some(probe_ip),
        }
    }

    fn represent(&self, bytes: &[u8]) -> Value {
        match &self.probe_ip {
            Some(ip) => represent_string(&redact(bytes, ip)),
            None => represent_string(bytes),
        }
    }

    /// Later duplicates overwrite earlier ones.
    fn headers(&self, headers: &Headers) -> Value {
        let map: Map<String, Value> = headers
            .iter()
            .map(|(name, value)| (name.clone(), self.represent(value.as_bytes())))
            .collect();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::Scrubber;
    use crate::settings::Settings;
    use serde_json::json;

    #[test]
    fn test_scrubber_redacts_probe_ip() {
        let settings = Settings::new().with("real_probe_ip_", "10.0.0.1");
        let scrubber = Scrubber::from_settings(&settings);

        assert_eq!(scrubber.represent(b"from 10.0.0.1"), json!("from [REDACTED]"));
    }

    #[test]
    fn test_scrubber_keeps_ip_when_asked() {
        let settings = Settings::new()
            .with("real_probe_ip_", "10.0.0.1")
            .with("save_real_probe_ip", true);
        let scrubber = Scrubber::from_settings(&settings);

        assert_eq!(scrubber.represent(b"from 10.0.0.1"), json!("from 10.0.0.1"));
    }

    #[test]
    fn test_scrubber_last_duplicate_header_wins() {
        let scrubber = Scrubber::from_settings(&Settings::new());
        let headers = vec![
            ("Accept".to_owned(), "a".to_owned()),
            ("Accept".to_owned(), "b".to_owned()),
        ];

        assert_eq!(scrubber.headers(&headers), json!({"Accept": "b"}));
    }
}
