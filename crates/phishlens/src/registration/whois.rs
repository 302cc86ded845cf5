//! WHOIS (RFC 3912) client and response parser.
//!
//! The registry for a TLD is discovered through the IANA bootstrap server,
//! then queried for the registrable domain. Thin registries (Verisign) point
//! at the registrar's server, which is queried once more and appended.

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use super::{RegistrationRecord, RegistrationSource};
use crate::error::{Error, Result};

/// Default bootstrap server.
pub const IANA_WHOIS: &str = "whois.iana.org";
pub const WHOIS_PORT: u16 = 43;
/// Upper bound on a single server response.
const MAX_RESPONSE_BYTES: u64 = 64 * 1024;

/// Second-level labels under which registrations happen one level deeper
/// (`example.co.uk`).
const SECOND_LEVEL: &[&str] = &[
    "ac", "co", "com", "edu", "gov", "ltd", "me", "net", "nic", "or", "org", "plc", "sch",
];

const CREATION_KEYS: &[&str] = &[
    "creation date",
    "created",
    "created on",
    "created date",
    "domain registration date",
    "registered",
    "registered on",
    "registration date",
    "registration time",
];

const EXPIRATION_KEYS: &[&str] = &[
    "registry expiry date",
    "registrar registration expiration date",
    "expiration date",
    "expiration time",
    "expiry date",
    "expire date",
    "expires",
    "expires on",
    "paid-till",
    "renewal date",
];

const DOMAIN_KEYS: &[&str] = &["domain name", "domain"];

/// Native WHOIS client over TCP.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    bootstrap: String,
    port: u16,
}

impl WhoisClient {
    pub fn new(bootstrap: impl Into<String>) -> Self {
        Self {
            bootstrap: bootstrap.into(),
            port: WHOIS_PORT,
        }
    }

    /// Use a non-standard port for every server (for local fakes).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    async fn query(&self, server: &str, query: &str) -> Result<String> {
        debug!("whois {server}: {query}");
        // Name resolution runs on the blocking pool and is not cancelled with
        // the lookup; see `BoundedResolver`.
        let mut stream = TcpStream::connect((server, self.port)).await?;
        stream.write_all(format!("{query}\r\n").as_bytes()).await?;

        let mut buf = Vec::new();
        (&mut stream)
            .take(MAX_RESPONSE_BYTES)
            .read_to_end(&mut buf)
            .await?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new(IANA_WHOIS)
    }
}

#[async_trait]
impl RegistrationSource for WhoisClient {
    async fn lookup(&self, host: &str) -> Result<RegistrationRecord> {
        if host.trim_matches(['[', ']']).parse::<IpAddr>().is_ok() {
            return Err(Error::Whois(format!("{host} is an address, not a domain")));
        }

        let domain = registrable_domain(host);
        let tld = domain
            .rsplit('.')
            .next()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Whois(format!("no tld in {host}")))?;

        let bootstrap = self.query(&self.bootstrap, tld).await?;
        let server = referral(&bootstrap)
            .ok_or_else(|| Error::Whois(format!("no whois server for .{tld}")))?;

        let mut text = self.query(&server, &registry_query(&server, &domain)).await?;

        let registrar = registrar_server(&text).filter(|r| !r.eq_ignore_ascii_case(&server));
        if let Some(registrar) = registrar {
            match self.query(&registrar, &domain).await {
                Ok(extra) => {
                    text.push('\n');
                    text.push_str(&extra);
                }
                Err(e) => debug!("registrar whois {registrar} failed: {e}"),
            }
        }

        Ok(parse_record(&text))
    }
}

/// Reduce a host to the name a registry knows about.
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_lowercase();
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return host;
    }

    let n = labels.len();
    let keep = if labels[n - 1].len() == 2 && SECOND_LEVEL.contains(&labels[n - 2]) {
        3
    } else {
        2
    };
    labels[n - keep..].join(".")
}

/// Verisign registries match name servers too unless asked for an exact
/// domain.
fn registry_query(server: &str, domain: &str) -> String {
    if server.to_lowercase().contains("verisign-grs.com") {
        format!("={domain}")
    } else {
        domain.to_string()
    }
}

/// Server named by an IANA `refer:` or `whois:` line.
pub fn referral(text: &str) -> Option<String> {
    fields(text)
        .find(|(key, value)| (key == "refer" || key == "whois") && !value.is_empty())
        .map(|(_, value)| clean_server(&value))
}

/// Registrar server named by a thin registry response.
pub fn registrar_server(text: &str) -> Option<String> {
    fields(text)
        .find(|(key, value)| key == "registrar whois server" && !value.is_empty())
        .map(|(_, value)| clean_server(&value))
}

fn clean_server(value: &str) -> String {
    let value = value
        .trim_start_matches("whois://")
        .trim_start_matches("http://")
        .trim_start_matches("https://");
    value.trim_end_matches('/').to_string()
}

/// `key: value` pairs with lowercased keys, skipping comments.
fn fields(text: &str) -> impl Iterator<Item = (String, String)> + '_ {
    text.lines().filter_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with(['%', '#']) || line.starts_with(">>>") {
            return None;
        }
        let (key, value) = line.split_once(':')?;
        Some((key.trim().to_lowercase(), value.trim().to_string()))
    })
}

/// Extract dates and names from raw WHOIS text.
///
/// The first parseable creation and expiration dates win; every domain name
/// line is collected.
pub fn parse_record(text: &str) -> RegistrationRecord {
    let mut record = RegistrationRecord::default();

    for (key, value) in fields(text) {
        let key = key.as_str();
        if CREATION_KEYS.contains(&key) {
            if record.creation_date.is_none() {
                record.creation_date = parse_date(&value);
            }
        } else if EXPIRATION_KEYS.contains(&key) {
            if record.expiration_date.is_none() {
                record.expiration_date = parse_date(&value);
            }
        } else if DOMAIN_KEYS.contains(&key) {
            let name = value.to_lowercase();
            if !name.is_empty() && !record.domain_names.contains(&name) {
                record.domain_names.push(name);
            }
        }
    }

    record
}

/// Parse the date formats registries actually emit.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value
        .split(['(', '\t'])
        .next()
        .unwrap_or(value)
        .trim()
        .trim_end_matches(" UTC")
        .trim_end_matches(" GMT")
        .trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%d %H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let naive = value.trim_end_matches('Z');
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y.%m.%d %H:%M:%S",
        "%d.%m.%Y %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(dt.and_utc());
        }
    }

    for fmt in ["%Y-%m-%d", "%d-%b-%Y", "%Y.%m.%d", "%d.%m.%Y", "%Y/%m/%d", "%Y%m%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(naive, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}
