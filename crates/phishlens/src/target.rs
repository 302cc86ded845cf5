//! Scheme defaulting and URL decomposition shared by every stage.

use std::net::IpAddr;

use url::{Host, Url};

/// A URL prepared for analysis.
///
/// Built infallibly: when the `url` crate rejects the input, a lenient
/// split of the text still yields a host and path so the lexical rules run
/// and the content stage fails on its own terms.
#[derive(Debug, Clone)]
pub struct Target {
    /// Input with `http://` prepended when no http(s) scheme was given.
    pub url: String,
    pub scheme: String,
    /// Lowercased host without brackets, port or userinfo. Internationalized
    /// names are in their ASCII (punycode) form.
    pub host: String,
    /// The host as typed, lowercased. Text rules read this one so an
    /// internationalized name is not judged by its `xn--` encoding.
    pub written_host: String,
    /// Explicit, non-default port.
    pub port: Option<u16>,
    /// `host[:port]`, compared against link targets.
    pub authority: String,
    pub path: String,
    pub ip_literal: bool,
    parsed: Option<Url>,
}

impl Target {
    pub fn parse(raw: &str) -> Self {
        let url = with_default_scheme(raw.trim());

        match Url::parse(&url) {
            Ok(parsed) => Self::from_url(url, parsed),
            Err(e) => {
                tracing::debug!("url parser rejected {url}: {e}; using lenient split");
                Self::lenient(url)
            }
        }
    }

    fn from_url(url: String, parsed: Url) -> Self {
        let ip_literal = matches!(parsed.host(), Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)));
        let host = parsed
            .host_str()
            .unwrap_or("")
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();

        Self {
            scheme: parsed.scheme().to_string(),
            written_host: written_host(&url),
            port: parsed.port(),
            authority: authority_of(&parsed),
            path: parsed.path().to_string(),
            host,
            ip_literal,
            url,
            parsed: Some(parsed),
        }
    }

    fn lenient(url: String) -> Self {
        let (scheme, rest) = url.split_once("://").unwrap_or(("http", url.as_str()));
        let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let (authority_part, tail) = rest.split_at(end);
        let path_end = tail.find(['?', '#']).unwrap_or(tail.len());
        let path = &tail[..path_end];

        let (host, port) = split_host_port(strip_userinfo(authority_part));
        let host = host.to_lowercase();
        let ip_literal = host.parse::<IpAddr>().is_ok();
        let authority = match port {
            Some(p) => format!("{host}:{p}"),
            None => host.clone(),
        };

        Self {
            scheme: scheme.to_lowercase(),
            path: path.to_string(),
            written_host: host.clone(),
            host,
            port,
            authority,
            ip_literal,
            parsed: None,
            url,
        }
    }

    /// The parsed URL, when the input was well-formed.
    pub fn parsed(&self) -> Option<&Url> {
        self.parsed.as_ref()
    }

    /// Authority of `reference` resolved against this target.
    ///
    /// Unresolvable references yield an empty authority, which never equals
    /// a real page authority.
    pub fn resolve_authority(&self, reference: &str) -> String {
        let resolved = match &self.parsed {
            Some(base) => base.join(reference),
            None => Url::parse(reference),
        };
        resolved.map(|u| authority_of(&u)).unwrap_or_default()
    }

    /// Whether `reference` points somewhere other than this page's authority.
    pub fn is_external(&self, reference: &str) -> bool {
        self.resolve_authority(reference) != self.authority
    }
}

/// Prepend `http://` unless the text already starts with an http(s) scheme.
pub fn with_default_scheme(raw: &str) -> String {
    let lower = raw.get(..8).unwrap_or(raw).to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    }
}

/// `host[:port]`, with the port only when explicit and non-default.
pub fn authority_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or("");
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Host text between the scheme and the path, before any IDNA mapping.
fn written_host(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let end = rest.find(['/', '\\', '?', '#']).unwrap_or(rest.len());
    let (host, _) = split_host_port(strip_userinfo(&rest[..end]));
    host.to_lowercase()
}

fn strip_userinfo(authority: &str) -> &str {
    authority.rsplit_once('@').map_or(authority, |(_, hostport)| hostport)
}

fn split_host_port(hostport: &str) -> (&str, Option<u16>) {
    if let Some(rest) = hostport.strip_prefix('[') {
        // [v6]:port
        if let Some((host, after)) = rest.split_once(']') {
            let port = after.strip_prefix(':').and_then(|p| p.parse().ok());
            return (host, port);
        }
        return (rest, None);
    }
    match hostport.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            (host, port.parse().ok())
        }
        _ => (hostport, None),
    }
}
