//! Extraction settings, read from `PHISHLENS_*` environment variables.

use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::registration::whois::IANA_WHOIS;

/// Desktop Chrome; some kits serve a blank page to unknown agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Which registration lookup to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WhoisBackend {
    /// Built-in RFC 3912 client.
    Socket,
    /// System `whois` program.
    Command,
}

impl FromStr for WhoisBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "socket" => Ok(WhoisBackend::Socket),
            "command" => Ok(WhoisBackend::Command),
            other => Err(Error::Config(format!(
                "unknown whois backend `{other}` (expected socket or command)"
            ))),
        }
    }
}

/// Settings for one [`FeatureExtractor`](crate::FeatureExtractor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractorConfig {
    pub fetch_timeout: Duration,
    pub whois_timeout: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
    pub max_body_bytes: usize,
    pub whois_backend: WhoisBackend,
    /// Bootstrap server for the socket backend.
    pub whois_server: String,
    /// Program for the command backend.
    pub whois_program: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            whois_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: 30,
            max_body_bytes: 5 * 1024 * 1024,
            whois_backend: WhoisBackend::Socket,
            whois_server: IANA_WHOIS.to_string(),
            whois_program: "whois".to_string(),
        }
    }
}

impl ExtractorConfig {
    /// Defaults overridden by any `PHISHLENS_*` variables that are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_var::<u64, _>(&lookup, "PHISHLENS_FETCH_TIMEOUT_MS")? {
            config.fetch_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "PHISHLENS_WHOIS_TIMEOUT_MS")? {
            config.whois_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = parse_var(&lookup, "PHISHLENS_MAX_REDIRECTS")? {
            config.max_redirects = n;
        }
        if let Some(n) = parse_var(&lookup, "PHISHLENS_MAX_BODY_BYTES")? {
            config.max_body_bytes = n;
        }
        if let Some(backend) = lookup("PHISHLENS_WHOIS_BACKEND") {
            config.whois_backend = backend.parse()?;
        }
        if let Some(agent) = lookup("PHISHLENS_USER_AGENT").filter(|s| !s.is_empty()) {
            config.user_agent = agent;
        }
        if let Some(server) = lookup("PHISHLENS_WHOIS_SERVER").filter(|s| !s.is_empty()) {
            config.whois_server = server;
        }
        if let Some(program) = lookup("PHISHLENS_WHOIS_PROGRAM").filter(|s| !s.is_empty()) {
            config.whois_program = program;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{key}={raw} is not a valid number"))),
    }
}
