//! Domain registration lookup under a hard time budget.
//!
//! A registration source may hang forever, so the resolver never awaits it
//! directly. Each lookup runs in its own spawned task; when the budget runs
//! out the task is aborted, which drops the lookup future and everything it
//! owns (sockets, child processes started with `kill_on_drop`).

pub mod command;
pub mod whois;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::schema::FeatureName;
use crate::vector::FeatureVector;

pub use command::CommandWhois;
pub use whois::WhoisClient;

/// Registrations shorter than this many days are suspicious.
const MIN_REGISTRATION_DAYS: i64 = 365;
/// Domains younger than this many days are suspicious.
const MIN_AGE_DAYS: i64 = 180;

/// Registration metadata. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationRecord {
    pub creation_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    /// Registered domain names, lowercased.
    pub domain_names: Vec<String>,
}

/// Why no record is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    TimedOut,
    Failed(String),
}

/// Result of one bounded lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Resolved(RegistrationRecord),
    Unavailable(UnavailableReason),
}

impl RegistrationOutcome {
    pub fn record(&self) -> Option<&RegistrationRecord> {
        match self {
            RegistrationOutcome::Resolved(record) => Some(record),
            RegistrationOutcome::Unavailable(_) => None,
        }
    }
}

/// Something that can look up registration data for a domain.
#[async_trait]
pub trait RegistrationSource: Send + Sync {
    async fn lookup(&self, host: &str) -> Result<RegistrationRecord>;
}

/// Runs a [`RegistrationSource`] in an isolated task with a deadline.
///
/// On expiry the task is aborted, which drops every socket and, for
/// [`CommandWhois`], kills the child process. One thing outlives the abort:
/// a host name lookup already handed to tokio's blocking pool (the socket
/// backend resolving a WHOIS server name) runs until the system resolver
/// returns. It holds no connection, and the caller is not kept waiting.
#[derive(Clone)]
pub struct BoundedResolver {
    source: Arc<dyn RegistrationSource>,
    budget: Duration,
}

impl BoundedResolver {
    pub fn new(source: Arc<dyn RegistrationSource>, budget: Duration) -> Self {
        Self { source, budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Look up `host`, giving up after the budget.
    ///
    /// Returns within the budget plus scheduling overhead no matter what the
    /// source does. Errors and panics in the source become `Unavailable`.
    pub async fn resolve(&self, host: &str) -> RegistrationOutcome {
        if host.is_empty() {
            return RegistrationOutcome::Unavailable(UnavailableReason::Failed(
                "empty host".to_string(),
            ));
        }

        let source = Arc::clone(&self.source);
        let query = host.to_string();
        let mut task = tokio::spawn(async move { source.lookup(&query).await });

        match tokio::time::timeout(self.budget, &mut task).await {
            Ok(Ok(Ok(record))) => {
                debug!(
                    "registration for {host}: created {:?}, expires {:?}, {} name(s)",
                    record.creation_date,
                    record.expiration_date,
                    record.domain_names.len()
                );
                RegistrationOutcome::Resolved(record)
            }
            Ok(Ok(Err(e))) => {
                warn!("registration lookup for {host} failed: {e}");
                RegistrationOutcome::Unavailable(UnavailableReason::Failed(e.to_string()))
            }
            Ok(Err(join_err)) => {
                warn!("registration lookup for {host} crashed: {join_err}");
                RegistrationOutcome::Unavailable(UnavailableReason::Failed(join_err.to_string()))
            }
            Err(_) => {
                task.abort();
                warn!(
                    "registration lookup for {host} exceeded {}ms, cancelled",
                    self.budget.as_millis()
                );
                RegistrationOutcome::Unavailable(UnavailableReason::TimedOut)
            }
        }
    }
}

/// Write the registration-derived features into `vector`.
///
/// `host` is the host that was queried; `now` anchors the domain age.
pub fn apply(
    outcome: &RegistrationOutcome,
    host: &str,
    now: DateTime<Utc>,
    vector: &mut FeatureVector,
) {
    let record = outcome.record();

    match record.and_then(|r| r.creation_date.map(|created| (r, created))) {
        Some((record, created)) => {
            let short_registration = match record.expiration_date {
                Some(expires) => (expires - created).num_days() <= MIN_REGISTRATION_DAYS,
                None => true,
            };
            if short_registration {
                vector.flag(FeatureName::DomainRegLen);
            }
            if (now - created).num_days() < MIN_AGE_DAYS {
                vector.flag(FeatureName::AgeOfDomain);
            }
        }
        None => {
            vector.flag(FeatureName::DomainRegLen);
            vector.flag(FeatureName::AgeOfDomain);
            vector.flag(FeatureName::DnsRecording);
        }
    }

    let host = host.to_lowercase();
    let matches_host = record.is_some_and(|r| {
        r.domain_names
            .iter()
            .any(|name| name.to_lowercase().contains(&host))
    });
    if !matches_host {
        vector.flag(FeatureName::AbnormalUrl);
    }
}
