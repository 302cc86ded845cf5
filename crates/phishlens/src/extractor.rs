//! Feature vector assembly.
//!
//! Runs the lexical, registration, fetch and markup stages for one URL and
//! merges them into a fresh [`FeatureVector`]. Every stage failure maps to
//! that stage's worst-case defaults, so extraction itself cannot fail.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::info;

use crate::config::{ExtractorConfig, WhoisBackend};
use crate::error::Result;
use crate::fetch::{ContentSource, HttpFetcher};
use crate::registration::{self, BoundedResolver, CommandWhois, RegistrationSource, WhoisClient};
use crate::schema::{FeatureName, FeatureValue};
use crate::target::Target;
use crate::vector::{FeatureReport, FeatureVector};
use crate::{lexical, markup};

/// Turns URLs into feature reports. Cheap to share behind an `Arc`; holds no
/// per-extraction state.
#[derive(Clone)]
pub struct FeatureExtractor {
    resolver: BoundedResolver,
    fetcher: Arc<dyn ContentSource>,
}

impl FeatureExtractor {
    /// Build the default network-backed stages from `config`.
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let source: Arc<dyn RegistrationSource> = match config.whois_backend {
            WhoisBackend::Socket => Arc::new(WhoisClient::new(config.whois_server.clone())),
            WhoisBackend::Command => Arc::new(CommandWhois::new(config.whois_program.clone())),
        };
        let fetcher = HttpFetcher::new(config)?;

        Ok(Self::with_sources(
            BoundedResolver::new(source, config.whois_timeout),
            Arc::new(fetcher),
        ))
    }

    /// Assemble from custom stages.
    pub fn with_sources(resolver: BoundedResolver, fetcher: Arc<dyn ContentSource>) -> Self {
        Self { resolver, fetcher }
    }

    /// Extract the full feature vector for `url`.
    pub async fn extract(&self, url: &str) -> FeatureReport {
        let started = Instant::now();
        let target = Target::parse(url);

        let mut vector = FeatureVector::new();
        lexical::apply(&target, &mut vector);

        // Independent I/O; both must finish (or hit their budgets) before merging.
        let (registration, fetched) = tokio::join!(
            self.resolver.resolve(&target.host),
            self.fetcher.fetch(&target.url)
        );

        registration::apply(&registration, &target.host, Utc::now(), &mut vector);
        markup::apply(&fetched, &target, &mut vector);
        apply_age_heuristic(&mut vector);

        let report = FeatureReport {
            url: target.url,
            vector,
        };
        info!(
            "extracted {}: {} suspicious feature(s) in {}ms",
            report.url,
            report.suspicious().len(),
            started.elapsed().as_millis()
        );
        report
    }
}

/// Traffic rank, search indexing and inbound links cannot be measured here.
/// They are approximated from domain age: a new domain is assumed to have
/// none of them. PageRank and StatsReport are left at the default.
pub fn apply_age_heuristic(vector: &mut FeatureVector) {
    if vector.get(FeatureName::AgeOfDomain) == FeatureValue::Suspicious {
        for name in FeatureName::AGE_DERIVED {
            vector.flag(name);
        }
    }
}
