//! `phishlens extract <url>...`: feature vectors for one or more URLs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::output::{self, Styled};
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use phishlens::{
    validate_columns, ExtractorConfig, FeatureExtractor, FeatureName, FeatureReport, FeatureValue,
    WhoisBackend,
};
use serde::Serialize;

/// Options for one `extract` invocation.
#[derive(Debug, Clone)]
pub struct ExtractArgs {
    pub urls: Vec<String>,
    pub fetch_timeout_ms: Option<u64>,
    pub whois_timeout_ms: Option<u64>,
    pub whois_backend: Option<WhoisBackend>,
    pub columns: Option<PathBuf>,
    pub concurrency: usize,
}

/// Run the extract command.
pub async fn run(args: ExtractArgs) -> Result<()> {
    // A column drift would silently corrupt every prediction; refuse to start.
    if let Some(path) = &args.columns {
        check_columns(path)?;
    }

    let config = build_config(&args)?;
    if output::is_verbose() && !output::is_json() {
        eprintln!(
            "  fetch budget {}ms, whois budget {}ms ({:?} backend), {} at a time",
            config.fetch_timeout.as_millis(),
            config.whois_timeout.as_millis(),
            config.whois_backend,
            args.concurrency.max(1)
        );
    }

    let extractor = FeatureExtractor::new(&config).context("failed to set up extractor")?;
    let s = Styled::new();

    let mut reports = stream::iter(&args.urls)
        .map(|url| extractor.extract(url))
        .buffered(args.concurrency.max(1));

    while let Some(report) = reports.next().await {
        if output::is_json() {
            output::print_json_line(&ReportLine::new(&report));
        } else if output::is_quiet() {
            println!("{}\t{}", report.url, format_row(&report));
        } else {
            print_report(&s, &report);
        }
    }

    Ok(())
}

/// Environment settings with command-line overrides applied.
fn build_config(args: &ExtractArgs) -> Result<ExtractorConfig> {
    let mut config = ExtractorConfig::from_env().context("invalid PHISHLENS_* setting")?;
    if let Some(ms) = args.fetch_timeout_ms {
        config.fetch_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = args.whois_timeout_ms {
        config.whois_timeout = Duration::from_millis(ms);
    }
    if let Some(backend) = args.whois_backend {
        config.whois_backend = backend;
    }
    Ok(config)
}

/// Read a JSON array of column names.
pub fn load_columns(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read column file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of column names", path.display()))
}

/// Fail unless the file lists exactly the extractor's columns, in order.
pub fn check_columns(path: &Path) -> Result<()> {
    let columns = load_columns(path)?;
    validate_columns(columns.as_slice())
        .with_context(|| format!("classifier columns in {} do not match", path.display()))?;
    Ok(())
}

/// One `--json` line: `{url, row, features, suspicious}`, features in
/// column order.
#[derive(Debug, Serialize)]
pub struct ReportLine<'a> {
    #[serde(flatten)]
    report: &'a FeatureReport,
    suspicious: Vec<FeatureName>,
}

impl<'a> ReportLine<'a> {
    pub fn new(report: &'a FeatureReport) -> Self {
        Self {
            report,
            suspicious: report.suspicious(),
        }
    }
}

/// Comma-separated row, as fed to the classifier.
pub fn format_row(report: &FeatureReport) -> String {
    report
        .row()
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn print_report(s: &Styled, report: &FeatureReport) {
    let suspicious = report.suspicious().len();
    let neutral = report
        .vector
        .iter()
        .filter(|(_, v)| *v == FeatureValue::Neutral)
        .count();

    let summary = if suspicious == 0 {
        s.green("no suspicious features")
    } else {
        s.red(&format!("{suspicious} suspicious"))
    };
    println!(
        "  {}  {summary}, {}",
        s.bold(&report.url),
        s.yellow(&format!("{neutral} neutral"))
    );

    for (i, (name, value)) in report.vector.iter().enumerate() {
        println!(
            "    {} {} {:<22} {:>2}",
            s.dim(&format!("{i:>2}")),
            s.value_sym(value),
            name.as_str(),
            value.as_i8()
        );
    }
    println!();
}
