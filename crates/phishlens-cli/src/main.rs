//! `phishlens`: extract phishing feature vectors from the command line.

mod cli;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use phishlens::WhoisBackend;
use tracing_subscriber::EnvFilter;

use cli::extract_cmd::{self, ExtractArgs};

#[derive(Parser)]
#[command(
    name = "phishlens",
    version,
    about = "Turn URLs into the 30-column phishing feature vector"
)]
struct Cli {
    /// Machine-readable JSON output
    #[arg(long, global = true)]
    json: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Extra detail, and info-level logs
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write logs to stderr as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the feature vector for each URL
    Extract {
        /// URLs to analyze; the scheme is optional
        #[arg(required = true)]
        urls: Vec<String>,

        /// Page fetch budget in milliseconds
        #[arg(long)]
        fetch_timeout_ms: Option<u64>,

        /// Registration lookup budget in milliseconds
        #[arg(long)]
        whois_timeout_ms: Option<u64>,

        /// Registration lookup backend (socket or command)
        #[arg(long)]
        whois_backend: Option<WhoisBackend>,

        /// JSON array of the classifier's column names, checked before extracting
        #[arg(long)]
        columns: Option<PathBuf>,

        /// URLs analyzed at once
        #[arg(long, default_value = "4")]
        concurrency: usize,
    },
    /// Print the feature column order
    Schema,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Output modes travel through the environment so every command sees them.
    if cli.json {
        std::env::set_var("PHISHLENS_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("PHISHLENS_QUIET", "1");
    }
    if cli.verbose {
        std::env::set_var("PHISHLENS_VERBOSE", "1");
    }

    init_tracing(cli.verbose, cli.log_json);
    tracing::debug!("phishlens v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Schema => cli::schema_cmd::run(),
        Commands::Extract {
            urls,
            fetch_timeout_ms,
            whois_timeout_ms,
            whois_backend,
            columns,
            concurrency,
        } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to start async runtime")?;
            runtime.block_on(extract_cmd::run(ExtractArgs {
                urls,
                fetch_timeout_ms,
                whois_timeout_ms,
                whois_backend,
                columns,
                concurrency,
            }))
        }
    }
}

/// Logs go to stderr so stdout stays clean for rows and JSON.
fn init_tracing(verbose: bool, log_json: bool) {
    let default = if verbose { "phishlens=info" } else { "phishlens=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}
