//! Registration lookup through the system `whois` program.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::whois::{parse_record, registrable_domain};
use super::{RegistrationRecord, RegistrationSource};
use crate::error::{Error, Result};

/// Runs an external WHOIS program and parses its stdout.
///
/// The child is spawned with `kill_on_drop`, so a resolver timeout that drops
/// this lookup also kills the process.
#[derive(Debug, Clone)]
pub struct CommandWhois {
    program: String,
    args: Vec<String>,
}

impl CommandWhois {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Extra arguments placed before the domain.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for CommandWhois {
    fn default() -> Self {
        Self::new("whois")
    }
}

#[async_trait]
impl RegistrationSource for CommandWhois {
    async fn lookup(&self, host: &str) -> Result<RegistrationRecord> {
        let domain = registrable_domain(host);
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&domain)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        // whois exits non-zero for "no match" on some systems but still prints
        // the registry's answer.
        if !output.status.success() && output.stdout.is_empty() {
            return Err(Error::Whois(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        Ok(parse_record(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::registration::{BoundedResolver, RegistrationOutcome, UnavailableReason};
    use chrono::Datelike;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_parses_program_output() {
        let script = "printf 'Domain Name: %s\\nCreation Date: 2012-12-12\\n' \"$0\"";
        let source = CommandWhois::new("sh").with_args(["-c", script]);

        let record = source.lookup("www.example.org").await.unwrap();
        assert_eq!(record.domain_names, vec!["example.org"]);
        assert_eq!(record.creation_date.unwrap().year(), 2012);
    }

    #[tokio::test]
    async fn test_failing_program_is_an_error() {
        let source = CommandWhois::new("sh").with_args(["-c", "exit 3"]);
        assert!(source.lookup("example.org").await.is_err());

        let missing = CommandWhois::new("phishlens-no-such-whois-binary");
        assert!(missing.lookup("example.org").await.is_err());
    }

    #[tokio::test]
    async fn test_hung_program_is_cut_off() {
        let source = CommandWhois::new("sh").with_args(["-c", "sleep 30"]);
        let resolver = BoundedResolver::new(Arc::new(source), Duration::from_millis(200));

        let start = Instant::now();
        let outcome = resolver.resolve("example.org").await;
        assert_eq!(
            outcome,
            RegistrationOutcome::Unavailable(UnavailableReason::TimedOut)
        );
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
