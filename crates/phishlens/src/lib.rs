//! PhishLens: phishing feature extraction.
//!
//! Turns an arbitrary URL into the fixed 30-column ternary row a pre-trained
//! phishing classifier consumes. Three sources feed the row: the URL text,
//! the domain's registration record, and the fetched page markup. Each of
//! them may be slow, broken or hostile, and the row keeps its shape anyway.
//!
//! ```no_run
//! # async fn demo() -> phishlens::Result<()> {
//! let extractor = phishlens::FeatureExtractor::new(&phishlens::ExtractorConfig::from_env()?)?;
//! let report = extractor.extract("paypa1-login.example.net/verify").await;
//! println!("{:?}", report.row());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod extractor;
pub mod fetch;
pub mod lexical;
pub mod markup;
pub mod registration;
pub mod schema;
pub mod target;
pub mod vector;

pub use config::{ExtractorConfig, WhoisBackend};
pub use error::{Error, Result};
pub use extractor::FeatureExtractor;
pub use fetch::{ContentSource, FetchResult, FetchedPage, HttpFetcher};
pub use registration::{
    BoundedResolver, CommandWhois, RegistrationOutcome, RegistrationRecord, RegistrationSource,
    UnavailableReason, WhoisClient,
};
pub use schema::{
    column_names, validate_columns, FeatureName, FeatureValue, SchemaError, FEATURE_COUNT,
};
pub use target::Target;
pub use vector::{FeatureReport, FeatureVector};
