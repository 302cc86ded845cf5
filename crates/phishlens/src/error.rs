//! Error types for the extraction engine.
//!
//! Stage internals return these through `?`; the stage boundaries (resolver,
//! fetcher) turn them into outcome values so an extraction never fails.

use std::time::Duration;

use crate::schema::SchemaError;

/// Errors produced inside PhishLens.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("too many redirects (limit {0})")]
    TooManyRedirects(usize),

    #[error("fetch timed out after {0:?}")]
    FetchTimeout(Duration),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("whois lookup failed: {0}")]
    Whois(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

pub type Result<T> = std::result::Result<T, Error>;
