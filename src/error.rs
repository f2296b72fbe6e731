//! Error taxonomy shared by the library.
//!
//! - [`IsbnError`]: malformed caller input, rejected before any network call
//! - [`FetchError`]: transport faults from the fetch layer
//! - [`ExtractionFailure`]: the single "no offer from this source" outcome
//! - [`ConfigError`]: unreadable or invalid configuration

use std::path::PathBuf;

use thiserror::Error;

/// Rejected ISBN input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IsbnError {
    #[error("ISBN is empty")]
    Empty,

    #[error("ISBN must not be negative or zero: {0}")]
    NonPositive(String),

    #[error("ISBN contains a non-digit character: {0}")]
    NonDigit(String),

    #[error("ISBN must have 10 or 13 digits, got {0}")]
    WrongLength(usize),
}

/// Transport-level failure reported by a [`Fetcher`](crate::http_client::Fetcher).
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {0} timed out")]
    Timeout(String),

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(ToString::to_string)
            .unwrap_or_else(|| "<unknown>".to_string());
        if err.is_timeout() {
            return FetchError::Timeout(url);
        }
        if let Some(status) = err.status() {
            return FetchError::Status {
                url,
                status: status.as_u16(),
            };
        }
        FetchError::Transport {
            url,
            message: err.to_string(),
        }
    }
}

/// A retailer could not produce a valid offer.
///
/// This is the only way an extractor reports "no result". It always carries
/// the retailer name and a human-readable reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{retailer}: {reason}")]
pub struct ExtractionFailure {
    pub retailer: String,
    pub reason: String,
}

impl ExtractionFailure {
    pub fn new(retailer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            retailer: retailer.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a transport fault; the coordinator treats both identically.
    pub fn from_fetch(retailer: impl Into<String>, err: &FetchError) -> Self {
        Self::new(retailer, err.to_string())
    }
}

/// Configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
