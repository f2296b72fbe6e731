//! Runtime configuration loaded from `~/.config/bookmark/config.toml`.
//!
//! Every key is optional. A missing file means defaults; a file that exists
//! but cannot be read or parsed is an error the CLI reports.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::metadata::GOOGLE_BOOKS_ENDPOINT;
use crate::throttle::HostThrottle;

const APP_DIR: &str = "bookmark";

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Request timeout for one fetch.
    pub fetch_timeout_secs: u64,
    /// Budget for one retailer's whole ladder. Defaults to 1.5× the fetch
    /// timeout when unset.
    pub retailer_timeout_secs: Option<u64>,
    /// Retailers in flight at once; `0` runs them all together.
    pub max_concurrency: usize,
    /// Minimum spacing between requests to one host.
    pub min_interval_ms: u64,
    /// Random extra spacing on top of `min_interval_ms`.
    pub jitter_ms: u64,
    /// Retailer names to leave out of the registry.
    pub disabled: Vec<String>,
    /// Declarative retailers file; defaults next to the config file.
    pub retailers_file: Option<PathBuf>,
    pub metadata_endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 30,
            retailer_timeout_secs: None,
            max_concurrency: 0,
            min_interval_ms: 1000,
            jitter_ms: 500,
            disabled: Vec::new(),
            retailers_file: None,
            metadata_endpoint: GOOGLE_BOOKS_ENDPOINT.to_string(),
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or is
    /// not valid TOML for this schema.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn retailer_timeout(&self) -> Duration {
        match self.retailer_timeout_secs {
            Some(secs) => Duration::from_secs(secs.max(1)),
            None => self.fetch_timeout().mul_f64(1.5),
        }
    }

    pub fn throttle(&self) -> HostThrottle {
        HostThrottle::new(
            Duration::from_millis(self.min_interval_ms),
            Duration::from_millis(self.jitter_ms),
        )
    }

    /// Where declarative retailers are read from, if anywhere.
    pub fn retailers_path(&self) -> Option<PathBuf> {
        self.retailers_file.clone().or_else(|| app_dir().map(|d| d.join("retailers.toml")))
    }
}

fn app_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR))
}

/// `~/.config/bookmark/config.toml` (platform equivalent elsewhere).
pub fn default_config_path() -> Option<PathBuf> {
    app_dir().map(|d| d.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn retailer_timeout_defaults_to_one_and_a_half_fetches() {
        let config = Config::from_toml("fetch_timeout_secs = 10").unwrap();
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.retailer_timeout(), Duration::from_secs(15));
        assert_eq!(Config::default().retailer_timeout(), Duration::from_secs(45));
    }

    #[test]
    fn parses_every_key() {
        let config = Config::from_toml(
            r#"
fetch_timeout_secs = 20
retailer_timeout_secs = 25
max_concurrency = 2
min_interval_ms = 250
jitter_ms = 0
disabled = ["macmillan"]
retailers_file = "/tmp/retailers.toml"
metadata_endpoint = "http://localhost:9000/volumes"
"#,
        )
        .unwrap();
        assert_eq!(config.retailer_timeout(), Duration::from_secs(25));
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.disabled, vec!["macmillan"]);
        assert_eq!(config.retailers_path(), Some(PathBuf::from("/tmp/retailers.toml")));
        assert_eq!(config.metadata_endpoint, "http://localhost:9000/volumes");
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert!(Config::from_toml("fetch_timeout = 3").is_err());
    }

    #[test]
    fn missing_file_is_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/bookmark/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn invalid_file_is_error() {
        let path = std::env::temp_dir().join(format!("bookmark-config-{}.toml", std::process::id()));
        std::fs::write(&path, "fetch_timeout_secs = \"soon\"").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
