mod find;
mod output;
mod retailers;
mod search;
mod selftest;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use bookmark::{AcceleratedClient, BookSearchService, Config, Coordinator, GoogleBooks, RetailerRegistry};

pub use find::{cmd_find, cmd_survey};
pub use retailers::cmd_retailers;
pub use search::cmd_search;
pub use selftest::cmd_selftest;

/// Everything a subcommand needs, built once per process.
pub struct Context {
    pub config: Config,
    pub registry: Arc<RetailerRegistry>,
    pub client: Arc<AcceleratedClient>,
}

impl Context {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load(config_path).context("failed to load configuration")?;
        let registry = Arc::new(RetailerRegistry::discover(&config));
        let client = Arc::new(
            AcceleratedClient::with_options(config.fetch_timeout(), config.throttle())
                .context("failed to create HTTP client")?,
        );
        Ok(Self {
            config,
            registry,
            client,
        })
    }

    pub fn coordinator(&self) -> Coordinator {
        Coordinator::new(self.registry.clone(), self.client.clone())
            .with_timeout(self.config.retailer_timeout())
            .with_concurrency(self.config.max_concurrency)
    }

    pub fn search_service(&self) -> BookSearchService {
        let resolver = GoogleBooks::with_endpoint(self.client.clone(), self.config.metadata_endpoint.clone());
        BookSearchService::new(self.coordinator(), Arc::new(resolver))
    }
}
