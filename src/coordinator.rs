//! Aggregation across retailers.
//!
//! Every registered retailer runs concurrently through [`lookup`], each in
//! its own failure boundary: an [`ExtractionFailure`], a timeout and a panic
//! all count as "no contribution" and never stop the other retailers.
//! Surviving offers are re-validated and reduced to the cheapest.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::book::{Book, Filters, Isbn};
use crate::error::{ExtractionFailure, IsbnError};
use crate::http_client::{Fetcher, DEFAULT_TIMEOUT};
use crate::retailer::{lookup, Retailer, RetailerRegistry};

/// Per-retailer budget: one and a half fetch timeouts.
pub const DEFAULT_RETAILER_TIMEOUT: Duration = Duration::from_secs(DEFAULT_TIMEOUT.as_secs() * 3 / 2);

/// What one retailer contributed to a search.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub retailer: String,
    pub result: Result<Book, ExtractionFailure>,
}

impl Outcome {
    pub fn book(&self) -> Option<&Book> {
        self.result.as_ref().ok()
    }
}

#[derive(Serialize)]
struct OutcomeView<'a> {
    retailer: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    offer: Option<&'a Book>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl Serialize for Outcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        OutcomeView {
            retailer: &self.retailer,
            offer: self.result.as_ref().ok(),
            error: self.result.as_ref().err().map(|e| e.reason.as_str()),
        }
        .serialize(serializer)
    }
}

/// Runs a search across a registry.
///
/// Holds no per-search state; concurrent searches on one coordinator are
/// independent.
pub struct Coordinator {
    registry: Arc<RetailerRegistry>,
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
    concurrency: usize,
}

impl Coordinator {
    pub fn new(registry: Arc<RetailerRegistry>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            registry,
            fetcher,
            timeout: DEFAULT_RETAILER_TIMEOUT,
            concurrency: 0,
        }
    }

    /// Budget for one retailer's whole ladder.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Maximum retailers in flight. `0` means one slot per retailer.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn registry(&self) -> &RetailerRegistry {
        &self.registry
    }

    /// The cheapest valid offer for `raw_isbn`, or `None` when no retailer
    /// produced one.
    ///
    /// # Errors
    ///
    /// Returns [`IsbnError`] for malformed input, before any retailer runs.
    #[instrument(skip_all, fields(isbn = %raw_isbn))]
    pub async fn find_cheapest(
        &self,
        raw_isbn: &str,
        filters: &Filters,
    ) -> Result<Option<Book>, IsbnError> {
        let isbn = Isbn::parse(raw_isbn)?;
        let outcomes = self.run_all(&isbn, filters).await;
        let best = cheapest(&isbn, filters, outcomes);
        match &best {
            Some(book) => info!("Cheapest offer: {} at ${:.2}", book.retailer, book.price),
            None => info!("No offer found"),
        }
        Ok(best)
    }

    /// Every retailer's outcome, in registry order.
    ///
    /// # Errors
    ///
    /// Returns [`IsbnError`] for malformed input, before any retailer runs.
    #[instrument(skip_all, fields(isbn = %raw_isbn))]
    pub async fn survey(&self, raw_isbn: &str, filters: &Filters) -> Result<Vec<Outcome>, IsbnError> {
        let isbn = Isbn::parse(raw_isbn)?;
        Ok(self.run_all(&isbn, filters).await)
    }

    async fn run_all(&self, isbn: &Isbn, filters: &Filters) -> Vec<Outcome> {
        let limit = match self.concurrency {
            0 => self.registry.len().max(1),
            n => n,
        };
        let fetcher: &dyn Fetcher = self.fetcher.as_ref();

        let mut outcomes: Vec<(usize, Outcome)> = stream::iter(self.registry.iter().enumerate())
            .map(|(index, retailer)| async move {
                (index, self.run_one(retailer.as_ref(), isbn, filters, fetcher).await)
            })
            .buffer_unordered(limit)
            .collect()
            .await;

        outcomes.sort_by_key(|(index, _)| *index);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }

    async fn run_one(
        &self,
        retailer: &dyn Retailer,
        isbn: &Isbn,
        filters: &Filters,
        fetcher: &dyn Fetcher,
    ) -> Outcome {
        let name = retailer.name().to_string();
        let call = AssertUnwindSafe(lookup(retailer, isbn.as_str(), filters, fetcher)).catch_unwind();

        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(Ok(book))) => Ok(book),
            Ok(Ok(Err(failure))) => {
                warn!("Retailer {} failed: {}", name, failure.reason);
                Err(failure)
            }
            Ok(Err(panic)) => {
                let message = panic_message(panic.as_ref());
                error!("Retailer {} panicked: {}", name, message);
                Err(ExtractionFailure::new(&name, format!("panicked: {message}")))
            }
            Err(_) => {
                warn!("Retailer {} timed out after {:?}", name, self.timeout);
                Err(ExtractionFailure::new(
                    &name,
                    format!("timed out after {}s", self.timeout.as_secs_f64()),
                ))
            }
        };

        Outcome {
            retailer: name,
            result,
        }
    }
}

/// Re-validate survivors and keep the cheapest. `outcomes` must be in
/// registry order: the first of equal prices wins.
fn cheapest(isbn: &Isbn, filters: &Filters, outcomes: Vec<Outcome>) -> Option<Book> {
    outcomes
        .into_iter()
        .filter_map(|outcome| outcome.result.ok())
        .filter(|book| book.has_valid_price() && filters.admits(book) && &book.isbn == isbn)
        .min_by(Book::cmp_price)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
