//! Retailer extractors.
//!
//! Each retailer turns an ISBN into at most one [`Book`] offer by fetching
//! and parsing that retailer's pages.
//!
//! # Architecture
//!
//! - [`Retailer`]: Async trait for one retailer's extraction ladder
//! - [`lookup`]: Contract entry point wrapping [`Retailer::extract`]
//! - [`RetailerRegistry`]: The fixed list of retailers for one process
//!
//! # Example
//!
//! ```rust,no_run
//! use bookmark::retailer::{lookup, RetailerRegistry};
//! use bookmark::{AcceleratedClient, Filters};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = AcceleratedClient::new()?;
//! let registry = RetailerRegistry::builtin();
//!
//! for retailer in registry.iter() {
//!     match lookup(retailer.as_ref(), "9780134685991", &Filters::default(), &client).await {
//!         Ok(book) => println!("{}: ${:.2}", book.retailer, book.price),
//!         Err(e) => println!("{e}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod abebooks;
pub mod configured;
pub mod ladder;
pub mod macmillan;
pub mod textbookx;
pub mod vitalsource;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::book::{Book, Filters, Isbn, Medium};
use crate::config::Config;
use crate::error::ExtractionFailure;
use crate::http_client::Fetcher;

/// The media a retailer is able to sell.
///
/// Records with [`Medium::Unknown`] are always consistent: some retailers
/// cannot tell from the listing alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offering {
    media: Vec<Medium>,
}

impl Offering {
    pub fn only(medium: Medium) -> Self {
        Self::of(&[medium])
    }

    pub fn of(media: &[Medium]) -> Self {
        Self {
            media: media.iter().copied().filter(|m| *m != Medium::Unknown).collect(),
        }
    }

    pub fn media(&self) -> &[Medium] {
        &self.media
    }

    /// The medium reported when a listing does not say.
    pub fn primary(&self) -> Medium {
        self.media.first().copied().unwrap_or(Medium::Unknown)
    }

    pub fn admits(&self, medium: Medium) -> bool {
        medium == Medium::Unknown || self.media.is_empty() || self.media.contains(&medium)
    }
}

impl fmt::Display for Offering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.media.is_empty() {
            return f.write_str("unknown");
        }
        let names: Vec<String> = self.media.iter().map(ToString::to_string).collect();
        f.write_str(&names.join("/"))
    }
}

/// Extractor for one retailer.
#[async_trait]
pub trait Retailer: Send + Sync {
    /// Stable identifier (e.g., "abebooks"), unique within a registry.
    fn name(&self) -> &str;

    /// Human-facing name, used in placeholder titles.
    fn display_name(&self) -> &str {
        self.name()
    }

    /// An ISBN known to resolve on this retailer.
    fn self_test_isbn(&self) -> Isbn;

    fn offering(&self) -> Offering;

    /// Run the strategy ladder for an already validated ISBN.
    ///
    /// `filters` may narrow the query; the result is still post-filtered by
    /// [`lookup`].
    async fn extract(
        &self,
        isbn: &Isbn,
        filters: &Filters,
        fetcher: &dyn Fetcher,
    ) -> Result<Book, ExtractionFailure>;
}

/// Look up one retailer's offer for `raw_isbn`.
///
/// Every way of not producing a valid, matching offer comes back as
/// [`ExtractionFailure`]: malformed ISBN, fetch errors, unparsable markup,
/// invalid price, inconsistent medium, or a record rejected by `filters`.
pub async fn lookup(
    retailer: &dyn Retailer,
    raw_isbn: impl fmt::Display,
    filters: &Filters,
    fetcher: &dyn Fetcher,
) -> Result<Book, ExtractionFailure> {
    let raw = raw_isbn.to_string();
    let isbn = Isbn::parse(&raw)
        .map_err(|e| ExtractionFailure::new(retailer.name(), format!("invalid ISBN: {e}")))?;

    let book = retailer.extract(&isbn, filters, fetcher).await?;
    verify(retailer, &isbn, filters, book)
}

fn verify(
    retailer: &dyn Retailer,
    isbn: &Isbn,
    filters: &Filters,
    book: Book,
) -> Result<Book, ExtractionFailure> {
    let fail = |reason: String| Err(ExtractionFailure::new(retailer.name(), reason));

    if !book.has_valid_price() {
        return fail(format!("invalid price {}", book.price));
    }
    if &book.isbn != isbn {
        return fail(format!("record is for ISBN {}, not {isbn}", book.isbn));
    }
    if book.link.trim().is_empty() {
        return fail("record has no link".to_string());
    }
    let offering = retailer.offering();
    if !offering.admits(book.medium) {
        return fail(format!("{} record from a {offering} retailer", book.medium));
    }
    if !filters.admits(&book) {
        return fail(format!(
            "filtered out ({} {}, wanted {} {})",
            book.condition,
            book.medium,
            filters.condition.map_or_else(|| "any".to_string(), |c| c.to_string()),
            filters.medium.map_or_else(|| "any".to_string(), |m| m.to_string()),
        ));
    }
    Ok(book)
}

/// The retailers known to one process.
///
/// Built once at startup and shared read-only. Registration order is the
/// tie-break order used by the coordinator.
pub struct RetailerRegistry {
    retailers: Vec<Arc<dyn Retailer>>,
}

impl RetailerRegistry {
    /// The built-in retailers, in fixed order.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_retailers(builtin_retailers())
    }

    /// The single discovery pass: built-ins minus `config.disabled`, then
    /// every valid entry of the retailers file.
    ///
    /// Never fails. Bad configured entries are skipped with a warning.
    #[must_use]
    pub fn discover(config: &Config) -> Self {
        let disabled: HashSet<&str> = config.disabled.iter().map(String::as_str).collect();
        let mut retailers: Vec<Arc<dyn Retailer>> = builtin_retailers()
            .into_iter()
            .filter(|r| {
                let keep = !disabled.contains(r.name());
                if !keep {
                    tracing::debug!("Retailer {} disabled by configuration", r.name());
                }
                keep
            })
            .collect();

        let mut seen: HashSet<String> = retailers.iter().map(|r| r.name().to_string()).collect();
        if let Some(path) = config.retailers_path() {
            for retailer in configured::load(&path) {
                if disabled.contains(retailer.name()) {
                    continue;
                }
                if !seen.insert(retailer.name().to_string()) {
                    tracing::warn!(
                        "Skipping configured retailer {}: name already registered",
                        retailer.name()
                    );
                    continue;
                }
                retailers.push(Arc::new(retailer));
            }
        }

        tracing::debug!("Registered {} retailers", retailers.len());
        Self { retailers }
    }

    pub fn from_retailers(retailers: Vec<Arc<dyn Retailer>>) -> Self {
        Self { retailers }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Retailer>> {
        self.retailers.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.retailers.iter().map(|r| r.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Retailer>> {
        self.retailers.iter().find(|r| r.name().eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.retailers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.retailers.is_empty()
    }
}

impl Default for RetailerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_retailers() -> Vec<Arc<dyn Retailer>> {
    vec![
        Arc::new(abebooks::AbeBooks),
        Arc::new(textbookx::TextbookX),
        Arc::new(vitalsource::VitalSource),
        Arc::new(macmillan::Macmillan),
    ]
}
