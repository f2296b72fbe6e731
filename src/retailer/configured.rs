//! Retailers declared in `retailers.toml`.
//!
//! Each `[[retailers]]` entry describes a search URL and the CSS selectors
//! for one result container. Entries are validated when the file is loaded;
//! an invalid entry is skipped with a warning and never reaches the
//! registry.

use std::path::Path;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;
use thiserror::Error;

use super::ladder::{self, Candidate, Ladder, Page, Scope};
use super::{Offering, Retailer};
use crate::book::{Book, Condition, Filters, Isbn, Medium};
use crate::error::{ExtractionFailure, IsbnError};
use crate::http_client::Fetcher;

/// Placeholder replaced by the ISBN digits in `search_url`.
pub const ISBN_PLACEHOLDER: &str = "{isbn}";

/// One `[[retailers]]` table as written by the user.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetailerDefinition {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub base_url: String,
    pub search_url: String,
    pub container: String,
    pub title: String,
    pub price: String,
    #[serde(default)]
    pub link: Option<String>,
    pub medium: String,
    #[serde(default)]
    pub condition: Option<String>,
    pub self_test_isbn: String,
}

/// Why an entry was rejected.
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("name must be a non-empty identifier")]
    Name,

    #[error("base_url is not an absolute URL: {0}")]
    BaseUrl(String),

    #[error("search_url must contain {{isbn}}")]
    Placeholder,

    #[error("invalid {field} selector {css:?}")]
    Selector { field: &'static str, css: String },

    #[error("{0}")]
    Value(String),

    #[error("invalid self_test_isbn: {0}")]
    Isbn(#[from] IsbnError),
}

/// A validated declarative retailer.
#[derive(Debug)]
pub struct ConfiguredRetailer {
    name: String,
    display_name: String,
    base_url: String,
    search_url: String,
    container: Selector,
    title: Selector,
    price: Selector,
    link: Option<Selector>,
    medium: Medium,
    condition: Condition,
    self_test_isbn: Isbn,
}

impl TryFrom<RetailerDefinition> for ConfiguredRetailer {
    type Error = DefinitionError;

    fn try_from(def: RetailerDefinition) -> Result<Self, Self::Error> {
        let name = def.name.trim().to_ascii_lowercase();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(DefinitionError::Name);
        }
        if url::Url::parse(&def.base_url).is_err() {
            return Err(DefinitionError::BaseUrl(def.base_url));
        }
        if !def.search_url.contains(ISBN_PLACEHOLDER) {
            return Err(DefinitionError::Placeholder);
        }

        let selector = |field: &'static str, css: &str| {
            Selector::parse(css).map_err(|_| DefinitionError::Selector {
                field,
                css: css.to_string(),
            })
        };

        Ok(Self {
            display_name: def.display_name.unwrap_or_else(|| def.name.clone()),
            container: selector("container", &def.container)?,
            title: selector("title", &def.title)?,
            price: selector("price", &def.price)?,
            link: def.link.as_deref().map(|css| selector("link", css)).transpose()?,
            medium: def.medium.parse::<Medium>().map_err(DefinitionError::Value)?,
            condition: def
                .condition
                .as_deref()
                .map(str::parse::<Condition>)
                .transpose()
                .map_err(DefinitionError::Value)?
                .unwrap_or_default(),
            self_test_isbn: Isbn::parse(&def.self_test_isbn)?,
            name,
            base_url: def.base_url,
            search_url: def.search_url,
        })
    }
}

/// Load every valid entry from `path`.
///
/// A missing file is not an error. A file that cannot be read or is not
/// valid TOML yields no entries and one warning.
pub fn load(path: &Path) -> Vec<ConfiguredRetailer> {
    if !path.exists() {
        tracing::debug!("No retailers file at {}", path.display());
        return Vec::new();
    }
    match std::fs::read_to_string(path) {
        Ok(content) => parse(&content, &path.display().to_string()),
        Err(e) => {
            tracing::warn!("Failed to read retailers file {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Parse a retailers file body. `origin` names the source in diagnostics.
pub fn parse(content: &str, origin: &str) -> Vec<ConfiguredRetailer> {
    let document: toml::Value = match toml::from_str(content) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Invalid TOML in retailers file {}: {}", origin, e);
            return Vec::new();
        }
    };
    let Some(entries) = document.get("retailers").and_then(toml::Value::as_array) else {
        return Vec::new();
    };

    // Entries are decoded one by one so a bad one cannot hide the rest.
    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let definition: RetailerDefinition = match entry.clone().try_into() {
                Ok(def) => def,
                Err(e) => {
                    tracing::warn!("Skipping retailer #{} in {}: {}", index + 1, origin, e);
                    return None;
                }
            };
            let name = definition.name.clone();
            match ConfiguredRetailer::try_from(definition) {
                Ok(retailer) => Some(retailer),
                Err(e) => {
                    tracing::warn!("Skipping retailer {} in {}: {}", name, origin, e);
                    None
                }
            }
        })
        .collect()
}

impl ConfiguredRetailer {
    fn url_for(&self, isbn: &Isbn) -> String {
        self.search_url.replace(ISBN_PLACEHOLDER, isbn.as_str())
    }

    fn container_offer(&self, document: &Html, scope: &Scope<'_>) -> Option<Candidate> {
        document.select(&self.container).find_map(|block| {
            let price = ladder::first_price(block, &[&self.price])?;
            Some(
                Candidate::priced(price)
                    .titled(ladder::first_text(block, &[&self.title]))
                    .linked(ladder::first_link(block, scope.base_url, self.link.as_ref())),
            )
        })
    }
}

#[async_trait]
impl Retailer for ConfiguredRetailer {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn self_test_isbn(&self) -> Isbn {
        self.self_test_isbn.clone()
    }

    fn offering(&self) -> Offering {
        Offering::only(self.medium)
    }

    async fn extract(
        &self,
        isbn: &Isbn,
        _filters: &Filters,
        fetcher: &dyn Fetcher,
    ) -> Result<Book, ExtractionFailure> {
        let mut ladder = Ladder::new(&self.name, &self.display_name, isbn);

        if let Some(page) = ladder.fetch(fetcher, &self.url_for(isbn)).await {
            self.climb(&mut ladder, &page);
        }

        ladder.finish(self.medium, self.condition)
    }
}

impl ConfiguredRetailer {
    fn climb(&self, ladder: &mut Ladder<'_>, page: &Page) -> bool {
        let parsed = page.parse(&self.base_url);
        ladder.attempt("container", &parsed, |doc, scope| self.container_offer(doc, scope))
            || ladder.attempt("page-wide", &parsed, ladder::page_wide_scan)
            || ladder.attempt("json-ld", &parsed, ladder::json_ld_offer)
    }
}
