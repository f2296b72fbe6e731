//! Title and ISBN resolution via the Google Books volumes API.
//!
//! Resolution never fails for "not found": lookups that miss, error out, or
//! return undecodable JSON all come back empty and are logged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::book::Isbn;
use crate::http_client::Fetcher;

pub const GOOGLE_BOOKS_ENDPOINT: &str = "https://www.googleapis.com/books/v1/volumes";

/// Bibliographic metadata for one edition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Volume {
    pub title: String,
    pub author: String,
    /// Preferred identifier: ISBN-13 when available, else ISBN-10.
    pub isbn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn_10: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn_13: Option<String>,
    pub publisher: String,
    pub published_date: String,
    pub description: String,
    pub page_count: u32,
    pub thumbnail: String,
}

/// Maps free text or an ISBN to bibliographic metadata.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Volumes matching `text`, best match first.
    async fn resolve_by_title(&self, text: &str, max_results: usize) -> Vec<Volume>;

    /// The volume for `isbn`, if the catalogue knows it.
    async fn resolve_by_isbn(&self, isbn: &Isbn) -> Option<Volume>;
}

/// Google Books client.
pub struct GoogleBooks<F> {
    fetcher: F,
    endpoint: String,
}

impl<F: Fetcher> GoogleBooks<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_endpoint(fetcher, GOOGLE_BOOKS_ENDPOINT)
    }

    pub fn with_endpoint(fetcher: F, endpoint: impl Into<String>) -> Self {
        Self {
            fetcher,
            endpoint: endpoint.into(),
        }
    }

    fn title_url(&self, text: &str, max_results: usize) -> String {
        format!(
            "{}?q={}&maxResults={}&printType=books",
            self.endpoint,
            urlencoding::encode(text),
            max_results.clamp(1, 40)
        )
    }

    fn isbn_url(&self, isbn: &Isbn) -> String {
        format!("{}?q=isbn:{}&maxResults=1", self.endpoint, isbn)
    }

    async fn query(&self, url: &str) -> Vec<Volume> {
        let body = match self.fetcher.fetch_text(url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Google Books request failed: {}", e);
                return Vec::new();
            }
        };
        match serde_json::from_str::<VolumesResponse>(&body) {
            Ok(response) => response.items.into_iter().filter_map(Volume::from_item).collect(),
            Err(e) => {
                tracing::warn!("Failed to parse Google Books response: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl<F: Fetcher> MetadataResolver for GoogleBooks<F> {
    async fn resolve_by_title(&self, text: &str, max_results: usize) -> Vec<Volume> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        tracing::info!("Searching Google Books for: {}", text);
        let mut volumes = self.query(&self.title_url(text, max_results)).await;
        volumes.truncate(max_results);
        tracing::info!("Found {} books from Google Books", volumes.len());
        volumes
    }

    async fn resolve_by_isbn(&self, isbn: &Isbn) -> Option<Volume> {
        self.query(&self.isbn_url(isbn)).await.into_iter().next()
    }
}

impl Volume {
    /// `None` when the item lacks a title or any ISBN.
    fn from_item(item: VolumeItem) -> Option<Self> {
        let info = item.volume_info;
        if info.title.trim().is_empty() {
            return None;
        }

        let mut isbn_10 = None;
        let mut isbn_13 = None;
        for id in info.industry_identifiers {
            match id.kind.as_str() {
                "ISBN_10" => isbn_10 = Some(id.identifier),
                "ISBN_13" => isbn_13 = Some(id.identifier),
                _ => {}
            }
        }
        let isbn = isbn_13.clone().or_else(|| isbn_10.clone())?;

        let author = if info.authors.is_empty() {
            "Unknown Author".to_string()
        } else {
            info.authors.join(", ")
        };

        Some(Self {
            title: info.title,
            author,
            isbn,
            isbn_10,
            isbn_13,
            publisher: info.publisher,
            published_date: info.published_date,
            description: info.description,
            page_count: info.page_count,
            thumbnail: info.image_links.thumbnail,
        })
    }

    /// The preferred ISBN, validated.
    pub fn parsed_isbn(&self) -> Option<Isbn> {
        Isbn::parse(&self.isbn).ok()
    }
}

// ============================================================================
// Google Books API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<VolumeItem>,
}

#[derive(Debug, Deserialize)]
struct VolumeItem {
    #[serde(rename = "volumeInfo", default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VolumeInfo {
    title: String,
    authors: Vec<String>,
    publisher: String,
    published_date: String,
    description: String,
    page_count: u32,
    industry_identifiers: Vec<IndustryIdentifier>,
    image_links: ImageLinks,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageLinks {
    thumbnail: String,
}
