//! Title and ISBN searches on top of the coordinator.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::book::{Book, Filters};
use crate::coordinator::Coordinator;
use crate::error::IsbnError;
use crate::metadata::{MetadataResolver, Volume};

/// One catalogue match and its cheapest offer.
#[derive(Debug, Clone, Serialize)]
pub struct TitleMatch {
    pub volume: Volume,
    pub best: Option<Book>,
}

/// Resolves titles to editions and prices each edition.
pub struct BookSearchService {
    coordinator: Coordinator,
    resolver: Arc<dyn MetadataResolver>,
}

impl BookSearchService {
    pub fn new(coordinator: Coordinator, resolver: Arc<dyn MetadataResolver>) -> Self {
        Self {
            coordinator,
            resolver,
        }
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Up to `max_results` catalogue matches for `text`, each with its
    /// cheapest offer. Volumes whose ISBN does not validate are kept with no
    /// offer.
    pub async fn search_by_title(&self, text: &str, max_results: usize) -> Vec<TitleMatch> {
        let volumes = self.resolver.resolve_by_title(text, max_results).await;
        let mut matches = Vec::with_capacity(volumes.len());

        for volume in volumes {
            let best = match volume.parsed_isbn() {
                Some(isbn) => self
                    .coordinator
                    .find_cheapest(isbn.as_str(), &Filters::default())
                    .await
                    .ok()
                    .flatten()
                    .map(|mut book| {
                        book.enrich(&volume);
                        book
                    }),
                None => {
                    tracing::debug!("Skipping pricing for {}: unusable ISBN {}", volume.title, volume.isbn);
                    None
                }
            };
            matches.push(TitleMatch { volume, best });
        }

        info!(
            "Priced {} of {} matches for {:?}",
            matches.iter().filter(|m| m.best.is_some()).count(),
            matches.len(),
            text
        );
        matches
    }

    /// The cheapest offer for `raw_isbn`, enriched with catalogue metadata.
    ///
    /// # Errors
    ///
    /// Returns [`IsbnError`] for malformed input.
    pub async fn search_by_isbn(
        &self,
        raw_isbn: &str,
        filters: &Filters,
    ) -> Result<Option<Book>, IsbnError> {
        let Some(mut book) = self.coordinator.find_cheapest(raw_isbn, filters).await? else {
            return Ok(None);
        };
        if let Some(volume) = self.resolver.resolve_by_isbn(&book.isbn).await {
            book.enrich(&volume);
        }
        Ok(Some(book))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{Condition, Isbn, Medium};
    use crate::error::ExtractionFailure;
    use crate::http_client::{Fetcher, FixtureFetcher};
    use crate::retailer::{Offering, Retailer, RetailerRegistry};
    use async_trait::async_trait;

    struct Fixed(f64);

    #[async_trait]
    impl Retailer for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn self_test_isbn(&self) -> Isbn {
            Isbn::parse("9780132350884").unwrap()
        }

        fn offering(&self) -> Offering {
            Offering::only(Medium::Physical)
        }

        async fn extract(
            &self,
            isbn: &Isbn,
            _filters: &Filters,
            _fetcher: &dyn Fetcher,
        ) -> Result<Book, ExtractionFailure> {
            Ok(Book {
                retailer: "fixed".into(),
                link: "https://fixed.test/b".into(),
                title: "Clean Code".into(),
                isbn: isbn.clone(),
                price: self.0,
                condition: Condition::Used,
                medium: Medium::Physical,
                description: None,
                image: None,
            })
        }
    }

    struct Catalogue;

    #[async_trait]
    impl MetadataResolver for Catalogue {
        async fn resolve_by_title(&self, _text: &str, _max: usize) -> Vec<Volume> {
            vec![
                volume("9780132350884"),
                Volume {
                    isbn: "UOM:39015".into(),
                    ..volume("")
                },
            ]
        }

        async fn resolve_by_isbn(&self, isbn: &Isbn) -> Option<Volume> {
            Some(volume(isbn.as_str()))
        }
    }

    fn volume(isbn: &str) -> Volume {
        Volume {
            title: "Clean Code".into(),
            author: "Robert C. Martin".into(),
            isbn: isbn.into(),
            description: "Agile craftsmanship".into(),
            thumbnail: "https://img.test/c.jpg".into(),
            ..Volume::default()
        }
    }

    fn service(price: f64) -> BookSearchService {
        let registry = Arc::new(RetailerRegistry::from_retailers(vec![Arc::new(Fixed(price))]));
        let coordinator = Coordinator::new(registry, Arc::new(FixtureFetcher::new()));
        BookSearchService::new(coordinator, Arc::new(Catalogue))
    }

    #[tokio::test]
    async fn title_search_prices_and_enriches() {
        let matches = service(17.0).search_by_title("clean code", 5).await;
        assert_eq!(matches.len(), 2);
        let best = matches[0].best.as_ref().unwrap();
        assert_eq!(best.price, 17.0);
        assert_eq!(best.description.as_deref(), Some("Agile craftsmanship"));
        assert_eq!(best.image.as_deref(), Some("https://img.test/c.jpg"));
        assert!(matches[1].best.is_none());
    }

    #[tokio::test]
    async fn isbn_search_enriches() {
        let book = service(9.5)
            .search_by_isbn("9780132350884", &Filters::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(book.description.as_deref(), Some("Agile craftsmanship"));
    }

    #[tokio::test]
    async fn isbn_search_no_offer_is_none() {
        let svc = service(0.0);
        assert!(svc.search_by_isbn("9780132350884", &Filters::default()).await.unwrap().is_none());
        assert!(svc.search_by_isbn("12", &Filters::default()).await.is_err());
    }
}
