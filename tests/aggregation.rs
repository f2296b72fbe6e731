//! Aggregation behavior against scripted retailers.
//!
//! No network: retailers return canned records, fail, hang or panic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use bookmark::retailer::textbookx::TextbookX;
use bookmark::retailer::vitalsource::VitalSource;
use bookmark::{
    Book, Condition, Coordinator, ExtractionFailure, Fetcher, Filters, FixtureFetcher, Isbn, IsbnError,
    Medium, Offering, Retailer, RetailerRegistry,
};

const ISBN: &str = "9780134685991";

enum Script {
    Price(f64),
    Offer(f64, Condition),
    Fail,
    Hang,
    Panic,
}

struct Scripted {
    name: &'static str,
    script: Script,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(name: &'static str, script: Script) -> Arc<Self> {
        Arc::new(Self {
            name,
            script,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Retailer for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    fn self_test_isbn(&self) -> Isbn {
        Isbn::parse(ISBN).unwrap()
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
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (price, condition) = match self.script {
            Script::Price(p) => (p, Condition::New),
            Script::Offer(p, c) => (p, c),
            Script::Fail => return Err(ExtractionFailure::new(self.name, "markup changed")),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!("timeout should cancel the retailer");
            }
            Script::Panic => panic!("selector exploded"),
        };
        Ok(Book {
            retailer: self.name.to_string(),
            link: format!("https://{}.test/book/{isbn}", self.name),
            title: "Effective Java".to_string(),
            isbn: isbn.clone(),
            price,
            condition,
            medium: Medium::Physical,
            description: None,
            image: None,
        })
    }
}

fn coordinator(retailers: Vec<Arc<Scripted>>) -> Coordinator {
    let retailers: Vec<Arc<dyn Retailer>> = retailers
        .into_iter()
        .map(|r| r as Arc<dyn Retailer>)
        .collect();
    Coordinator::new(
        Arc::new(RetailerRegistry::from_retailers(retailers)),
        Arc::new(FixtureFetcher::new()),
    )
    .with_timeout(Duration::from_millis(200))
}

#[tokio::test]
async fn returns_minimum_unchanged() {
    let c = coordinator(vec![
        Scripted::new("a", Script::Price(23.99)),
        Scripted::new("b", Script::Price(12.99)),
        Scripted::new("c", Script::Price(40.99)),
    ]);
    let best = c.find_cheapest(ISBN, &Filters::default()).await.unwrap().unwrap();
    assert_eq!(best.price, 12.99);
    assert_eq!(best.retailer, "b");
    assert_eq!(best.link, "https://b.test/book/9780134685991");
    assert_eq!(best.isbn.as_str(), ISBN);
}

#[tokio::test]
async fn zero_price_is_excluded() {
    let c = coordinator(vec![
        Scripted::new("zero", Script::Price(0.0)),
        Scripted::new("b", Script::Price(23.99)),
        Scripted::new("c", Script::Price(40.99)),
    ]);
    let best = c.find_cheapest(ISBN, &Filters::default()).await.unwrap().unwrap();
    assert_eq!(best.retailer, "b");
}

#[tokio::test]
async fn total_failure_is_none() {
    let c = coordinator(vec![
        Scripted::new("a", Script::Fail),
        Scripted::new("b", Script::Fail),
        Scripted::new("c", Script::Fail),
    ]);
    assert!(c.find_cheapest(ISBN, &Filters::default()).await.unwrap().is_none());
}

#[tokio::test]
async fn filter_excludes_valid_offer() {
    let c = coordinator(vec![
        Scripted::new("new", Script::Offer(9.99, Condition::New)),
        Scripted::new("used", Script::Offer(19.99, Condition::Used)),
    ]);
    let used = Filters::new(Some(Condition::Used), None);
    let best = c.find_cheapest(ISBN, &used).await.unwrap().unwrap();
    assert_eq!(best.retailer, "used");

    let ebook = Filters::new(None, Some(Medium::Ebook));
    assert!(c.find_cheapest(ISBN, &ebook).await.unwrap().is_none());
}

#[tokio::test]
async fn panic_is_contained() {
    let c = coordinator(vec![
        Scripted::new("boom", Script::Panic),
        Scripted::new("ok", Script::Price(31.0)),
    ]);
    let best = c.find_cheapest(ISBN, &Filters::default()).await.unwrap().unwrap();
    assert_eq!(best.retailer, "ok");

    let outcomes = c.survey(ISBN, &Filters::default()).await.unwrap();
    let boom = outcomes[0].result.as_ref().unwrap_err();
    assert!(boom.reason.contains("selector exploded"));
}

#[tokio::test]
async fn timeout_is_contained() {
    let c = coordinator(vec![
        Scripted::new("slow", Script::Hang),
        Scripted::new("ok", Script::Price(31.0)),
    ]);
    let outcomes = c.survey(ISBN, &Filters::default()).await.unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].result.as_ref().unwrap_err().reason.contains("timed out"));
    assert_eq!(outcomes[1].book().unwrap().price, 31.0);
}

#[tokio::test]
async fn ties_resolve_to_registry_order() {
    let c = coordinator(vec![
        Scripted::new("first", Script::Price(15.0)),
        Scripted::new("second", Script::Price(15.0)),
        Scripted::new("third", Script::Price(15.0)),
    ]);
    for _ in 0..10 {
        let best = c.find_cheapest(ISBN, &Filters::default()).await.unwrap().unwrap();
        assert_eq!(best.retailer, "first");
    }
}

#[tokio::test]
async fn repeated_search_is_identical() {
    let c = coordinator(vec![
        Scripted::new("a", Script::Price(18.5)),
        Scripted::new("b", Script::Price(22.0)),
    ]);
    let first = c.find_cheapest(ISBN, &Filters::default()).await.unwrap();
    let second = c.find_cheapest(ISBN, &Filters::default()).await.unwrap();
    assert_eq!(first, second);
}

const VITALSOURCE_SEARCH: &str = r#"<html><body><ul>
    <li class="product-search-result__wrapper">
      <a href="/products/effective-java-joshua-bloch-v9780134685991">
        <h2 class="product-search-result__title">Effective Java</h2>
      </a>
      <span class="block font-3 u-weight--bold">$52.99 USD</span>
    </li></ul></body></html>"#;

// Prints only the ISBN-10 form of the query.
const TEXTBOOKX_PAGE: &str = r#"<html><body><h1>Effective Java, 3rd Edition</h1>
    <p>ISBN-10: 0-13-468599-7</p><p>Our price: $36.40</p></body></html>"#;

#[tokio::test]
async fn builtin_extractors_repeat_over_same_pages() {
    let fetcher = FixtureFetcher::new()
        .with_page(format!("https://www.vitalsource.com/textbooks?q={ISBN}"), VITALSOURCE_SEARCH)
        .with_page(format!("https://www.textbookx.com/search?q={ISBN}"), TEXTBOOKX_PAGE);
    let retailers: Vec<Arc<dyn Retailer>> = vec![Arc::new(VitalSource), Arc::new(TextbookX)];
    let c = Coordinator::new(
        Arc::new(RetailerRegistry::from_retailers(retailers)),
        Arc::new(fetcher),
    );

    let first = c.find_cheapest(ISBN, &Filters::default()).await.unwrap().unwrap();
    let second = c.find_cheapest(ISBN, &Filters::default()).await.unwrap().unwrap();
    assert_eq!(first.retailer, "textbookx");
    assert_eq!(first.price, 36.40);
    assert_eq!(first.title, "Effective Java, 3rd Edition");
    assert_eq!(first.price, second.price);
    assert_eq!(first.title, second.title);
    assert_eq!(first, second);

    let outcomes = c.survey(ISBN, &Filters::default()).await.unwrap();
    assert_eq!(outcomes[0].book().map(|b| b.price), Some(52.99));
}

#[tokio::test]
async fn invalid_isbn_never_reaches_retailers() {
    let a = Scripted::new("a", Script::Price(10.0));
    let c = coordinator(vec![a.clone()]);
    for raw in ["-20435223542", "12345", "97801346859X1", ""] {
        assert!(c.find_cheapest(raw, &Filters::default()).await.is_err(), "{raw}");
    }
    assert!(matches!(
        c.find_cheapest("-20435223542", &Filters::default()).await,
        Err(IsbnError::NonPositive(_))
    ));
    assert_eq!(a.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn bounded_concurrency_still_runs_everyone() {
    let retailers: Vec<_> = ["a", "b", "c", "d", "e"]
        .into_iter()
        .zip([50.0, 40.0, 30.0, 20.0, 10.0])
        .map(|(name, price)| Scripted::new(name, Script::Price(price)))
        .collect();
    let c = coordinator(retailers.clone()).with_concurrency(2);
    let best = c.find_cheapest(ISBN, &Filters::default()).await.unwrap().unwrap();
    assert_eq!(best.retailer, "e");
    assert!(retailers.iter().all(|r| r.calls.load(Ordering::SeqCst) == 1));
}

#[tokio::test]
async fn empty_registry_finds_nothing() {
    let c = coordinator(Vec::new());
    assert!(c.find_cheapest(ISBN, &Filters::default()).await.unwrap().is_none());
    assert!(c.survey(ISBN, &Filters::default()).await.unwrap().is_empty());
}
