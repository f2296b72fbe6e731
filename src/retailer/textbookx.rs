//! TextbookX search results.
//!
//! The search path has moved between releases, so four URL shapes are
//! tried until one answers. On the page that answers:
//! 1. Product containers (`product`, `book-card`, `item` classes)
//! 2. Product blocks nested in a results container
//! 3. The smallest block mentioning the ISBN next to a price
//! 4. Page-wide scan for a price next to the ISBN

use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use super::ladder::{self, sel, Candidate, Ladder, Page, Scope};
use super::{Offering, Retailer};
use crate::book::{Book, Condition, Filters, Isbn, Medium};
use crate::error::ExtractionFailure;
use crate::http_client::Fetcher;
use crate::price;

const BASE_URL: &str = "https://www.textbookx.com";

static PRODUCT_CONTAINERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        r#"div[class*="product"], div[class*="listing"]"#,
        r#"div[class*="book-card"], div[class*="book-item"]"#,
        r#"li[class*="product"], li[class*="item"]"#,
        r#"article[class*="product"], article[class*="book"]"#,
    ]
    .into_iter()
    .map(sel)
    .collect()
});
static RESULTS_BLOCK: LazyLock<Selector> = LazyLock::new(|| {
    sel(r#"div[class*="results"] div[class*="product"], div[class*="results"] div[class*="item"], div[class*="results"] div[class*="book"]"#)
});

static HEADINGS: LazyLock<[Selector; 3]> = LazyLock::new(|| [sel("h2"), sel("h3"), sel("h1")]);
static TITLE_CLASS: LazyLock<Selector> = LazyLock::new(|| {
    sel(r#"a[class*="title"], a[class*="name"], span[class*="title"], span[class*="name"], div[class*="title"]"#)
});
static PRICE_CLASS: LazyLock<Selector> = LazyLock::new(|| {
    sel(r#"span[class*="price"], div[class*="price"], p[class*="price"], strong[class*="price"], span[class*="amount"], span[class*="cost"]"#)
});

/// TextbookX extractor. Physical textbooks, condition not reported.
pub struct TextbookX;

impl TextbookX {
    fn search_urls(isbn: &Isbn) -> Vec<String> {
        vec![
            format!("{BASE_URL}/search?q={isbn}"),
            format!("{BASE_URL}/search/?q={isbn}"),
            format!("{BASE_URL}/textbooks?q={isbn}"),
            format!("{BASE_URL}/textbooks/?q={isbn}"),
        ]
    }
}

#[async_trait]
impl Retailer for TextbookX {
    fn name(&self) -> &str {
        "textbookx"
    }

    fn display_name(&self) -> &str {
        "TextbookX"
    }

    fn self_test_isbn(&self) -> Isbn {
        Isbn::known("9780134685991")
    }

    fn offering(&self) -> Offering {
        Offering::only(Medium::Physical)
    }

    async fn extract(
        &self,
        isbn: &Isbn,
        _filters: &Filters,
        fetcher: &dyn Fetcher,
    ) -> Result<Book, ExtractionFailure> {
        let mut ladder = Ladder::new(self.name(), self.display_name(), isbn);

        if let Some(page) = ladder.fetch_any(fetcher, &Self::search_urls(isbn)).await {
            climb(&mut ladder, &page);
        }

        ladder.finish(Medium::Physical, Condition::Unknown)
    }
}

fn climb(ladder: &mut Ladder<'_>, page: &Page) -> bool {
    let parsed = page.parse(BASE_URL);
    ladder.attempt("product-container", &parsed, product_container)
        || ladder.attempt("results-container", &parsed, results_container)
        || ladder.attempt("isbn-container", &parsed, isbn_container)
        || ladder.attempt("page-wide", &parsed, ladder::page_wide_scan)
}

fn product_container(document: &Html, scope: &Scope<'_>) -> Option<Candidate> {
    PRODUCT_CONTAINERS
        .iter()
        .find_map(|selector| document.select(selector).find_map(|block| from_block(block, scope)))
}

fn results_container(document: &Html, scope: &Scope<'_>) -> Option<Candidate> {
    document.select(&RESULTS_BLOCK).find_map(|block| from_block(block, scope))
}

fn isbn_container(document: &Html, scope: &Scope<'_>) -> Option<Candidate> {
    ladder::isbn_container(document, scope.isbn).and_then(|block| from_block(block, scope))
}

/// Title, price and link from one product block.
fn from_block(block: ElementRef<'_>, scope: &Scope<'_>) -> Option<Candidate> {
    let price = ladder::first_price(block, &[&*PRICE_CLASS])
        .or_else(|| price::first_currency_amount(&ladder::element_text(block)))?;

    let [h2, h3, h1] = &*HEADINGS;
    let title = ladder::first_text(block, &[h2, h3, h1, &*TITLE_CLASS]).or_else(|| {
        block
            .value()
            .attr("data-title")
            .or_else(|| block.value().attr("data-name"))
            .map(|t| t.trim().to_string())
    });

    Some(
        Candidate::priced(price)
            .titled(title)
            .linked(ladder::first_link(block, scope.base_url, None)),
    )
}
