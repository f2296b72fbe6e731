//! VitalSource eTextbooks.
//!
//! The direct product page `/products/-v<isbn>` is tried first, then the
//! search results. Each page runs this ladder:
//! 1. The page's own markup (product overview, or
//!    `li.product-search-result__wrapper` results)
//! 2. Embedded `__NEXT_DATA__` or JSON-LD islands
//! 3. Page-wide scan for a price next to the ISBN

use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};

use super::ladder::{self, sel, Candidate, Ladder, Page, Scope};
use super::{Offering, Retailer};
use crate::book::{Book, Condition, Filters, Isbn, Medium};
use crate::error::ExtractionFailure;
use crate::http_client::Fetcher;
use crate::price;

const BASE_URL: &str = "https://www.vitalsource.com";

static PRODUCT_TITLE: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"h1[class*="product-overview__title"], h1"#));
static PRODUCT_PRICE: LazyLock<Selector> = LazyLock::new(|| {
    sel(r#"[class*="product-overview__price"], [data-testid="price"], span.font-3.u-weight--bold"#)
});

static RESULT: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"li[class*="product-search-result__wrapper"]"#));
static RESULT_TITLE: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"h2[class*="product-search-result__title"]"#));
static H2: LazyLock<Selector> = LazyLock::new(|| sel("h2"));
static RESULT_PRICE: LazyLock<Selector> =
    LazyLock::new(|| sel("span.font-3.u-weight--bold, span.block.font-3"));
static PRODUCT_LINK: LazyLock<Selector> = LazyLock::new(|| sel(r#"a[href*="/products/"]"#));

/// VitalSource extractor. Digital rentals and purchases only.
pub struct VitalSource;

impl VitalSource {
    fn product_url(isbn: &Isbn) -> String {
        format!("{BASE_URL}/products/-v{isbn}")
    }

    fn search_url(isbn: &Isbn) -> String {
        format!("{BASE_URL}/textbooks?q={isbn}")
    }
}

#[async_trait]
impl Retailer for VitalSource {
    fn name(&self) -> &str {
        "vitalsource"
    }

    fn display_name(&self) -> &str {
        "VitalSource"
    }

    fn self_test_isbn(&self) -> Isbn {
        Isbn::known("9780134685991")
    }

    fn offering(&self) -> Offering {
        Offering::only(Medium::Ebook)
    }

    async fn extract(
        &self,
        isbn: &Isbn,
        _filters: &Filters,
        fetcher: &dyn Fetcher,
    ) -> Result<Book, ExtractionFailure> {
        let mut ladder = Ladder::new(self.name(), self.display_name(), isbn);

        if let Some(page) = ladder.fetch(fetcher, &Self::product_url(isbn)).await {
            if climb(&mut ladder, &page, "product-page", product_page) {
                return ladder.finish(Medium::Ebook, Condition::Unknown);
            }
        }
        if let Some(page) = ladder.fetch(fetcher, &Self::search_url(isbn)).await {
            climb(&mut ladder, &page, "search-result", search_result);
        }

        ladder.finish(Medium::Ebook, Condition::Unknown)
    }
}

type Rung = fn(&Html, &Scope<'_>) -> Option<Candidate>;

/// The page's own rung, then the embedded data islands, then the page-wide scan.
fn climb(ladder: &mut Ladder<'_>, page: &Page, name: &'static str, first: Rung) -> bool {
    let parsed = page.parse(BASE_URL);
    ladder.attempt(name, &parsed, first)
        || ladder.attempt("next-data", &parsed, ladder::next_data_offer)
        || ladder.attempt("json-ld", &parsed, ladder::json_ld_offer)
        || ladder.attempt("page-wide", &parsed, ladder::page_wide_scan)
}

fn product_page(document: &Html, scope: &Scope<'_>) -> Option<Candidate> {
    let root = document.root_element();
    let price = ladder::first_price(root, &[&*PRODUCT_PRICE])?;
    Some(
        Candidate::priced(price)
            .titled(ladder::first_text(root, &[&*PRODUCT_TITLE]))
            .linked(Some(scope.page_url.to_string())),
    )
}

fn search_result(document: &Html, scope: &Scope<'_>) -> Option<Candidate> {
    document.select(&RESULT).find_map(|result| {
        // "$52.99 USD"
        let price = ladder::first_price(result, &[&*RESULT_PRICE]).or_else(|| {
            result
                .text()
                .filter(|t| t.contains('$') && t.contains("USD"))
                .find_map(price::first_currency_amount)
        })?;
        Some(
            Candidate::priced(price)
                .titled(ladder::first_text(result, &[&*RESULT_TITLE, &*H2]))
                .linked(ladder::first_link(result, scope.base_url, Some(&*PRODUCT_LINK))),
        )
    })
}
