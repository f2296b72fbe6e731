//! AbeBooks marketplace listings.
//!
//! Strategies, in order:
//! 1. Search results page (`kn=<isbn>`, narrowed with `cond=` when a
//!    condition filter is set): first listing with a price
//! 2. Page-wide scan for a price next to the ISBN
//! 3. JSON-LD product data
//!
//! The keyword search page is tried with the same ladder when the search
//! servlet answers with an error. It is not narrowed by condition, so its
//! listings report `unknown` unless they state one.

use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};

use super::ladder::{self, sel, Candidate, Ladder, Page, Scope};
use super::{Offering, Retailer};
use crate::book::{Book, Condition, Filters, Isbn, Medium};
use crate::error::ExtractionFailure;
use crate::http_client::Fetcher;
use crate::price;

const BASE_URL: &str = "https://www.abebooks.com";

static LISTING: LazyLock<Selector> = LazyLock::new(|| sel(r#"li[data-test-id="listing-item"]"#));
static LISTING_TITLE: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"span[data-test-id="listing-title"], h2[itemprop="name"]"#));
static ITEM_PRICE: LazyLock<Selector> = LazyLock::new(|| sel(r#"p[data-test-id="item-price"]"#));
static CONDITION: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"span[data-test-id="listing-book-condition"]"#));
static LISTING_LINK: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"a[data-test-id="listing-title-link"], a[itemprop="url"], a[href]"#));

/// AbeBooks extractor. Sells physical copies only.
pub struct AbeBooks;

impl AbeBooks {
    fn search_url(isbn: &Isbn, filters: &Filters) -> String {
        match narrowed_condition(filters) {
            Some(c) => format!("{BASE_URL}/servlet/SearchResults?cond={c}&kn={isbn}"),
            None => format!("{BASE_URL}/servlet/SearchResults?kn={isbn}"),
        }
    }

    fn keyword_url(isbn: &Isbn) -> String {
        format!("{BASE_URL}/book-search/kw/{isbn}/")
    }
}

#[async_trait]
impl Retailer for AbeBooks {
    fn name(&self) -> &str {
        "abebooks"
    }

    fn display_name(&self) -> &str {
        "AbeBooks"
    }

    fn self_test_isbn(&self) -> Isbn {
        // Quantum Physics for Beginners
        Isbn::known("9798991511100")
    }

    fn offering(&self) -> Offering {
        Offering::only(Medium::Physical)
    }

    async fn extract(
        &self,
        isbn: &Isbn,
        filters: &Filters,
        fetcher: &dyn Fetcher,
    ) -> Result<Book, ExtractionFailure> {
        let mut ladder = Ladder::new(self.name(), self.display_name(), isbn);
        let pages = [
            (Self::search_url(isbn, filters), narrowed_condition(filters)),
            (Self::keyword_url(isbn), None),
        ];

        for (url, assumed) in pages {
            let Some(page) = ladder.fetch(fetcher, &url).await else {
                continue;
            };
            if climb(&mut ladder, &page, assumed) {
                break;
            }
        }

        ladder.finish(Medium::Physical, Condition::Unknown)
    }
}

/// The condition the search servlet filters on with `cond=`.
fn narrowed_condition(filters: &Filters) -> Option<Condition> {
    filters
        .condition
        .filter(|c| matches!(c, Condition::New | Condition::Used))
}

/// Run every rung on one page. Listings on a `cond=` page that state no
/// condition take `assumed`; the keyword page passes `None`.
fn climb(ladder: &mut Ladder<'_>, page: &Page, assumed: Option<Condition>) -> bool {
    let parsed = page.parse(BASE_URL);
    let narrowed = |found: Option<Candidate>| found.map(|c| c.assuming(assumed));

    ladder.attempt("listing", &parsed, |doc, scope| narrowed(parse_listing(doc, scope)))
        || ladder.attempt("page-wide", &parsed, |doc, scope| {
            narrowed(ladder::page_wide_scan(doc, scope))
        })
        || ladder.attempt("json-ld", &parsed, |doc, scope| {
            narrowed(ladder::json_ld_offer(doc, scope))
        })
}

fn parse_listing(document: &Html, scope: &Scope<'_>) -> Option<Candidate> {
    document.select(&LISTING).find_map(|listing| {
        let price = ladder::first_price(listing, &[&*ITEM_PRICE])
            .or_else(|| price::first_currency_amount(&ladder::element_text(listing)))?;
        let condition = listing
            .select(&CONDITION)
            .next()
            .and_then(|c| ladder::condition_from_text(&ladder::element_text(c)));
        Some(Candidate {
            title: ladder::first_text(listing, &[&*LISTING_TITLE]),
            price,
            link: ladder::first_link(listing, scope.base_url, Some(&*LISTING_LINK)),
            condition,
            medium: Some(Medium::Physical),
        })
    })
}
