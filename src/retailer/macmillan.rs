//! Macmillan Learning storefront.
//!
//! Macmillan sells new copies only, mostly as Achieve access codes, with
//! ebook and print editions alongside. Ladder:
//! 1. Search result price tag (`div.priceandvaluetag p.text-right strong`)
//! 2. Page-wide scan for a price next to the ISBN
//! 3. JSON-LD product data

use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use super::ladder::{self, sel, Candidate, Ladder, Page, Scope};
use super::{Offering, Retailer};
use crate::book::{Book, Condition, Filters, Isbn, Medium};
use crate::error::ExtractionFailure;
use crate::http_client::Fetcher;

const BASE_URL: &str = "https://www.macmillanlearning.com";

static PRICE_TAG: LazyLock<Selector> =
    LazyLock::new(|| sel("div.priceandvaluetag p.text-right strong"));
static RESULT_BLOCK: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"div[class*="product-tile"], div[class*="search-result"], li[class*="product"]"#));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"[class*="product-title"], h3 a, h2, h3"#));
static FORMAT: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"[class*="format"], [class*="product-type"], div.priceandvaluetag"#));

/// Macmillan Learning extractor.
pub struct Macmillan;

impl Macmillan {
    fn search_url(isbn: &Isbn) -> String {
        format!("{BASE_URL}/college/us/search/?text={isbn}")
    }
}

#[async_trait]
impl Retailer for Macmillan {
    fn name(&self) -> &str {
        "macmillan"
    }

    fn display_name(&self) -> &str {
        "Macmillan Learning"
    }

    fn self_test_isbn(&self) -> Isbn {
        Isbn::known("9781319244453")
    }

    fn offering(&self) -> Offering {
        Offering::of(&[Medium::Interactive, Medium::Ebook, Medium::Physical])
    }

    async fn extract(
        &self,
        isbn: &Isbn,
        _filters: &Filters,
        fetcher: &dyn Fetcher,
    ) -> Result<Book, ExtractionFailure> {
        let mut ladder = Ladder::new(self.name(), self.display_name(), isbn);

        if let Some(page) = ladder.fetch(fetcher, &Self::search_url(isbn)).await {
            climb(&mut ladder, &page);
        }

        ladder.finish(Medium::Interactive, Condition::New)
    }
}

fn climb(ladder: &mut Ladder<'_>, page: &Page) -> bool {
    let parsed = page.parse(BASE_URL);
    ladder.attempt("price-tag", &parsed, price_tag)
        || ladder.attempt("page-wide", &parsed, ladder::page_wide_scan)
        || ladder.attempt("json-ld", &parsed, ladder::json_ld_offer)
}

fn price_tag(document: &Html, scope: &Scope<'_>) -> Option<Candidate> {
    let tag = document.select(&PRICE_TAG).next()?;
    let price = crate::price::parse_price(&ladder::element_text(tag))?;

    let block = enclosing_block(tag);
    let title = block
        .and_then(|b| ladder::first_text(b, &[&*TITLE]))
        .or_else(|| ladder::page_title(document));
    let link = block.and_then(|b| ladder::first_link(b, scope.base_url, None));
    let medium = block
        .map(|b| {
            b.select(&FORMAT)
                .map(ladder::element_text)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .and_then(|text| medium_from_text(&text));

    Some(Candidate {
        title,
        price,
        link,
        condition: Some(Condition::New),
        medium,
    })
}

/// The result tile holding `element`, if there is one.
fn enclosing_block(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| RESULT_BLOCK.matches(a))
}

/// Format labels such as `"Achieve Access Code"` or `"Loose-leaf"`.
fn medium_from_text(text: &str) -> Option<Medium> {
    let lower = text.to_ascii_lowercase();
    if lower.contains("achieve") || lower.contains("access code") || lower.contains("online") {
        Some(Medium::Interactive)
    } else if lower.contains("ebook") || lower.contains("e-book") || lower.contains("digital") {
        Some(Medium::Ebook)
    } else if ["paperback", "hardcover", "loose-leaf", "loose leaf", "print"]
        .iter()
        .any(|k| lower.contains(k))
    {
        Some(Medium::Physical)
    } else {
        None
    }
}
