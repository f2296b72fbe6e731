//! Strategy ladder shared by all retailers.
//!
//! Retailer markup is unstable, so every extractor tries several strategies
//! in a fixed order. A [`Ladder`] records the outcome of each one and stops
//! at the first candidate carrying both a plausible price and a plausible
//! title. A candidate with only a price is kept as a fallback and used, with a
//! placeholder title, if nothing better turns up.
//!
//! The generic scanners in this module (page-wide currency scan, JSON-LD and
//! `__NEXT_DATA__` islands) are reusable rungs for any retailer.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::book::{Book, Condition, Isbn, Medium};
use crate::error::ExtractionFailure;
use crate::http_client::Fetcher;
use crate::price;

/// How far (in bytes of page text) a price may sit from the ISBN.
const ISBN_WINDOW: usize = 400;

static H1: LazyLock<Selector> = LazyLock::new(|| sel("h1"));
static OG_TITLE: LazyLock<Selector> = LazyLock::new(|| sel(r#"meta[property="og:title"]"#));
static TITLE: LazyLock<Selector> = LazyLock::new(|| sel("title"));
static LINK: LazyLock<Selector> = LazyLock::new(|| sel("a[href]"));
static LD_JSON: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"script[type="application/ld+json"]"#));
static NEXT_DATA: LazyLock<Selector> = LazyLock::new(|| sel("script#__NEXT_DATA__"));

/// Compile a selector literal.
///
/// Only for selectors written in this crate; every one is exercised by
/// tests, so a failure here is a programming error.
pub(crate) fn sel(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e:?}"))
}

/// A fetched page.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub body: String,
}

impl Page {
    /// Parse once for every strategy run against this page.
    pub fn parse<'p>(&'p self, base_url: &'p str) -> Parsed<'p> {
        Parsed {
            url: &self.url,
            base_url,
            document: Html::parse_document(&self.body),
        }
    }
}

/// A parsed [`Page`]. `Html` is not `Send`: never hold one across an await.
pub struct Parsed<'p> {
    pub url: &'p str,
    pub base_url: &'p str,
    pub document: Html,
}

/// Context handed to every strategy.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub isbn: &'a Isbn,
    pub page_url: &'a str,
    pub base_url: &'a str,
}

/// What a strategy found on a page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub title: Option<String>,
    pub price: f64,
    pub link: Option<String>,
    pub condition: Option<Condition>,
    pub medium: Option<Medium>,
}

impl Candidate {
    pub fn priced(price: f64) -> Self {
        Self {
            price,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn titled(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    #[must_use]
    pub fn linked(mut self, link: Option<String>) -> Self {
        self.link = link;
        self
    }

    /// Fill in `condition` when the strategy found none.
    #[must_use]
    pub fn assuming(mut self, condition: Option<Condition>) -> Self {
        self.condition = self.condition.or(condition);
        self
    }

    fn has_title(&self) -> bool {
        self.title.as_deref().is_some_and(is_plausible_title)
    }
}

/// Titles shorter than four characters are treated as noise.
pub fn is_plausible_title(title: &str) -> bool {
    title.trim().chars().count() > 3
}

/// Runs strategies in order for one extraction.
#[derive(Debug)]
pub struct Ladder<'a> {
    retailer: &'a str,
    display_name: &'a str,
    isbn: &'a Isbn,
    settled: Option<Candidate>,
    fallback: Option<Candidate>,
    last_reason: Option<String>,
}

impl<'a> Ladder<'a> {
    pub fn new(retailer: &'a str, display_name: &'a str, isbn: &'a Isbn) -> Self {
        Self {
            retailer,
            display_name,
            isbn,
            settled: None,
            fallback: None,
            last_reason: None,
        }
    }

    /// Whether a strategy has already produced a complete candidate.
    pub fn is_settled(&self) -> bool {
        self.settled.is_some()
    }

    /// Fetch a page, recording the failure reason if it cannot be retrieved.
    pub async fn fetch(&mut self, fetcher: &dyn Fetcher, url: &str) -> Option<Page> {
        match fetcher.fetch_text(url).await {
            Ok(body) => Some(Page {
                url: url.to_string(),
                body,
            }),
            Err(e) => {
                debug!(retailer = self.retailer, url, error = %e, "Fetch failed");
                self.last_reason = Some(e.to_string());
                None
            }
        }
    }

    /// Fetch the first URL in `urls` that answers.
    pub async fn fetch_any(&mut self, fetcher: &dyn Fetcher, urls: &[String]) -> Option<Page> {
        for url in urls {
            if let Some(page) = self.fetch(fetcher, url).await {
                return Some(page);
            }
        }
        None
    }

    /// Run one strategy against `page`. Returns `true` once the ladder is
    /// settled; later calls are then no-ops.
    pub fn attempt<F>(&mut self, strategy: &'static str, page: &Parsed<'_>, parse: F) -> bool
    where
        F: FnOnce(&Html, &Scope<'_>) -> Option<Candidate>,
    {
        if self.is_settled() {
            return true;
        }

        let scope = Scope {
            isbn: self.isbn,
            page_url: page.url,
            base_url: page.base_url,
        };

        let Some(mut candidate) = parse(&page.document, &scope) else {
            debug!(retailer = self.retailer, strategy, "Strategy found nothing");
            self.last_reason = Some(format!("{strategy}: no price found"));
            return false;
        };

        if !price::is_plausible(candidate.price) {
            debug!(retailer = self.retailer, strategy, price = candidate.price, "Implausible price");
            self.last_reason = Some(format!("{strategy}: implausible price {}", candidate.price));
            return false;
        }

        if candidate.link.as_deref().is_none_or(str::is_empty) {
            candidate.link = Some(page.url.to_string());
        }

        if candidate.has_title() {
            debug!(retailer = self.retailer, strategy, price = candidate.price, "Strategy succeeded");
            self.settled = Some(candidate);
            return true;
        }

        debug!(retailer = self.retailer, strategy, price = candidate.price, "Price without title");
        if self.fallback.is_none() {
            self.fallback = Some(candidate);
        }
        false
    }

    /// Turn the winning candidate into a record.
    pub fn finish(self, medium: Medium, condition: Condition) -> Result<Book, ExtractionFailure> {
        let Some(candidate) = self.settled.or(self.fallback) else {
            let reason = self
                .last_reason
                .unwrap_or_else(|| "no strategy produced a price".to_string());
            return Err(ExtractionFailure::new(self.retailer, reason));
        };

        let title = candidate
            .title
            .filter(|t| is_plausible_title(t))
            .unwrap_or_else(|| format!("Book ({})", self.display_name));

        Ok(Book {
            retailer: self.retailer.to_string(),
            link: candidate.link.unwrap_or_default(),
            title,
            isbn: self.isbn.clone(),
            price: candidate.price,
            condition: candidate.condition.unwrap_or(condition),
            medium: candidate.medium.unwrap_or(medium),
            description: None,
            image: None,
        })
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Element text with whitespace collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the first element matching any selector, in selector order.
pub fn first_text(root: ElementRef<'_>, selectors: &[&Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| {
        root.select(selector)
            .map(element_text)
            .find(|text| is_plausible_title(text))
    })
}

/// First plausible price among elements matching `selectors`.
pub fn first_price(root: ElementRef<'_>, selectors: &[&Selector]) -> Option<f64> {
    selectors.iter().find_map(|selector| {
        root.select(selector)
            .find_map(|el| price::parse_price(&element_text(el)))
    })
}

/// Resolve `href` against `base`. Absolute links pass through.
pub fn resolve_link(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    url::Url::parse(base)
        .and_then(|b| b.join(href))
        .map(String::from)
        .ok()
}

/// First link inside `root`, resolved.
pub fn first_link(root: ElementRef<'_>, base: &str, selector: Option<&Selector>) -> Option<String> {
    root.select(selector.unwrap_or(&LINK))
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| resolve_link(base, href))
}

/// Best page-level title: `<h1>`, then `og:title`, then `<title>`.
pub fn page_title(document: &Html) -> Option<String> {
    let root = document.root_element();
    first_text(root, &[&*H1])
        .or_else(|| {
            document
                .select(&OG_TITLE)
                .filter_map(|m| m.value().attr("content"))
                .map(str::trim)
                .find(|t| is_plausible_title(t))
                .map(str::to_string)
        })
        .or_else(|| first_text(root, &[&*TITLE]))
}

/// Infer condition from free text such as `"Used - Very Good"`.
pub fn condition_from_text(text: &str) -> Option<Condition> {
    let lower = text.to_ascii_lowercase();
    if lower.contains("used") || lower.contains("pre-owned") {
        Some(Condition::Used)
    } else if lower.contains("new") {
        Some(Condition::New)
    } else {
        None
    }
}

/// The smallest `div`/`li`/`article` whose text mentions the ISBN, in
/// either its ISBN-10 or ISBN-13 form, and holds a currency amount.
pub fn isbn_container<'d>(document: &'d Html, isbn: &Isbn) -> Option<ElementRef<'d>> {
    static BLOCKS: LazyLock<Selector> = LazyLock::new(|| sel("div, li, article"));
    let forms = isbn.forms();
    document
        .select(&BLOCKS)
        .filter(|el| {
            let text = element_text(*el);
            let compact = compact_isbn_text(&text);
            forms.iter().any(|f| compact.contains(f.as_str()))
                && price::first_currency_amount(&text).is_some()
        })
        .min_by_key(|el| el.text().map(str::len).sum::<usize>())
}

/// Hyphens dropped and `x` check digits uppercased, so printed ISBNs
/// compare against [`Isbn::forms`].
fn compact_isbn_text(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

// ============================================================================
// Generic rungs
// ============================================================================

/// Page-wide scan: the currency amount nearest to the ISBN text.
pub fn page_wide_scan(document: &Html, scope: &Scope<'_>) -> Option<Candidate> {
    let compact = compact_isbn_text(&element_text(document.root_element()));
    let price = scope
        .isbn
        .forms()
        .iter()
        .find_map(|form| price::amount_near(&compact, form, ISBN_WINDOW))?;
    Some(Candidate::priced(price).titled(page_title(document)))
}

/// `application/ld+json` islands describing a `Product` or `Book` offer.
pub fn json_ld_offer(document: &Html, scope: &Scope<'_>) -> Option<Candidate> {
    document
        .select(&LD_JSON)
        .filter_map(|script| serde_json::from_str::<Value>(&script.text().collect::<String>()).ok())
        .find_map(|value| ld_offer(&value, scope))
}

fn ld_offer(value: &Value, scope: &Scope<'_>) -> Option<Candidate> {
    match value {
        Value::Array(items) => items.iter().find_map(|v| ld_offer(v, scope)),
        Value::Object(map) => {
            if let Some(graph) = map.get("@graph") {
                return ld_offer(graph, scope);
            }
            let kind = map.get("@type").map(type_names).unwrap_or_default();
            if !kind.iter().any(|k| k == "Product" || k == "Book") {
                return None;
            }
            let offers = map.get("offers")?;
            let offer = match offers {
                Value::Array(list) => list.iter().find(|o| offer_price(o).is_some())?,
                other => other,
            };
            let price = offer_price(offer)?;
            let title = map.get("name").and_then(Value::as_str).map(str::to_string);
            let link = offer
                .get("url")
                .or_else(|| map.get("url"))
                .and_then(Value::as_str)
                .and_then(|href| resolve_link(scope.base_url, href));
            let condition = offer
                .get("itemCondition")
                .and_then(Value::as_str)
                .and_then(|c| {
                    if c.contains("Used") {
                        Some(Condition::Used)
                    } else if c.contains("New") {
                        Some(Condition::New)
                    } else {
                        None
                    }
                });
            let medium = map.get("bookFormat").and_then(Value::as_str).and_then(|f| {
                if f.contains("EBook") {
                    Some(Medium::Ebook)
                } else if f.contains("Hardcover") || f.contains("Paperback") {
                    Some(Medium::Physical)
                } else {
                    None
                }
            });
            Some(Candidate {
                title,
                price,
                link,
                condition,
                medium,
            })
        }
        _ => None,
    }
}

fn type_names(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

fn offer_price(offer: &Value) -> Option<f64> {
    ["price", "lowPrice"]
        .iter()
        .filter_map(|key| offer.get(*key))
        .find_map(json_amount)
}

fn json_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|p| price::is_plausible(*p)),
        Value::String(s) => price::parse_price(s),
        _ => None,
    }
}

/// `__NEXT_DATA__` island: the first object carrying a title and a price,
/// preferring one that mentions the ISBN.
pub fn next_data_offer(document: &Html, scope: &Scope<'_>) -> Option<Candidate> {
    let script = document.select(&NEXT_DATA).next()?;
    let value: Value = serde_json::from_str(&script.text().collect::<String>()).ok()?;

    let mut found = Vec::new();
    collect_priced_objects(&value, &mut found);

    let isbn = scope.isbn.as_str();
    let best = found
        .iter()
        .find(|obj| obj.to_string().contains(isbn))
        .or_else(|| found.first())?;

    let title = ["title", "name"]
        .iter()
        .find_map(|k| best.get(*k).and_then(Value::as_str))
        .map(str::to_string);
    let price = ["price", "salePrice", "amount", "listPrice"]
        .iter()
        .filter_map(|k| best.get(*k))
        .find_map(nested_amount)?;
    let link = ["url", "href", "path"]
        .iter()
        .find_map(|k| best.get(*k).and_then(Value::as_str))
        .and_then(|href| resolve_link(scope.base_url, href));

    Some(Candidate::priced(price).titled(title).linked(link))
}

/// Prices in app state are sometimes `{ "amount": 12.99, "currency": "USD" }`.
fn nested_amount(value: &Value) -> Option<f64> {
    json_amount(value).or_else(|| value.get("amount").and_then(json_amount))
}

fn collect_priced_objects<'v>(value: &'v Value, out: &mut Vec<&'v Value>) {
    match value {
        Value::Object(map) => {
            let titled = ["title", "name"]
                .iter()
                .any(|k| map.get(*k).and_then(Value::as_str).is_some_and(is_plausible_title));
            let priced = ["price", "salePrice", "amount", "listPrice"]
                .iter()
                .filter_map(|k| map.get(*k))
                .any(|v| nested_amount(v).is_some());
            if titled && priced {
                out.push(value);
            }
            for child in map.values() {
                collect_priced_objects(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_priced_objects(item, out);
            }
        }
        _ => {}
    }
}
