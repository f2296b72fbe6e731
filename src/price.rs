//! Price parsing and plausibility.
//!
//! Listing pages are full of numbers that are not prices (ISBN fragments,
//! page counts, ratings). A value is only accepted as a price when it lies in
//! `[PRICE_FLOOR, PRICE_CEILING]`.

use std::sync::LazyLock;

use regex::Regex;

/// Smallest plausible book price in dollars.
pub const PRICE_FLOOR: f64 = 1.00;

/// Largest plausible book price: four figures.
pub const PRICE_CEILING: f64 = 9_999.99;

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("valid number regex")
});

/// `$12.99`, `US$ 1,299.00`, `12.99 USD`
static CURRENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:US\s?)?\$\s*(\d[\d,]*(?:\.\d{2})?)|(\d[\d,]*\.\d{2})\s*USD")
        .expect("valid currency regex")
});

pub fn is_plausible(price: f64) -> bool {
    price.is_finite() && (PRICE_FLOOR..=PRICE_CEILING).contains(&price)
}

fn to_amount(digits: &str) -> Option<f64> {
    digits.replace(',', "").parse::<f64>().ok().filter(|p| is_plausible(*p))
}

/// Parse the first plausible amount in a price label such as `"$52.99 USD"`.
pub fn parse_price(text: &str) -> Option<f64> {
    NUMBER.find_iter(text).find_map(|m| to_amount(m.as_str()))
}

/// Every plausible currency-formatted amount in `text`, in document order,
/// paired with its byte offset.
pub fn currency_amounts(text: &str) -> Vec<(usize, f64)> {
    CURRENCY
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let digits = caps.get(1).or_else(|| caps.get(2))?;
            to_amount(digits.as_str()).map(|p| (whole.start(), p))
        })
        .collect()
}

/// First plausible currency-formatted amount in `text`.
pub fn first_currency_amount(text: &str) -> Option<f64> {
    currency_amounts(text).first().map(|(_, p)| *p)
}

/// The currency amount closest to any occurrence of `needle`, looking at
/// most `window` bytes away.
pub fn amount_near(text: &str, needle: &str, window: usize) -> Option<f64> {
    if needle.is_empty() {
        return None;
    }
    let anchors: Vec<usize> = text.match_indices(needle).map(|(i, _)| i).collect();
    if anchors.is_empty() {
        return None;
    }

    currency_amounts(text)
        .into_iter()
        .filter_map(|(offset, price)| {
            let distance = anchors.iter().map(|a| a.abs_diff(offset)).min()?;
            (distance <= window).then_some((distance, price))
        })
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, price)| price)
}
