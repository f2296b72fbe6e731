//! The normalized offer record every retailer produces.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::IsbnError;
use crate::metadata::Volume;

/// A validated ISBN-10 or ISBN-13.
///
/// Stores the digit string so that ISBN-10 values starting with `0`
/// survive formatting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Isbn(String);

impl Isbn {
    /// Parse caller input. Hyphens and spaces between digits are ignored.
    pub fn parse(raw: &str) -> Result<Self, IsbnError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IsbnError::Empty);
        }
        if trimmed.starts_with('-') {
            return Err(IsbnError::NonPositive(trimmed.to_string()));
        }

        let digits: String = trimmed.chars().filter(|c| *c != '-' && *c != ' ').collect();
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(IsbnError::NonDigit(trimmed.to_string()));
        }
        if digits.len() != 10 && digits.len() != 13 {
            return Err(IsbnError::WrongLength(digits.len()));
        }
        if digits.chars().all(|c| c == '0') {
            return Err(IsbnError::NonPositive(trimmed.to_string()));
        }

        Ok(Self(digits))
    }

    /// Wrap a digit string written into this crate, such as a retailer's
    /// self-test ISBN. Callers' tests cover that the literal parses.
    pub(crate) fn known(digits: &'static str) -> Self {
        debug_assert!(Self::parse(digits).is_ok(), "invalid built-in ISBN {digits}");
        Self(digits.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value. Always fits: at most 13 decimal digits.
    pub fn as_u64(&self) -> u64 {
        self.0.bytes().fold(0, |acc, b| acc * 10 + u64::from(b - b'0'))
    }

    pub fn is_isbn13(&self) -> bool {
        self.0.len() == 13
    }

    /// The ISBN-10 form. `None` for `979` ISBN-13s, which have none.
    ///
    /// Returned as text: the mod-11 check digit may be `X`.
    pub fn to_isbn10(&self) -> Option<String> {
        if !self.is_isbn13() {
            return Some(self.0.clone());
        }
        let body = self.0.strip_prefix("978")?.get(..9)?;
        let sum: u32 = body
            .bytes()
            .zip((2..=10).rev())
            .map(|(b, weight)| u32::from(b - b'0') * weight)
            .sum();
        let check = match (11 - sum % 11) % 11 {
            10 => 'X',
            n => char::from_digit(n, 10)?,
        };
        Some(format!("{body}{check}"))
    }

    /// The `978` ISBN-13 form, with its mod-10 check digit recomputed.
    #[must_use]
    pub fn to_isbn13(&self) -> Isbn {
        if self.is_isbn13() {
            return self.clone();
        }
        let body = format!("978{}", &self.0[..9]);
        let sum: u32 = body
            .bytes()
            .zip([1, 3].into_iter().cycle())
            .map(|(b, weight)| u32::from(b - b'0') * weight)
            .sum();
        Self(format!("{body}{}", (10 - sum % 10) % 10))
    }

    /// Every form a page may print this ISBN in: itself first, then its
    /// ISBN-10 or ISBN-13 counterpart when one exists.
    pub fn forms(&self) -> Vec<String> {
        let other = if self.is_isbn13() {
            self.to_isbn10()
        } else {
            Some(self.to_isbn13().0)
        };
        std::iter::once(self.0.clone()).chain(other).collect()
    }
}

impl FromStr for Isbn {
    type Err = IsbnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<i64> for Isbn {
    type Error = IsbnError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(IsbnError::NonPositive(value.to_string()));
        }
        Self::parse(&value.to_string())
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Isbn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Physical condition of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    #[default]
    Unknown,
    Used,
    New,
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(Condition::Unknown),
            "used" => Ok(Condition::Used),
            "new" => Ok(Condition::New),
            other => Err(format!("unknown condition '{other}' (expected used, new or unknown)")),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Condition::Unknown => "unknown",
            Condition::Used => "used",
            Condition::New => "new",
        })
    }
}

/// Delivery format of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Medium {
    #[default]
    Unknown,
    Physical,
    Ebook,
    Interactive,
}

impl FromStr for Medium {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(Medium::Unknown),
            "physical" | "print" => Ok(Medium::Physical),
            "ebook" | "digital" => Ok(Medium::Ebook),
            "interactive" => Ok(Medium::Interactive),
            other => Err(format!(
                "unknown medium '{other}' (expected physical, ebook, interactive or unknown)"
            )),
        }
    }
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Medium::Unknown => "unknown",
            Medium::Physical => "physical",
            Medium::Ebook => "ebook",
            Medium::Interactive => "interactive",
        })
    }
}

/// Optional caller constraints applied after extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Filters {
    pub condition: Option<Condition>,
    pub medium: Option<Medium>,
}

impl Filters {
    pub fn new(condition: Option<Condition>, medium: Option<Medium>) -> Self {
        Self { condition, medium }
    }

    /// Whether `book` satisfies every filter that is set.
    pub fn admits(&self, book: &Book) -> bool {
        self.condition.is_none_or(|c| c == book.condition)
            && self.medium.is_none_or(|m| m == book.medium)
    }
}

/// One purchasable offer for a specific ISBN.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Book {
    pub retailer: String,
    pub link: String,
    pub title: String,
    pub isbn: Isbn,
    pub price: f64,
    pub condition: Condition,
    pub medium: Medium,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Book {
    /// A price is valid when it is finite and strictly positive.
    pub fn has_valid_price(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }

    /// Order by price only.
    pub fn cmp_price(&self, other: &Self) -> Ordering {
        self.price.total_cmp(&other.price)
    }

    /// Fill description and image from metadata. Never overwrites
    /// extracted fields.
    pub fn enrich(&mut self, volume: &Volume) {
        if self.description.is_none() && !volume.description.is_empty() {
            self.description = Some(volume.description.clone());
        }
        if self.image.is_none() && !volume.thumbnail.is_empty() {
            self.image = Some(volume.thumbnail.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(price: f64, condition: Condition, medium: Medium) -> Book {
        Book {
            retailer: "test".to_string(),
            link: "https://example.com/book".to_string(),
            title: "Sample".to_string(),
            isbn: Isbn::parse("9780134685991").unwrap(),
            price,
            condition,
            medium,
            description: None,
            image: None,
        }
    }

    #[test]
    fn parse_accepts_isbn13_and_isbn10() {
        assert_eq!(Isbn::parse("9780134685991").unwrap().as_str(), "9780134685991");
        assert_eq!(Isbn::parse("0134685997").unwrap().as_str(), "0134685997");
    }

    #[test]
    fn parse_strips_hyphens_and_spaces() {
        let isbn = Isbn::parse(" 978-0-13-468599-1 ").unwrap();
        assert_eq!(isbn.as_str(), "9780134685991");
        assert_eq!(Isbn::parse("978 0134 685991").unwrap(), isbn);
    }

    #[test]
    fn parse_rejects_negative() {
        assert_eq!(
            Isbn::parse("-20435223542"),
            Err(IsbnError::NonPositive("-20435223542".to_string()))
        );
        assert!(Isbn::try_from(-20_435_223_542_i64).is_err());
        assert!(Isbn::try_from(0_i64).is_err());
    }

    #[test]
    fn parse_rejects_malformed() {
        assert_eq!(Isbn::parse(""), Err(IsbnError::Empty));
        assert_eq!(Isbn::parse("12345"), Err(IsbnError::WrongLength(5)));
        assert!(matches!(Isbn::parse("97801346859X1"), Err(IsbnError::NonDigit(_))));
        assert!(matches!(Isbn::parse("0000000000"), Err(IsbnError::NonPositive(_))));
    }

    #[test]
    fn integer_isbn_round_trips() {
        let isbn = Isbn::try_from(9_798_991_511_100_i64).unwrap();
        assert_eq!(isbn.as_u64(), 9_798_991_511_100);
        assert!(isbn.is_isbn13());
    }

    #[test]
    fn isbn13_converts_to_isbn10_with_new_check_digit() {
        let isbn = Isbn::parse("978-0-13-468599-1").unwrap();
        assert_eq!(isbn.to_isbn10().as_deref(), Some("0134685997"));
        assert_eq!(
            Isbn::parse("9780306406157").unwrap().to_isbn10().as_deref(),
            Some("0306406152")
        );
        assert_eq!(
            Isbn::parse("9780804429573").unwrap().to_isbn10().as_deref(),
            Some("080442957X")
        );
    }

    #[test]
    fn isbn10_converts_to_isbn13_with_new_check_digit() {
        let isbn = Isbn::parse("0134685997").unwrap();
        assert_eq!(isbn.to_isbn13().as_str(), "9780134685991");
        assert_eq!(Isbn::parse("0306406152").unwrap().to_isbn13().as_str(), "9780306406157");
    }

    #[test]
    fn prefix_979_has_no_isbn10_form() {
        let isbn = Isbn::parse("9798991511100").unwrap();
        assert_eq!(isbn.to_isbn10(), None);
        assert_eq!(isbn.forms(), vec!["9798991511100".to_string()]);
    }

    #[test]
    fn forms_list_both_representations() {
        assert_eq!(
            Isbn::parse("9780134685991").unwrap().forms(),
            vec!["9780134685991".to_string(), "0134685997".to_string()]
        );
        assert_eq!(
            Isbn::parse("0134685997").unwrap().forms(),
            vec!["0134685997".to_string(), "9780134685991".to_string()]
        );
    }

    #[test]
    fn leading_zero_preserved() {
        let isbn = Isbn::parse("0134685997").unwrap();
        assert_eq!(isbn.to_string(), "0134685997");
        assert_eq!(isbn.as_u64(), 134_685_997);
    }

    #[test]
    fn condition_and_medium_parse_case_insensitively() {
        assert_eq!("USED".parse::<Condition>(), Ok(Condition::Used));
        assert_eq!(" new ".parse::<Condition>(), Ok(Condition::New));
        assert!("mint".parse::<Condition>().is_err());
        assert_eq!("eBook".parse::<Medium>(), Ok(Medium::Ebook));
        assert_eq!("print".parse::<Medium>(), Ok(Medium::Physical));
        assert!("vinyl".parse::<Medium>().is_err());
    }

    #[test]
    fn filters_discard_mismatches() {
        let book = sample(10.0, Condition::New, Medium::Physical);
        assert!(Filters::default().admits(&book));
        assert!(Filters::new(Some(Condition::New), None).admits(&book));
        assert!(!Filters::new(Some(Condition::Used), None).admits(&book));
        assert!(!Filters::new(None, Some(Medium::Ebook)).admits(&book));
    }

    #[test]
    fn price_validity() {
        assert!(sample(12.99, Condition::Unknown, Medium::Unknown).has_valid_price());
        assert!(!sample(0.0, Condition::Unknown, Medium::Unknown).has_valid_price());
        assert!(!sample(-3.0, Condition::Unknown, Medium::Unknown).has_valid_price());
        assert!(!sample(f64::NAN, Condition::Unknown, Medium::Unknown).has_valid_price());
    }

    #[test]
    fn ordering_uses_price_only() {
        let cheap = sample(12.99, Condition::Used, Medium::Physical);
        let pricey = sample(40.99, Condition::New, Medium::Ebook);
        assert_eq!(cheap.cmp_price(&pricey), Ordering::Less);
    }

    #[test]
    fn serializes_lowercase_enums_and_string_isbn() {
        let json = serde_json::to_value(sample(9.5, Condition::Used, Medium::Ebook)).unwrap();
        assert_eq!(json["condition"], "used");
        assert_eq!(json["medium"], "ebook");
        assert_eq!(json["isbn"], "9780134685991");
        assert!(json.get("description").is_none());
    }
}
