//! # Attribute Values
//!
//! Native representation of item attributes after they have been decoded from
//! the change stream's typed envelope.
//!
//! Equality is value equality: numbers compare by numeric value (`"1"`,
//! `"1.0"` and `"1e0"` are equal), sets compare as sets, maps compare by
//! key/value pairs. A missing attribute is represented by the absence of the
//! key in an [`Image`], never by [`AttributeValue::Null`].

use serde_json::{json, Map as JsonMap, Value as JsonValue};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Snapshot of an item's attributes, keyed by attribute name.
pub type Image = BTreeMap<String, AttributeValue>;

/// Arbitrary-precision number kept as text, compared by numeric value.
#[derive(Debug, Clone)]
pub struct Number {
    text: String,
    canonical: CanonicalNumber,
}

/// `digits * 10^exponent`, with no leading or trailing zeros in `digits`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct CanonicalNumber {
    negative: bool,
    digits: String,
    exponent: i64,
}

impl CanonicalNumber {
    fn zero() -> Self {
        Self {
            negative: false,
            digits: "0".to_string(),
            exponent: 0,
        }
    }

    fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let (negative, unsigned) = match trimmed.as_bytes().first()? {
            b'-' => (true, &trimmed[1..]),
            b'+' => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
            Some(pos) => (&unsigned[..pos], unsigned[pos + 1..].parse::<i64>().ok()?),
            None => (unsigned, 0),
        };

        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (mantissa, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        let mut exponent = exponent.checked_sub(i64::try_from(frac_part.len()).ok()?)?;
        let joined = format!("{int_part}{frac_part}");
        let significant = joined.trim_start_matches('0');
        if significant.is_empty() {
            return Some(Self::zero());
        }

        let digits = significant.trim_end_matches('0');
        let trailing_zeros = significant.len() - digits.len();
        exponent = exponent.checked_add(i64::try_from(trailing_zeros).ok()?)?;

        Some(Self {
            negative,
            digits: digits.to_string(),
            exponent,
        })
    }
}

impl Number {
    /// Parse numeric text as delivered in the `N` envelope.
    pub fn parse(text: &str) -> Option<Self> {
        CanonicalNumber::parse(text).map(|canonical| Self {
            text: text.trim().to_string(),
            canonical,
        })
    }

    /// The numeric text as received.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.text.parse().ok()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.text.parse().ok()
    }

    pub fn is_zero(&self) -> bool {
        self.canonical == CanonicalNumber::zero()
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Number {}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

// Set ordering only; not numeric ordering.
impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        let text = value.to_string();
        let canonical = CanonicalNumber::parse(&text).unwrap_or_else(CanonicalNumber::zero);
        Self { text, canonical }
    }
}

/// A decoded attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<AttributeValue>),
    Map(BTreeMap<String, AttributeValue>),
    StringSet(BTreeSet<String>),
    NumberSet(BTreeSet<Number>),
    /// Base64 text, compared without decoding
    Binary(String),
    BinarySet(BTreeSet<String>),
}

impl AttributeValue {
    /// The envelope tag this value is delivered under.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "BOOL",
            Self::Number(_) => "N",
            Self::String(_) => "S",
            Self::List(_) => "L",
            Self::Map(_) => "M",
            Self::StringSet(_) => "SS",
            Self::NumberSet(_) => "NS",
            Self::Binary(_) => "B",
            Self::BinarySet(_) => "BS",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Self::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Encode back into the change stream's typed envelope.
    pub fn to_wire(&self) -> JsonValue {
        match self {
            Self::Null => json!({ "NULL": true }),
            Self::Bool(b) => json!({ "BOOL": b }),
            Self::Number(n) => json!({ "N": n.as_str() }),
            Self::String(s) => json!({ "S": s }),
            Self::List(items) => {
                json!({ "L": items.iter().map(Self::to_wire).collect::<Vec<_>>() })
            }
            Self::Map(entries) => json!({ "M": image_to_wire(entries) }),
            Self::StringSet(items) => json!({ "SS": items }),
            Self::NumberSet(items) => {
                json!({ "NS": items.iter().map(Number::as_str).collect::<Vec<_>>() })
            }
            Self::Binary(b) => json!({ "B": b }),
            Self::BinarySet(items) => json!({ "BS": items }),
        }
    }
}

/// Encode a whole image into the typed envelope, one entry per attribute.
pub fn image_to_wire(image: &Image) -> JsonValue {
    let entries: JsonMap<String, JsonValue> = image
        .iter()
        .map(|(name, value)| (name.clone(), value.to_wire()))
        .collect();
    JsonValue::Object(entries)
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Binary(b) => write!(f, "b64:{b}"),
            other => write!(f, "{}", other.to_wire()),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Number(Number::from(i64::from(value)))
    }
}

impl From<Number> for AttributeValue {
    fn from(value: Number) -> Self {
        Self::Number(value)
    }
}

impl From<Vec<AttributeValue>> for AttributeValue {
    fn from(value: Vec<AttributeValue>) -> Self {
        Self::List(value)
    }
}

impl From<Image> for AttributeValue {
    fn from(value: Image) -> Self {
        Self::Map(value)
    }
}
