use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Dynamically typed key produced by a dimension accessor.
///
/// Numbers and dates are ordered numerically, text lexicographically and
/// tuples element-wise. Keys of different kinds are unordered, and so is
/// `NaN`, so range predicates over them simply evaluate to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Number(OrderedFloat<f64>),
    Text(String),
    Date(DateTime<Utc>),
    Tuple(Vec<Key>),
}

impl Key {
    #[must_use]
    pub fn number(value: f64) -> Self {
        Self::Number(OrderedFloat(value))
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn pair(x: impl Into<Key>, y: impl Into<Key>) -> Self {
        Self::Tuple(vec![x.into(), y.into()])
    }

    /// Builds a date key from epoch milliseconds.
    ///
    /// Out-of-range timestamps fall back to a plain number key.
    #[must_use]
    pub fn date_from_millis(millis: f64) -> Self {
        if !millis.is_finite() {
            return Self::number(millis);
        }
        match Utc.timestamp_millis_opt(millis.round() as i64).single() {
            Some(date) => Self::Date(date),
            None => Self::number(millis),
        }
    }

    /// Numeric projection used by continuous scales: numbers as-is, dates as
    /// epoch milliseconds.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(value.0),
            Self::Date(date) => Some(date.timestamp_millis() as f64),
            Self::Text(_) | Self::Tuple(_) => None,
        }
    }

    #[must_use]
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Ordering used when sorting keys for display; unordered pairs compare equal.
    #[must_use]
    pub fn display_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.cmp(b),
            _ => self.partial_cmp(other).unwrap_or(Ordering::Equal),
        }
    }

    /// Equality used by predicates: `NaN` never matches, not even itself.
    ///
    /// `==` stays a total equivalence so keys can be hashed and toggled.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.0 == b.0,
            (Self::Tuple(a), Self::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.matches(b))
            }
            _ => self == other,
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.0.partial_cmp(&b.0),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Tuple(a), Self::Tuple(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => {
                let value = value.0;
                if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
                    write!(f, "{}", value as i64)
                } else {
                    write!(f, "{value}")
                }
            }
            Self::Text(text) => f.write_str(text),
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Tuple(items) => {
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<f64> for Key {
    fn from(value: f64) -> Self {
        Self::number(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Self::number(f64::from(value))
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for Key {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}
