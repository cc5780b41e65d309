//! Filter value model.
//!
//! Every filter is immutable once built and answers one question through
//! [`Filter::is_filtered`]: does a dimension key fall inside the selection.
//! Malformed bounds are not rejected; comparisons against them evaluate to
//! `false`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::Key;

/// Half-open 1-D interval `[low, high)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangedFilter {
    low: Key,
    high: Key,
}

impl RangedFilter {
    #[must_use]
    pub fn new(low: impl Into<Key>, high: impl Into<Key>) -> Self {
        Self {
            low: low.into(),
            high: high.into(),
        }
    }

    #[must_use]
    pub fn low(&self) -> &Key {
        &self.low
    }

    #[must_use]
    pub fn high(&self) -> &Key {
        &self.high
    }

    #[must_use]
    pub fn is_filtered(&self, value: &Key) -> bool {
        self.low <= *value && *value < self.high
    }
}

/// Exact `[x, y]` point over tuple keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoDimensionalFilter {
    x: Key,
    y: Key,
}

impl TwoDimensionalFilter {
    #[must_use]
    pub fn new(x: impl Into<Key>, y: impl Into<Key>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }

    #[must_use]
    pub fn is_filtered(&self, value: &Key) -> bool {
        match value {
            Key::Tuple(items) => items.len() == 2 && items[0].matches(&self.x) && items[1].matches(&self.y),
            _ => false,
        }
    }
}

/// Input shapes accepted by [`RangedTwoDimensionalFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RangedTwoDimensionalBounds {
    /// Two opposite rectangle corners in any order.
    Corners([f64; 2], [f64; 2]),
    /// An x-only band; y is unbounded in both directions.
    XBand(f64, f64),
}

/// Rectangle normalized to bottom-left / top-right corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangedTwoDimensionalFilter {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl RangedTwoDimensionalFilter {
    #[must_use]
    pub fn new(bounds: RangedTwoDimensionalBounds) -> Self {
        match bounds {
            RangedTwoDimensionalBounds::Corners(a, b) => Self {
                x0: a[0].min(b[0]),
                y0: a[1].min(b[1]),
                x1: a[0].max(b[0]),
                y1: a[1].max(b[1]),
            },
            RangedTwoDimensionalBounds::XBand(low, high) => Self {
                x0: low,
                y0: f64::NEG_INFINITY,
                x1: high,
                y1: f64::INFINITY,
            },
        }
    }

    #[must_use]
    pub fn corners(&self) -> ([f64; 2], [f64; 2]) {
        ([self.x0, self.y0], [self.x1, self.y1])
    }

    /// Tuple keys are tested on both axes; a scalar key is tested on x only.
    #[must_use]
    pub fn is_filtered(&self, value: &Key) -> bool {
        let (x, y) = match value {
            Key::Tuple(items) => {
                if items.len() != 2 {
                    return false;
                }
                match (items[0].as_f64(), items[1].as_f64()) {
                    (Some(x), Some(y)) => (x, y),
                    _ => return false,
                }
            }
            other => match other.as_f64() {
                Some(x) => (x, self.y0),
                None => return false,
            },
        };
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// Selection predicate held in a chart's filter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    Single(Key),
    Ranged(RangedFilter),
    TwoDimensional(TwoDimensionalFilter),
    RangedTwoDimensional(RangedTwoDimensionalFilter),
}

impl Filter {
    #[must_use]
    pub fn single(key: impl Into<Key>) -> Self {
        Self::Single(key.into())
    }

    #[must_use]
    pub fn ranged(low: impl Into<Key>, high: impl Into<Key>) -> Self {
        Self::Ranged(RangedFilter::new(low, high))
    }

    #[must_use]
    pub fn point(x: impl Into<Key>, y: impl Into<Key>) -> Self {
        Self::TwoDimensional(TwoDimensionalFilter::new(x, y))
    }

    /// Rectangle filter; `None` bounds mean "no filter" and yield `None`.
    #[must_use]
    pub fn ranged_two_dimensional(bounds: Option<RangedTwoDimensionalBounds>) -> Option<Self> {
        bounds.map(|bounds| Self::RangedTwoDimensional(RangedTwoDimensionalFilter::new(bounds)))
    }

    #[must_use]
    pub fn is_filtered(&self, value: &Key) -> bool {
        match self {
            Self::Single(key) => key.matches(value),
            Self::Ranged(filter) => filter.is_filtered(value),
            Self::TwoDimensional(filter) => filter.is_filtered(value),
            Self::RangedTwoDimensional(filter) => filter.is_filtered(value),
        }
    }

    /// Numeric bounds of a 1-D range filter.
    #[must_use]
    pub fn numeric_range(&self) -> Option<(f64, f64)> {
        match self {
            Self::Ranged(filter) => Some((filter.low.as_f64()?, filter.high.as_f64()?)),
            _ => None,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(key) => write!(f, "{key}"),
            Self::Ranged(filter) => write!(f, "[{} -> {}]", filter.low, filter.high),
            Self::TwoDimensional(filter) => write!(f, "[{}, {}]", filter.x, filter.y),
            Self::RangedTwoDimensional(filter) => write!(
                f,
                "[[{}, {}] -> [{}, {}]]",
                filter.x0, filter.y0, filter.x1, filter.y1
            ),
        }
    }
}

/// Compares two optional filters as ranges.
///
/// Both absent is equal, one absent is not. Range filters compare by numeric
/// bounds so date and number bounds with the same instant agree.
#[must_use]
pub fn ranges_equal(a: Option<&Filter>, b: Option<&Filter>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => match (a.numeric_range(), b.numeric_range()) {
            (Some(left), Some(right)) => left == right,
            _ => a == b,
        },
        _ => false,
    }
}
