//! Contracts consumed from the multi-dimensional data engine.
//!
//! Charts only call these traits; indexing and reduction strategies belong
//! to the engine. [`memory`] ships a small in-process engine with
//! crossfilter semantics for tests, demos and benches.

pub mod memory;

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::core::Key;

pub use memory::{MemoryCrossfilter, MemoryDimension, MemoryGroup, MemoryGroupAll};

/// One aggregated record produced by a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: Key,
    pub value: f64,
}

impl KeyValue {
    #[must_use]
    pub fn new(key: impl Into<Key>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

pub type KeyPredicate = Rc<dyn Fn(&Key) -> bool>;

/// Active selection applied to a dimension.
#[derive(Clone)]
pub enum DimensionFilter {
    /// Clears the dimension's filter.
    All,
    Exact(Key),
    /// Half-open `[low, high)` range.
    Range(Key, Key),
    Predicate(KeyPredicate),
}

impl DimensionFilter {
    #[must_use]
    pub fn matches(&self, key: &Key) -> bool {
        match self {
            Self::All => true,
            Self::Exact(expected) => expected.matches(key),
            Self::Range(low, high) => low <= key && key < high,
            Self::Predicate(predicate) => predicate(key),
        }
    }
}

impl fmt::Debug for DimensionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Exact(key) => f.debug_tuple("Exact").field(key).finish(),
            Self::Range(low, high) => f.debug_tuple("Range").field(low).field(high).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Key extractor over the dataset that can be filtered.
pub trait Dimension {
    fn filter(&self, filter: DimensionFilter);
}

/// Aggregation of records by dimension key.
pub trait Group {
    /// Every group, ordered by key.
    fn all(&self) -> Vec<KeyValue>;
    /// The `count` largest groups by value, descending.
    fn top(&self, count: usize) -> Vec<KeyValue>;
}

/// Single-value reduction over all currently filtered records.
pub trait GroupAll {
    fn value(&self) -> f64;
}

/// Total number of records held by the engine.
pub trait DataSize {
    fn size(&self) -> usize;
}
