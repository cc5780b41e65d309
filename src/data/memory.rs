use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::core::Key;
use crate::data::{DataSize, Dimension, DimensionFilter, Group, GroupAll, KeyValue};

type Accessor<T> = Rc<dyn Fn(&T) -> Key>;
type Measure<T> = Rc<dyn Fn(&T) -> f64>;

struct EngineState<T> {
    records: Vec<T>,
    accessors: Vec<Accessor<T>>,
    filters: Vec<DimensionFilter>,
}

impl<T> EngineState<T> {
    /// Whether `record` passes every dimension filter except `ignored`.
    fn passes(&self, record: &T, ignored: Option<usize>) -> bool {
        self.accessors
            .iter()
            .zip(&self.filters)
            .enumerate()
            .filter(|(index, _)| Some(*index) != ignored)
            .all(|(_, (accessor, filter))| filter.matches(&accessor(record)))
    }
}

/// In-memory engine with crossfilter semantics.
///
/// A group observes the filters of every dimension except its own, while a
/// [`MemoryGroupAll`] observes all of them.
pub struct MemoryCrossfilter<T> {
    state: Rc<RefCell<EngineState<T>>>,
}

impl<T> Clone for MemoryCrossfilter<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: 'static> MemoryCrossfilter<T> {
    #[must_use]
    pub fn new(records: Vec<T>) -> Self {
        Self {
            state: Rc::new(RefCell::new(EngineState {
                records,
                accessors: Vec::new(),
                filters: Vec::new(),
            })),
        }
    }

    pub fn add(&self, records: impl IntoIterator<Item = T>) {
        self.state.borrow_mut().records.extend(records);
    }

    pub fn dimension(&self, accessor: impl Fn(&T) -> Key + 'static) -> MemoryDimension<T> {
        let mut state = self.state.borrow_mut();
        state.accessors.push(Rc::new(accessor));
        state.filters.push(DimensionFilter::All);
        MemoryDimension {
            engine: self.clone(),
            index: state.accessors.len() - 1,
        }
    }

    /// Count of records passing every filter.
    #[must_use]
    pub fn group_all_count(&self) -> MemoryGroupAll<T> {
        MemoryGroupAll {
            engine: self.clone(),
            measure: None,
        }
    }

    pub fn group_all_sum(&self, measure: impl Fn(&T) -> f64 + 'static) -> MemoryGroupAll<T> {
        MemoryGroupAll {
            engine: self.clone(),
            measure: Some(Rc::new(measure)),
        }
    }
}

impl<T> DataSize for MemoryCrossfilter<T> {
    fn size(&self) -> usize {
        self.state.borrow().records.len()
    }
}

pub struct MemoryDimension<T> {
    engine: MemoryCrossfilter<T>,
    index: usize,
}

impl<T: 'static> MemoryDimension<T> {
    /// Groups records by dimension key, counting them.
    #[must_use]
    pub fn group(&self) -> MemoryGroup<T> {
        MemoryGroup {
            engine: self.engine.clone(),
            dimension: self.index,
            key_map: None,
            measure: None,
        }
    }

    pub fn group_sum(&self, measure: impl Fn(&T) -> f64 + 'static) -> MemoryGroup<T> {
        MemoryGroup {
            measure: Some(Rc::new(measure)),
            ..self.group()
        }
    }

    /// Groups by a coarser key derived from the dimension key (e.g. day -> week).
    pub fn group_by(&self, key_map: impl Fn(&Key) -> Key + 'static) -> MemoryGroup<T> {
        MemoryGroup {
            key_map: Some(Rc::new(key_map)),
            ..self.group()
        }
    }
}

impl<T> Dimension for MemoryDimension<T> {
    fn filter(&self, filter: DimensionFilter) {
        let mut state = self.engine.state.borrow_mut();
        if let Some(slot) = state.filters.get_mut(self.index) {
            *slot = filter;
        }
    }
}

pub struct MemoryGroup<T> {
    engine: MemoryCrossfilter<T>,
    dimension: usize,
    key_map: Option<Rc<dyn Fn(&Key) -> Key>>,
    measure: Option<Measure<T>>,
}

impl<T> Group for MemoryGroup<T> {
    fn all(&self) -> Vec<KeyValue> {
        let state = self.engine.state.borrow();
        let Some(accessor) = state.accessors.get(self.dimension) else {
            return Vec::new();
        };

        let mut totals: IndexMap<Key, f64> = IndexMap::new();
        for record in &state.records {
            let raw = accessor(record);
            let key = match &self.key_map {
                Some(map) => map(&raw),
                None => raw,
            };
            // Keys stay present with zero value once filtered out.
            let total = totals.entry(key).or_insert(0.0);
            if state.passes(record, Some(self.dimension)) {
                *total += self.measure.as_ref().map_or(1.0, |measure| measure(record));
            }
        }

        let mut groups: Vec<KeyValue> = totals
            .into_iter()
            .map(|(key, value)| KeyValue { key, value })
            .collect();
        groups.sort_by(|a, b| a.key.display_cmp(&b.key));
        groups
    }

    fn top(&self, count: usize) -> Vec<KeyValue> {
        let mut groups = self.all();
        groups.sort_by(|a, b| b.value.total_cmp(&a.value));
        groups.truncate(count);
        groups
    }
}

pub struct MemoryGroupAll<T> {
    engine: MemoryCrossfilter<T>,
    measure: Option<Measure<T>>,
}

impl<T> GroupAll for MemoryGroupAll<T> {
    fn value(&self) -> f64 {
        let state = self.engine.state.borrow();
        state
            .records
            .iter()
            .filter(|record| state.passes(record, None))
            .map(|record| self.measure.as_ref().map_or(1.0, |measure| measure(record)))
            .sum()
    }
}
