use std::cell::{Cell, RefCell};

use indexmap::IndexSet;

use crate::chart::{BaseChart, FilterUpdate};
use crate::core::{Filter, Key};
use crate::data::KeyValue;
use crate::render::SelectionState;

/// One drawn category of a capped chart.
#[derive(Debug, Clone, PartialEq)]
pub enum CapEntry {
    Row(KeyValue),
    /// Everything beyond the cap, summed into one synthetic row.
    Others {
        label: String,
        value: f64,
        keys: Vec<Key>,
    },
}

impl CapEntry {
    #[must_use]
    pub fn key(&self) -> Key {
        match self {
            Self::Row(datum) => datum.key.clone(),
            Self::Others { label, .. } => Key::text(label.clone()),
        }
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        match self {
            Self::Row(datum) => datum.value,
            Self::Others { value, .. } => *value,
        }
    }

    /// Filter mutation for a click on this entry; "Others" toggles every
    /// underlying key at once.
    #[must_use]
    pub fn click_update(&self) -> FilterUpdate {
        match self {
            Self::Row(datum) => FilterUpdate::Toggle(Filter::Single(datum.key.clone())),
            Self::Others { keys, .. } => FilterUpdate::ToggleBatch(
                keys.iter().cloned().map(Filter::Single).collect(),
            ),
        }
    }

    #[must_use]
    pub fn selection(&self, base: &BaseChart) -> SelectionState {
        match self {
            Self::Row(datum) => base.selection_for(&datum.key),
            Self::Others { keys, .. } => {
                let mut states = keys.iter().map(|key| base.selection_for(key));
                match states.next() {
                    None => SelectionState::Neutral,
                    Some(first) => {
                        if first == SelectionState::Selected
                            || states.any(|state| state == SelectionState::Selected)
                        {
                            SelectionState::Selected
                        } else {
                            first
                        }
                    }
                }
            }
        }
    }
}

/// Limits a chart to its largest categories.
pub struct CapMixin {
    cap: Cell<Option<usize>>,
    others_label: RefCell<String>,
    others_grouper: Cell<bool>,
}

impl Default for CapMixin {
    fn default() -> Self {
        Self {
            cap: Cell::new(None),
            others_label: RefCell::new("Others".to_owned()),
            others_grouper: Cell::new(true),
        }
    }
}

impl CapMixin {
    #[must_use]
    pub fn cap(&self) -> Option<usize> {
        self.cap.get()
    }

    /// Keeps the `cap` largest groups; `None` draws every group.
    pub fn set_cap(&self, cap: Option<usize>) {
        self.cap.set(cap);
    }

    #[must_use]
    pub fn others_label(&self) -> String {
        self.others_label.borrow().clone()
    }

    pub fn set_others_label(&self, label: impl Into<String>) {
        *self.others_label.borrow_mut() = label.into();
    }

    /// Whether the remainder beyond the cap is summed into an "Others" row.
    pub fn set_others_grouper(&self, enabled: bool) {
        self.others_grouper.set(enabled);
    }

    /// Entries to draw, in the chart's ordering, "Others" last.
    #[must_use]
    pub fn entries(&self, base: &BaseChart) -> Vec<CapEntry> {
        let Some(group) = base.group() else {
            return Vec::new();
        };
        let Some(cap) = self.cap.get() else {
            return base
                .ordered_data()
                .into_iter()
                .map(CapEntry::Row)
                .collect();
        };

        let mut top = group.top(cap);
        base.sort_by_ordering(&mut top);
        if !self.others_grouper.get() {
            return top.into_iter().map(CapEntry::Row).collect();
        }

        let top_keys: IndexSet<Key> = top.iter().map(|datum| datum.key.clone()).collect();
        let (keys, value) = group
            .all()
            .into_iter()
            .filter(|datum| !top_keys.contains(&datum.key))
            .fold((Vec::new(), 0.0), |(mut keys, value), datum| {
                keys.push(datum.key);
                (keys, value + datum.value)
            });

        let mut entries: Vec<CapEntry> = top.into_iter().map(CapEntry::Row).collect();
        if !keys.is_empty() {
            entries.push(CapEntry::Others {
                label: self.others_label(),
                value,
                keys,
            });
        }
        entries
    }
}
