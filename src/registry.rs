//! Chart registry: named chart groups and the broadcasts that keep them
//! consistent.
//!
//! The registry also owns the event coalescer and the clock that drives it,
//! so every deferred action of the charts registered here (coalesced filter
//! updates, transition completions) runs on one deterministic timeline.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::chart::{Chart, FilterUpdate};
use crate::core::Filter;
use crate::error::{ChartError, ChartResult};
use crate::events::{DEFAULT_SLOT, EventCoalescer};

/// Group used when a chart is anchored without naming one.
pub const DEFAULT_CHART_GROUP: &str = "__default_chart_group__";

pub type ChartHandle = Rc<dyn Chart>;

/// Work deferred through the coalescer.
pub type DeferredAction = Box<dyn FnOnce() -> ChartResult<()>>;

/// Post-hook invoked once per render/redraw broadcast with the group name.
pub type Renderlet = Rc<dyn Fn(&str)>;

/// Filter sets of a group's members keyed by anchor name.
pub type FilterState = IndexMap<String, Vec<Filter>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BroadcastKind {
    Render,
    Redraw,
}

thread_local! {
    static GLOBAL_REGISTRY: Rc<ChartRegistry> = Rc::new(ChartRegistry::new());
}

pub struct ChartRegistry {
    groups: RefCell<IndexMap<String, Vec<ChartHandle>>>,
    renderlet: RefCell<Option<Renderlet>>,
    broadcasting: RefCell<Option<String>>,
    events: RefCell<EventCoalescer<DeferredAction>>,
    transitions_disabled: Cell<bool>,
}

impl Default for ChartRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn group_name(group: Option<&str>) -> &str {
    group.unwrap_or(DEFAULT_CHART_GROUP)
}

impl ChartRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            groups: RefCell::new(IndexMap::new()),
            renderlet: RefCell::new(None),
            broadcasting: RefCell::new(None),
            events: RefCell::new(EventCoalescer::new()),
            transitions_disabled: Cell::new(false),
        }
    }

    /// Registry shared by every chart created on this thread without an
    /// explicit registry.
    #[must_use]
    pub fn global() -> Rc<Self> {
        GLOBAL_REGISTRY.with(Rc::clone)
    }

    /// Appends `chart` to `group`. Duplicate registration is not guarded.
    pub fn register(&self, chart: ChartHandle, group: Option<&str>) {
        let group = group_name(group);
        debug!(group, chart = %chart.base().anchor_name(), "registering chart");
        self.groups
            .borrow_mut()
            .entry(group.to_owned())
            .or_default()
            .push(chart);
    }

    /// Removes the chart whose anchor name matches `anchor_name`; no-op when absent.
    pub fn deregister(&self, anchor_name: &str, group: Option<&str>) {
        let mut groups = self.groups.borrow_mut();
        if let Some(charts) = groups.get_mut(group_name(group)) {
            if let Some(position) = charts
                .iter()
                .position(|chart| chart.base().anchor_name() == anchor_name)
            {
                charts.remove(position);
            }
        }
    }

    /// Whether this exact chart instance is registered in any group.
    #[must_use]
    pub fn has(&self, chart: &dyn Chart) -> bool {
        let target = chart.base();
        self.groups
            .borrow()
            .values()
            .flatten()
            .any(|candidate| candidate.base().same_chart(target))
    }

    /// Snapshot of the members of `group` in registration order.
    #[must_use]
    pub fn list(&self, group: Option<&str>) -> Vec<ChartHandle> {
        self.groups
            .borrow()
            .get(group_name(group))
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn group_names(&self) -> Vec<String> {
        self.groups.borrow().keys().cloned().collect()
    }

    /// Drops one group's membership, or every group when `group` is `None`.
    pub fn clear(&self, group: Option<&str>) {
        let mut groups = self.groups.borrow_mut();
        match group {
            Some(group) => {
                groups.shift_remove(group);
            }
            None => groups.clear(),
        }
    }

    /// Filter sets of every member of `group`; unfiltered charts are omitted.
    #[must_use]
    pub fn filter_state(&self, group: Option<&str>) -> FilterState {
        self.list(group)
            .iter()
            .filter_map(|chart| {
                let filters = chart.base().filters();
                (!filters.is_empty()).then(|| (chart.base().anchor_name(), filters))
            })
            .collect()
    }

    pub fn filter_state_json(&self, group: Option<&str>) -> ChartResult<String> {
        serde_json::to_string(&self.filter_state(group))
            .map_err(|err| ChartError::InvalidData(format!("filter state: {err}")))
    }

    /// Re-applies a state captured by [`ChartRegistry::filter_state_json`].
    ///
    /// Every member of `group` ends up with exactly the filters recorded for
    /// its anchor name (none when absent); the group is not redrawn.
    pub fn restore_filter_state_json(&self, group: Option<&str>, json: &str) -> ChartResult<()> {
        let state: FilterState = serde_json::from_str(json)
            .map_err(|err| ChartError::InvalidData(format!("filter state: {err}")))?;
        for chart in self.list(group) {
            let base = chart.base();
            match state.get(&base.anchor_name()) {
                Some(filters) if !filters.is_empty() => {
                    base.filter_all()?;
                    base.update_filter(FilterUpdate::ToggleBatch(filters.clone()))?;
                }
                _ if base.has_filter(None) => base.filter_all()?,
                _ => {}
            }
        }
        Ok(())
    }

    pub fn set_renderlet(&self, renderlet: Option<Renderlet>) {
        *self.renderlet.borrow_mut() = renderlet;
    }

    /// Whether a render/redraw broadcast is in flight.
    #[must_use]
    pub fn is_broadcasting(&self) -> bool {
        self.broadcasting.borrow().is_some()
    }

    pub fn render_all(&self, group: Option<&str>) -> ChartResult<()> {
        self.broadcast(group_name(group), BroadcastKind::Render)
    }

    pub fn redraw_all(&self, group: Option<&str>) -> ChartResult<()> {
        self.broadcast(group_name(group), BroadcastKind::Redraw)
    }

    fn broadcast(&self, group: &str, kind: BroadcastKind) -> ChartResult<()> {
        {
            let mut broadcasting = self.broadcasting.borrow_mut();
            if broadcasting.is_some() {
                return Err(ChartError::ReentrantBroadcast {
                    group: group.to_owned(),
                });
            }
            *broadcasting = Some(group.to_owned());
        }

        debug!(group, ?kind, "broadcasting to chart group");
        // Members may deregister while we iterate, so walk a snapshot.
        let members = self.list(Some(group));
        let result = members.iter().try_for_each(|chart| match kind {
            BroadcastKind::Render => chart.render(),
            BroadcastKind::Redraw => chart.redraw(),
        });
        *self.broadcasting.borrow_mut() = None;
        result?;

        let renderlet = self.renderlet.borrow().clone();
        if let Some(renderlet) = renderlet {
            renderlet(group);
        }
        Ok(())
    }

    /// Triggers `action` through the coalescer on `slot`.
    ///
    /// A zero delay runs the action before returning; otherwise it runs from
    /// [`ChartRegistry::tick`] unless a later trigger on the same slot
    /// supersedes it.
    pub fn trigger_in(&self, slot: &str, action: DeferredAction, delay: Duration) -> ChartResult<()> {
        let immediate = self.events.borrow_mut().trigger_in(slot, action, delay);
        match immediate {
            Some(action) => action(),
            None => Ok(()),
        }
    }

    /// Triggers `action` on the shared default slot.
    pub fn trigger(&self, action: DeferredAction, delay: Duration) -> ChartResult<()> {
        self.trigger_in(DEFAULT_SLOT, action, delay)
    }

    /// Queues an action that is never superseded (transition completions).
    pub fn schedule(&self, action: DeferredAction, delay: Duration) {
        self.events.borrow_mut().schedule(action, delay);
    }

    /// Advances the clock by `elapsed`, running every action that comes due.
    ///
    /// Every due action runs even if an earlier one fails; the first error is
    /// returned. Returns the number of actions executed.
    pub fn tick(&self, elapsed: Duration) -> ChartResult<usize> {
        let target = self.events.borrow().now() + elapsed;
        let mut executed = 0;
        let mut first_error = None;
        loop {
            // Released actions may trigger again, so never hold the borrow while running.
            let next = self.events.borrow_mut().pop_due(target);
            let Some(action) = next else {
                break;
            };
            executed += 1;
            if let Err(err) = action() {
                warn!(error = %err, "coalesced chart action failed");
                first_error.get_or_insert(err);
            }
        }
        self.events.borrow_mut().settle_at(target);
        match first_error {
            Some(err) => Err(err),
            None => Ok(executed),
        }
    }

    /// Runs the clock until no timer is left.
    pub fn flush(&self) -> ChartResult<usize> {
        let mut executed = 0;
        loop {
            let (now, last_due) = {
                let events = self.events.borrow();
                (events.now(), events.last_due())
            };
            let Some(last_due) = last_due else {
                return Ok(executed);
            };
            executed += self.tick(last_due.saturating_sub(now))?;
        }
    }

    #[must_use]
    pub fn now(&self) -> Duration {
        self.events.borrow().now()
    }

    #[must_use]
    pub fn pending_actions(&self) -> usize {
        self.events.borrow().pending_len()
    }

    /// Globally disables transitions; completions then fire synchronously.
    pub fn set_transitions_disabled(&self, disabled: bool) {
        self.transitions_disabled.set(disabled);
    }

    #[must_use]
    pub fn transitions_disabled(&self) -> bool {
        self.transitions_disabled.get()
    }
}
