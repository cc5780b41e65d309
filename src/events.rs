//! Event coalescing on a deterministic clock.
//!
//! Rapid interaction (brush drags, wheel zoom) triggers many expensive
//! filter + redraw cascades. [`EventCoalescer`] records the most recent
//! trigger per slot and, when its delay elapses, only releases an action that
//! is still the current one for its slot. Earlier timers still fire, but
//! their action is dropped.
//!
//! Time never advances on its own: the host event loop calls
//! [`EventCoalescer::advance`] (or `ChartRegistry::tick`) with elapsed time,
//! the same way kinetic interactions are stepped by `delta_seconds`.

use std::collections::HashMap;
use std::time::Duration;

use tracing::trace;

/// Standard delay used to coalesce redraw broadcasts during interaction.
pub const EVENT_DELAY: Duration = Duration::from_millis(40);

/// Slot shared by every caller that does not name one.
pub const DEFAULT_SLOT: &str = "";

struct ScheduledAction<A> {
    due: Duration,
    token: u64,
    slot: Option<String>,
    action: A,
}

pub struct EventCoalescer<A> {
    now: Duration,
    next_token: u64,
    current: HashMap<String, u64>,
    pending: Vec<ScheduledAction<A>>,
}

impl<A> Default for EventCoalescer<A> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_token: 0,
            current: HashMap::new(),
            pending: Vec::new(),
        }
    }
}

impl<A> EventCoalescer<A> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of timers still queued, stale ones included.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Triggers `action` on the shared default slot.
    ///
    /// See [`EventCoalescer::trigger_in`].
    #[must_use]
    pub fn trigger(&mut self, action: A, delay: Duration) -> Option<A> {
        self.trigger_in(DEFAULT_SLOT, action, delay)
    }

    /// Records `action` as the current one for `slot`.
    ///
    /// With a zero delay the action is handed back and the caller must run it
    /// immediately; nothing is scheduled. Otherwise it is queued and released
    /// by [`EventCoalescer::pop_due`] only if no later trigger on the same
    /// slot has superseded it.
    #[must_use]
    pub fn trigger_in(&mut self, slot: &str, action: A, delay: Duration) -> Option<A> {
        let token = self.issue_token();
        self.current.insert(slot.to_owned(), token);
        if delay.is_zero() {
            return Some(action);
        }
        self.pending.push(ScheduledAction {
            due: self.now + delay,
            token,
            slot: Some(slot.to_owned()),
            action,
        });
        None
    }

    /// Queues an action that always runs once `delay` elapses.
    pub fn schedule(&mut self, action: A, delay: Duration) {
        let token = self.issue_token();
        self.pending.push(ScheduledAction {
            due: self.now + delay,
            token,
            slot: None,
            action,
        });
    }

    /// Pops the earliest timer due at or before `until`, moving the clock to
    /// its due time. Superseded timers are discarded along the way.
    pub fn pop_due(&mut self, until: Duration) -> Option<A> {
        loop {
            let index = self
                .pending
                .iter()
                .enumerate()
                .filter(|(_, scheduled)| scheduled.due <= until)
                .min_by_key(|(_, scheduled)| (scheduled.due, scheduled.token))
                .map(|(index, _)| index)?;

            let scheduled = self.pending.swap_remove(index);
            self.now = self.now.max(scheduled.due);
            let is_current = match &scheduled.slot {
                None => true,
                Some(slot) => self.current.get(slot) == Some(&scheduled.token),
            };
            if is_current {
                return Some(scheduled.action);
            }
            trace!(token = scheduled.token, "dropping superseded coalesced action");
        }
    }

    /// Moves the clock forward without releasing anything.
    pub fn settle_at(&mut self, at: Duration) {
        self.now = self.now.max(at);
    }

    /// Advances the clock by `elapsed` and returns every released action in
    /// due order.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<A> {
        let target = self.now + elapsed;
        let mut released = Vec::new();
        while let Some(action) = self.pop_due(target) {
            released.push(action);
        }
        self.settle_at(target);
        released
    }

    /// Due time of the last queued timer, if any.
    #[must_use]
    pub fn last_due(&self) -> Option<Duration> {
        self.pending.iter().map(|scheduled| scheduled.due).max()
    }

    fn issue_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::EventCoalescer;

    #[test]
    fn later_trigger_supersedes_pending_action() {
        let mut events = EventCoalescer::new();
        assert!(events.trigger("a", Duration::from_millis(100)).is_none());
        assert!(events.advance(Duration::from_millis(10)).is_empty());
        assert!(events.trigger("b", Duration::from_millis(100)).is_none());
        assert_eq!(events.advance(Duration::from_millis(140)), vec!["b"]);
        assert_eq!(events.pending_len(), 0);
    }

    #[test]
    fn zero_delay_hands_action_back_without_scheduling() {
        let mut events = EventCoalescer::new();
        assert_eq!(events.trigger("a", Duration::ZERO), Some("a"));
        assert_eq!(events.pending_len(), 0);
        assert!(events.advance(Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn zero_delay_trigger_also_supersedes_pending_action() {
        let mut events = EventCoalescer::new();
        let _ = events.trigger("a", Duration::from_millis(40));
        assert_eq!(events.trigger("b", Duration::ZERO), Some("b"));
        assert!(events.advance(Duration::from_millis(100)).is_empty());
    }

    #[test]
    fn slots_coalesce_independently() {
        let mut events = EventCoalescer::new();
        let _ = events.trigger_in("left", "a", Duration::from_millis(40));
        let _ = events.trigger_in("right", "b", Duration::from_millis(40));
        assert_eq!(events.advance(Duration::from_millis(40)), vec!["a", "b"]);
    }

    #[test]
    fn scheduled_actions_are_never_superseded() {
        let mut events = EventCoalescer::new();
        events.schedule("done", Duration::from_millis(250));
        let _ = events.trigger("a", Duration::from_millis(10));
        assert_eq!(events.advance(Duration::from_millis(300)), vec!["a", "done"]);
        assert_eq!(events.now(), Duration::from_millis(300));
    }
}
