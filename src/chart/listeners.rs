use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::chart::FilterUpdate;

/// Namespace used by [`ChartListeners::on`].
pub const DEFAULT_NAMESPACE: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartEventKind {
    PreRender,
    PostRender,
    PreRedraw,
    PostRedraw,
    Filtered,
    Zoomed,
}

/// Lifecycle notification delivered to chart listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartEvent {
    PreRender,
    PostRender,
    PreRedraw,
    PostRedraw,
    /// The filter set changed; carries the mutation that was applied.
    Filtered(FilterUpdate),
    /// The x domain changed through zoom or focus.
    Zoomed { domain: (f64, f64) },
}

impl ChartEvent {
    #[must_use]
    pub fn kind(&self) -> ChartEventKind {
        match self {
            Self::PreRender => ChartEventKind::PreRender,
            Self::PostRender => ChartEventKind::PostRender,
            Self::PreRedraw => ChartEventKind::PreRedraw,
            Self::PostRedraw => ChartEventKind::PostRedraw,
            Self::Filtered(_) => ChartEventKind::Filtered,
            Self::Zoomed { .. } => ChartEventKind::Zoomed,
        }
    }
}

pub type Listener = Rc<dyn Fn(&ChartEvent)>;

/// One listener slot per `(event, namespace)`; registering again replaces it.
#[derive(Default)]
pub struct ChartListeners {
    slots: RefCell<IndexMap<(ChartEventKind, String), Listener>>,
}

impl ChartListeners {
    pub fn on(&self, kind: ChartEventKind, listener: impl Fn(&ChartEvent) + 'static) {
        self.on_named(kind, DEFAULT_NAMESPACE, listener);
    }

    pub fn on_named(
        &self,
        kind: ChartEventKind,
        namespace: &str,
        listener: impl Fn(&ChartEvent) + 'static,
    ) {
        self.slots
            .borrow_mut()
            .insert((kind, namespace.to_owned()), Rc::new(listener));
    }

    pub fn off(&self, kind: ChartEventKind, namespace: &str) {
        self.slots
            .borrow_mut()
            .shift_remove(&(kind, namespace.to_owned()));
    }

    #[must_use]
    pub fn has(&self, kind: ChartEventKind, namespace: &str) -> bool {
        self.slots
            .borrow()
            .contains_key(&(kind, namespace.to_owned()))
    }

    /// Invokes every listener registered for the event's kind, in
    /// registration order. Listeners may register or remove listeners.
    pub fn fire(&self, event: &ChartEvent) {
        let kind = event.kind();
        let listeners: Vec<Listener> = self
            .slots
            .borrow()
            .iter()
            .filter(|((slot_kind, _), _)| *slot_kind == kind)
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::{ChartEvent, ChartEventKind, ChartListeners};

    #[test]
    fn registering_same_slot_replaces_previous_listener() {
        let listeners = ChartListeners::default();
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));

        let counter = Rc::clone(&first);
        listeners.on(ChartEventKind::PostRender, move |_| counter.set(counter.get() + 1));
        let counter = Rc::clone(&second);
        listeners.on(ChartEventKind::PostRender, move |_| counter.set(counter.get() + 1));

        listeners.fire(&ChartEvent::PostRender);
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn namespaces_fan_out_and_can_be_removed() {
        let listeners = ChartListeners::default();
        let calls = Rc::new(Cell::new(0));
        for namespace in ["a", "b"] {
            let counter = Rc::clone(&calls);
            listeners.on_named(ChartEventKind::PreRedraw, namespace, move |_| {
                counter.set(counter.get() + 1);
            });
        }

        listeners.fire(&ChartEvent::PreRedraw);
        listeners.off(ChartEventKind::PreRedraw, "a");
        listeners.fire(&ChartEvent::PreRedraw);
        listeners.fire(&ChartEvent::PostRedraw);

        assert_eq!(calls.get(), 3);
        assert!(listeners.has(ChartEventKind::PreRedraw, "b"));
    }
}
