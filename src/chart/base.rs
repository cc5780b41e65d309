use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration;

use smallvec::smallvec;
use tracing::{debug, trace};

use crate::chart::{
    AnchorTarget, ChartEvent, ChartEventKind, ChartListeners, ColorScale, FilterUpdate, Legend,
    LegendItem, MandatoryAttribute, MandatoryAttributes,
};
use crate::core::{Filter, Key, Margins, Viewport};
use crate::data::{Dimension, DimensionFilter, Group, KeyValue};
use crate::error::{ChartError, ChartResult};
use crate::registry::{ChartHandle, ChartRegistry, DEFAULT_CHART_GROUP, DeferredAction};
use crate::render::{Color, RenderFrame, SelectionState, SurfaceHandle};

/// Applies a filter list to a dimension. Returning `None` keeps the list as
/// computed; `Some` replaces it with the filters actually applied.
pub type FilterHandler = Rc<dyn Fn(&dyn Dimension, &[Filter]) -> Option<Vec<Filter>>>;
pub type HasFilterHandler = Rc<dyn Fn(&[Filter], &Filter) -> bool>;
pub type FilterPrinter = Rc<dyn Fn(&[Filter]) -> String>;
pub type KeyAccessor = Rc<dyn Fn(&KeyValue) -> Key>;
pub type ValueAccessor = Rc<dyn Fn(&KeyValue) -> f64>;
pub type LabelAccessor = Rc<dyn Fn(&KeyValue) -> String>;
pub type OrderingComparator = Rc<dyn Fn(&KeyValue, &KeyValue) -> Ordering>;
pub type DataAccessor = Rc<dyn Fn(&dyn Group) -> Vec<KeyValue>>;

const DEFAULT_TRANSITION: Duration = Duration::from_millis(750);

static NEXT_CHART_ID: AtomicU64 = AtomicU64::new(1);

/// Compiles a filter list into one dimension predicate.
///
/// An empty list clears the dimension; a lone single or ranged filter maps to
/// the engine's exact/range filter; anything else matches when any filter does.
#[must_use]
pub fn compile_filters(filters: &[Filter]) -> DimensionFilter {
    match filters {
        [] => DimensionFilter::All,
        [Filter::Single(key)] => DimensionFilter::Exact(key.clone()),
        [Filter::Ranged(range)] => DimensionFilter::Range(range.low().clone(), range.high().clone()),
        _ => {
            let filters = filters.to_vec();
            DimensionFilter::Predicate(Rc::new(move |key| {
                filters.iter().any(|filter| filter.is_filtered(key))
            }))
        }
    }
}

pub fn default_filter_handler(dimension: &dyn Dimension, filters: &[Filter]) -> Option<Vec<Filter>> {
    dimension.filter(compile_filters(filters));
    None
}

#[must_use]
pub fn default_filter_printer(filters: &[Filter]) -> String {
    filters
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Render,
    Redraw,
}

impl TransitionKind {
    fn completion(self) -> ChartEvent {
        match self {
            Self::Render => ChartEvent::PostRender,
            Self::Redraw => ChartEvent::PostRedraw,
        }
    }
}

struct Anchor {
    name: String,
    surface: SurfaceHandle,
    group: String,
    registered: bool,
}

struct BaseState {
    id: u64,
    registry: Rc<ChartRegistry>,
    anchor: RefCell<Option<Anchor>>,
    dimension: RefCell<Option<Rc<dyn Dimension>>>,
    group: RefCell<Option<Rc<dyn Group>>>,
    group_label: RefCell<Option<String>>,
    data_accessor: RefCell<Option<DataAccessor>>,
    key_accessor: RefCell<KeyAccessor>,
    value_accessor: RefCell<ValueAccessor>,
    label_accessor: RefCell<LabelAccessor>,
    ordering: RefCell<OrderingComparator>,
    filters: RefCell<Vec<Filter>>,
    filter_handler: RefCell<FilterHandler>,
    has_filter_handler: RefCell<HasFilterHandler>,
    filter_printer: RefCell<FilterPrinter>,
    listeners: ChartListeners,
    viewport: Cell<Viewport>,
    margins: Cell<Margins>,
    colors: RefCell<ColorScale>,
    legend: Cell<Option<Legend>>,
    transition_duration: Cell<Duration>,
    render_generation: Cell<u64>,
    redraw_generation: Cell<u64>,
    rendered: Cell<bool>,
}

impl BaseState {
    fn generation(&self, kind: TransitionKind) -> &Cell<u64> {
        match kind {
            TransitionKind::Render => &self.render_generation,
            TransitionKind::Redraw => &self.redraw_generation,
        }
    }
}

/// Shared state and behavior of every chart: anchoring, data binding, the
/// filter set, listeners and transitions.
///
/// Cloning yields another handle to the same chart.
#[derive(Clone)]
pub struct BaseChart {
    state: Rc<BaseState>,
}

impl Default for BaseChart {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseChart {
    /// Chart bound to this thread's global registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(ChartRegistry::global())
    }

    #[must_use]
    pub fn with_registry(registry: Rc<ChartRegistry>) -> Self {
        Self {
            state: Rc::new(BaseState {
                id: NEXT_CHART_ID.fetch_add(1, AtomicOrdering::Relaxed),
                registry,
                anchor: RefCell::new(None),
                dimension: RefCell::new(None),
                group: RefCell::new(None),
                group_label: RefCell::new(None),
                data_accessor: RefCell::new(None),
                key_accessor: RefCell::new(Rc::new(|datum: &KeyValue| datum.key.clone())),
                value_accessor: RefCell::new(Rc::new(|datum: &KeyValue| datum.value)),
                label_accessor: RefCell::new(Rc::new(|datum: &KeyValue| datum.key.to_string())),
                ordering: RefCell::new(Rc::new(|a: &KeyValue, b: &KeyValue| {
                    a.key.display_cmp(&b.key)
                })),
                filters: RefCell::new(Vec::new()),
                filter_handler: RefCell::new(Rc::new(default_filter_handler)),
                has_filter_handler: RefCell::new(Rc::new(|filters: &[Filter], filter: &Filter| {
                    filters.contains(filter)
                })),
                filter_printer: RefCell::new(Rc::new(default_filter_printer)),
                listeners: ChartListeners::default(),
                viewport: Cell::new(Viewport::default()),
                margins: Cell::new(Margins::default()),
                colors: RefCell::new(ColorScale::default()),
                legend: Cell::new(None),
                transition_duration: Cell::new(DEFAULT_TRANSITION),
                render_generation: Cell::new(0),
                redraw_generation: Cell::new(0),
                rendered: Cell::new(false),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.state.id
    }

    #[must_use]
    pub fn registry(&self) -> Rc<ChartRegistry> {
        Rc::clone(&self.state.registry)
    }

    /// Whether both handles refer to the same chart instance.
    #[must_use]
    pub fn same_chart(&self, other: &BaseChart) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    // Anchoring ------------------------------------------------------------

    pub(crate) fn attach(
        &self,
        handle: ChartHandle,
        target: AnchorTarget,
        group: Option<&str>,
    ) -> ChartResult<()> {
        let anchor = match target {
            AnchorTarget::Surface(surface) => {
                let name = surface.borrow().id().to_owned();
                let group = group.unwrap_or(DEFAULT_CHART_GROUP).to_owned();
                Anchor {
                    name,
                    surface,
                    group,
                    registered: true,
                }
            }
            AnchorTarget::Chart(parent) => {
                let parent = parent.base();
                let surface = parent.surface_or_err()?;
                Anchor {
                    name: format!("{}-chart-{}", parent.anchor_name(), self.state.id),
                    surface,
                    group: parent.chart_group(),
                    registered: false,
                }
            }
        };

        self.leave_group();

        let registered = anchor.registered;
        let group = anchor.group.clone();
        debug!(chart = %anchor.name, group = %group, registered, "anchoring chart");
        *self.state.anchor.borrow_mut() = Some(anchor);
        if registered {
            self.state.registry.register(handle, Some(&group));
        }
        Ok(())
    }

    /// Leaves the chart group; the chart keeps its surface and can still be
    /// rendered explicitly.
    pub fn deregister(&self) {
        self.leave_group();
    }

    fn leave_group(&self) {
        let previous = {
            let mut anchor = self.state.anchor.borrow_mut();
            match anchor.as_mut() {
                Some(anchor) if anchor.registered => {
                    anchor.registered = false;
                    Some((anchor.name.clone(), anchor.group.clone()))
                }
                _ => None,
            }
        };
        if let Some((name, group)) = previous {
            self.state.registry.deregister(&name, Some(&group));
        }
    }

    #[must_use]
    pub fn is_anchored(&self) -> bool {
        self.state.anchor.borrow().is_some()
    }

    /// Identity of the chart on its surface; also the name of its layer.
    #[must_use]
    pub fn anchor_name(&self) -> String {
        match self.state.anchor.borrow().as_ref() {
            Some(anchor) => anchor.name.clone(),
            None => format!("chart-{}", self.state.id),
        }
    }

    #[must_use]
    pub fn chart_group(&self) -> String {
        self.state
            .anchor
            .borrow()
            .as_ref()
            .map_or_else(|| DEFAULT_CHART_GROUP.to_owned(), |anchor| anchor.group.clone())
    }

    #[must_use]
    pub fn surface(&self) -> Option<SurfaceHandle> {
        self.state
            .anchor
            .borrow()
            .as_ref()
            .map(|anchor| Rc::clone(&anchor.surface))
    }

    pub fn surface_or_err(&self) -> ChartResult<SurfaceHandle> {
        self.surface().ok_or_else(|| ChartError::NotAnchored {
            chart: self.anchor_name(),
        })
    }

    /// Draws `frame` into this chart's layer of its surface.
    pub fn present(&self, frame: RenderFrame) -> ChartResult<()> {
        let surface = self.surface_or_err()?;
        let layer = self.anchor_name();
        surface.borrow_mut().present(&layer, frame)
    }

    /// Moves the pixel brush drawn over this chart's layer.
    pub fn set_brush_overlay(&self, extent: Option<(f64, f64)>) {
        if let Some(surface) = self.surface() {
            let layer = self.anchor_name();
            surface.borrow_mut().set_brush_overlay(&layer, extent);
        }
    }

    // Data binding ---------------------------------------------------------

    pub fn set_dimension(&self, dimension: Rc<dyn Dimension>) {
        *self.state.dimension.borrow_mut() = Some(dimension);
    }

    #[must_use]
    pub fn dimension(&self) -> Option<Rc<dyn Dimension>> {
        self.state.dimension.borrow().clone()
    }

    /// Binds the aggregation the chart draws; `label` names it in legends.
    pub fn set_group(&self, group: Rc<dyn Group>, label: Option<&str>) {
        *self.state.group.borrow_mut() = Some(group);
        *self.state.group_label.borrow_mut() = label.map(str::to_owned);
    }

    #[must_use]
    pub fn group(&self) -> Option<Rc<dyn Group>> {
        self.state.group.borrow().clone()
    }

    #[must_use]
    pub fn group_label(&self) -> Option<String> {
        self.state.group_label.borrow().clone()
    }

    /// `dimension` and `group`, required by every data-driven chart.
    #[must_use]
    pub fn standard_attributes(&self) -> MandatoryAttributes {
        smallvec![
            MandatoryAttribute::new("dimension", self.state.dimension.borrow().is_some()),
            MandatoryAttribute::new("group", self.state.group.borrow().is_some()),
        ]
    }

    /// Overrides how records are pulled from the group (default `group.all()`).
    pub fn set_data_accessor(&self, accessor: Option<DataAccessor>) {
        *self.state.data_accessor.borrow_mut() = accessor;
    }

    #[must_use]
    pub fn data(&self) -> Vec<KeyValue> {
        let Some(group) = self.group() else {
            return Vec::new();
        };
        let accessor = self.state.data_accessor.borrow().clone();
        match accessor {
            Some(accessor) => accessor(group.as_ref()),
            None => group.all(),
        }
    }

    /// [`BaseChart::data`] sorted with the ordering comparator.
    #[must_use]
    pub fn ordered_data(&self) -> Vec<KeyValue> {
        let mut data = self.data();
        self.sort_by_ordering(&mut data);
        data
    }

    pub fn sort_by_ordering(&self, data: &mut [KeyValue]) {
        let ordering = self.state.ordering.borrow().clone();
        data.sort_by(|a, b| ordering(a, b));
    }

    pub fn set_ordering(&self, ordering: OrderingComparator) {
        *self.state.ordering.borrow_mut() = ordering;
    }

    pub fn set_key_accessor(&self, accessor: KeyAccessor) {
        *self.state.key_accessor.borrow_mut() = accessor;
    }

    pub fn set_value_accessor(&self, accessor: ValueAccessor) {
        *self.state.value_accessor.borrow_mut() = accessor;
    }

    pub fn set_label_accessor(&self, accessor: LabelAccessor) {
        *self.state.label_accessor.borrow_mut() = accessor;
    }

    #[must_use]
    pub fn key_of(&self, datum: &KeyValue) -> Key {
        let accessor = self.state.key_accessor.borrow().clone();
        accessor(datum)
    }

    #[must_use]
    pub fn value_of(&self, datum: &KeyValue) -> f64 {
        let accessor = self.state.value_accessor.borrow().clone();
        accessor(datum)
    }

    #[must_use]
    pub fn label_of(&self, datum: &KeyValue) -> String {
        let accessor = self.state.label_accessor.borrow().clone();
        accessor(datum)
    }

    // Filters --------------------------------------------------------------

    /// First filter of the set.
    #[must_use]
    pub fn filter(&self) -> Option<Filter> {
        self.state.filters.borrow().first().cloned()
    }

    /// Snapshot of the filter set.
    #[must_use]
    pub fn filters(&self) -> Vec<Filter> {
        self.state.filters.borrow().clone()
    }

    /// With `None`, whether any filter is set; otherwise whether `filter` is
    /// part of the set according to the has-filter handler.
    #[must_use]
    pub fn has_filter(&self, filter: Option<&Filter>) -> bool {
        let filters = self.state.filters.borrow();
        match filter {
            None => !filters.is_empty(),
            Some(filter) => {
                let handler = self.state.has_filter_handler.borrow().clone();
                handler(&filters, filter)
            }
        }
    }

    /// Applies one filter mutation, recompiles the dimension predicate and
    /// fires exactly one `Filtered` event.
    pub fn update_filter(&self, update: impl Into<FilterUpdate>) -> ChartResult<()> {
        self.ensure_not_broadcasting()?;
        let update = update.into();
        let mut next = self.filters();
        match &update {
            FilterUpdate::Reset => next.clear(),
            FilterUpdate::Replace(filter) => next = vec![filter.clone()],
            FilterUpdate::Toggle(filter) => toggle(&mut next, filter),
            FilterUpdate::ToggleBatch(filters) => {
                for filter in filters {
                    toggle(&mut next, filter);
                }
            }
        }
        self.commit_filters(next, update);
        Ok(())
    }

    /// Clears the set and applies `filter` as one transaction.
    pub fn replace_filter(&self, filter: Option<Filter>) -> ChartResult<()> {
        match filter {
            Some(filter) => self.update_filter(FilterUpdate::Replace(filter)),
            None => self.update_filter(FilterUpdate::Reset),
        }
    }

    pub fn filter_all(&self) -> ChartResult<()> {
        self.update_filter(FilterUpdate::Reset)
    }

    fn ensure_not_broadcasting(&self) -> ChartResult<()> {
        if self.state.registry.is_broadcasting() {
            return Err(ChartError::FilterDuringBroadcast {
                anchor: self.anchor_name(),
            });
        }
        Ok(())
    }

    fn commit_filters(&self, filters: Vec<Filter>, update: FilterUpdate) {
        let applied = match self.dimension() {
            Some(dimension) => {
                let handler = self.state.filter_handler.borrow().clone();
                handler(dimension.as_ref(), &filters).unwrap_or(filters)
            }
            None => filters,
        };
        trace!(chart = %self.anchor_name(), filters = applied.len(), "filters applied");
        *self.state.filters.borrow_mut() = applied;
        self.refresh_controls();
        self.state.listeners.fire(&ChartEvent::Filtered(update));
    }

    /// Shows the reset control and filter text while a filter is set.
    fn refresh_controls(&self) {
        let Some(surface) = self.surface() else {
            return;
        };
        let text = self.filter_text();
        surface.borrow_mut().set_controls(text.is_some(), text);
    }

    /// Filter-display text, `None` when unfiltered.
    #[must_use]
    pub fn filter_text(&self) -> Option<String> {
        let filters = self.state.filters.borrow();
        if filters.is_empty() {
            return None;
        }
        let printer = self.state.filter_printer.borrow().clone();
        Some(printer(&filters))
    }

    pub fn set_filter_handler(&self, handler: FilterHandler) {
        *self.state.filter_handler.borrow_mut() = handler;
    }

    pub fn set_has_filter_handler(&self, handler: HasFilterHandler) {
        *self.state.has_filter_handler.borrow_mut() = handler;
    }

    pub fn set_filter_printer(&self, printer: FilterPrinter) {
        *self.state.filter_printer.borrow_mut() = printer;
    }

    /// Selection state of the element drawn for `key`.
    #[must_use]
    pub fn selection_for(&self, key: &Key) -> SelectionState {
        let filters = self.state.filters.borrow();
        if filters.is_empty() {
            SelectionState::Neutral
        } else if filters.iter().any(|filter| filter.is_filtered(key)) {
            SelectionState::Selected
        } else {
            SelectionState::Deselected
        }
    }

    /// Click on a drawn element: toggles `update` and redraws the group.
    pub fn click(&self, update: impl Into<FilterUpdate>) -> ChartResult<()> {
        let update = update.into();
        let chart = self.clone();
        self.trigger_now(Box::new(move || {
            chart.update_filter(update)?;
            chart.redraw_group()
        }))
    }

    // Broadcast ------------------------------------------------------------

    /// Redraws every chart of this chart's group, this one included.
    pub fn redraw_group(&self) -> ChartResult<()> {
        self.state.registry.redraw_all(Some(&self.chart_group()))
    }

    pub fn render_group(&self) -> ChartResult<()> {
        self.state.registry.render_all(Some(&self.chart_group()))
    }

    /// Runs `action` through the coalescer immediately, on this chart's slot.
    pub fn trigger_now(&self, action: DeferredAction) -> ChartResult<()> {
        self.state
            .registry
            .trigger_in(&self.anchor_name(), action, Duration::ZERO)
    }

    /// Coalesces `action` on this chart's group slot.
    pub fn trigger_for_group(&self, action: DeferredAction, delay: Duration) -> ChartResult<()> {
        self.state
            .registry
            .trigger_in(&self.chart_group(), action, delay)
    }

    // Listeners ------------------------------------------------------------

    #[must_use]
    pub fn listeners(&self) -> &ChartListeners {
        &self.state.listeners
    }

    pub fn on(&self, kind: ChartEventKind, listener: impl Fn(&ChartEvent) + 'static) {
        self.state.listeners.on(kind, listener);
    }

    pub fn on_named(
        &self,
        kind: ChartEventKind,
        namespace: &str,
        listener: impl Fn(&ChartEvent) + 'static,
    ) {
        self.state.listeners.on_named(kind, namespace, listener);
    }

    pub fn off(&self, kind: ChartEventKind, namespace: &str) {
        self.state.listeners.off(kind, namespace);
    }

    // Layout and style -----------------------------------------------------

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.state.viewport.get()
    }

    pub fn set_viewport(&self, viewport: Viewport) -> ChartResult<()> {
        self.state.viewport.set(viewport.validate()?);
        Ok(())
    }

    #[must_use]
    pub fn margins(&self) -> Margins {
        self.state.margins.get()
    }

    pub fn set_margins(&self, margins: Margins) -> ChartResult<()> {
        self.state.margins.set(margins.validate()?);
        Ok(())
    }

    #[must_use]
    pub fn effective_width(&self) -> f64 {
        self.margins().inner_width(self.viewport())
    }

    #[must_use]
    pub fn effective_height(&self) -> f64 {
        self.margins().inner_height(self.viewport())
    }

    pub fn set_colors(&self, colors: ColorScale) {
        *self.state.colors.borrow_mut() = colors;
    }

    pub fn color_of(&self, key: &Key) -> Color {
        self.state.colors.borrow_mut().color_of(key)
    }

    pub fn set_legend(&self, legend: Option<Legend>) -> ChartResult<()> {
        let legend = legend.map(Legend::validate).transpose()?;
        self.state.legend.set(legend);
        Ok(())
    }

    #[must_use]
    pub fn legend(&self) -> Option<Legend> {
        self.state.legend.get()
    }

    pub(crate) fn render_legend(&self, items: &[LegendItem]) -> ChartResult<()> {
        let Some(legend) = self.legend() else {
            return Ok(());
        };
        let surface = self.surface_or_err()?;
        let layer = format!("{}-legend", self.anchor_name());
        let frame = legend.build_frame(self.viewport(), items);
        surface.borrow_mut().present(&layer, frame)
    }

    // Lifecycle ------------------------------------------------------------

    #[must_use]
    pub fn has_rendered(&self) -> bool {
        self.state.rendered.get()
    }

    pub(crate) fn mark_rendered(&self) {
        self.state.rendered.set(true);
    }

    #[must_use]
    pub fn transition_duration(&self) -> Duration {
        self.state.transition_duration.get()
    }

    pub fn set_transition_duration(&self, duration: Duration) {
        self.state.transition_duration.set(duration);
    }

    /// Starts a transition; a render also supersedes a pending redraw.
    pub(crate) fn begin_transition(&self, kind: TransitionKind) -> u64 {
        if kind == TransitionKind::Render {
            bump(&self.state.redraw_generation);
        }
        bump(self.state.generation(kind))
    }

    /// Fires the post event now when transitions are instant, otherwise once
    /// the duration elapses on the registry clock. A completion whose
    /// transition was superseded is dropped.
    pub(crate) fn complete_transition(&self, kind: TransitionKind, generation: u64) {
        let duration = self.transition_duration();
        if duration.is_zero() || self.state.registry.transitions_disabled() {
            self.state.listeners.fire(&kind.completion());
            return;
        }

        let state = Rc::downgrade(&self.state);
        self.state.registry.schedule(
            Box::new(move || {
                if let Some(state) = state.upgrade() {
                    if state.generation(kind).get() == generation {
                        state.listeners.fire(&kind.completion());
                    } else {
                        trace!(chart = state.id, ?kind, "dropping stale transition completion");
                    }
                }
                Ok(())
            }),
            duration,
        );
    }
}

fn bump(counter: &Cell<u64>) -> u64 {
    let next = counter.get() + 1;
    counter.set(next);
    next
}

fn toggle(filters: &mut Vec<Filter>, filter: &Filter) {
    match filters.iter().position(|candidate| candidate == filter) {
        Some(index) => {
            filters.remove(index);
        }
        None => filters.push(filter.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::{compile_filters, default_filter_printer};
    use crate::core::{Filter, Key};
    use crate::data::DimensionFilter;

    #[test]
    fn lone_filters_compile_to_engine_native_filters() {
        assert!(matches!(compile_filters(&[]), DimensionFilter::All));
        assert!(matches!(
            compile_filters(&[Filter::single("Tue")]),
            DimensionFilter::Exact(_)
        ));
        assert!(matches!(
            compile_filters(&[Filter::ranged(1, 5)]),
            DimensionFilter::Range(_, _)
        ));
    }

    #[test]
    fn several_filters_compile_to_any_match_predicate() {
        let compiled = compile_filters(&[Filter::single("Mon"), Filter::ranged(10, 20)]);
        assert!(compiled.matches(&Key::text("Mon")));
        assert!(compiled.matches(&Key::number(15.0)));
        assert!(!compiled.matches(&Key::number(20.0)));
        assert!(!compiled.matches(&Key::text("Tue")));
    }

    #[test]
    fn printer_joins_filters() {
        let text = default_filter_printer(&[Filter::single("Mon"), Filter::ranged(1, 2)]);
        assert_eq!(text, "Mon, [1 -> 2]");
    }
}
