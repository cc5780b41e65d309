use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crosschart::chart::{
    AnchorTarget, Chart, ChartEvent, ChartEventKind, CoordinateGridChart, FilterUpdate,
    default_filter_handler,
};
use crosschart::charts::{BarChart, RowChart};
use crosschart::core::{Filter, Key};
use crosschart::data::{Dimension, GroupAll, MemoryCrossfilter, MemoryGroupAll};
use crosschart::render::{Surface, SurfaceHandle};
use crosschart::{ChartError, ChartRegistry};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Sale {
    day: &'static str,
}

fn sales() -> MemoryCrossfilter<Sale> {
    let days = ["Mon", "Mon", "Tue", "Tue", "Tue", "Wed"];
    MemoryCrossfilter::new(days.into_iter().map(|day| Sale { day }).collect())
}

struct Fixture {
    registry: Rc<ChartRegistry>,
    surface: SurfaceHandle,
    chart: Rc<RowChart>,
    selected: MemoryGroupAll<Sale>,
}

fn fixture() -> Fixture {
    let registry = Rc::new(ChartRegistry::new());
    let engine = sales();
    let day = engine.dimension(|sale: &Sale| Key::text(sale.day));
    let by_day = day.group();

    let chart = Rc::new(RowChart::with_registry(Rc::clone(&registry)));
    chart.base().set_dimension(Rc::new(day));
    chart.base().set_group(Rc::new(by_day), Some("sales"));
    chart.base().set_transition_duration(Duration::ZERO);

    let surface = Surface::headless("days");
    chart
        .anchor(AnchorTarget::Surface(Rc::clone(&surface)), None)
        .expect("anchor");
    Fixture {
        registry,
        surface,
        chart,
        selected: engine.group_all_count(),
    }
}

fn record(chart: &RowChart, kind: ChartEventKind) -> Rc<RefCell<Vec<ChartEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    chart
        .base()
        .on(kind, move |event| sink.borrow_mut().push(event.clone()));
    events
}

fn day_filter(index: u8) -> Filter {
    Filter::single(["Mon", "Tue", "Wed", "Thu", "Fri", "Sat"][usize::from(index) % 6])
}

#[test]
fn toggling_filters_recompiles_the_dimension() {
    let f = fixture();
    let base = f.chart.base();
    assert_eq!(f.selected.value(), 6.0);

    base.update_filter(Filter::single("Tue")).expect("filter");
    assert_eq!(f.selected.value(), 3.0);

    base.update_filter(Filter::single("Mon")).expect("filter");
    assert_eq!(f.selected.value(), 5.0);
    assert!(base.has_filter(Some(&Filter::single("Mon"))));
    assert!(!base.has_filter(Some(&Filter::single("Wed"))));

    base.update_filter(Filter::single("Tue")).expect("toggle off");
    assert_eq!(base.filters(), vec![Filter::single("Mon")]);
    assert_eq!(f.selected.value(), 2.0);
}

#[test]
fn filter_all_clears_everything_in_one_event() {
    let f = fixture();
    let base = f.chart.base();
    base.update_filter(vec![Filter::single("Mon"), Filter::single("Tue"), Filter::single("Wed")])
        .expect("filter");
    let events = record(&f.chart, ChartEventKind::Filtered);

    base.filter_all().expect("reset");
    assert!(!base.has_filter(None));
    assert_eq!(f.selected.value(), 6.0);
    assert_eq!(*events.borrow(), vec![ChartEvent::Filtered(FilterUpdate::Reset)]);
}

#[test]
fn batch_toggle_fires_a_single_event() {
    let f = fixture();
    let base = f.chart.base();
    base.update_filter(Filter::single("Mon")).expect("filter");
    let events = record(&f.chart, ChartEventKind::Filtered);

    base.update_filter(vec![Filter::single("Mon"), Filter::single("Tue")])
        .expect("batch");
    assert_eq!(base.filters(), vec![Filter::single("Tue")]);
    assert_eq!(events.borrow().len(), 1);
}

#[test]
fn replace_fires_a_single_event() {
    let f = fixture();
    let base = f.chart.base();
    base.update_filter(vec![Filter::single("Mon"), Filter::single("Wed")])
        .expect("filter");
    let events = record(&f.chart, ChartEventKind::Filtered);

    base.replace_filter(Some(Filter::single("Tue"))).expect("replace");
    assert_eq!(base.filters(), vec![Filter::single("Tue")]);
    assert_eq!(
        *events.borrow(),
        vec![ChartEvent::Filtered(FilterUpdate::Replace(Filter::single("Tue")))]
    );
    assert_eq!(f.selected.value(), 3.0);
}

#[test]
fn reset_control_and_filter_text_follow_the_filter_set() {
    let f = fixture();
    let base = f.chart.base();
    assert!(!f.surface.borrow().reset_visible());

    base.update_filter(Filter::single("Tue")).expect("filter");
    assert!(f.surface.borrow().reset_visible());
    assert_eq!(f.surface.borrow().filter_text(), Some("Tue"));

    base.update_filter(Filter::single("Mon")).expect("filter");
    assert_eq!(f.surface.borrow().filter_text(), Some("Tue, Mon"));

    base.filter_all().expect("reset");
    assert!(!f.surface.borrow().reset_visible());
    assert_eq!(f.surface.borrow().filter_text(), None);
}

#[test]
fn custom_filter_handler_decides_the_applied_set() {
    let f = fixture();
    let base = f.chart.base();
    // Keep only the most recent filter.
    base.set_filter_handler(Rc::new(|dimension: &dyn Dimension, filters: &[Filter]| {
        let last: Vec<Filter> = filters.last().cloned().into_iter().collect();
        default_filter_handler(dimension, &last);
        Some(last)
    }));
    base.set_filter_printer(Rc::new(|filters: &[Filter]| format!("{} selected", filters.len())));

    base.update_filter(Filter::single("Mon")).expect("filter");
    base.update_filter(Filter::single("Wed")).expect("filter");
    assert_eq!(base.filters(), vec![Filter::single("Wed")]);
    assert_eq!(f.selected.value(), 1.0);
    assert_eq!(base.filter_text().as_deref(), Some("1 selected"));
}

#[test]
fn has_filter_handler_can_match_loosely() {
    let f = fixture();
    let base = f.chart.base();
    base.set_has_filter_handler(Rc::new(|filters: &[Filter], filter: &Filter| {
        filters
            .iter()
            .any(|candidate| candidate.to_string().eq_ignore_ascii_case(&filter.to_string()))
    }));
    base.update_filter(Filter::single("Tue")).expect("filter");
    assert!(base.has_filter(Some(&Filter::single("tue"))));
}

#[test]
fn missing_dimension_fails_before_drawing() {
    let registry = Rc::new(ChartRegistry::new());
    let chart = Rc::new(RowChart::with_registry(Rc::clone(&registry)));
    let surface = Surface::headless("bare");
    chart
        .anchor(AnchorTarget::Surface(Rc::clone(&surface)), None)
        .expect("anchor");

    let err = chart.render().expect_err("missing dimension");
    assert_eq!(
        err,
        ChartError::MissingAttribute {
            attribute: "dimension",
            anchor: "bare".to_owned(),
        }
    );
    assert!(surface.borrow().layer("bare").is_none());
    assert!(!chart.base().has_rendered());
}

#[test]
fn grid_chart_requires_an_x_scale() {
    let registry = Rc::new(ChartRegistry::new());
    let engine = sales();
    let day = engine.dimension(|sale: &Sale| Key::text(sale.day));
    let chart = Rc::new(BarChart::with_registry(registry));
    chart.base().set_group(Rc::new(day.group()), None);
    chart.base().set_dimension(Rc::new(day));
    chart
        .anchor(AnchorTarget::Surface(Surface::headless("bars")), None)
        .expect("anchor");

    let err = chart.render().expect_err("missing x");
    assert!(matches!(err, ChartError::MissingAttribute { attribute: "x", .. }));
    assert!(chart.grid().x().is_none());
}

#[test]
fn named_listeners_coexist_and_reregistration_replaces() {
    let f = fixture();
    let base = f.chart.base();
    let calls = Rc::new(RefCell::new(Vec::new()));

    for (namespace, tag) in [("", "first"), ("", "second"), ("audit", "audit")] {
        let calls = Rc::clone(&calls);
        base.on_named(ChartEventKind::Filtered, namespace, move |_| {
            calls.borrow_mut().push(tag);
        });
    }
    base.update_filter(Filter::single("Tue")).expect("filter");
    assert_eq!(*calls.borrow(), vec!["second", "audit"]);

    base.off(ChartEventKind::Filtered, "audit");
    base.filter_all().expect("reset");
    assert_eq!(*calls.borrow(), vec!["second", "audit", "second"]);
}

#[test]
fn click_toggles_and_redraws_the_group() {
    let f = fixture();
    f.chart.render().expect("render");
    let redraws = record(&f.chart, ChartEventKind::PreRedraw);

    f.chart.click_row(&Key::text("Tue")).expect("click");
    assert_eq!(f.chart.base().filters(), vec![Filter::single("Tue")]);
    assert_eq!(redraws.borrow().len(), 1);

    f.chart.click_row(&Key::text("Tue")).expect("click again");
    assert!(f.chart.base().filters().is_empty());
    assert_eq!(redraws.borrow().len(), 2);
    assert_eq!(f.registry.pending_actions(), 0);
}

#[test]
fn post_events_wait_for_the_transition() {
    let f = fixture();
    f.chart.base().set_transition_duration(Duration::from_millis(750));
    let done = record(&f.chart, ChartEventKind::PostRender);

    f.chart.render().expect("render");
    assert!(done.borrow().is_empty());
    f.registry.tick(Duration::from_millis(749)).expect("tick");
    assert!(done.borrow().is_empty());
    f.registry.tick(Duration::from_millis(1)).expect("tick");
    assert_eq!(done.borrow().len(), 1);
}

#[test]
fn superseded_transition_completion_is_dropped() {
    let f = fixture();
    f.chart.base().set_transition_duration(Duration::from_millis(750));
    let done = record(&f.chart, ChartEventKind::PostRender);

    f.chart.render().expect("first render");
    f.registry.tick(Duration::from_millis(100)).expect("tick");
    f.chart.render().expect("second render");

    f.registry.tick(Duration::from_millis(700)).expect("tick");
    assert!(done.borrow().is_empty());
    f.registry.tick(Duration::from_millis(50)).expect("tick");
    assert_eq!(done.borrow().len(), 1);
}

#[test]
fn disabled_transitions_complete_synchronously() {
    let f = fixture();
    f.chart.base().set_transition_duration(Duration::from_millis(750));
    f.registry.set_transitions_disabled(true);
    let done = record(&f.chart, ChartEventKind::PostRedraw);

    f.chart.render().expect("render");
    f.chart.redraw().expect("redraw");
    assert_eq!(done.borrow().len(), 1);
    assert_eq!(f.registry.pending_actions(), 0);
}

#[test]
fn render_fires_pre_and_post_in_order() {
    let f = fixture();
    let events = Rc::new(RefCell::new(Vec::new()));
    for kind in [ChartEventKind::PreRender, ChartEventKind::PostRender] {
        let sink = Rc::clone(&events);
        f.chart.base().on(kind, move |event| sink.borrow_mut().push(event.kind()));
    }
    f.chart.render().expect("render");
    assert_eq!(
        *events.borrow(),
        vec![ChartEventKind::PreRender, ChartEventKind::PostRender]
    );
    assert!(f.chart.base().has_rendered());
}

proptest! {
    #[test]
    fn toggling_twice_restores_the_set(
        initial in prop::collection::vec(0u8..6, 0..6),
        value in 0u8..6,
    ) {
        let f = fixture();
        let base = f.chart.base();
        for index in initial {
            base.update_filter(day_filter(index)).expect("seed");
        }
        let before = base.filters();
        let selected = f.selected.value();

        base.update_filter(day_filter(value)).expect("toggle");
        base.update_filter(day_filter(value)).expect("toggle back");

        let mut after = base.filters();
        let mut expected = before;
        after.sort_by_key(ToString::to_string);
        expected.sort_by_key(ToString::to_string);
        prop_assert_eq!(after, expected);
        prop_assert_eq!(f.selected.value(), selected);
    }

    #[test]
    fn replace_leaves_exactly_one_filter(
        initial in prop::collection::vec(0u8..6, 0..6),
        value in 0u8..6,
    ) {
        let f = fixture();
        let base = f.chart.base();
        for index in initial {
            base.update_filter(day_filter(index)).expect("seed");
        }
        base.replace_filter(Some(day_filter(value))).expect("replace");
        prop_assert_eq!(base.filters(), vec![day_filter(value)]);

        base.replace_filter(None).expect("clear");
        prop_assert!(base.filters().is_empty());
    }
}
