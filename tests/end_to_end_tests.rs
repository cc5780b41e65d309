use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crosschart::chart::{AnchorTarget, Chart, Legend};
use crosschart::charts::{CountTemplates, DataCount, PieChart, RowChart};
use crosschart::core::{Filter, Key};
use crosschart::data::MemoryCrossfilter;
use crosschart::render::{RenderFrame, Renderer, SelectionState, Surface, SurfaceHandle};
use crosschart::{ChartRegistry, ChartResult};

#[derive(Debug, Clone)]
struct Visit {
    day: &'static str,
    minutes: f64,
}

fn visits() -> Vec<Visit> {
    [("Mon", 10.0), ("Mon", 5.0), ("Tue", 20.0), ("Tue", 1.0), ("Tue", 4.0), ("Wed", 30.0)]
        .into_iter()
        .map(|(day, minutes)| Visit { day, minutes })
        .collect()
}

struct Dashboard {
    registry: Rc<ChartRegistry>,
    engine: MemoryCrossfilter<Visit>,
    rows: Rc<RowChart>,
    rows_surface: SurfaceHandle,
    count: Rc<DataCount>,
}

fn dashboard() -> Dashboard {
    let registry = Rc::new(ChartRegistry::new());
    registry.set_transitions_disabled(true);
    let engine = MemoryCrossfilter::new(visits());

    let day = engine.dimension(|visit: &Visit| Key::text(visit.day));
    let rows = Rc::new(RowChart::with_registry(Rc::clone(&registry)));
    rows.base().set_group(Rc::new(day.group()), Some("visits"));
    rows.base().set_dimension(Rc::new(day));
    let rows_surface = Surface::headless("days");
    rows.anchor(AnchorTarget::Surface(Rc::clone(&rows_surface)), None)
        .expect("anchor rows");

    let count = Rc::new(DataCount::with_registry(Rc::clone(&registry)));
    count.set_data_size(Rc::new(engine.clone()));
    count.set_group_all(Rc::new(engine.group_all_count()));
    count
        .anchor(AnchorTarget::Surface(Surface::headless("count")), None)
        .expect("anchor count");

    registry.render_all(None).expect("render");
    Dashboard {
        registry,
        engine,
        rows,
        rows_surface,
        count,
    }
}

fn selection(surface: &SurfaceHandle, layer: &str, key: &str) -> Option<SelectionState> {
    surface
        .borrow()
        .layer(layer)
        .and_then(|frame| frame.selection_of(&Key::text(key)))
}

#[test]
fn clicking_a_row_updates_the_count_and_selection() {
    let d = dashboard();
    assert_eq!(d.count.text(), "6 selected out of 6 records");
    assert_eq!(selection(&d.rows_surface, "days", "Tue"), Some(SelectionState::Neutral));

    d.rows.click_row(&Key::text("Tue")).expect("click");

    assert_eq!(d.count.selected(), 3.0);
    assert_eq!(d.count.text(), "3 selected out of 6 records");
    assert_eq!(selection(&d.rows_surface, "days", "Tue"), Some(SelectionState::Selected));
    assert_eq!(selection(&d.rows_surface, "days", "Mon"), Some(SelectionState::Deselected));
    assert_eq!(selection(&d.rows_surface, "days", "Wed"), Some(SelectionState::Deselected));
    assert_eq!(d.rows.entries().len(), 3);

    d.rows.click_row(&Key::text("Tue")).expect("click again");
    assert_eq!(d.count.text(), "6 selected out of 6 records");
    assert_eq!(selection(&d.rows_surface, "days", "Mon"), Some(SelectionState::Neutral));
}

#[test]
fn clicking_others_toggles_every_capped_key() {
    let d = dashboard();
    d.rows.cap().set_cap(Some(1));
    d.rows.redraw().expect("redraw");
    let labels: Vec<Key> = d.rows.entries().iter().map(|entry| entry.key()).collect();
    assert_eq!(labels, vec![Key::text("Tue"), Key::text("Others")]);

    d.rows.click_row(&Key::text("Others")).expect("click others");
    assert_eq!(
        d.rows.base().filters(),
        vec![Filter::single("Mon"), Filter::single("Wed")]
    );
    assert_eq!(d.count.selected(), 3.0);
    assert_eq!(selection(&d.rows_surface, "days", "Others"), Some(SelectionState::Selected));
    assert_eq!(selection(&d.rows_surface, "days", "Tue"), Some(SelectionState::Deselected));
}

#[test]
fn unknown_rows_are_ignored() {
    let d = dashboard();
    d.rows.click_row(&Key::text("Sun")).expect("click");
    assert!(d.rows.base().filters().is_empty());
    assert_eq!(d.registry.pending_actions(), 0);
}

#[test]
fn filters_on_other_dimensions_shrink_the_rows() {
    let d = dashboard();
    let long = d.engine.dimension(|visit: &Visit| Key::number(visit.minutes));
    let pie = Rc::new(PieChart::with_registry(Rc::clone(&d.registry)));
    pie.base().set_group(Rc::new(long.group()), None);
    pie.base().set_dimension(Rc::new(long));
    let pie_surface = Surface::headless("minutes");
    pie.anchor(AnchorTarget::Surface(Rc::clone(&pie_surface)), None)
        .expect("anchor pie");
    pie.render().expect("render pie");

    pie.base()
        .update_filter(Filter::ranged(10.0, 100.0))
        .expect("filter minutes");
    pie.base().redraw_group().expect("redraw");

    let values: Vec<f64> = d.rows.entries().iter().map(|entry| entry.value()).collect();
    assert_eq!(values, vec![1.0, 1.0, 1.0]);
    assert_eq!(d.count.text(), "3 selected out of 6 records");

    let surface = pie_surface.borrow();
    let frame = surface.layer("minutes").expect("pie drawn");
    assert_eq!(frame.arcs.len(), 6);
    assert_eq!(frame.selection_of(&Key::number(20.0)), Some(SelectionState::Selected));
    assert_eq!(frame.selection_of(&Key::number(4.0)), Some(SelectionState::Deselected));
}

#[test]
fn pie_slices_cover_the_full_circle() {
    let d = dashboard();
    let day = d.engine.dimension(|visit: &Visit| Key::text(visit.day));
    let pie = Rc::new(PieChart::with_registry(Rc::clone(&d.registry)));
    pie.base()
        .set_group(Rc::new(day.group_sum(|visit: &Visit| visit.minutes)), None);
    pie.base().set_dimension(Rc::new(day));
    let surface = Surface::headless("share");
    pie.anchor(AnchorTarget::Surface(Rc::clone(&surface)), None)
        .expect("anchor pie");
    pie.render().expect("render");

    let surface = surface.borrow();
    let frame = surface.layer("share").expect("drawn");
    let sweep: f64 = frame
        .arcs
        .iter()
        .map(|arc| arc.end_angle - arc.start_angle)
        .sum();
    approx::assert_relative_eq!(sweep, std::f64::consts::TAU, epsilon = 1e-9);
}

#[test]
fn legend_lists_every_row() {
    let d = dashboard();
    d.rows.base().set_legend(Some(Legend::default())).expect("legend");
    d.rows.render().expect("render");

    let surface = d.rows_surface.borrow();
    let legend = surface.layer("days-legend").expect("legend drawn");
    assert_eq!(legend.rects.len(), 3);
    assert_eq!(legend.texts.len(), 3);
}

#[test]
fn count_templates_are_configurable() {
    let d = dashboard();
    d.count.set_templates(CountTemplates {
        some: "%filter-count of %total-count".to_owned(),
        all: Some("All %total-count records".to_owned()),
    });
    d.count.redraw().expect("redraw");
    assert_eq!(d.count.text(), "All 6 records");

    d.rows.click_row(&Key::text("Wed")).expect("click");
    assert_eq!(d.count.text(), "1 of 6");
}

#[test]
fn transitions_stay_pending_until_the_clock_runs() {
    let d = dashboard();
    d.registry.set_transitions_disabled(false);
    d.rows.base().set_transition_duration(Duration::from_millis(250));

    d.rows.redraw().expect("redraw");
    assert_eq!(d.registry.pending_actions(), 1);
    assert_eq!(d.registry.flush().expect("flush"), 1);
}

/// Backend that records the rect count of every composed frame it receives.
struct RecordingRenderer {
    rects: Rc<RefCell<Vec<usize>>>,
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, frame: &RenderFrame) -> ChartResult<()> {
        frame.validate()?;
        self.rects.borrow_mut().push(frame.rects.len());
        Ok(())
    }
}

#[test]
fn composed_frames_reach_the_backend() {
    let d = dashboard();
    let rects = Rc::new(RefCell::new(Vec::new()));
    let surface = Rc::new(RefCell::new(Surface::new(
        "weekdays",
        Box::new(RecordingRenderer {
            rects: Rc::clone(&rects),
        }),
    )));

    let day = d.engine.dimension(|visit: &Visit| Key::text(visit.day));
    let chart = Rc::new(RowChart::with_registry(Rc::clone(&d.registry)));
    chart.base().set_group(Rc::new(day.group()), None);
    chart.base().set_dimension(Rc::new(day));
    chart
        .anchor(AnchorTarget::Surface(surface), None)
        .expect("anchor");

    chart.render().expect("render");
    assert_eq!(*rects.borrow(), vec![3]);

    chart.base().set_legend(Some(Legend::default())).expect("legend");
    chart.render().expect("render with legend");
    assert_eq!(*rects.borrow(), vec![3, 3, 6]);

    chart.click_row(&Key::text("Mon")).expect("click");
    assert!(rects.borrow().len() > 3);
    assert_eq!(rects.borrow().last(), Some(&6));
}
