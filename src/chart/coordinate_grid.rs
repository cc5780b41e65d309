//! Coordinate grid protocol: x/y scales, elastic domains, brush-to-filter
//! translation, zoom and the focus/range chart linkage.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chart::{Chart, ChartEvent, ChartEventKind, MandatoryAttribute, MandatoryAttributes};
use crate::core::{Filter, Key, LinearScale, Padding, XScale, XUnits, ranges_equal};
use crate::error::{ChartError, ChartResult};
use crate::events::EVENT_DELAY;
use crate::registry::DeferredAction;

/// Listener namespace the range chart uses to drive its focus chart.
pub const RANGE_CHART_NAMESPACE: &str = "range-chart";

/// Domain rounding applied to brush extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Rounding {
    /// Nearest multiple of `step`.
    Nearest { step: f64 },
    /// Largest multiple of `step` not above the value.
    Floor { step: f64 },
}

impl Rounding {
    #[must_use]
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Self::Nearest { step } => (value / step).round() * step,
            Self::Floor { step } => (value / step).floor() * step,
        }
    }

    fn validate(self) -> ChartResult<Self> {
        let (Self::Nearest { step } | Self::Floor { step }) = self;
        if !step.is_finite() || step <= 0.0 {
            return Err(ChartError::InvalidData(
                "brush rounding step must be finite and > 0".to_owned(),
            ));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrushBehavior {
    pub enabled: bool,
    pub rounding: Option<Rounding>,
    /// Keeps rounding active even when bars are centered.
    pub always_use_rounding: bool,
}

impl Default for BrushBehavior {
    fn default() -> Self {
        Self {
            enabled: true,
            rounding: None,
            always_use_rounding: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomBehavior {
    pub mouse_zoomable: bool,
    /// Keeps the x domain inside the domain captured when the scale was set.
    pub zoom_out_restrict: bool,
    /// Bounds of the zoom level relative to the original domain width.
    pub min_scale: f64,
    pub max_scale: f64,
}

impl Default for ZoomBehavior {
    fn default() -> Self {
        Self {
            mouse_zoomable: false,
            zoom_out_restrict: true,
            min_scale: 1.0,
            max_scale: f64::INFINITY,
        }
    }
}

impl ZoomBehavior {
    pub fn validate(self) -> ChartResult<Self> {
        if !self.min_scale.is_finite() || self.min_scale <= 0.0 {
            return Err(ChartError::InvalidData(
                "zoom min_scale must be finite and > 0".to_owned(),
            ));
        }
        if self.max_scale.is_nan() || self.max_scale < self.min_scale {
            return Err(ChartError::InvalidData(
                "zoom max_scale must be >= min_scale".to_owned(),
            ));
        }
        Ok(self)
    }
}

/// Which axes recompute their domain from the data on every redraw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ElasticBehavior {
    pub x: bool,
    pub y: bool,
    pub x_padding: Padding,
    pub y_padding: Padding,
}

impl ElasticBehavior {
    pub fn validate(self) -> ChartResult<Self> {
        self.x_padding.validate()?;
        self.y_padding.validate()?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomSource {
    /// Wheel zoom or an explicit domain request on this chart.
    Interaction,
    /// `focus()` on this chart.
    Focus,
    /// The linked range chart's filter moved; nothing is propagated back.
    Linked,
}

/// Shifts `extent` inside `constraint`, preserving its width where the
/// constraint allows. `None` when `extent` already fits.
#[must_use]
pub fn constrain_extent(extent: (f64, f64), constraint: (f64, f64)) -> Option<(f64, f64)> {
    let size = extent.1 - extent.0;
    if extent.0 < constraint.0 {
        Some((constraint.0, constraint.1.min(constraint.0 + size)))
    } else if constraint.1 < extent.1 {
        Some((constraint.0.max(constraint.1 - size), constraint.1))
    } else {
        None
    }
}

/// Overlap of two extents; `None` when they are disjoint.
#[must_use]
pub fn intersect_extents(a: (f64, f64), b: (f64, f64)) -> Option<(f64, f64)> {
    if a.0 > b.1 || b.0 > a.1 {
        return None;
    }
    Some((a.0.max(b.0), a.1.min(b.1)))
}

fn extent_of(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |extent, value| match extent {
        None => Some((value, value)),
        Some((min, max)) => Some((f64::min(min, value), f64::max(max, value))),
    })
}

fn ordered(extent: (f64, f64)) -> (f64, f64) {
    if extent.1 < extent.0 {
        (extent.1, extent.0)
    } else {
        extent
    }
}

/// Scale and interaction state of a coordinate grid chart.
pub struct CoordinateGrid {
    x: RefCell<Option<XScale>>,
    x_original_domain: Cell<Option<(f64, f64)>>,
    y: RefCell<Option<LinearScale>>,
    x_units: Cell<XUnits>,
    unit_count: Cell<Option<usize>>,
    elastic: Cell<ElasticBehavior>,
    brush: Cell<BrushBehavior>,
    zoom: Cell<ZoomBehavior>,
    centered_bars: Cell<bool>,
    band_padding: Cell<f64>,
    refocused: Cell<bool>,
    brush_extent: Cell<Option<(f64, f64)>>,
    rounding_warned: Cell<bool>,
    range_chart: RefCell<Option<Weak<dyn CoordinateGridChart>>>,
    focus_chart: RefCell<Option<Weak<dyn CoordinateGridChart>>>,
}

impl Default for CoordinateGrid {
    fn default() -> Self {
        Self {
            x: RefCell::new(None),
            x_original_domain: Cell::new(None),
            y: RefCell::new(None),
            x_units: Cell::new(XUnits::default()),
            unit_count: Cell::new(None),
            elastic: Cell::new(ElasticBehavior::default()),
            brush: Cell::new(BrushBehavior::default()),
            zoom: Cell::new(ZoomBehavior::default()),
            centered_bars: Cell::new(false),
            band_padding: Cell::new(0.1),
            refocused: Cell::new(false),
            brush_extent: Cell::new(None),
            rounding_warned: Cell::new(false),
            range_chart: RefCell::new(None),
            focus_chart: RefCell::new(None),
        }
    }
}

impl CoordinateGrid {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn x(&self) -> Option<XScale> {
        self.x.borrow().clone()
    }

    /// Assigns the x scale and captures its domain as the zoom-out bound.
    pub fn set_x(&self, scale: XScale) {
        self.x_original_domain.set(scale.continuous_domain());
        *self.x.borrow_mut() = Some(scale);
        self.rescale();
    }

    #[must_use]
    pub fn x_domain(&self) -> Option<(f64, f64)> {
        self.x.borrow().as_ref().and_then(XScale::continuous_domain)
    }

    #[must_use]
    pub fn x_original_domain(&self) -> Option<(f64, f64)> {
        self.x_original_domain.get()
    }

    #[must_use]
    pub fn y(&self) -> Option<LinearScale> {
        *self.y.borrow()
    }

    pub fn set_y(&self, scale: LinearScale) {
        *self.y.borrow_mut() = Some(scale);
        self.rescale();
    }

    #[must_use]
    pub fn x_units(&self) -> XUnits {
        self.x_units.get()
    }

    pub fn set_x_units(&self, units: XUnits) -> ChartResult<()> {
        self.x_units.set(units.validate()?);
        self.rescale();
        Ok(())
    }

    #[must_use]
    pub fn is_ordinal(&self) -> bool {
        self.x_units.get().is_ordinal()
    }

    #[must_use]
    pub fn elastic(&self) -> ElasticBehavior {
        self.elastic.get()
    }

    pub fn set_elastic(&self, elastic: ElasticBehavior) -> ChartResult<()> {
        self.elastic.set(elastic.validate()?);
        Ok(())
    }

    #[must_use]
    pub fn brush(&self) -> BrushBehavior {
        self.brush.get()
    }

    pub fn set_brush(&self, brush: BrushBehavior) -> ChartResult<()> {
        if let Some(rounding) = brush.rounding {
            rounding.validate()?;
        }
        self.brush.set(brush);
        Ok(())
    }

    #[must_use]
    pub fn zoom(&self) -> ZoomBehavior {
        self.zoom.get()
    }

    pub fn set_zoom(&self, zoom: ZoomBehavior) -> ChartResult<()> {
        self.zoom.set(zoom.validate()?);
        Ok(())
    }

    #[must_use]
    pub fn centered_bars(&self) -> bool {
        self.centered_bars.get()
    }

    pub fn set_centered_bars(&self, centered: bool) {
        self.centered_bars.set(centered);
        self.rescale();
    }

    #[must_use]
    pub fn band_padding(&self) -> f64 {
        self.band_padding.get()
    }

    pub fn set_band_padding(&self, padding: f64) -> ChartResult<()> {
        if !padding.is_finite() || !(0.0..1.0).contains(&padding) {
            return Err(ChartError::InvalidData(
                "band padding must be finite and in [0, 1)".to_owned(),
            ));
        }
        self.band_padding.set(padding);
        self.rescale();
        Ok(())
    }

    /// Whether the x domain was moved away from its original domain.
    #[must_use]
    pub fn refocused(&self) -> bool {
        self.refocused.get()
    }

    /// Current brush extent in domain units.
    #[must_use]
    pub fn brush_extent(&self) -> Option<(f64, f64)> {
        self.brush_extent.get()
    }

    #[must_use]
    pub fn range_chart(&self) -> Option<Rc<dyn CoordinateGridChart>> {
        self.range_chart.borrow().as_ref().and_then(Weak::upgrade)
    }

    #[must_use]
    pub fn focus_chart(&self) -> Option<Rc<dyn CoordinateGridChart>> {
        self.focus_chart.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// Invalidates the cached unit count.
    pub fn rescale(&self) {
        self.unit_count.set(None);
    }

    #[must_use]
    pub fn unit_count_cached(&self) -> bool {
        self.unit_count.get().is_some()
    }

    /// Number of x units in the current domain, computed once per
    /// invalidation.
    #[must_use]
    pub fn x_unit_count(&self) -> usize {
        if let Some(count) = self.unit_count.get() {
            return count;
        }
        let count = match self.x.borrow().as_ref() {
            None => 0,
            Some(XScale::Ordinal(scale)) => {
                self.x_units.get().count(0.0, 0.0, scale.domain().len())
            }
            Some(XScale::Continuous { scale, .. }) => {
                let (start, end) = scale.domain();
                self.x_units.get().count(start, end, 0)
            }
        };
        self.unit_count.set(Some(count));
        count
    }

    /// Sets the continuous x domain, invalidating the unit count when it moves.
    pub fn update_x_domain(&self, domain: (f64, f64)) -> ChartResult<()> {
        let mut x = self.x.borrow_mut();
        let Some(XScale::Continuous { scale, .. }) = x.as_mut() else {
            return Ok(());
        };
        if scale.domain() != domain {
            scale.set_domain(domain.0, domain.1)?;
            self.unit_count.set(None);
        }
        Ok(())
    }

    fn update_ordinal_domain(&self, domain: Vec<Key>) {
        let mut x = self.x.borrow_mut();
        match x.as_mut() {
            Some(XScale::Ordinal(scale)) => {
                if scale.domain() != domain.as_slice() {
                    scale.set_domain(domain);
                    self.unit_count.set(None);
                }
            }
            _ => {
                *x = Some(XScale::ordinal(domain));
                self.unit_count.set(None);
            }
        }
    }

    fn update_y_domain(&self, domain: (f64, f64)) -> ChartResult<()> {
        let mut y = self.y.borrow_mut();
        match y.as_mut() {
            Some(scale) => {
                if scale.domain() != domain {
                    scale.set_domain(domain.0, domain.1)?;
                    self.unit_count.set(None);
                }
            }
            None => {
                *y = Some(LinearScale::new(domain.0, domain.1)?);
                self.unit_count.set(None);
            }
        }
        Ok(())
    }

    fn set_pixel_ranges(&self, width: f64, height: f64) {
        let padding = self.band_padding.get();
        match self.x.borrow_mut().as_mut() {
            Some(XScale::Continuous { scale, .. }) => scale.set_range(0.0, width),
            Some(XScale::Ordinal(scale)) => scale.set_range_bands(0.0, width, padding, padding / 2.0),
            None => {}
        }
        if let Some(scale) = self.y.borrow_mut().as_mut() {
            scale.set_range(height, 0.0);
        }
    }

    /// Whether brush extents are rounded; centered bars disable rounding
    /// unless explicitly overridden.
    #[must_use]
    pub fn rounding_applies(&self) -> bool {
        let brush = self.brush.get();
        brush.rounding.is_some() && (!self.centered_bars.get() || brush.always_use_rounding)
    }

    fn warn_rounding_conflict(&self, anchor: &str) {
        let brush = self.brush.get();
        if brush.rounding.is_some()
            && self.centered_bars.get()
            && !brush.always_use_rounding
            && !self.rounding_warned.replace(true)
        {
            warn!(
                chart = anchor,
                "brush rounding is ignored while bars are centered; enable always_use_rounding to force it"
            );
        }
    }

    /// Orders a domain extent and applies the brush rounding.
    #[must_use]
    pub fn extend_brush(&self, extent: (f64, f64)) -> (f64, f64) {
        let extent = ordered(extent);
        match self.brush.get().rounding {
            Some(rounding) if self.rounding_applies() => {
                (rounding.apply(extent.0), rounding.apply(extent.1))
            }
            _ => extent,
        }
    }

    #[must_use]
    pub fn pixels_to_extent(&self, start_px: f64, end_px: f64) -> Option<(f64, f64)> {
        match self.x.borrow().as_ref() {
            Some(XScale::Continuous { scale, .. }) => {
                Some(ordered((scale.invert(start_px), scale.invert(end_px))))
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn extent_to_pixels(&self, extent: (f64, f64)) -> Option<(f64, f64)> {
        match self.x.borrow().as_ref() {
            Some(XScale::Continuous { scale, .. }) => {
                Some((scale.scale(extent.0), scale.scale(extent.1)))
            }
            _ => None,
        }
    }

    /// Ranged filter over a domain extent, keyed like the x axis.
    #[must_use]
    pub fn ranged_filter(&self, extent: (f64, f64)) -> Filter {
        match self.x.borrow().as_ref() {
            Some(scale) => Filter::ranged(scale.key_at(extent.0), scale.key_at(extent.1)),
            None => Filter::ranged(extent.0, extent.1),
        }
    }
}

/// Capability of charts drawn on an x/y grid.
pub trait CoordinateGridChart: Chart {
    fn grid(&self) -> &CoordinateGrid;

    /// `dimension`, `group` and `x`.
    fn grid_attributes(&self) -> MandatoryAttributes {
        let mut attributes = self.base().standard_attributes();
        attributes.push(MandatoryAttribute::new("x", self.grid().x().is_some()));
        attributes
    }

    /// Smallest and largest numeric key in the data, unpadded.
    fn x_data_extent(&self) -> Option<(f64, f64)> {
        let base = self.base();
        extent_of(
            base.data()
                .iter()
                .filter_map(|datum| base.key_of(datum).as_f64()),
        )
    }

    /// Lower bound of the elastic x domain: data minimum minus x padding.
    fn x_axis_min(&self) -> Option<f64> {
        self.padded_x_extent().map(|(min, _)| min)
    }

    /// Upper bound of the elastic x domain: data maximum plus x padding.
    fn x_axis_max(&self) -> Option<f64> {
        self.padded_x_extent().map(|(_, max)| max)
    }

    /// Smallest drawn value, unpadded; y padding is added by `prepare_axes`.
    fn y_axis_min(&self) -> Option<f64> {
        self.y_data_extent().map(|(min, _)| min)
    }

    fn y_axis_max(&self) -> Option<f64> {
        self.y_data_extent().map(|(_, max)| max)
    }

    fn y_data_extent(&self) -> Option<(f64, f64)> {
        let base = self.base();
        extent_of(
            base.data()
                .iter()
                .map(|datum| base.value_of(datum))
                .filter(|value| value.is_finite()),
        )
    }

    fn padded_x_extent(&self) -> Option<(f64, f64)> {
        let grid = self.grid();
        let (min, max) = self.x_data_extent()?;
        let temporal = grid.x.borrow().as_ref().is_some_and(XScale::is_temporal);
        let padding = grid.elastic().x_padding.amount(max - min, temporal);
        Some((min - padding, max + padding))
    }

    /// Distinct keys in the chart's ordering.
    fn ordinal_x_domain(&self) -> Vec<Key> {
        let base = self.base();
        let keys: IndexSet<Key> = base
            .ordered_data()
            .iter()
            .map(|datum| base.key_of(datum))
            .collect();
        keys.into_iter().collect()
    }

    /// Recomputes elastic domains and lays the scales out over the plot area.
    fn prepare_axes(&self) -> ChartResult<()> {
        let grid = self.grid();
        let base = self.base();
        let elastic = grid.elastic();
        grid.warn_rounding_conflict(&base.anchor_name());

        if grid.is_ordinal() {
            let empty = match grid.x.borrow().as_ref() {
                Some(XScale::Ordinal(scale)) => scale.domain().is_empty(),
                _ => true,
            };
            if elastic.x || empty {
                grid.update_ordinal_domain(self.ordinal_x_domain());
            }
        } else if elastic.x {
            if let Some(domain) = self.padded_x_extent() {
                grid.update_x_domain(domain)?;
            }
        }

        if elastic.y || grid.y().is_none() {
            if let (Some(min), Some(max)) = (self.y_axis_min(), self.y_axis_max()) {
                let padding = elastic.y_padding.amount(max - min, false);
                grid.update_y_domain((min - padding, max + padding))?;
            }
        }

        grid.set_pixel_ranges(base.effective_width(), base.effective_height());
        Ok(())
    }

    /// Brush moved to `extent` (domain units, `None` for an empty brush).
    ///
    /// The brush overlay follows immediately; the filter change and group
    /// redraw are coalesced per chart group.
    fn on_brush(&self, extent: Option<(f64, f64)>) -> ChartResult<()> {
        let grid = self.grid();
        let base = self.base();
        if grid.is_ordinal() {
            warn!(chart = %base.anchor_name(), "brushing is not supported on ordinal x axes");
            return Ok(());
        }
        if !grid.brush().enabled {
            debug!(chart = %base.anchor_name(), "brush disabled; ignoring extent");
            return Ok(());
        }

        let extent = extent.map(|extent| grid.extend_brush(extent));
        grid.brush_extent.set(extent);
        base.set_brush_overlay(extent.and_then(|extent| grid.extent_to_pixels(extent)));

        let chart = base.clone();
        let action: DeferredAction = match extent {
            Some((low, high)) if high > low => {
                let filter = grid.ranged_filter((low, high));
                Box::new(move || {
                    chart.replace_filter(Some(filter))?;
                    chart.redraw_group()
                })
            }
            _ => Box::new(move || {
                chart.filter_all()?;
                chart.redraw_group()
            }),
        };
        base.trigger_for_group(action, EVENT_DELAY)
    }

    /// Brush moved between two pixel offsets of the plot area.
    fn on_brush_pixels(&self, start_px: f64, end_px: f64) -> ChartResult<()> {
        let extent = self.grid().pixels_to_extent(start_px, end_px);
        self.on_brush(extent)
    }

    /// Redraws the brush overlay from the current filter.
    fn sync_brush(&self) {
        let grid = self.grid();
        if !grid.brush().enabled || grid.is_ordinal() {
            return;
        }
        let base = self.base();
        let extent = base.filter().as_ref().and_then(Filter::numeric_range);
        grid.brush_extent.set(extent);
        base.set_brush_overlay(extent.and_then(|extent| grid.extent_to_pixels(extent)));
    }

    /// Moves the x domain to `candidate`, filters on it and keeps the range
    /// chart and the group in sync.
    fn apply_zoom(&self, candidate: (f64, f64), source: ZoomSource) -> ChartResult<()> {
        let grid = self.grid();
        let base = self.base();
        if grid.is_ordinal() {
            warn!(chart = %base.anchor_name(), "zoom is not supported on ordinal x axes");
            return Ok(());
        }
        let Some(original) = grid.x_original_domain() else {
            return Err(ChartError::MissingAttribute {
                attribute: "x",
                anchor: base.anchor_name(),
            });
        };

        grid.refocused.set(true);
        let range = grid.range_chart();
        let mut domain = ordered(candidate);
        if grid.zoom().zoom_out_restrict {
            let mut constraint = original;
            if let Some(range_domain) = range.as_ref().and_then(|range| range.grid().x_domain()) {
                constraint = intersect_extents(original, range_domain).unwrap_or_else(|| {
                    warn!(
                        chart = %base.anchor_name(),
                        ?original,
                        ?range_domain,
                        "could not intersect extents; constraining to the original domain"
                    );
                    original
                });
            }
            if let Some(constrained) = constrain_extent(domain, constraint) {
                domain = constrained;
            }
        }

        grid.update_x_domain(domain)?;
        let filter = (domain != original).then(|| grid.ranged_filter(domain));
        base.replace_filter(filter.clone())?;
        grid.rescale();

        let local_redraw = source != ZoomSource::Linked
            || range
                .as_ref()
                .is_none_or(|range| range.base().chart_group() != base.chart_group());
        if local_redraw {
            self.redraw()?;
        }

        if source != ZoomSource::Linked {
            if let Some(range) = range {
                if !ranges_equal(base.filter().as_ref(), range.base().filter().as_ref()) {
                    base.trigger_now(Box::new(move || {
                        range.base().replace_filter(filter)?;
                        range.redraw()
                    }))?;
                }
            }
            base.listeners().fire(&ChartEvent::Zoomed { domain });
            let chart = base.clone();
            base.trigger_for_group(Box::new(move || chart.redraw_group()), EVENT_DELAY)?;
        }

        grid.refocused.set(domain != original);
        Ok(())
    }

    /// Zooms to `range`, or back to the original domain when it is `None`
    /// or empty.
    fn focus(&self, range: Option<(f64, f64)>) -> ChartResult<()> {
        let target = match range {
            Some(range) if range.0 != range.1 => Some(range),
            _ => self.grid().x_original_domain(),
        };
        match target {
            Some(target) => self.apply_zoom(target, ZoomSource::Focus),
            None => Err(ChartError::MissingAttribute {
                attribute: "x",
                anchor: self.base().anchor_name(),
            }),
        }
    }

    /// Wheel zoom by `factor` (> 1 zooms in) around the pixel `anchor_px`,
    /// clamped to the zoom scale extent.
    fn zoom_by(&self, factor: f64, anchor_px: f64) -> ChartResult<()> {
        let grid = self.grid();
        let zoom = grid.zoom();
        if !zoom.mouse_zoomable {
            debug!(chart = %self.base().anchor_name(), "mouse zoom disabled; ignoring wheel");
            return Ok(());
        }
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ChartError::InvalidData(
                "zoom factor must be finite and > 0".to_owned(),
            ));
        }
        let (Some(current), Some(original)) = (grid.x_domain(), grid.x_original_domain()) else {
            return Ok(());
        };
        let current_width = current.1 - current.0;
        let original_width = original.1 - original.0;
        if current_width <= 0.0 || original_width <= 0.0 {
            return Ok(());
        }

        let anchor = grid
            .pixels_to_extent(anchor_px, anchor_px)
            .map_or((current.0 + current.1) / 2.0, |(value, _)| value);
        let level = (original_width / current_width * factor).clamp(zoom.min_scale, zoom.max_scale);
        let width = original_width / level;
        let start = anchor - (anchor - current.0) / current_width * width;
        self.apply_zoom((start, start + width), ZoomSource::Interaction)
    }

    /// Pairs this focus chart with `range`: zooming here moves the range
    /// chart's brush, brushing the range chart refocuses this chart.
    fn set_range_chart<R>(self: &Rc<Self>, range: &Rc<R>)
    where
        Self: Sized + 'static,
        R: CoordinateGridChart + 'static,
    {
        let focus: Rc<dyn CoordinateGridChart> = Rc::<Self>::clone(self);
        let range: Rc<dyn CoordinateGridChart> = Rc::<R>::clone(range);
        *self.grid().range_chart.borrow_mut() = Some(Rc::downgrade(&range));
        link_focus_chart(&range, &focus);
    }
}

fn link_focus_chart(range: &Rc<dyn CoordinateGridChart>, focus: &Rc<dyn CoordinateGridChart>) {
    *range.grid().focus_chart.borrow_mut() = Some(Rc::downgrade(focus));
    let weak_range = Rc::downgrade(range);
    let weak_focus = Rc::downgrade(focus);
    range
        .base()
        .on_named(ChartEventKind::Filtered, RANGE_CHART_NAMESPACE, move |_| {
            let (Some(range), Some(focus)) = (weak_range.upgrade(), weak_focus.upgrade()) else {
                return;
            };
            let trigger = focus.base().clone();
            let result = trigger.trigger_now(Box::new(move || {
                follow_range_filter(range.as_ref(), focus.as_ref())
            }));
            if let Err(err) = result {
                warn!(error = %err, "focus chart failed to follow its range chart");
            }
        });
}

fn follow_range_filter(
    range: &dyn CoordinateGridChart,
    focus: &dyn CoordinateGridChart,
) -> ChartResult<()> {
    let range_filter = range.base().filter();
    let focus_filter = focus.base().filter();
    match range_filter.as_ref().and_then(Filter::numeric_range) {
        None => {
            let Some(original) = focus.grid().x_original_domain() else {
                return Ok(());
            };
            if focus_filter.is_none() && focus.grid().x_domain() == Some(original) {
                return Ok(());
            }
            focus.apply_zoom(original, ZoomSource::Linked)
        }
        Some(extent) => {
            if ranges_equal(range_filter.as_ref(), focus_filter.as_ref()) {
                return Ok(());
            }
            focus.apply_zoom(extent, ZoomSource::Linked)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CoordinateGrid, Rounding, BrushBehavior, constrain_extent, intersect_extents};
    use crate::core::{XScale, XUnits};

    #[test]
    fn undershooting_extent_shifts_up_keeping_width() {
        assert_eq!(constrain_extent((-10.0, 40.0), (0.0, 100.0)), Some((0.0, 50.0)));
    }

    #[test]
    fn overshooting_extent_shifts_down_keeping_width() {
        assert_eq!(constrain_extent((80.0, 120.0), (0.0, 100.0)), Some((60.0, 100.0)));
    }

    #[test]
    fn extent_wider_than_constraint_is_capped() {
        assert_eq!(constrain_extent((-50.0, 150.0), (0.0, 100.0)), Some((0.0, 100.0)));
    }

    #[test]
    fn fitting_extent_is_unconstrained() {
        assert_eq!(constrain_extent((10.0, 20.0), (0.0, 100.0)), None);
    }

    #[test]
    fn disjoint_extents_do_not_intersect() {
        assert_eq!(intersect_extents((0.0, 10.0), (20.0, 30.0)), None);
        assert_eq!(intersect_extents((0.0, 100.0), (20.0, 300.0)), Some((20.0, 100.0)));
    }

    #[test]
    fn unit_count_is_cached_until_rescale() {
        let grid = CoordinateGrid::new();
        grid.set_x(XScale::linear(0.0, 10.0).expect("scale"));
        assert!(!grid.unit_count_cached());
        assert_eq!(grid.x_unit_count(), 10);
        assert!(grid.unit_count_cached());

        grid.update_x_domain((0.0, 20.0)).expect("domain");
        assert!(!grid.unit_count_cached());
        assert_eq!(grid.x_unit_count(), 20);

        grid.set_x_units(XUnits::FixedCount(4)).expect("units");
        assert_eq!(grid.x_unit_count(), 4);
    }

    #[test]
    fn centered_bars_disable_rounding_unless_forced() {
        let grid = CoordinateGrid::new();
        grid.set_brush(BrushBehavior {
            rounding: Some(Rounding::Nearest { step: 1.0 }),
            ..BrushBehavior::default()
        })
        .expect("brush");
        assert_eq!(grid.extend_brush((3.4, 1.6)), (2.0, 3.0));

        grid.set_centered_bars(true);
        assert_eq!(grid.extend_brush((1.6, 3.4)), (1.6, 3.4));

        grid.set_brush(BrushBehavior {
            rounding: Some(Rounding::Nearest { step: 1.0 }),
            always_use_rounding: true,
            ..BrushBehavior::default()
        })
        .expect("brush");
        assert_eq!(grid.extend_brush((1.6, 3.4)), (2.0, 3.0));
    }
}
