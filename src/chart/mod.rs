//! Chart contract shared by every concrete chart.
//!
//! A concrete chart is a struct that owns a [`BaseChart`] handle (plus any
//! capability state such as a [`CoordinateGrid`] or a [`CapMixin`]) and
//! implements [`Chart`]. The provided `render`/`redraw` methods run the
//! lifecycle around the chart's own `do_render`/`do_redraw`.

pub mod base;
pub mod cap;
pub mod color;
pub mod coordinate_grid;
pub mod legend;
pub mod listeners;

use std::rc::Rc;

use smallvec::SmallVec;
use tracing::debug;

use crate::core::Filter;
use crate::error::{ChartError, ChartResult};
use crate::registry::ChartHandle;
use crate::render::SurfaceHandle;

pub use base::{
    BaseChart, DataAccessor, FilterHandler, FilterPrinter, HasFilterHandler, KeyAccessor,
    LabelAccessor, OrderingComparator, TransitionKind, ValueAccessor, compile_filters,
    default_filter_handler, default_filter_printer,
};
pub use cap::{CapEntry, CapMixin};
pub use color::{CATEGORY10, ColorScale};
pub use coordinate_grid::{
    BrushBehavior, CoordinateGrid, CoordinateGridChart, ElasticBehavior, Rounding, ZoomBehavior,
    ZoomSource, constrain_extent, intersect_extents,
};
pub use legend::{Legend, LegendItem};
pub use listeners::{ChartEvent, ChartEventKind, ChartListeners, DEFAULT_NAMESPACE, Listener};

/// Where a chart is anchored.
#[derive(Clone)]
pub enum AnchorTarget {
    /// A drawing surface of its own; the chart joins a chart group.
    Surface(SurfaceHandle),
    /// Another chart's surface; the chart is not registered in any group.
    Chart(ChartHandle),
}

/// Attribute that must be configured before a chart can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MandatoryAttribute {
    pub name: &'static str,
    pub is_set: bool,
}

impl MandatoryAttribute {
    #[must_use]
    pub const fn new(name: &'static str, is_set: bool) -> Self {
        Self { name, is_set }
    }
}

pub type MandatoryAttributes = SmallVec<[MandatoryAttribute; 4]>;

/// Mutation applied to a chart's filter set.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterUpdate {
    /// Removes the filter when present, adds it otherwise.
    Toggle(Filter),
    /// Toggles every filter in one transaction.
    ToggleBatch(Vec<Filter>),
    /// Replaces the whole set with one filter.
    Replace(Filter),
    /// Clears the set.
    Reset,
}

impl From<Filter> for FilterUpdate {
    fn from(filter: Filter) -> Self {
        Self::Toggle(filter)
    }
}

impl From<Option<Filter>> for FilterUpdate {
    fn from(filter: Option<Filter>) -> Self {
        match filter {
            Some(filter) => Self::Toggle(filter),
            None => Self::Reset,
        }
    }
}

impl From<Vec<Filter>> for FilterUpdate {
    fn from(filters: Vec<Filter>) -> Self {
        Self::ToggleBatch(filters)
    }
}

pub trait Chart {
    fn base(&self) -> &BaseChart;

    /// Draws the chart from scratch.
    fn do_render(&self) -> ChartResult<()>;

    /// Redraws from the current data-engine state; must not broadcast.
    fn do_redraw(&self) -> ChartResult<()>;

    fn mandatory_attributes(&self) -> MandatoryAttributes {
        self.base().standard_attributes()
    }

    fn legendables(&self) -> Vec<LegendItem> {
        Vec::new()
    }

    /// Validates configuration, then draws. A missing attribute fails
    /// before anything is drawn.
    fn render(&self) -> ChartResult<()> {
        let base = self.base();
        base.surface_or_err()?;
        debug!(chart = %base.anchor_name(), "render");
        base.listeners().fire(&ChartEvent::PreRender);

        if let Some(missing) = self
            .mandatory_attributes()
            .iter()
            .find(|attribute| !attribute.is_set)
        {
            return Err(ChartError::MissingAttribute {
                attribute: missing.name,
                anchor: base.anchor_name(),
            });
        }

        let generation = base.begin_transition(TransitionKind::Render);
        self.do_render()?;
        base.mark_rendered();
        base.render_legend(&self.legendables())?;
        base.complete_transition(TransitionKind::Render, generation);
        Ok(())
    }

    fn redraw(&self) -> ChartResult<()> {
        let base = self.base();
        base.surface_or_err()?;
        debug!(chart = %base.anchor_name(), "redraw");
        base.listeners().fire(&ChartEvent::PreRedraw);

        let generation = base.begin_transition(TransitionKind::Redraw);
        self.do_redraw()?;
        base.complete_transition(TransitionKind::Redraw, generation);
        Ok(())
    }

    /// Anchors the chart, joining `group` (or the default group) unless the
    /// target is another chart. Re-anchoring leaves the previous group only
    /// once the new target is known to be usable; on error the chart keeps
    /// its current anchor and membership.
    ///
    /// The registry keeps a strong handle to every registered chart, so an
    /// anchored chart lives until it is deregistered or its group is cleared.
    fn anchor(self: &Rc<Self>, target: AnchorTarget, group: Option<&str>) -> ChartResult<()>
    where
        Self: Sized + 'static,
    {
        let handle: ChartHandle = Rc::<Self>::clone(self);
        self.base().attach(handle, target, group)
    }
}
