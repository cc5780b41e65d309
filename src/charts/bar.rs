use std::cell::Cell;
use std::rc::Rc;

use crate::chart::{BaseChart, Chart, CoordinateGrid, CoordinateGridChart, MandatoryAttributes};
use crate::charts::{drawn_values, finite_or_zero};
use crate::core::XScale;
use crate::error::{ChartError, ChartResult};
use crate::registry::ChartRegistry;
use crate::render::{RectPrimitive, RenderFrame};

/// Width used when the computed bar width is degenerate.
pub const MIN_BAR_WIDTH: f64 = 1.0;

const DEFAULT_GAP: f64 = 2.0;

pub struct BarChart {
    base: BaseChart,
    grid: CoordinateGrid,
    gap: Cell<f64>,
}

impl Default for BarChart {
    fn default() -> Self {
        Self::new()
    }
}

impl BarChart {
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(ChartRegistry::global())
    }

    #[must_use]
    pub fn with_registry(registry: Rc<ChartRegistry>) -> Self {
        Self {
            base: BaseChart::with_registry(registry),
            grid: CoordinateGrid::new(),
            gap: Cell::new(DEFAULT_GAP),
        }
    }

    /// Pixels between adjacent bars on a continuous axis.
    pub fn set_gap(&self, gap: f64) -> ChartResult<()> {
        if !gap.is_finite() || gap < 0.0 {
            return Err(ChartError::InvalidData(
                "bar gap must be finite and >= 0".to_owned(),
            ));
        }
        self.gap.set(gap);
        self.grid.rescale();
        Ok(())
    }

    /// Bar width in pixels; falls back to [`MIN_BAR_WIDTH`] when the layout
    /// leaves no usable width.
    #[must_use]
    pub fn bar_width(&self) -> f64 {
        let width = match self.grid.x() {
            Some(XScale::Ordinal(scale)) => scale.band_width(),
            Some(XScale::Continuous { .. }) => {
                let units = self.grid.x_unit_count() as f64;
                (self.base.effective_width() / units - self.gap.get()).floor()
            }
            None => MIN_BAR_WIDTH,
        };
        if width.is_finite() && width >= MIN_BAR_WIDTH {
            width
        } else {
            MIN_BAR_WIDTH
        }
    }

    fn draw(&self) -> ChartResult<()> {
        self.prepare_axes()?;
        let base = &self.base;
        let mut frame = RenderFrame::new(base.viewport());
        let (Some(x), Some(y)) = (self.grid.x(), self.grid.y()) else {
            return base.present(frame);
        };

        let margins = base.margins();
        let width = self.bar_width();
        let offset = if self.grid.centered_bars() { width / 2.0 } else { 0.0 };
        let baseline = y.scale(0.0).clamp(0.0, base.effective_height());
        for datum in base.data() {
            let key = base.key_of(&datum);
            let Some(left) = x.scale_key(&key).filter(|left| left.is_finite()) else {
                continue;
            };
            let top = finite_or_zero(y.scale(finite_or_zero(base.value_of(&datum))));
            let selection = base.selection_for(&key);
            let rect = RectPrimitive::new(
                margins.left + left - offset,
                margins.top + top.min(baseline),
                width,
                (baseline - top).abs(),
                base.color_of(&key),
            )
            .with_key(key, selection);
            frame = frame.with_rect(rect);
        }
        base.present(frame)?;
        self.sync_brush();
        Ok(())
    }
}

impl Chart for BarChart {
    fn base(&self) -> &BaseChart {
        &self.base
    }

    fn mandatory_attributes(&self) -> MandatoryAttributes {
        self.grid_attributes()
    }

    fn do_render(&self) -> ChartResult<()> {
        self.draw()
    }

    fn do_redraw(&self) -> ChartResult<()> {
        self.draw()
    }
}

impl CoordinateGridChart for BarChart {
    fn grid(&self) -> &CoordinateGrid {
        &self.grid
    }

    fn y_axis_min(&self) -> Option<f64> {
        Some(drawn_values(&self.base).into_iter().fold(0.0, f64::min))
    }

    fn y_axis_max(&self) -> Option<f64> {
        Some(drawn_values(&self.base).into_iter().fold(0.0, f64::max))
    }
}
