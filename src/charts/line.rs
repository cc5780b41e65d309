use std::cell::Cell;
use std::rc::Rc;

use crate::chart::{BaseChart, Chart, CoordinateGrid, CoordinateGridChart, MandatoryAttributes};
use crate::charts::{drawn_values, finite_or_zero};
use crate::core::Key;
use crate::error::{ChartError, ChartResult};
use crate::registry::ChartRegistry;
use crate::render::{LinePrimitive, RectPrimitive, RenderFrame};

pub struct LineChart {
    base: BaseChart,
    grid: CoordinateGrid,
    stroke_width: Cell<f64>,
    dot_size: Cell<Option<f64>>,
}

impl Default for LineChart {
    fn default() -> Self {
        Self::new()
    }
}

impl LineChart {
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(ChartRegistry::global())
    }

    #[must_use]
    pub fn with_registry(registry: Rc<ChartRegistry>) -> Self {
        Self {
            base: BaseChart::with_registry(registry),
            grid: CoordinateGrid::new(),
            stroke_width: Cell::new(1.5),
            dot_size: Cell::new(None),
        }
    }

    pub fn set_stroke_width(&self, width: f64) -> ChartResult<()> {
        if !width.is_finite() || width <= 0.0 {
            return Err(ChartError::InvalidData(
                "line stroke width must be finite and > 0".to_owned(),
            ));
        }
        self.stroke_width.set(width);
        Ok(())
    }

    /// Draws a square marker of `size` pixels on every data point.
    pub fn set_dot_size(&self, size: Option<f64>) -> ChartResult<()> {
        if size.is_some_and(|size| !size.is_finite() || size <= 0.0) {
            return Err(ChartError::InvalidData(
                "dot size must be finite and > 0".to_owned(),
            ));
        }
        self.dot_size.set(size);
        Ok(())
    }

    fn draw(&self) -> ChartResult<()> {
        self.prepare_axes()?;
        let base = &self.base;
        let mut frame = RenderFrame::new(base.viewport());
        let (Some(x), Some(y)) = (self.grid.x(), self.grid.y()) else {
            return base.present(frame);
        };

        let margins = base.margins();
        let color = base.color_of(&Key::text(base.group_label().unwrap_or_default()));
        let points: Vec<_> = base
            .data()
            .into_iter()
            .filter_map(|datum| {
                let key = base.key_of(&datum);
                let px = x.scale_key(&key).filter(|px| px.is_finite())?;
                let py = finite_or_zero(y.scale(finite_or_zero(base.value_of(&datum))));
                Some((key, margins.left + px, margins.top + py))
            })
            .collect();

        for pair in points.windows(2) {
            let ((_, x1, y1), (_, x2, y2)) = (&pair[0], &pair[1]);
            frame = frame.with_line(LinePrimitive::new(
                *x1,
                *y1,
                *x2,
                *y2,
                self.stroke_width.get(),
                color,
            ));
        }
        if let Some(size) = self.dot_size.get() {
            for (key, px, py) in points {
                let selection = base.selection_for(&key);
                frame = frame.with_rect(
                    RectPrimitive::new(px - size / 2.0, py - size / 2.0, size, size, color)
                        .with_key(key, selection),
                );
            }
        }
        base.present(frame)?;
        self.sync_brush();
        Ok(())
    }
}

impl Chart for LineChart {
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

impl CoordinateGridChart for LineChart {
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
