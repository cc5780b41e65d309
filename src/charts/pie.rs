use std::cell::Cell;
use std::f64::consts::TAU;
use std::rc::Rc;

use tracing::debug;

use crate::chart::{BaseChart, CapEntry, CapMixin, Chart, LegendItem};
use crate::charts::finite_or_zero;
use crate::core::Key;
use crate::error::{ChartError, ChartResult};
use crate::registry::ChartRegistry;
use crate::render::{ArcPrimitive, RenderFrame};

pub struct PieChart {
    base: BaseChart,
    cap: CapMixin,
    radius: Cell<Option<f64>>,
    inner_radius: Cell<f64>,
}

impl Default for PieChart {
    fn default() -> Self {
        Self::new()
    }
}

impl PieChart {
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(ChartRegistry::global())
    }

    #[must_use]
    pub fn with_registry(registry: Rc<ChartRegistry>) -> Self {
        Self {
            base: BaseChart::with_registry(registry),
            cap: CapMixin::default(),
            radius: Cell::new(None),
            inner_radius: Cell::new(0.0),
        }
    }

    #[must_use]
    pub fn cap(&self) -> &CapMixin {
        &self.cap
    }

    /// Outer radius; defaults to half the smaller viewport side.
    pub fn set_radius(&self, radius: Option<f64>) -> ChartResult<()> {
        if radius.is_some_and(|radius| !radius.is_finite() || radius <= 0.0) {
            return Err(ChartError::InvalidData(
                "pie radius must be finite and > 0".to_owned(),
            ));
        }
        self.radius.set(radius);
        Ok(())
    }

    /// Non-zero inner radius turns the pie into a donut.
    pub fn set_inner_radius(&self, inner_radius: f64) -> ChartResult<()> {
        if !inner_radius.is_finite() || inner_radius < 0.0 {
            return Err(ChartError::InvalidData(
                "pie inner radius must be finite and >= 0".to_owned(),
            ));
        }
        self.inner_radius.set(inner_radius);
        Ok(())
    }

    #[must_use]
    pub fn entries(&self) -> Vec<CapEntry> {
        self.cap.entries(&self.base)
    }

    /// Click on the slice drawn for `key`.
    pub fn click_slice(&self, key: &Key) -> ChartResult<()> {
        match self.entries().into_iter().find(|entry| entry.key() == *key) {
            Some(entry) => self.base.click(entry.click_update()),
            None => {
                debug!(chart = %self.base.anchor_name(), %key, "click on unknown slice ignored");
                Ok(())
            }
        }
    }

    fn draw(&self) -> ChartResult<()> {
        let base = &self.base;
        let viewport = base.viewport();
        let width = f64::from(viewport.width);
        let height = f64::from(viewport.height);
        let radius = self.radius.get().unwrap_or(width.min(height) / 2.0);
        let inner_radius = self.inner_radius.get().min(radius);

        let entries = self.entries();
        let total: f64 = entries
            .iter()
            .map(|entry| finite_or_zero(entry.value()).max(0.0))
            .sum();

        let mut frame = RenderFrame::new(viewport);
        if total > 0.0 {
            let mut start_angle = 0.0;
            for entry in &entries {
                let value = finite_or_zero(entry.value()).max(0.0);
                let end_angle = start_angle + value / total * TAU;
                let key = entry.key();
                frame.arcs.push(ArcPrimitive {
                    center_x: width / 2.0,
                    center_y: height / 2.0,
                    inner_radius,
                    outer_radius: radius,
                    start_angle,
                    end_angle,
                    fill: base.color_of(&key),
                    selection: entry.selection(base),
                    key,
                });
                start_angle = end_angle;
            }
        }
        base.present(frame)
    }
}

impl Chart for PieChart {
    fn base(&self) -> &BaseChart {
        &self.base
    }

    fn do_render(&self) -> ChartResult<()> {
        self.draw()
    }

    fn do_redraw(&self) -> ChartResult<()> {
        self.draw()
    }

    fn legendables(&self) -> Vec<LegendItem> {
        self.entries()
            .into_iter()
            .map(|entry| {
                let key = entry.key();
                LegendItem {
                    name: key.to_string(),
                    color: self.base.color_of(&key),
                    key,
                }
            })
            .collect()
    }
}
