use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::debug;

use crate::chart::{BaseChart, CapEntry, CapMixin, Chart, LegendItem};
use crate::charts::{LABEL_COLOR, LABEL_FONT_PX, finite_or_zero};
use crate::core::{Key, LinearScale};
use crate::error::ChartResult;
use crate::registry::ChartRegistry;
use crate::render::{RectPrimitive, RenderFrame, TextHAlign, TextPrimitive};

const DEFAULT_GAP: f64 = 5.0;
const LABEL_OFFSET_X: f64 = 10.0;

/// Horizontal bars, one per (capped) category.
pub struct RowChart {
    base: BaseChart,
    cap: CapMixin,
    x: RefCell<Option<LinearScale>>,
    elastic_x: Cell<bool>,
    gap: Cell<f64>,
}

impl Default for RowChart {
    fn default() -> Self {
        Self::new()
    }
}

impl RowChart {
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(ChartRegistry::global())
    }

    #[must_use]
    pub fn with_registry(registry: Rc<ChartRegistry>) -> Self {
        Self {
            base: BaseChart::with_registry(registry),
            cap: CapMixin::default(),
            x: RefCell::new(None),
            elastic_x: Cell::new(false),
            gap: Cell::new(DEFAULT_GAP),
        }
    }

    #[must_use]
    pub fn cap(&self) -> &CapMixin {
        &self.cap
    }

    #[must_use]
    pub fn x(&self) -> Option<LinearScale> {
        *self.x.borrow()
    }

    pub fn set_x(&self, scale: LinearScale) {
        *self.x.borrow_mut() = Some(scale);
    }

    /// Refits the value axis to the data on every redraw.
    pub fn set_elastic_x(&self, elastic: bool) {
        self.elastic_x.set(elastic);
    }

    /// Entries as currently drawn.
    #[must_use]
    pub fn entries(&self) -> Vec<CapEntry> {
        self.cap.entries(&self.base)
    }

    /// Click on the row drawn for `key`.
    pub fn click_row(&self, key: &Key) -> ChartResult<()> {
        match self.entries().into_iter().find(|entry| entry.key() == *key) {
            Some(entry) => self.base.click(entry.click_update()),
            None => {
                debug!(chart = %self.base.anchor_name(), %key, "click on unknown row ignored");
                Ok(())
            }
        }
    }

    fn value_scale(&self, entries: &[CapEntry]) -> ChartResult<LinearScale> {
        let mut x = self.x.borrow_mut();
        let mut scale = match *x {
            Some(scale) if !self.elastic_x.get() => scale,
            _ => {
                let values = entries.iter().map(|entry| finite_or_zero(entry.value()));
                let low = values.clone().fold(0.0, f64::min);
                let high = values.fold(0.0, f64::max);
                LinearScale::new(low, high)?
            }
        };
        scale.set_range(0.0, self.base.effective_width());
        *x = Some(scale);
        Ok(scale)
    }

    fn draw(&self) -> ChartResult<()> {
        let base = &self.base;
        let entries = self.entries();
        let scale = self.value_scale(&entries)?;
        let margins = base.margins();
        let gap = self.gap.get();
        let count = entries.len() as f64;
        let height = ((base.effective_height() - (count + 1.0) * gap) / count).max(0.0);
        let zero = scale.scale(0.0);

        let mut frame = RenderFrame::new(base.viewport());
        for (index, entry) in entries.iter().enumerate() {
            let key = entry.key();
            let end = finite_or_zero(scale.scale(finite_or_zero(entry.value())));
            let top = margins.top + gap + index as f64 * (height + gap);
            frame = frame.with_rect(
                RectPrimitive::new(
                    margins.left + zero.min(end),
                    top,
                    (end - zero).abs(),
                    height,
                    base.color_of(&key),
                )
                .with_key(key, entry.selection(base)),
            );

            let label = match entry {
                CapEntry::Row(datum) => base.label_of(datum),
                CapEntry::Others { label, .. } => label.clone(),
            };
            if !label.is_empty() && height > 0.0 {
                frame = frame.with_text(TextPrimitive::new(
                    label,
                    margins.left + LABEL_OFFSET_X,
                    top + height / 2.0,
                    LABEL_FONT_PX,
                    LABEL_COLOR,
                    TextHAlign::Left,
                ));
            }
        }
        base.present(frame)
    }
}

impl Chart for RowChart {
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
