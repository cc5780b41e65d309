use serde::{Deserialize, Serialize};

use crate::core::{Key, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::render::{Color, RectPrimitive, RenderFrame, TextHAlign, TextPrimitive};

/// One legend row contributed by a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendItem {
    pub name: String,
    pub color: Color,
    pub key: Key,
}

/// Placement of a legend block inside the chart surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    pub x: f64,
    pub y: f64,
    pub item_height: f64,
    pub gap: f64,
    pub font_size_px: f64,
}

impl Default for Legend {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            item_height: 12.0,
            gap: 5.0,
            font_size_px: 11.0,
        }
    }
}

impl Legend {
    pub fn validate(self) -> ChartResult<Self> {
        for (name, value) in [
            ("x", self.x),
            ("y", self.y),
            ("item_height", self.item_height),
            ("gap", self.gap),
            ("font_size_px", self.font_size_px),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ChartError::InvalidData(format!(
                    "legend `{name}` must be finite and >= 0"
                )));
            }
        }
        if self.item_height <= 0.0 || self.font_size_px <= 0.0 {
            return Err(ChartError::InvalidData(
                "legend item height and font size must be > 0".to_owned(),
            ));
        }
        Ok(self)
    }

    /// Stacks one swatch plus label per item, top to bottom.
    #[must_use]
    pub fn build_frame(&self, viewport: Viewport, items: &[LegendItem]) -> RenderFrame {
        let label_color = Color::rgb(0.2, 0.2, 0.2);
        let mut frame = RenderFrame::new(viewport);
        for (index, item) in items.iter().enumerate() {
            let top = self.y + index as f64 * (self.item_height + self.gap);
            frame = frame.with_rect(RectPrimitive::new(
                self.x,
                top,
                self.item_height,
                self.item_height,
                item.color,
            ));
            if !item.name.is_empty() {
                frame = frame.with_text(TextPrimitive::new(
                    item.name.clone(),
                    self.x + self.item_height + self.gap,
                    top + self.item_height,
                    self.font_size_px,
                    label_color,
                    TextHAlign::Left,
                ));
            }
        }
        frame
    }
}
