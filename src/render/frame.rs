use crate::core::{Key, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::render::{ArcPrimitive, LinePrimitive, RectPrimitive, SelectionState, TextPrimitive};

/// Backend-agnostic scene for one chart draw pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub viewport: Viewport,
    pub lines: Vec<LinePrimitive>,
    pub rects: Vec<RectPrimitive>,
    pub arcs: Vec<ArcPrimitive>,
    pub texts: Vec<TextPrimitive>,
}

impl RenderFrame {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            lines: Vec::new(),
            rects: Vec::new(),
            arcs: Vec::new(),
            texts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_line(mut self, line: LinePrimitive) -> Self {
        self.lines.push(line);
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: TextPrimitive) -> Self {
        self.texts.push(text);
        self
    }

    #[must_use]
    pub fn with_rect(mut self, rect: RectPrimitive) -> Self {
        self.rects.push(rect);
        self
    }

    /// Appends every primitive of `other`.
    pub fn extend(&mut self, other: &RenderFrame) {
        self.lines.extend_from_slice(&other.lines);
        self.rects.extend(other.rects.iter().cloned());
        self.arcs.extend(other.arcs.iter().cloned());
        self.texts.extend(other.texts.iter().cloned());
    }

    pub fn validate(&self) -> ChartResult<()> {
        if !self.viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: self.viewport.width,
                height: self.viewport.height,
            });
        }

        for line in &self.lines {
            line.validate()?;
        }
        for rect in &self.rects {
            rect.validate()?;
        }
        for arc in &self.arcs {
            arc.validate()?;
        }
        for text in &self.texts {
            text.validate()?;
        }

        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.rects.is_empty() && self.arcs.is_empty() && self.texts.is_empty()
    }

    /// Selection state of the first keyed element drawn for `key`.
    #[must_use]
    pub fn selection_of(&self, key: &Key) -> Option<SelectionState> {
        self.rects
            .iter()
            .filter_map(|rect| rect.key.as_ref().map(|k| (k, rect.selection)))
            .chain(self.arcs.iter().map(|arc| (&arc.key, arc.selection)))
            .find(|(candidate, _)| *candidate == key)
            .map(|(_, selection)| selection)
    }
}
