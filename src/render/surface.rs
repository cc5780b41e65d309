use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::core::Viewport;
use crate::error::ChartResult;
use crate::render::{NullRenderer, RenderFrame, Renderer};

pub type SurfaceHandle = Rc<RefCell<Surface>>;

/// Drawing surface a chart is anchored to.
///
/// Several charts may share one surface (a sub-chart draws into its parent's
/// surface); each draws into its own named layer and the surface hands the
/// composed frame to its renderer.
pub struct Surface {
    id: String,
    renderer: Box<dyn Renderer>,
    layers: IndexMap<String, RenderFrame>,
    brush_overlays: IndexMap<String, (f64, f64)>,
    reset_visible: bool,
    filter_text: Option<String>,
}

impl Surface {
    #[must_use]
    pub fn new(id: impl Into<String>, renderer: Box<dyn Renderer>) -> Self {
        Self {
            id: id.into(),
            renderer,
            layers: IndexMap::new(),
            brush_overlays: IndexMap::new(),
            reset_visible: false,
            filter_text: None,
        }
    }

    /// Surface backed by a [`NullRenderer`].
    #[must_use]
    pub fn headless(id: impl Into<String>) -> SurfaceHandle {
        Rc::new(RefCell::new(Self::new(id, Box::new(NullRenderer))))
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Replaces `layer` and renders every layer composed in insertion order.
    pub fn present(&mut self, layer: &str, frame: RenderFrame) -> ChartResult<()> {
        let viewport = frame.viewport;
        self.layers.insert(layer.to_owned(), frame);
        let composed = self.compose(viewport);
        self.renderer.render(&composed)
    }

    fn compose(&self, viewport: Viewport) -> RenderFrame {
        let mut composed = RenderFrame::new(viewport);
        for frame in self.layers.values() {
            composed.extend(frame);
        }
        composed
    }

    #[must_use]
    pub fn layer(&self, layer: &str) -> Option<&RenderFrame> {
        self.layers.get(layer)
    }

    /// Pixel extent of the brush drawn over `layer`, `None` hides it.
    pub fn set_brush_overlay(&mut self, layer: &str, extent: Option<(f64, f64)>) {
        match extent {
            Some(extent) => {
                self.brush_overlays.insert(layer.to_owned(), extent);
            }
            None => {
                self.brush_overlays.shift_remove(layer);
            }
        }
    }

    #[must_use]
    pub fn brush_overlay(&self, layer: &str) -> Option<(f64, f64)> {
        self.brush_overlays.get(layer).copied()
    }

    pub fn set_controls(&mut self, reset_visible: bool, filter_text: Option<String>) {
        self.reset_visible = reset_visible;
        self.filter_text = filter_text;
    }

    #[must_use]
    pub fn reset_visible(&self) -> bool {
        self.reset_visible
    }

    #[must_use]
    pub fn filter_text(&self) -> Option<&str> {
        self.filter_text.as_deref()
    }
}
