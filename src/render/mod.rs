mod frame;
mod null_renderer;
mod primitives;
mod surface;

pub use frame::RenderFrame;
pub use null_renderer::NullRenderer;
pub use primitives::{
    ArcPrimitive, Color, LinePrimitive, RectPrimitive, SelectionState, TextHAlign, TextPrimitive,
};
pub use surface::{Surface, SurfaceHandle};

use crate::error::ChartResult;

/// Contract implemented by any rendering backend.
///
/// Backends receive a fully materialized `RenderFrame` so drawing code stays
/// isolated from filter coordination and interaction logic.
pub trait Renderer {
    fn render(&mut self, frame: &RenderFrame) -> ChartResult<()>;
}
