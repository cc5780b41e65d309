//! Concrete chart adapters. Each one only maps the shared chart state onto
//! primitives; filtering and redraw orchestration live in [`crate::chart`].

pub mod bar;
pub mod data_count;
pub mod line;
pub mod pie;
pub mod row;

pub use bar::{BarChart, MIN_BAR_WIDTH};
pub use data_count::{CountTemplates, DataCount};
pub use line::LineChart;
pub use pie::PieChart;
pub use row::RowChart;

use crate::chart::BaseChart;
use crate::render::Color;

const LABEL_COLOR: Color = Color::rgb(0.2, 0.2, 0.2);
const LABEL_FONT_PX: f64 = 11.0;

/// Drawn values; non-finite values count as zero.
fn drawn_values(base: &BaseChart) -> Vec<f64> {
    base.data()
        .iter()
        .map(|datum| finite_or_zero(base.value_of(datum)))
        .collect()
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
