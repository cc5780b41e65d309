//! crosschart: filter-linked, coordinated charts.
//!
//! Charts bind to dimensions and groups of a crossfilter-style data engine.
//! Filtering one chart recompiles its dimension predicate and redraws every
//! chart in its group through the [`ChartRegistry`]; coordinate grid charts add
//! brushing, zoom and focus/range linkage on top of that cycle.

pub mod chart;
pub mod charts;
pub mod core;
pub mod data;
pub mod error;
pub mod events;
pub mod registry;
pub mod render;
pub mod telemetry;

pub use chart::{AnchorTarget, BaseChart, Chart, CoordinateGridChart, FilterUpdate};
pub use error::{ChartError, ChartResult};
pub use events::{EVENT_DELAY, EventCoalescer};
pub use registry::{ChartRegistry, DEFAULT_CHART_GROUP};
