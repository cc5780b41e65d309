use thiserror::Error;

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    #[error("invalid viewport size: width={width}, height={height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Raised by `render()` before any drawing when a required attribute is unset.
    #[error("mandatory attribute chart.{attribute} is missing on chart[#{anchor}]")]
    MissingAttribute {
        attribute: &'static str,
        anchor: String,
    },

    #[error("chart `{chart}` has no drawing surface; call anchor() first")]
    NotAnchored { chart: String },

    #[error("broadcast for chart group `{group}` started while another broadcast is in flight")]
    ReentrantBroadcast { group: String },

    #[error("filter of chart[#{anchor}] changed during an in-flight redraw broadcast")]
    FilterDuringBroadcast { anchor: String },
}
