pub mod filters;
pub mod key;
pub mod scale;
pub mod types;
pub mod units;

pub use filters::{
    Filter, RangedFilter, RangedTwoDimensionalBounds, RangedTwoDimensionalFilter,
    TwoDimensionalFilter, ranges_equal,
};
pub use key::Key;
pub use scale::{ContinuousKind, LinearScale, OrdinalScale, XScale};
pub use types::{Margins, Viewport};
pub use units::{MILLIS_PER_DAY, NEGLIGIBLE_NUMBER, Padding, XUnits};
