use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

pub const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Differences below this are treated as rounding noise.
pub const NEGLIGIBLE_NUMBER: f64 = 1e-10;

/// How a coordinate grid counts the units plotted along x.
///
/// Every scale-dependent operation (band layout, domain computation, brush
/// rounding) dispatches on this value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum XUnits {
    /// Categorical keys; one unit per distinct key in the domain.
    Ordinal,
    /// Continuous keys stepped at `resolution` (1.0 = integers).
    Quantitative { resolution: f64 },
    /// A fixed number of units regardless of the domain.
    FixedCount(usize),
}

impl Default for XUnits {
    fn default() -> Self {
        Self::INTEGERS
    }
}

impl XUnits {
    pub const INTEGERS: Self = Self::Quantitative { resolution: 1.0 };

    /// Day-sized units for date domains expressed in epoch milliseconds.
    #[must_use]
    pub const fn days() -> Self {
        Self::Quantitative {
            resolution: MILLIS_PER_DAY,
        }
    }

    #[must_use]
    pub fn is_ordinal(self) -> bool {
        matches!(self, Self::Ordinal)
    }

    pub fn validate(self) -> ChartResult<Self> {
        if let Self::Quantitative { resolution } = self {
            if !resolution.is_finite() || resolution <= 0.0 {
                return Err(ChartError::InvalidData(
                    "x-units resolution must be finite and > 0".to_owned(),
                ));
            }
        }
        Ok(self)
    }

    /// Number of units between `start` and `end`.
    ///
    /// `ordinal_len` is the size of the ordinal domain and only used by
    /// [`XUnits::Ordinal`].
    #[must_use]
    pub fn count(self, start: f64, end: f64, ordinal_len: usize) -> usize {
        match self {
            Self::Ordinal => ordinal_len,
            Self::FixedCount(count) => count,
            Self::Quantitative { resolution } => {
                let steps = ((end - start) / resolution).abs();
                if !steps.is_finite() {
                    return 0;
                }
                if (steps - steps.floor()).abs() < NEGLIGIBLE_NUMBER {
                    steps.floor() as usize
                } else {
                    steps.ceil() as usize
                }
            }
        }
    }
}

/// Padding applied around an elastic domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Padding {
    /// Absolute domain units; for date axes the unit is one day.
    Absolute(f64),
    /// Percentage of the data range.
    Percent(f64),
}

impl Default for Padding {
    fn default() -> Self {
        Self::Absolute(0.0)
    }
}

impl Padding {
    pub fn validate(self) -> ChartResult<Self> {
        let value = match self {
            Self::Absolute(value) | Self::Percent(value) => value,
        };
        if !value.is_finite() || value < 0.0 {
            return Err(ChartError::InvalidData(
                "axis padding must be finite and >= 0".to_owned(),
            ));
        }
        Ok(self)
    }

    /// Padding in domain units for a data range spanning `span`.
    #[must_use]
    pub fn amount(self, span: f64, temporal: bool) -> f64 {
        match self {
            Self::Absolute(value) if temporal => value * MILLIS_PER_DAY,
            Self::Absolute(value) => value,
            Self::Percent(percent) => span.abs() * percent / 100.0,
        }
    }
}
