use serde::{Deserialize, Serialize};

use crate::core::Key;
use crate::error::{ChartError, ChartResult};

/// Continuous domain -> pixel range mapping.
///
/// A zero-width domain maps every value to the start of the range instead of
/// producing `NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearScale {
    domain_start: f64,
    domain_end: f64,
    range_start: f64,
    range_end: f64,
}

impl Default for LinearScale {
    fn default() -> Self {
        Self {
            domain_start: 0.0,
            domain_end: 1.0,
            range_start: 0.0,
            range_end: 1.0,
        }
    }
}

impl LinearScale {
    pub fn new(domain_start: f64, domain_end: f64) -> ChartResult<Self> {
        let mut scale = Self::default();
        scale.set_domain(domain_start, domain_end)?;
        Ok(scale)
    }

    #[must_use]
    pub fn domain(self) -> (f64, f64) {
        (self.domain_start, self.domain_end)
    }

    pub fn set_domain(&mut self, start: f64, end: f64) -> ChartResult<()> {
        if !start.is_finite() || !end.is_finite() {
            return Err(ChartError::InvalidData(
                "scale domain must be finite".to_owned(),
            ));
        }
        self.domain_start = start;
        self.domain_end = end;
        Ok(())
    }

    #[must_use]
    pub fn range(self) -> (f64, f64) {
        (self.range_start, self.range_end)
    }

    pub fn set_range(&mut self, start: f64, end: f64) {
        self.range_start = start;
        self.range_end = end;
    }

    #[must_use]
    pub fn scale(self, value: f64) -> f64 {
        let span = self.domain_end - self.domain_start;
        if span == 0.0 || !value.is_finite() {
            return self.range_start;
        }
        let normalized = (value - self.domain_start) / span;
        self.range_start + normalized * (self.range_end - self.range_start)
    }

    #[must_use]
    pub fn invert(self, pixel: f64) -> f64 {
        let span = self.range_end - self.range_start;
        if span == 0.0 || !pixel.is_finite() {
            return self.domain_start;
        }
        let normalized = (pixel - self.range_start) / span;
        self.domain_start + normalized * (self.domain_end - self.domain_start)
    }
}

/// Categorical scale laid out as equal bands.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrdinalScale {
    domain: Vec<Key>,
    range_start: f64,
    range_end: f64,
    padding: f64,
    outer_padding: f64,
}

impl OrdinalScale {
    #[must_use]
    pub fn new(domain: Vec<Key>) -> Self {
        Self {
            domain,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn domain(&self) -> &[Key] {
        &self.domain
    }

    pub fn set_domain(&mut self, domain: Vec<Key>) {
        self.domain = domain;
    }

    /// Lays keys out over `[start, end]` with inner and outer padding as a
    /// fraction of one step.
    pub fn set_range_bands(&mut self, start: f64, end: f64, padding: f64, outer_padding: f64) {
        self.range_start = start;
        self.range_end = end;
        self.padding = padding.clamp(0.0, 1.0);
        self.outer_padding = outer_padding.max(0.0);
    }

    fn step(&self) -> f64 {
        let count = self.domain.len() as f64;
        let denominator = count - self.padding + 2.0 * self.outer_padding;
        if denominator <= 0.0 {
            return 0.0;
        }
        (self.range_end - self.range_start) / denominator
    }

    #[must_use]
    pub fn band_width(&self) -> f64 {
        self.step() * (1.0 - self.padding)
    }

    /// Start of the band for `key`, or `None` when the key is not in the domain.
    #[must_use]
    pub fn scale(&self, key: &Key) -> Option<f64> {
        let index = self.domain.iter().position(|candidate| candidate == key)?;
        let step = self.step();
        Some(self.range_start + step * self.outer_padding + step * index as f64)
    }
}

/// Kind of continuous x axis; decides how domain values turn back into keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ContinuousKind {
    #[default]
    Linear,
    /// Domain values are epoch milliseconds.
    Time,
}

/// X scale of a coordinate grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum XScale {
    Continuous {
        kind: ContinuousKind,
        scale: LinearScale,
    },
    Ordinal(OrdinalScale),
}

impl XScale {
    pub fn linear(start: f64, end: f64) -> ChartResult<Self> {
        Ok(Self::Continuous {
            kind: ContinuousKind::Linear,
            scale: LinearScale::new(start, end)?,
        })
    }

    /// Time scale over epoch-millisecond bounds.
    pub fn time(start_millis: f64, end_millis: f64) -> ChartResult<Self> {
        Ok(Self::Continuous {
            kind: ContinuousKind::Time,
            scale: LinearScale::new(start_millis, end_millis)?,
        })
    }

    #[must_use]
    pub fn ordinal(domain: Vec<Key>) -> Self {
        Self::Ordinal(OrdinalScale::new(domain))
    }

    #[must_use]
    pub fn is_ordinal(&self) -> bool {
        matches!(self, Self::Ordinal(_))
    }

    #[must_use]
    pub fn continuous_domain(&self) -> Option<(f64, f64)> {
        match self {
            Self::Continuous { scale, .. } => Some(scale.domain()),
            Self::Ordinal(_) => None,
        }
    }

    /// Pixel position of `key`; band start for ordinal scales.
    #[must_use]
    pub fn scale_key(&self, key: &Key) -> Option<f64> {
        match self {
            Self::Continuous { scale, .. } => key.as_f64().map(|value| scale.scale(value)),
            Self::Ordinal(scale) => scale.scale(key),
        }
    }

    /// Converts a continuous domain value back into a key of the axis kind.
    #[must_use]
    pub fn key_at(&self, value: f64) -> Key {
        match self {
            Self::Continuous {
                kind: ContinuousKind::Time,
                ..
            } => Key::date_from_millis(value),
            _ => Key::number(value),
        }
    }

    #[must_use]
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            Self::Continuous {
                kind: ContinuousKind::Time,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{LinearScale, OrdinalScale};
    use crate::core::Key;

    #[test]
    fn linear_scale_round_trips_pixels() {
        let mut scale = LinearScale::new(0.0, 100.0).expect("scale");
        scale.set_range(0.0, 500.0);
        assert_eq!(scale.scale(50.0), 250.0);
        assert_eq!(scale.invert(250.0), 50.0);
    }

    #[test]
    fn zero_width_domain_maps_to_range_start() {
        let mut scale = LinearScale::new(3.0, 3.0).expect("scale");
        scale.set_range(10.0, 20.0);
        assert_eq!(scale.scale(3.0), 10.0);
    }

    #[test]
    fn ordinal_bands_split_range_evenly() {
        let mut scale = OrdinalScale::new(vec![Key::text("a"), Key::text("b")]);
        scale.set_range_bands(0.0, 100.0, 0.0, 0.0);
        assert_eq!(scale.scale(&Key::text("b")), Some(50.0));
        assert_eq!(scale.band_width(), 50.0);
        assert_eq!(scale.scale(&Key::text("c")), None);
    }
}
