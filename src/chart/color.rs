use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::core::Key;
use crate::error::{ChartError, ChartResult};
use crate::render::Color;

/// Ten-color categorical palette.
pub const CATEGORY10: [u32; 10] = [
    0x1f77b4, 0xff7f0e, 0x2ca02c, 0xd62728, 0x9467bd, 0x8c564b, 0xe377c2, 0x7f7f7f, 0xbcbd22,
    0x17becf,
];

/// Ordinal color scale: keys receive palette entries in first-seen order and
/// keep them for the lifetime of the scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    palette: SmallVec<[Color; 10]>,
    assigned: IndexMap<Key, usize>,
}

impl Default for ColorScale {
    fn default() -> Self {
        Self {
            palette: CATEGORY10.iter().map(|hex| Color::from_hex(*hex)).collect(),
            assigned: IndexMap::new(),
        }
    }
}

impl ColorScale {
    pub fn new(palette: impl IntoIterator<Item = Color>) -> ChartResult<Self> {
        let palette: SmallVec<[Color; 10]> = palette.into_iter().collect();
        if palette.is_empty() {
            return Err(ChartError::InvalidData(
                "color palette must not be empty".to_owned(),
            ));
        }
        for color in &palette {
            color.validate()?;
        }
        Ok(Self {
            palette,
            assigned: IndexMap::new(),
        })
    }

    #[must_use]
    pub fn palette(&self) -> &[Color] {
        &self.palette
    }

    pub fn color_of(&mut self, key: &Key) -> Color {
        let next = self.assigned.len();
        let index = *self.assigned.entry(key.clone()).or_insert(next);
        self.palette[index % self.palette.len()]
    }
}
