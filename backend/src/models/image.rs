//! Lazy band expressions and multi-band image stacks.
//!
//! A [`BandExpr`] is an opaque handle to a per-pixel categorical surface. It is
//! only materialized when a compute engine evaluates or reduces it.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::classification::ClassificationCodeMap;

/// Band name prefix used by the MapBiomas integration asset.
pub const BAND_PREFIX: &str = "classification_";

/// Band name for one year, e.g. `classification_2023`.
pub fn year_band_name(year: i32) -> String {
    format!("{}{}", BAND_PREFIX, year)
}

/// Year encoded in a band name produced by [`year_band_name`].
pub fn band_year(name: &str) -> Option<i32> {
    name.strip_prefix(BAND_PREFIX)?.parse().ok()
}

/// Inclusive range of classification years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub first: i32,
    pub last: i32,
}

impl YearRange {
    pub fn new(first: i32, last: i32) -> Option<Self> {
        (first <= last).then_some(Self { first, last })
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.first..=self.last).contains(&year)
    }

    pub fn len(&self) -> usize {
        (self.last - self.first + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.first..=self.last
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            first: 1985,
            last: 2023,
        }
    }
}

/// Expression describing how a band's pixels are produced.
#[derive(Debug, Clone, PartialEq)]
pub enum BandExpr {
    /// A band read straight from an asset.
    Asset { asset_id: String, band: String },
    /// Raw codes of `source` replaced through a code map.
    Remap {
        source: Box<BandExpr>,
        map: Arc<ClassificationCodeMap>,
    },
}

impl BandExpr {
    pub fn asset(asset_id: impl Into<String>, band: impl Into<String>) -> Self {
        Self::Asset {
            asset_id: asset_id.into(),
            band: band.into(),
        }
    }

    pub fn remap(self, map: Arc<ClassificationCodeMap>) -> Self {
        Self::Remap {
            source: Box::new(self),
            map,
        }
    }

    /// Name of the asset band at the root of the expression.
    pub fn source_band(&self) -> &str {
        match self {
            Self::Asset { band, .. } => band,
            Self::Remap { source, .. } => source.source_band(),
        }
    }

    pub fn asset_id(&self) -> &str {
        match self {
            Self::Asset { asset_id, .. } => asset_id,
            Self::Remap { source, .. } => source.asset_id(),
        }
    }
}

impl fmt::Display for BandExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asset { asset_id, band } => write!(f, "{}/{}", asset_id, band),
            Self::Remap { source, map } => write!(f, "remap({}, {} codes)", source, map.len()),
        }
    }
}

/// A band expression with its output name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedBand {
    pub name: String,
    pub expr: BandExpr,
}

impl NamedBand {
    pub fn year(&self) -> Option<i32> {
        band_year(&self.name)
    }
}

/// Ordered multi-band image; bands are addressed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageStack {
    bands: Vec<NamedBand>,
}

impl ImageStack {
    /// Concatenate bands in the given order.
    pub fn cat(bands: impl IntoIterator<Item = NamedBand>) -> Self {
        Self {
            bands: bands.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn bands(&self) -> &[NamedBand] {
        &self.bands
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn select(&self, name: &str) -> Option<&NamedBand> {
        self.bands.iter().find(|b| b.name == name)
    }

    pub fn select_year(&self, year: i32) -> Option<&NamedBand> {
        self.select(&year_band_name(year))
    }

    pub fn years(&self) -> Vec<i32> {
        self.bands.iter().filter_map(NamedBand::year).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_names_round_trip_year() {
        assert_eq!(year_band_name(1985), "classification_1985");
        assert_eq!(band_year("classification_2023"), Some(2023));
        assert_eq!(band_year("ndvi_2023"), None);
    }

    #[test]
    fn test_default_year_range() {
        let range = YearRange::default();
        assert_eq!(range.len(), 39);
        assert!(range.contains(1985));
        assert!(range.contains(2023));
        assert!(!range.contains(2024));
        assert!(YearRange::new(2000, 1999).is_none());
    }

    #[test]
    fn test_remap_keeps_source_band() {
        let map = Arc::new(ClassificationCodeMap::new(&[1], &[1]).unwrap());
        let expr = BandExpr::asset("asset", "classification_2000").remap(map);
        assert_eq!(expr.source_band(), "classification_2000");
        assert_eq!(expr.asset_id(), "asset");
        assert!(expr.to_string().starts_with("remap(asset/classification_2000"));
    }

    #[test]
    fn test_stack_select() {
        let stack = ImageStack::cat([2001, 2000].map(|y| NamedBand {
            name: year_band_name(y),
            expr: BandExpr::asset("a", year_band_name(y)),
        }));
        assert_eq!(stack.years(), vec![2001, 2000]);
        assert!(stack.select_year(2000).is_some());
        assert!(stack.select_year(1999).is_none());
    }
}
