use serde::{Deserialize, Serialize};

use super::classification::CategoryCode;

/// Square metres per square kilometre.
pub const M2_PER_KM2: f64 = 1_000_000.0;

/// Area covered by one category in one year, full precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaStatistic {
    pub year: i32,
    pub category: CategoryCode,
    pub label: String,
    pub area_km2: f64,
}

impl AreaStatistic {
    pub fn from_m2(year: i32, category: CategoryCode, label: impl Into<String>, area_m2: f64) -> Self {
        Self {
            year,
            category,
            label: label.into(),
            area_km2: area_m2 / M2_PER_KM2,
        }
    }

    /// Area rounded for display.
    pub fn display_area_km2(&self) -> f64 {
        round2(self.area_km2)
    }
}

/// Round to two decimals, the precision every table and chart shows.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
