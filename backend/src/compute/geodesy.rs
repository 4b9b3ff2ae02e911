//! Ground area of lon/lat cells.

use serde::{Deserialize, Serialize};

use crate::models::GridSpec;

/// Radius of the sphere with the same surface area as the WGS84 ellipsoid.
pub const AUTHALIC_RADIUS_M: f64 = 6_371_007.181;

/// Area in m² of the spherical cell between two meridians `lon_span_deg`
/// apart and two parallels.
pub fn cell_area_m2(lon_span_deg: f64, lat_north: f64, lat_south: f64) -> f64 {
    let dlon = lon_span_deg.to_radians().abs();
    let band = (lat_north.to_radians().sin() - lat_south.to_radians().sin()).abs();
    AUTHALIC_RADIUS_M * AUTHALIC_RADIUS_M * dlon * band
}

/// How a counted pixel converts to area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PixelArea {
    /// True ground area of each pixel, in m².
    #[default]
    Geodesic,
    /// A fixed number of units per native pixel.
    Constant(f64),
}

impl PixelArea {
    /// Weight of a block of `rows` × `cols` native pixels whose top row is `row`.
    pub fn block_weight(&self, grid: &GridSpec, row: usize, rows: usize, cols: usize) -> f64 {
        match *self {
            PixelArea::Geodesic => {
                let (north, south) = grid.row_span_lat(row, rows);
                cell_area_m2(grid.pixel_width_deg() * cols as f64, north, south)
            }
            PixelArea::Constant(units) => units * (rows * cols) as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_sphere() {
        let total = cell_area_m2(360.0, 90.0, -90.0);
        let expected = 4.0 * std::f64::consts::PI * AUTHALIC_RADIUS_M * AUTHALIC_RADIUS_M;
        assert!((total - expected).abs() / expected < 1e-12);
    }

    #[test]
    fn test_cells_shrink_towards_poles() {
        let equator = cell_area_m2(1.0, 1.0, 0.0);
        let high = cell_area_m2(1.0, 61.0, 60.0);
        assert!(high < equator * 0.51 && high > equator * 0.49);
    }

    #[test]
    fn test_block_weight() {
        let grid = GridSpec::new(10, 10, 0.0, 1.0, 0.0, 1.0).unwrap();
        let one = PixelArea::Geodesic.block_weight(&grid, 0, 1, 1);
        let four = PixelArea::Geodesic.block_weight(&grid, 0, 2, 2);
        assert!((four / one - 4.0).abs() < 1e-3);
        assert_eq!(PixelArea::Constant(1.0).block_weight(&grid, 3, 2, 3), 6.0);
    }
}
