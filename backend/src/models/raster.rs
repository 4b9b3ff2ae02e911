use geo::Rect;
use serde::{Deserialize, Serialize};

/// Mean length of one degree of latitude, in metres.
pub const METRES_PER_DEGREE: f64 = 111_320.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RasterError {
    #[error("raster has {actual} values but its grid needs {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("raster grid must have non-zero width and height")]
    EmptyGrid,

    #[error("invalid raster bounds: lon [{min_lon}, {max_lon}], lat [{min_lat}, {max_lat}]")]
    InvalidBounds {
        min_lon: f64,
        max_lon: f64,
        min_lat: f64,
        max_lat: f64,
    },
}

/// Georeferencing of a north-up lon/lat raster. Row 0 is the northern edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub width: usize,
    pub height: usize,
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl GridSpec {
    pub fn new(
        width: usize,
        height: usize,
        min_lon: f64,
        max_lon: f64,
        min_lat: f64,
        max_lat: f64,
    ) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::EmptyGrid);
        }
        if !(min_lon < max_lon && min_lat < max_lat) {
            return Err(RasterError::InvalidBounds {
                min_lon,
                max_lon,
                min_lat,
                max_lat,
            });
        }
        Ok(Self {
            width,
            height,
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn pixel_width_deg(&self) -> f64 {
        (self.max_lon - self.min_lon) / self.width as f64
    }

    #[inline]
    pub fn pixel_height_deg(&self) -> f64 {
        (self.max_lat - self.min_lat) / self.height as f64
    }

    /// Ground size of one pixel along the meridian.
    pub fn native_resolution_m(&self) -> f64 {
        self.pixel_height_deg() * METRES_PER_DEGREE
    }

    /// Longitude of the centre of column `col`.
    #[inline]
    pub fn col_center_lon(&self, col: usize) -> f64 {
        self.min_lon + (col as f64 + 0.5) * self.pixel_width_deg()
    }

    /// Latitude of the centre of row `row`.
    #[inline]
    pub fn row_center_lat(&self, row: usize) -> f64 {
        self.max_lat - (row as f64 + 0.5) * self.pixel_height_deg()
    }

    /// Northern and southern latitude of a run of `rows` rows starting at `row`.
    pub fn row_span_lat(&self, row: usize, rows: usize) -> (f64, f64) {
        let top = self.max_lat - row as f64 * self.pixel_height_deg();
        let bottom = top - rows as f64 * self.pixel_height_deg();
        (top, bottom.max(self.min_lat))
    }

    pub fn extent(&self) -> Rect<f64> {
        Rect::new(
            geo::coord! { x: self.min_lon, y: self.min_lat },
            geo::coord! { x: self.max_lon, y: self.max_lat },
        )
    }

    /// Row and column ranges (end-exclusive) covering `rect`, clipped to the grid.
    pub fn window(&self, rect: &Rect<f64>) -> Option<(std::ops::Range<usize>, std::ops::Range<usize>)> {
        let min = rect.min();
        let max = rect.max();
        if max.x < self.min_lon || min.x > self.max_lon || max.y < self.min_lat || min.y > self.max_lat {
            return None;
        }

        let col_start = ((min.x - self.min_lon) / self.pixel_width_deg()).floor().max(0.0) as usize;
        let col_end = (((max.x - self.min_lon) / self.pixel_width_deg()).ceil() as usize).min(self.width);
        let row_start = ((self.max_lat - max.y) / self.pixel_height_deg()).floor().max(0.0) as usize;
        let row_end = (((self.max_lat - min.y) / self.pixel_height_deg()).ceil() as usize).min(self.height);

        if col_start >= col_end || row_start >= row_end {
            return None;
        }
        Some((row_start..row_end, col_start..col_end))
    }
}

/// Categorical raster with an optional validity mask. Row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRaster {
    pub grid: GridSpec,
    pub data: Vec<u8>,
    /// `false` marks pixels outside the clip region.
    pub valid: Vec<bool>,
}

impl CategoryRaster {
    pub fn new(grid: GridSpec, data: Vec<u8>) -> Result<Self, RasterError> {
        if data.len() != grid.len() {
            return Err(RasterError::SizeMismatch {
                expected: grid.len(),
                actual: data.len(),
            });
        }
        let valid = vec![true; data.len()];
        Ok(Self { grid, data, valid })
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        let idx = row * self.grid.width + col;
        if self.valid[idx] {
            Some(self.data[idx])
        } else {
            None
        }
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }

    /// Pixel count per value over valid pixels.
    pub fn histogram(&self) -> std::collections::BTreeMap<u8, usize> {
        let mut counts = std::collections::BTreeMap::new();
        for (value, valid) in self.data.iter().zip(&self.valid) {
            if *valid {
                *counts.entry(*value).or_insert(0) += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridSpec {
        GridSpec::new(4, 2, -46.0, -45.0, -3.0, -2.5).unwrap()
    }

    #[test]
    fn test_pixel_centers() {
        let g = grid();
        assert!((g.col_center_lon(0) - -45.875).abs() < 1e-12);
        assert!((g.row_center_lat(0) - -2.625).abs() < 1e-12);
        assert!((g.row_center_lat(1) - -2.875).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_grids_rejected() {
        assert_eq!(
            GridSpec::new(0, 2, 0.0, 1.0, 0.0, 1.0).unwrap_err(),
            RasterError::EmptyGrid
        );
        assert!(matches!(
            GridSpec::new(2, 2, 1.0, 0.0, 0.0, 1.0),
            Err(RasterError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn test_window_clips_to_grid() {
        let g = grid();
        let rect = Rect::new(
            geo::coord! { x: -45.6, y: -2.8 },
            geo::coord! { x: -40.0, y: 0.0 },
        );
        let (rows, cols) = g.window(&rect).unwrap();
        assert_eq!(rows, 0..2);
        assert_eq!(cols, 1..4);
    }

    #[test]
    fn test_window_outside_is_none() {
        let g = grid();
        let rect = Rect::new(geo::coord! { x: 10.0, y: 10.0 }, geo::coord! { x: 11.0, y: 11.0 });
        assert!(g.window(&rect).is_none());
    }

    #[test]
    fn test_raster_size_checked() {
        let err = CategoryRaster::new(grid(), vec![1; 3]).unwrap_err();
        assert_eq!(
            err,
            RasterError::SizeMismatch {
                expected: 8,
                actual: 3
            }
        );
    }

    #[test]
    fn test_histogram_skips_masked_pixels() {
        let mut raster = CategoryRaster::new(grid(), vec![1, 1, 2, 3, 3, 3, 0, 0]).unwrap();
        raster.valid[0] = false;
        let hist = raster.histogram();
        assert_eq!(hist.get(&1), Some(&1));
        assert_eq!(hist.get(&3), Some(&3));
        assert_eq!(raster.get(0, 0), None);
        assert_eq!(raster.get(0, 1), Some(1));
    }
}
