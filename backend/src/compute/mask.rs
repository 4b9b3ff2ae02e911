//! Pixel coverage of a polygon region.
//!
//! A pixel is covered when its centre falls inside the region. Each polygon
//! is filled with the even-odd rule over all of its rings, so holes are
//! excluded; the polygons of a multipolygon are combined by union.

use std::ops::Range;

use geo::{BoundingRect, LineString, MultiPolygon, Polygon};

use crate::models::GridSpec;

/// Coverage over a rectangular window of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageMask {
    rows: Range<usize>,
    cols: Range<usize>,
    covered: Vec<bool>,
}

impl CoverageMask {
    /// Every pixel of the grid is covered.
    pub fn full(grid: &GridSpec) -> Self {
        Self {
            rows: 0..grid.height,
            cols: 0..grid.width,
            covered: vec![true; grid.len()],
        }
    }

    /// Rasterize `region` onto `grid`. `None` when the region misses the grid.
    pub fn rasterize(grid: &GridSpec, region: &MultiPolygon<f64>) -> Option<Self> {
        let (rows, cols) = grid.window(&region.bounding_rect()?)?;
        let width = cols.len();
        let mut covered = vec![false; rows.len() * width];
        let mut crossings = Vec::new();

        for (i, row) in rows.clone().enumerate() {
            let y = grid.row_center_lat(row);
            let line = &mut covered[i * width..(i + 1) * width];
            for polygon in &region.0 {
                crossings.clear();
                polygon_crossings(polygon, y, &mut crossings);
                crossings.sort_by(f64::total_cmp);
                for span in crossings.chunks_exact(2) {
                    let start = first_col_at_or_after(grid, span[0]).max(cols.start);
                    let end = first_col_at_or_after(grid, span[1]).min(cols.end);
                    for col in start..end.max(start) {
                        line[col - cols.start] = true;
                    }
                }
            }
        }

        Some(Self { rows, cols, covered })
    }

    pub fn rows(&self) -> Range<usize> {
        self.rows.clone()
    }

    pub fn cols(&self) -> Range<usize> {
        self.cols.clone()
    }

    /// Whether grid pixel `(row, col)` is covered. Pixels outside the window are not.
    #[inline]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        if !self.rows.contains(&row) || !self.cols.contains(&col) {
            return false;
        }
        let width = self.cols.len();
        self.covered[(row - self.rows.start) * width + (col - self.cols.start)]
    }

    pub fn covered_count(&self) -> usize {
        self.covered.iter().filter(|c| **c).count()
    }
}

/// First column whose centre lies at or east of `lon`.
fn first_col_at_or_after(grid: &GridSpec, lon: f64) -> usize {
    let position = (lon - grid.min_lon) / grid.pixel_width_deg() - 0.5;
    position.ceil().max(0.0) as usize
}

fn polygon_crossings(polygon: &Polygon<f64>, y: f64, out: &mut Vec<f64>) {
    ring_crossings(polygon.exterior(), y, out);
    for interior in polygon.interiors() {
        ring_crossings(interior, y, out);
    }
}

/// Longitudes where the horizontal line at `y` crosses the ring edges.
fn ring_crossings(ring: &LineString<f64>, y: f64, out: &mut Vec<f64>) {
    for line in ring.lines() {
        let (a, b) = (line.start, line.end);
        if (a.y > y) != (b.y > y) {
            out.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Contains, Point};
    use proptest::prelude::*;

    fn grid() -> GridSpec {
        GridSpec::new(10, 10, 0.0, 10.0, 0.0, 10.0).unwrap()
    }

    #[test]
    fn test_rectangle_coverage() {
        let region = MultiPolygon(vec![polygon![
            (x: 2.0, y: 2.0),
            (x: 5.0, y: 2.0),
            (x: 5.0, y: 6.0),
            (x: 2.0, y: 6.0),
            (x: 2.0, y: 2.0),
        ]]);
        let mask = CoverageMask::rasterize(&grid(), &region).unwrap();
        assert_eq!(mask.covered_count(), 12);
        // row 4 has its centre at lat 5.5, column 2 at lon 2.5
        assert!(mask.contains(4, 2));
        assert!(!mask.contains(4, 5));
        assert!(!mask.contains(0, 0));
    }

    #[test]
    fn test_hole_is_excluded() {
        let region = MultiPolygon(vec![polygon!(
            exterior: [
                (x: 0.0, y: 0.0),
                (x: 10.0, y: 0.0),
                (x: 10.0, y: 10.0),
                (x: 0.0, y: 10.0),
                (x: 0.0, y: 0.0),
            ],
            interiors: [[
                (x: 4.0, y: 4.0),
                (x: 6.0, y: 4.0),
                (x: 6.0, y: 6.0),
                (x: 4.0, y: 6.0),
                (x: 4.0, y: 4.0),
            ]],
        )]);
        let mask = CoverageMask::rasterize(&grid(), &region).unwrap();
        assert_eq!(mask.covered_count(), 96);
        assert!(!mask.contains(5, 5));
    }

    #[test]
    fn test_region_outside_grid() {
        let region = MultiPolygon(vec![polygon![
            (x: 20.0, y: 20.0),
            (x: 21.0, y: 20.0),
            (x: 21.0, y: 21.0),
            (x: 20.0, y: 20.0),
        ]]);
        assert!(CoverageMask::rasterize(&grid(), &region).is_none());
    }

    #[test]
    fn test_full_mask() {
        let mask = CoverageMask::full(&grid());
        assert_eq!(mask.covered_count(), 100);
        assert!(mask.contains(9, 9));
    }

    proptest! {
        #[test]
        fn prop_matches_point_in_polygon(
            x0 in -1.0f64..11.0, y0 in -1.0f64..11.0,
            x1 in -1.0f64..11.0, y1 in -1.0f64..11.0,
            x2 in -1.0f64..11.0, y2 in -1.0f64..11.0,
        ) {
            let triangle = polygon![
                (x: x0, y: y0),
                (x: x1, y: y1),
                (x: x2, y: y2),
                (x: x0, y: y0),
            ];
            let g = grid();
            let region = MultiPolygon(vec![triangle.clone()]);
            if let Some(mask) = CoverageMask::rasterize(&g, &region) {
                for row in 0..g.height {
                    for col in 0..g.width {
                        let centre = Point::new(g.col_center_lon(col), g.row_center_lat(row));
                        prop_assert_eq!(mask.contains(row, col), triangle.contains(&centre));
                    }
                }
            }
        }
    }
}
