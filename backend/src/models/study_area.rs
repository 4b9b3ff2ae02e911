use geo::{BoundingRect, Centroid, GeodesicArea, MultiPolygon, Rect};
use serde::{Deserialize, Serialize};

use crate::study_area::{fingerprint, geojson_input, StudyAreaError};

/// Input channel a study area was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaSource {
    Shapefile,
    GeoJson,
    NamedRegion,
}

/// Polygonal area restricting both the rendered layers and the statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyArea {
    name: String,
    source: AreaSource,
    geometry: MultiPolygon<f64>,
}

impl StudyArea {
    /// Build a study area from lon/lat polygons.
    pub fn new(
        name: impl Into<String>,
        source: AreaSource,
        geometry: MultiPolygon<f64>,
    ) -> Result<Self, StudyAreaError> {
        if geometry.0.is_empty() || geometry.0.iter().all(|p| p.exterior().0.len() < 4) {
            return Err(StudyAreaError::EmptyGeometry);
        }
        for polygon in &geometry.0 {
            for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                for c in &ring.0 {
                    if !c.x.is_finite()
                        || !c.y.is_finite()
                        || !(-180.0..=180.0).contains(&c.x)
                        || !(-90.0..=90.0).contains(&c.y)
                    {
                        return Err(StudyAreaError::CoordinatesOutOfRange { x: c.x, y: c.y });
                    }
                }
            }
        }
        Ok(Self {
            name: name.into(),
            source,
            geometry,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> AreaSource {
        self.source
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }

    /// Geodesic area on the WGS84 ellipsoid, in square kilometres.
    pub fn area_km2(&self) -> f64 {
        self.geometry.geodesic_area_unsigned() / 1e6
    }

    /// `(lon, lat)` of the area centroid.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        self.geometry.centroid().map(|p| (p.x(), p.y()))
    }

    pub fn to_geojson(&self) -> geojson::Geometry {
        geojson_input::to_geojson_geometry(&self.geometry)
    }

    /// Stable content hash of the geometry, used to correlate log lines.
    pub fn fingerprint(&self) -> String {
        fingerprint::geometry_fingerprint(&self.geometry)
    }

    pub fn summary(&self) -> StudyAreaSummary {
        let bbox = self
            .bounding_rect()
            .map(|r| [r.min().x, r.min().y, r.max().x, r.max().y]);
        StudyAreaSummary {
            name: self.name.clone(),
            source: self.source,
            bbox,
            area_km2: self.area_km2(),
            centroid: self.centroid().map(|(x, y)| [x, y]),
            polygon_count: self.geometry.0.len(),
            fingerprint: self.fingerprint(),
        }
    }
}

/// Serializable description of a resolved study area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyAreaSummary {
    pub name: String,
    pub source: AreaSource,
    /// `[min_lon, min_lat, max_lon, max_lat]`
    pub bbox: Option<[f64; 4]>,
    pub area_km2: f64,
    /// `[lon, lat]`
    pub centroid: Option<[f64; 2]>,
    pub polygon_count: usize,
    pub fingerprint: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square() -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: -45.0, y: -3.0),
            (x: -44.0, y: -3.0),
            (x: -44.0, y: -2.0),
            (x: -45.0, y: -2.0),
            (x: -45.0, y: -3.0),
        ]])
    }

    #[test]
    fn test_summary_fields() {
        let area = StudyArea::new("Alcântara", AreaSource::NamedRegion, square()).unwrap();
        let summary = area.summary();
        assert_eq!(summary.name, "Alcântara");
        assert_eq!(summary.bbox, Some([-45.0, -3.0, -44.0, -2.0]));
        assert_eq!(summary.polygon_count, 1);
        let [cx, cy] = summary.centroid.unwrap();
        assert!((cx - -44.5).abs() < 1e-9 && (cy - -2.5).abs() < 1e-9);
        // one degree square near the equator is roughly 12 300 km2
        assert!(summary.area_km2 > 12_000.0 && summary.area_km2 < 12_500.0);
    }

    #[test]
    fn test_empty_geometry_rejected() {
        let err = StudyArea::new("x", AreaSource::GeoJson, MultiPolygon(vec![])).unwrap_err();
        assert!(matches!(err, StudyAreaError::EmptyGeometry));
    }

    #[test]
    fn test_projected_coordinates_rejected() {
        let projected = MultiPolygon(vec![polygon![
            (x: 500000.0, y: 9700000.0),
            (x: 510000.0, y: 9700000.0),
            (x: 510000.0, y: 9710000.0),
            (x: 500000.0, y: 9700000.0),
        ]]);
        let err = StudyArea::new("utm", AreaSource::Shapefile, projected).unwrap_err();
        assert!(matches!(err, StudyAreaError::CoordinatesOutOfRange { .. }));
    }
}
