//! Named administrative regions loaded from a boundary dataset.

use std::collections::BTreeMap;
use std::path::Path;

use geo::MultiPolygon;
use geojson::GeoJson;
use tracing::{info, warn};

use super::geojson_input::geometry_to_multipolygon;
use super::StudyAreaError;
use crate::models::{AreaSource, StudyArea};

/// Default feature property holding the region name.
pub const DEFAULT_NAME_PROPERTY: &str = "NM_MUNICIP";

/// Immutable region-name to geometry table, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct RegionTable {
    regions: BTreeMap<String, MultiPolygon<f64>>,
}

impl RegionTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the table from a GeoJSON FeatureCollection.
    ///
    /// Features without the name property or without a polygonal geometry
    /// are skipped. A repeated name keeps the last feature.
    pub fn from_geojson_str(text: &str, name_property: &str) -> Result<Self, StudyAreaError> {
        let geojson: GeoJson = text
            .parse()
            .map_err(|e: geojson::Error| StudyAreaError::BoundaryLoad(e.to_string()))?;
        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(StudyAreaError::BoundaryLoad(
                "boundary dataset must be a FeatureCollection".to_string(),
            ));
        };

        let mut regions = BTreeMap::new();
        let mut skipped = 0usize;
        for feature in collection.features {
            let name = feature
                .property(name_property)
                .and_then(|v| v.as_str())
                .map(str::to_string);
            let (Some(name), Some(geometry)) = (name, feature.geometry.as_ref()) else {
                skipped += 1;
                continue;
            };
            match geometry_to_multipolygon(geometry) {
                Ok(polygons) if !polygons.0.is_empty() => {
                    regions.insert(name, polygons);
                }
                Ok(_) => skipped += 1,
                Err(e) => {
                    warn!(region = %name, error = %e, "skipping region with unusable geometry");
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            warn!(skipped, "boundary features without a usable name or geometry");
        }
        Ok(Self { regions })
    }

    pub fn load(path: impl AsRef<Path>, name_property: &str) -> Result<Self, StudyAreaError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            StudyAreaError::BoundaryLoad(format!("{}: {}", path.display(), e))
        })?;
        let table = Self::from_geojson_str(&text, name_property)?;
        info!(path = %path.display(), regions = table.len(), "boundary dataset loaded");
        Ok(table)
    }

    /// Load the table, or fall back to an empty one so the other input
    /// channels keep working.
    pub fn load_or_empty(path: impl AsRef<Path>, name_property: &str) -> Self {
        match Self::load(path, name_property) {
            Ok(table) => table,
            Err(e) => {
                warn!(error = %e, "named-region selection disabled");
                Self::empty()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Region names in ascending order.
    pub fn names(&self) -> Vec<&str> {
        self.regions.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Option<&MultiPolygon<f64>> {
        self.regions.get(name)
    }

    /// Study area for an exact region name.
    pub fn resolve(&self, name: &str) -> Result<StudyArea, StudyAreaError> {
        let geometry = self
            .get(name)
            .ok_or_else(|| StudyAreaError::RegionNotFound(name.to_string()))?;
        StudyArea::new(name, AreaSource::NamedRegion, geometry.clone())
    }
}

impl FromIterator<(String, MultiPolygon<f64>)> for RegionTable {
    fn from_iter<I: IntoIterator<Item = (String, MultiPolygon<f64>)>>(iter: I) -> Self {
        Self {
            regions: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"NM_MUNICIP": "São Luís"},
             "geometry": {"type": "Polygon", "coordinates": [[[-44.4,-2.6],[-44.1,-2.6],[-44.1,-2.4],[-44.4,-2.6]]]}},
            {"type": "Feature", "properties": {"NM_MUNICIP": "Alcântara"},
             "geometry": {"type": "Polygon", "coordinates": [[[-44.6,-2.5],[-44.3,-2.5],[-44.3,-2.2],[-44.6,-2.5]]]}},
            {"type": "Feature", "properties": {"OTHER": "x"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}},
            {"type": "Feature", "properties": {"NM_MUNICIP": "Ponto"},
             "geometry": {"type": "Point", "coordinates": [0, 0]}}
        ]
    }"#;

    #[test]
    fn test_names_sorted_and_unusable_features_skipped() {
        let table = RegionTable::from_geojson_str(BOUNDARIES, DEFAULT_NAME_PROPERTY).unwrap();
        assert_eq!(table.names(), vec!["Alcântara", "São Luís"]);
    }

    #[test]
    fn test_resolve_exact_name() {
        let table = RegionTable::from_geojson_str(BOUNDARIES, DEFAULT_NAME_PROPERTY).unwrap();
        let area = table.resolve("São Luís").unwrap();
        assert_eq!(area.name(), "São Luís");
        assert_eq!(area.source(), AreaSource::NamedRegion);
        assert!(matches!(
            table.resolve("são luís"),
            Err(StudyAreaError::RegionNotFound(_))
        ));
    }

    #[test]
    fn test_missing_file_gives_empty_table() {
        let table = RegionTable::load_or_empty("/nonexistent/municipios.geojson", DEFAULT_NAME_PROPERTY);
        assert!(table.is_empty());
    }

    #[test]
    fn test_non_collection_rejected() {
        let err = RegionTable::from_geojson_str(
            r#"{"type":"Point","coordinates":[0,0]}"#,
            DEFAULT_NAME_PROPERTY,
        )
        .unwrap_err();
        assert!(matches!(err, StudyAreaError::BoundaryLoad(_)));
    }
}
