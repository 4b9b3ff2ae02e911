//! Pasted GeoJSON input.
//!
//! Accepts a bare geometry, a Feature or a FeatureCollection (first feature).
//! Only polygonal geometries are usable as a study area.

use geo::{MultiPolygon, Polygon};
use geojson::{GeoJson, Geometry, Value};
use tracing::debug;

use super::StudyAreaError;

/// Parse GeoJSON text into lon/lat polygons.
pub fn parse_geojson_str(text: &str) -> Result<MultiPolygon<f64>, StudyAreaError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| StudyAreaError::InvalidJson(e.to_string()))?;
    parse_geojson_value(value)
}

/// Parse an already decoded JSON value into lon/lat polygons.
pub fn parse_geojson_value(value: serde_json::Value) -> Result<MultiPolygon<f64>, StudyAreaError> {
    // A feature without its "type" member is still recognizable by its geometry.
    let value = match value {
        serde_json::Value::Object(mut object)
            if !object.contains_key("type") && object.contains_key("geometry") =>
        {
            object.remove("geometry").unwrap_or(serde_json::Value::Null)
        }
        other => other,
    };
    if value.is_null() {
        return Err(StudyAreaError::MissingGeometry);
    }

    let geojson = GeoJson::from_json_value(value)
        .map_err(|e| StudyAreaError::InvalidGeoJson(e.to_string()))?;

    let geometry = match geojson {
        GeoJson::FeatureCollection(collection) => {
            let count = collection.features.len();
            let first = collection
                .features
                .into_iter()
                .next()
                .ok_or(StudyAreaError::EmptyFeatureCollection)?;
            debug!(features = count, "using first feature of collection");
            first.geometry.ok_or(StudyAreaError::MissingGeometry)?
        }
        GeoJson::Feature(feature) => feature.geometry.ok_or(StudyAreaError::MissingGeometry)?,
        GeoJson::Geometry(geometry) => geometry,
    };

    geometry_to_multipolygon(&geometry)
}

/// Convert a GeoJSON geometry to polygons.
///
/// Geometry collections are flattened; any non-polygonal member rejects the
/// whole geometry.
pub fn geometry_to_multipolygon(geometry: &Geometry) -> Result<MultiPolygon<f64>, StudyAreaError> {
    let mut polygons = Vec::new();
    collect_polygons(&geometry.value, &mut polygons)?;
    Ok(MultiPolygon(polygons))
}

fn collect_polygons(value: &Value, out: &mut Vec<Polygon<f64>>) -> Result<(), StudyAreaError> {
    match value {
        Value::Polygon(rings) => {
            if rings.is_empty() {
                return Err(StudyAreaError::EmptyGeometry);
            }
            out.push(Polygon::<f64>::try_from(value).map_err(invalid)?);
        }
        Value::MultiPolygon(parts) => {
            if parts.iter().any(Vec::is_empty) {
                return Err(StudyAreaError::EmptyGeometry);
            }
            out.extend(MultiPolygon::<f64>::try_from(value).map_err(invalid)?);
        }
        Value::GeometryCollection(members) => {
            for member in members {
                collect_polygons(&member.value, out)?;
            }
        }
        other => return Err(StudyAreaError::UnsupportedGeometry(other.type_name().to_string())),
    }
    Ok(())
}

fn invalid(err: geojson::Error) -> StudyAreaError {
    StudyAreaError::InvalidGeoJson(err.to_string())
}

/// Encode polygons as a GeoJSON MultiPolygon geometry.
pub fn to_geojson_geometry(geometry: &MultiPolygon<f64>) -> Geometry {
    Geometry::new(Value::from(geometry))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"{"type":"Polygon","coordinates":[[[-45,-3],[-44,-3],[-44,-2],[-45,-2],[-45,-3]]]}"#;

    #[test]
    fn test_bare_geometry() {
        let mp = parse_geojson_str(SQUARE).unwrap();
        assert_eq!(mp.0.len(), 1);
        assert_eq!(mp.0[0].exterior().0.len(), 5);
    }

    #[test]
    fn test_feature_and_collection_agree() {
        let feature = format!(r#"{{"type":"Feature","properties":{{}},"geometry":{}}}"#, SQUARE);
        let collection = format!(r#"{{"type":"FeatureCollection","features":[{}]}}"#, feature);
        assert_eq!(
            parse_geojson_str(&feature).unwrap(),
            parse_geojson_str(&collection).unwrap()
        );
    }

    #[test]
    fn test_untyped_object_with_geometry() {
        let text = format!(r#"{{"geometry":{}}}"#, SQUARE);
        assert_eq!(parse_geojson_str(&text).unwrap().0.len(), 1);
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(matches!(
            parse_geojson_str("{not json"),
            Err(StudyAreaError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_geojson_str(r#"{"type":"Polygon"}"#),
            Err(StudyAreaError::InvalidGeoJson(_))
        ));
        assert!(matches!(
            parse_geojson_str(r#"{"type":"FeatureCollection","features":[]}"#),
            Err(StudyAreaError::EmptyFeatureCollection)
        ));
        assert!(matches!(
            parse_geojson_str(r#"{"type":"Feature","properties":{},"geometry":null}"#),
            Err(StudyAreaError::MissingGeometry)
        ));
        assert!(matches!(
            parse_geojson_str(r#"{"type":"Point","coordinates":[-45,-3]}"#),
            Err(StudyAreaError::UnsupportedGeometry(t)) if t == "Point"
        ));
    }

    #[test]
    fn test_geometry_collection_of_polygons() {
        let text = format!(r#"{{"type":"GeometryCollection","geometries":[{0},{0}]}}"#, SQUARE);
        assert_eq!(parse_geojson_str(&text).unwrap().0.len(), 2);
    }

    #[test]
    fn test_holes_and_empty_polygons() {
        let holed = r#"{"type":"MultiPolygon","coordinates":[
            [[[0,0],[10,0],[10,10],[0,10],[0,0]],[[2,2],[3,2],[3,3],[2,2]]],
            [[[20,20],[21,20],[21,21],[20,20]]]
        ]}"#;
        let mp = parse_geojson_str(holed).unwrap();
        assert_eq!(mp.0.len(), 2);
        assert_eq!(mp.0[0].interiors().len(), 1);
        assert_eq!(mp.0[1].exterior().0[1], geo::coord! { x: 21.0, y: 20.0 });

        assert!(matches!(
            parse_geojson_str(r#"{"type":"Polygon","coordinates":[]}"#),
            Err(StudyAreaError::EmptyGeometry)
        ));
        let nested = r#"{"type":"GeometryCollection","geometries":[
            {"type":"LineString","coordinates":[[0,0],[1,1]]}
        ]}"#;
        assert!(matches!(
            parse_geojson_str(nested),
            Err(StudyAreaError::UnsupportedGeometry(t)) if t == "LineString"
        ));
    }

    #[test]
    fn test_encode_decode_keeps_rings() {
        let mp = parse_geojson_str(SQUARE).unwrap();
        let encoded = to_geojson_geometry(&mp);
        let reparsed = geometry_to_multipolygon(&encoded).unwrap();
        assert_eq!(mp, reparsed);
    }
}
