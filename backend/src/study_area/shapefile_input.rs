//! Uploaded ESRI shapefile bundles.
//!
//! The components are staged in a temporary directory that is removed when
//! the read finishes, whatever the outcome.

use std::collections::BTreeMap;
use std::path::Path;

use base64::Engine as _;
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use shapefile::dbase::{FieldValue, Record};
use shapefile::{PolygonRing, Shape};
use tracing::{debug, warn};

use super::StudyAreaError;

/// Components every bundle must carry.
pub const REQUIRED_COMPONENTS: [&str; 3] = ["shp", "shx", "dbf"];

/// Attribute names tried, in order, for the area name.
const NAME_FIELDS: [&str; 3] = ["name", "NAME", "Name"];

/// One uploaded file, contents base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub content_base64: String,
}

/// Decoded shapefile components keyed by lowercase extension.
#[derive(Debug, Clone, Default)]
pub struct ShapefileBundle {
    components: BTreeMap<String, Vec<u8>>,
}

impl ShapefileBundle {
    /// Decode uploads and check the bundle is complete.
    pub fn from_uploads(files: &[UploadedFile]) -> Result<Self, StudyAreaError> {
        if files.is_empty() {
            return Err(StudyAreaError::InvalidUpload("no files uploaded".to_string()));
        }
        let mut components = BTreeMap::new();
        for file in files {
            let extension = Path::new(&file.name)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
                .ok_or_else(|| {
                    StudyAreaError::InvalidUpload(format!("'{}' has no file extension", file.name))
                })?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(file.content_base64.trim())
                .map_err(|e| {
                    StudyAreaError::InvalidUpload(format!("'{}' is not valid base64: {}", file.name, e))
                })?;
            if components.insert(extension.clone(), bytes).is_some() {
                warn!(extension = %extension, "duplicate shapefile component; keeping the last one");
            }
        }
        let bundle = Self { components };
        bundle.check_complete()?;
        Ok(bundle)
    }

    /// Build a bundle from raw component bytes.
    pub fn from_components(
        components: impl IntoIterator<Item = (String, Vec<u8>)>,
    ) -> Result<Self, StudyAreaError> {
        let bundle = Self {
            components: components
                .into_iter()
                .map(|(ext, bytes)| (ext.to_ascii_lowercase(), bytes))
                .collect(),
        };
        bundle.check_complete()?;
        Ok(bundle)
    }

    fn check_complete(&self) -> Result<(), StudyAreaError> {
        for required in REQUIRED_COMPONENTS {
            if !self.components.contains_key(required) {
                return Err(StudyAreaError::IncompleteShapefile {
                    missing: format!(".{}", required),
                });
            }
        }
        Ok(())
    }

    pub fn extensions(&self) -> Vec<&str> {
        self.components.keys().map(String::as_str).collect()
    }

    /// Read the first polygonal record.
    ///
    /// Returns the record's name attribute, when it has one, and its polygons.
    pub fn read_first_polygon(&self) -> Result<(Option<String>, MultiPolygon<f64>), StudyAreaError> {
        self.read_first_polygon_in(&std::env::temp_dir())
    }

    /// Like [`Self::read_first_polygon`], staging the components under `parent`.
    pub fn read_first_polygon_in(
        &self,
        parent: &Path,
    ) -> Result<(Option<String>, MultiPolygon<f64>), StudyAreaError> {
        let staging = tempfile::Builder::new().prefix("shapefile").tempdir_in(parent)?;
        for (extension, bytes) in &self.components {
            std::fs::write(staging.path().join(format!("upload.{}", extension)), bytes)?;
        }
        let shp_path = staging.path().join("upload.shp");
        debug!(path = %shp_path.display(), components = ?self.extensions(), "reading staged shapefile");

        let mut reader = shapefile::Reader::from_path(&shp_path)
            .map_err(|e| StudyAreaError::Shapefile(e.to_string()))?;

        for item in reader.iter_shapes_and_records() {
            let (shape, record) = item.map_err(|e| StudyAreaError::Shapefile(e.to_string()))?;
            if let Some(rings) = polygon_rings(&shape) {
                let name = record_name(&record);
                return Ok((name, assemble(rings)));
            }
            debug!(shape = ?shape.shapetype(), "skipping non-polygon record");
        }
        Err(StudyAreaError::NoPolygonRecord)
    }
}

macro_rules! rings_of {
    ($polygon:expr) => {
        $polygon
            .rings()
            .iter()
            .map(|ring| match ring {
                PolygonRing::Outer(points) => {
                    (true, points.iter().map(|p| Coord { x: p.x, y: p.y }).collect())
                }
                PolygonRing::Inner(points) => {
                    (false, points.iter().map(|p| Coord { x: p.x, y: p.y }).collect())
                }
            })
            .collect()
    };
}

/// `(is_outer, coordinates)` for each ring of a polygonal shape.
fn polygon_rings(shape: &Shape) -> Option<Vec<(bool, Vec<Coord<f64>>)>> {
    match shape {
        Shape::Polygon(p) => Some(rings_of!(p)),
        Shape::PolygonM(p) => Some(rings_of!(p)),
        Shape::PolygonZ(p) => Some(rings_of!(p)),
        _ => None,
    }
}

/// Group rings into polygons: each outer ring opens a polygon and the inner
/// rings that follow become its holes.
fn assemble(rings: Vec<(bool, Vec<Coord<f64>>)>) -> MultiPolygon<f64> {
    let mut parts: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();
    for (is_outer, coords) in rings {
        let ring = LineString::new(coords);
        match parts.last_mut() {
            Some((_, holes)) if !is_outer => holes.push(ring),
            _ => parts.push((ring, Vec::new())),
        }
    }
    MultiPolygon(
        parts
            .into_iter()
            .map(|(exterior, holes)| Polygon::new(exterior, holes))
            .collect(),
    )
}

fn record_name(record: &Record) -> Option<String> {
    NAME_FIELDS.iter().find_map(|field| match record.get(field) {
        Some(FieldValue::Character(Some(value))) if !value.trim().is_empty() => {
            Some(value.trim().to_string())
        }
        _ => None,
    })
}
