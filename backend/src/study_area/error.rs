//! Errors raised while turning user input into a study area.

/// Failure of one study-area input channel.
#[derive(Debug, thiserror::Error)]
pub enum StudyAreaError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("invalid GeoJSON: {0}")]
    InvalidGeoJson(String),

    #[error("unsupported geometry type '{0}'; expected Polygon or MultiPolygon")]
    UnsupportedGeometry(String),

    #[error("feature collection has no features")]
    EmptyFeatureCollection,

    #[error("feature has no geometry")]
    MissingGeometry,

    #[error("geometry has no polygon with at least three distinct vertices")]
    EmptyGeometry,

    #[error("coordinate ({x}, {y}) is not a WGS84 longitude/latitude")]
    CoordinatesOutOfRange { x: f64, y: f64 },

    #[error("shapefile bundle is missing the {missing} component")]
    IncompleteShapefile { missing: String },

    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    #[error("failed to read shapefile: {0}")]
    Shapefile(String),

    #[error("shapefile contains no polygon record")]
    NoPolygonRecord,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("region '{0}' not found")]
    RegionNotFound(String),

    #[error("failed to load boundary dataset: {0}")]
    BoundaryLoad(String),
}

impl StudyAreaError {
    /// Short machine-readable code used in API error bodies and attempt reports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "INVALID_JSON",
            Self::InvalidGeoJson(_) => "INVALID_GEOJSON",
            Self::UnsupportedGeometry(_) => "UNSUPPORTED_GEOMETRY",
            Self::EmptyFeatureCollection => "EMPTY_FEATURE_COLLECTION",
            Self::MissingGeometry => "MISSING_GEOMETRY",
            Self::EmptyGeometry => "EMPTY_GEOMETRY",
            Self::CoordinatesOutOfRange { .. } => "COORDINATES_OUT_OF_RANGE",
            Self::IncompleteShapefile { .. } => "INCOMPLETE_SHAPEFILE",
            Self::InvalidUpload(_) => "INVALID_UPLOAD",
            Self::Shapefile(_) => "SHAPEFILE_ERROR",
            Self::NoPolygonRecord => "NO_POLYGON_RECORD",
            Self::Io(_) => "IO_ERROR",
            Self::RegionNotFound(_) => "REGION_NOT_FOUND",
            Self::BoundaryLoad(_) => "BOUNDARY_LOAD_FAILED",
        }
    }
}
