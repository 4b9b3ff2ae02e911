//! Study-area input channels and their resolution into one [`StudyArea`].
//!
//! [`StudyArea`]: crate::models::StudyArea

mod error;
pub mod fingerprint;
pub mod geojson_input;
pub mod regions;
pub mod resolver;
pub mod shapefile_input;

pub use error::StudyAreaError;
pub use regions::{RegionTable, DEFAULT_NAME_PROPERTY};
pub use resolver::{
    ResolutionAttempt, ResolutionOutcome, StudyAreaRequest, StudyAreaResolver, DEFAULT_AREA_NAME,
};
pub use shapefile_input::{ShapefileBundle, UploadedFile};
