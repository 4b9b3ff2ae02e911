//! Geospatial compute engine.
//!
//! Band expressions built by the remapper are lazy; this module is where they
//! are materialized and reduced. The [`LandCoverEngine`] trait is the seam the
//! services talk to, so an engine backed by a remote service can replace the
//! in-process [`LocalEngine`] without touching the aggregation code.
//!
//! ```text
//! services (remap, area_stats, map_layers)
//!         │  BandExpr + StudyArea
//!         ▼
//! LandCoverEngine (trait) ── LocalEngine ── AssetStore (manifest + TIFF bands)
//! ```

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{BandExpr, CategoryCode, CategoryRaster, GridSpec, StudyArea};

pub mod asset;
mod error;
pub mod factory;
pub mod geodesy;
#[cfg(feature = "local-engine")]
pub mod local;
pub mod mask;

pub use asset::{AssetManifest, AssetStore, BandFile, MANIFEST_FILE};
pub use error::{ComputeError, ComputeResult, ErrorContext};
pub use factory::{EngineFactory, EngineType};
pub use geodesy::PixelArea;
#[cfg(feature = "local-engine")]
pub use local::LocalEngine;
pub use mask::CoverageMask;

/// Reference sampling scale of the MapBiomas collection, in metres.
pub const DEFAULT_SCALE_M: f64 = 30.0;

/// Reference cost ceiling of one reduction.
pub const DEFAULT_MAX_PIXELS: u64 = 10_000_000_000_000;

/// Parameters of a region reduction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReductionParams {
    /// Sampling scale in metres. Coarser than the native pixel size means
    /// nearest-neighbour sampling of one pixel per block.
    #[serde(default = "default_scale_m")]
    pub scale_m: f64,
    /// Upper bound on the number of sampled pixels.
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,
    #[serde(default)]
    pub pixel_area: PixelArea,
}

fn default_scale_m() -> f64 {
    DEFAULT_SCALE_M
}

fn default_max_pixels() -> u64 {
    DEFAULT_MAX_PIXELS
}

impl Default for ReductionParams {
    fn default() -> Self {
        Self {
            scale_m: DEFAULT_SCALE_M,
            max_pixels: DEFAULT_MAX_PIXELS,
            pixel_area: PixelArea::Geodesic,
        }
    }
}

impl ReductionParams {
    pub fn validate(&self) -> ComputeResult<()> {
        if !(self.scale_m.is_finite() && self.scale_m > 0.0) {
            return Err(ComputeError::InvalidParams(format!(
                "scale_m must be a positive number, got {}",
                self.scale_m
            )));
        }
        if self.max_pixels == 0 {
            return Err(ComputeError::InvalidParams(
                "max_pixels must be greater than zero".to_string(),
            ));
        }
        if let PixelArea::Constant(units) = self.pixel_area {
            if !(units.is_finite() && units >= 0.0) {
                return Err(ComputeError::InvalidParams(format!(
                    "constant pixel area must be a non-negative number, got {}",
                    units
                )));
            }
        }
        Ok(())
    }

    /// Native pixels per sampled block side at this scale.
    pub fn block_size(&self, native_resolution_m: f64) -> usize {
        if native_resolution_m <= 0.0 {
            return 1;
        }
        (self.scale_m / native_resolution_m).round().max(1.0) as usize
    }
}

/// Evaluates and reduces land-cover band expressions.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; one engine is shared by every request.
#[async_trait]
pub trait LandCoverEngine: Send + Sync {
    /// Identifier of the classification asset this engine serves.
    fn asset_id(&self) -> &str;

    /// Band names available in the asset.
    fn band_names(&self) -> Vec<String>;

    /// Grid of the asset, `None` when nothing is loaded.
    fn grid(&self) -> Option<GridSpec>;

    /// Materialize a band, clipped to `region` when one is given.
    ///
    /// Pixels outside the region or without data are marked invalid.
    async fn evaluate(
        &self,
        band: &BandExpr,
        region: Option<&StudyArea>,
    ) -> ComputeResult<CategoryRaster>;

    /// Sum of pixel area in m² for each requested category inside `region`.
    ///
    /// Categories present in the request but absent from the region map to 0.
    /// Valid pixels holding any other value are summed under their own value.
    /// An empty map means no valid pixel was sampled at all.
    async fn reduce_category_areas(
        &self,
        band: &BandExpr,
        region: Option<&StudyArea>,
        categories: &[CategoryCode],
        params: &ReductionParams,
    ) -> ComputeResult<BTreeMap<CategoryCode, f64>>;
}
