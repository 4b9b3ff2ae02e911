//! Engine factory for dependency injection.
//!
//! Builds the land-cover engine named in the configuration. A failure to load
//! the asset never stops the server: the factory logs it and hands out an
//! engine that serves nothing, so every later evaluation reports the problem.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{info, warn};

use super::{ComputeError, ComputeResult, LandCoverEngine};
#[cfg(feature = "local-engine")]
use super::LocalEngine;

/// Engine implementation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineType {
    /// In-process evaluation over a local asset directory
    Local,
}

impl FromStr for EngineType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            _ => Err(format!("Unknown engine type: {}", s)),
        }
    }
}

pub struct EngineFactory;

impl EngineFactory {
    /// Create an engine over the asset at `asset_dir`.
    pub fn create(
        engine_type: EngineType,
        asset_dir: &Path,
    ) -> ComputeResult<Arc<dyn LandCoverEngine>> {
        match engine_type {
            EngineType::Local => {
                #[cfg(feature = "local-engine")]
                {
                    let engine = LocalEngine::open(asset_dir)?;
                    Ok(Arc::new(engine))
                }
                #[cfg(not(feature = "local-engine"))]
                {
                    let _ = asset_dir;
                    Err(ComputeError::asset_load(
                        "local engine feature not enabled",
                        super::ErrorContext::new("create_engine"),
                    ))
                }
            }
        }
    }

    /// An engine with no asset loaded.
    pub fn create_empty() -> Arc<dyn LandCoverEngine> {
        #[cfg(feature = "local-engine")]
        {
            Arc::new(LocalEngine::empty())
        }
        #[cfg(not(feature = "local-engine"))]
        {
            Arc::new(NullEngine)
        }
    }

    /// Create the configured engine, falling back to an empty one on failure.
    ///
    /// `expected_asset_id` is compared with the loaded asset and a mismatch is
    /// logged; requests keep using the configured id.
    pub fn create_or_empty(
        engine: &str,
        asset_dir: &Path,
        expected_asset_id: &str,
    ) -> Arc<dyn LandCoverEngine> {
        let result = engine
            .parse::<EngineType>()
            .map_err(|e| ComputeError::asset_load(e, super::ErrorContext::new("create_engine")))
            .and_then(|t| Self::create(t, asset_dir));
        match result {
            Ok(engine) => {
                if engine.asset_id() != expected_asset_id {
                    warn!(
                        configured = %expected_asset_id,
                        loaded = %engine.asset_id(),
                        "loaded asset id differs from the configured one"
                    );
                }
                info!(asset = %engine.asset_id(), bands = engine.band_names().len(), "compute engine ready");
                engine
            }
            Err(e) => {
                warn!(error = %e, dir = %asset_dir.display(), "compute engine unavailable; land-cover requests will fail");
                Self::create_empty()
            }
        }
    }
}

/// Placeholder used when no engine backend is compiled in.
#[cfg(not(feature = "local-engine"))]
struct NullEngine;

#[cfg(not(feature = "local-engine"))]
#[async_trait::async_trait]
impl LandCoverEngine for NullEngine {
    fn asset_id(&self) -> &str {
        ""
    }

    fn band_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn grid(&self) -> Option<crate::models::GridSpec> {
        None
    }

    async fn evaluate(
        &self,
        _band: &crate::models::BandExpr,
        _region: Option<&crate::models::StudyArea>,
    ) -> ComputeResult<crate::models::CategoryRaster> {
        Err(ComputeError::NoAsset)
    }

    async fn reduce_category_areas(
        &self,
        _band: &crate::models::BandExpr,
        _region: Option<&crate::models::StudyArea>,
        _categories: &[crate::models::CategoryCode],
        _params: &super::ReductionParams,
    ) -> ComputeResult<std::collections::BTreeMap<crate::models::CategoryCode, f64>> {
        Err(ComputeError::NoAsset)
    }
}
