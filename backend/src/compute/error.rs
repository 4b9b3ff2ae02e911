//! Error types for band evaluation and reductions.

use std::fmt;

use crate::models::{ClassificationError, RasterError};

/// Result type for compute-engine operations.
pub type ComputeResult<T> = Result<T, ComputeError>;

/// Where in the engine an error happened.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation being performed (e.g. "load_band", "reduce").
    pub operation: Option<String>,
    /// Asset id involved.
    pub asset: Option<String>,
    /// Band name involved.
    pub band: Option<String>,
    pub details: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    pub fn with_asset(mut self, asset: impl Into<String>) -> Self {
        self.asset = Some(asset.into());
        self
    }

    pub fn with_band(mut self, band: impl Into<String>) -> Self {
        self.band = Some(band.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref asset) = self.asset {
            parts.push(format!("asset={}", asset));
        }
        if let Some(ref band) = self.band {
            parts.push(format!("band={}", band));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    #[error("band '{band}' not found in asset '{asset}'")]
    BandNotFound { asset: String, band: String },

    #[error("asset '{requested}' is not served by this engine (serving '{served}')")]
    AssetMismatch { requested: String, served: String },

    #[error("no classification asset is loaded")]
    NoAsset,

    #[error("study area does not intersect the asset extent")]
    OutsideExtent,

    #[error("reduction needs {pixels} pixels, above the limit of {max_pixels}")]
    TooManyPixels { pixels: u64, max_pixels: u64 },

    #[error("invalid reduction parameters: {0}")]
    InvalidParams(String),

    #[error("failed to load asset: {message} {context}")]
    AssetLoad {
        message: String,
        context: ErrorContext,
    },

    #[error("compute task failed: {0}")]
    TaskFailed(String),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Raster(#[from] RasterError),
}

impl ComputeError {
    pub fn asset_load(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::AssetLoad {
            message: message.into(),
            context,
        }
    }

    /// Whether the failure comes from the request rather than the engine.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::BandNotFound { .. }
                | Self::OutsideExtent
                | Self::TooManyPixels { .. }
                | Self::InvalidParams(_)
        )
    }
}
