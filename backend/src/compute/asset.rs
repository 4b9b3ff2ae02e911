//! Local classification asset store.
//!
//! An asset directory holds a `manifest.json` and one single-band 8-bit (or
//! 16-bit with values below 256) TIFF per band:
//!
//! ```text
//! assets/mapbiomas/
//!   manifest.json
//!   classification_1985.tif
//!   ...
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tiff::decoder::{Decoder, DecodingResult};
use tracing::{debug, info};

use super::error::{ComputeError, ComputeResult, ErrorContext};
use crate::models::GridSpec;

pub const MANIFEST_FILE: &str = "manifest.json";

/// One band file listed in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandFile {
    pub name: String,
    pub file: PathBuf,
}

/// Description of a local asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetManifest {
    pub asset_id: String,
    pub width: usize,
    pub height: usize,
    /// `[min_lon, min_lat, max_lon, max_lat]`
    pub bounds: [f64; 4],
    /// Raw value marking pixels without data.
    #[serde(default)]
    pub nodata: Option<u8>,
    pub bands: Vec<BandFile>,
}

impl AssetManifest {
    pub fn grid(&self) -> ComputeResult<GridSpec> {
        let [min_lon, min_lat, max_lon, max_lat] = self.bounds;
        Ok(GridSpec::new(
            self.width,
            self.height,
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        )?)
    }
}

/// In-memory bands of one asset sharing a single grid.
#[derive(Debug, Clone)]
pub struct AssetStore {
    asset_id: String,
    grid: GridSpec,
    nodata: Option<u8>,
    bands: BTreeMap<String, Arc<Vec<u8>>>,
}

impl AssetStore {
    /// Build a store from bands already in memory. Every band must fit `grid`.
    pub fn from_bands(
        asset_id: impl Into<String>,
        grid: GridSpec,
        nodata: Option<u8>,
        bands: impl IntoIterator<Item = (String, Vec<u8>)>,
    ) -> ComputeResult<Self> {
        let asset_id = asset_id.into();
        let mut store = BTreeMap::new();
        for (name, data) in bands {
            if data.len() != grid.len() {
                return Err(ComputeError::asset_load(
                    format!("band has {} values, grid needs {}", data.len(), grid.len()),
                    ErrorContext::new("from_bands")
                        .with_asset(asset_id.clone())
                        .with_band(name),
                ));
            }
            store.insert(name, Arc::new(data));
        }
        Ok(Self {
            asset_id,
            grid,
            nodata,
            bands: store,
        })
    }

    /// Load an asset directory.
    pub fn open(dir: impl AsRef<Path>) -> ComputeResult<Self> {
        let dir = dir.as_ref();
        let manifest_path = dir.join(MANIFEST_FILE);
        let context = || ErrorContext::new("open").with_details(manifest_path.display().to_string());

        let text = std::fs::read_to_string(&manifest_path)
            .map_err(|e| ComputeError::asset_load(e.to_string(), context()))?;
        let manifest: AssetManifest = serde_json::from_str(&text)
            .map_err(|e| ComputeError::asset_load(format!("invalid manifest: {}", e), context()))?;
        let grid = manifest.grid()?;

        let mut bands = Vec::with_capacity(manifest.bands.len());
        for band in &manifest.bands {
            let path = dir.join(&band.file);
            let data = read_band_tiff(&path, &grid).map_err(|message| {
                ComputeError::asset_load(
                    message,
                    ErrorContext::new("load_band")
                        .with_asset(manifest.asset_id.clone())
                        .with_band(band.name.clone())
                        .with_details(path.display().to_string()),
                )
            })?;
            debug!(band = %band.name, pixels = data.len(), "band loaded");
            bands.push((band.name.clone(), data));
        }

        let store = Self::from_bands(manifest.asset_id, grid, manifest.nodata, bands)?;
        info!(
            asset = %store.asset_id,
            bands = store.bands.len(),
            width = grid.width,
            height = grid.height,
            "classification asset loaded"
        );
        Ok(store)
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn nodata(&self) -> Option<u8> {
        self.nodata
    }

    pub fn band_names(&self) -> Vec<String> {
        self.bands.keys().cloned().collect()
    }

    pub fn band(&self, name: &str) -> ComputeResult<&Arc<Vec<u8>>> {
        self.bands.get(name).ok_or_else(|| ComputeError::BandNotFound {
            asset: self.asset_id.clone(),
            band: name.to_string(),
        })
    }
}

fn read_band_tiff(path: &Path, grid: &GridSpec) -> Result<Vec<u8>, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    let mut decoder = Decoder::new(BufReader::new(file)).map_err(|e| e.to_string())?;
    let (width, height) = decoder.dimensions().map_err(|e| e.to_string())?;
    if width as usize != grid.width || height as usize != grid.height {
        return Err(format!(
            "band is {}x{}, manifest grid is {}x{}",
            width, height, grid.width, grid.height
        ));
    }
    match decoder.read_image().map_err(|e| e.to_string())? {
        DecodingResult::U8(data) => Ok(data),
        DecodingResult::U16(data) => data
            .into_iter()
            .map(|v| u8::try_from(v).map_err(|_| format!("class value {} does not fit in 8 bits", v)))
            .collect(),
        _ => Err("unsupported pixel format; expected 8 or 16 bit unsigned".to_string()),
    }
}
