//! In-process engine evaluating band expressions over an [`AssetStore`].

use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::asset::AssetStore;
use super::mask::CoverageMask;
use super::{ComputeError, ComputeResult, LandCoverEngine, ReductionParams};
use crate::models::{
    BandExpr, CategoryCode, CategoryRaster, ClassCode, ClassificationCodeMap,
    ClassificationError, GridSpec, StudyArea,
};

/// Engine over a local asset. An engine built with [`LocalEngine::empty`]
/// serves nothing and fails every evaluation with [`ComputeError::NoAsset`].
#[derive(Debug, Clone, Default)]
pub struct LocalEngine {
    store: Option<Arc<AssetStore>>,
}

impl LocalEngine {
    pub fn new(store: AssetStore) -> Self {
        Self {
            store: Some(Arc::new(store)),
        }
    }

    pub fn open(dir: impl AsRef<Path>) -> ComputeResult<Self> {
        AssetStore::open(dir).map(Self::new)
    }

    pub fn from_bands(
        asset_id: impl Into<String>,
        grid: GridSpec,
        bands: impl IntoIterator<Item = (String, Vec<u8>)>,
    ) -> ComputeResult<Self> {
        AssetStore::from_bands(asset_id, grid, None, bands).map(Self::new)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.store.is_some()
    }

    fn store(&self) -> ComputeResult<Arc<AssetStore>> {
        self.store.clone().ok_or(ComputeError::NoAsset)
    }
}

#[async_trait]
impl LandCoverEngine for LocalEngine {
    fn asset_id(&self) -> &str {
        self.store.as_ref().map(|s| s.asset_id()).unwrap_or("")
    }

    fn band_names(&self) -> Vec<String> {
        self.store
            .as_ref()
            .map(|s| s.band_names())
            .unwrap_or_default()
    }

    fn grid(&self) -> Option<GridSpec> {
        self.store.as_ref().map(|s| *s.grid())
    }

    async fn evaluate(
        &self,
        band: &BandExpr,
        region: Option<&StudyArea>,
    ) -> ComputeResult<CategoryRaster> {
        let store = self.store()?;
        let band = band.clone();
        let region = region.cloned();
        tokio::task::spawn_blocking(move || evaluate_band(&store, &band, region.as_ref()))
            .await
            .map_err(|e| ComputeError::TaskFailed(e.to_string()))?
    }

    async fn reduce_category_areas(
        &self,
        band: &BandExpr,
        region: Option<&StudyArea>,
        categories: &[CategoryCode],
        params: &ReductionParams,
    ) -> ComputeResult<BTreeMap<CategoryCode, f64>> {
        let store = self.store()?;
        let band = band.clone();
        let region = region.cloned();
        let categories = categories.to_vec();
        let params = *params;
        tokio::task::spawn_blocking(move || {
            reduce_areas(&store, &band, region.as_ref(), &categories, &params)
        })
        .await
        .map_err(|e| ComputeError::TaskFailed(e.to_string()))?
    }
}

fn check_asset(store: &AssetStore, expr: &BandExpr) -> ComputeResult<()> {
    if expr.asset_id() != store.asset_id() {
        return Err(ComputeError::AssetMismatch {
            requested: expr.asset_id().to_string(),
            served: store.asset_id().to_string(),
        });
    }
    Ok(())
}

fn coverage(store: &AssetStore, region: Option<&StudyArea>) -> Option<CoverageMask> {
    match region {
        Some(area) => CoverageMask::rasterize(store.grid(), area.geometry()),
        None => Some(CoverageMask::full(store.grid())),
    }
}

/// Pixel values of `expr` over a window; `None` where the asset has no data.
fn materialize(
    store: &AssetStore,
    expr: &BandExpr,
    rows: &Range<usize>,
    cols: &Range<usize>,
) -> ComputeResult<Vec<Option<u8>>> {
    match expr {
        BandExpr::Asset { band, .. } => {
            let data = store.band(band)?;
            let width = store.grid().width;
            let nodata = store.nodata();
            let mut out = Vec::with_capacity(rows.len() * cols.len());
            for row in rows.clone() {
                let line = &data[row * width + cols.start..row * width + cols.end];
                out.extend(line.iter().map(|&v| (Some(v) != nodata).then_some(v)));
            }
            Ok(out)
        }
        BandExpr::Remap { source, map } => {
            let table = remap_table(map);
            materialize(store, source, rows, cols)?
                .into_iter()
                .map(|value| match value {
                    Some(v) => table[v as usize]
                        .clone()
                        .map(Some)
                        .map_err(ComputeError::from),
                    None => Ok(None),
                })
                .collect()
        }
    }
}

/// Result of remapping every possible raw value.
fn remap_table(map: &ClassificationCodeMap) -> Vec<Result<u8, ClassificationError>> {
    (0..=u8::MAX)
        .map(|v| map.apply(ClassCode(v)).map(|c| c.value()))
        .collect()
}

fn evaluate_band(
    store: &AssetStore,
    expr: &BandExpr,
    region: Option<&StudyArea>,
) -> ComputeResult<CategoryRaster> {
    check_asset(store, expr)?;
    let mask = coverage(store, region).ok_or(ComputeError::OutsideExtent)?;
    let (rows, cols) = (mask.rows(), mask.cols());
    let values = materialize(store, expr, &rows, &cols)?;

    let grid = store.grid();
    let sub = GridSpec::new(
        cols.len(),
        rows.len(),
        grid.min_lon + cols.start as f64 * grid.pixel_width_deg(),
        grid.min_lon + cols.end as f64 * grid.pixel_width_deg(),
        grid.max_lat - rows.end as f64 * grid.pixel_height_deg(),
        grid.max_lat - rows.start as f64 * grid.pixel_height_deg(),
    )?;
    let fill = store.nodata().unwrap_or(0);
    let data = values.iter().map(|v| v.unwrap_or(fill)).collect();
    let mut raster = CategoryRaster::new(sub, data)?;
    for (i, row) in rows.clone().enumerate() {
        for (j, col) in cols.clone().enumerate() {
            let idx = i * cols.len() + j;
            raster.valid[idx] = values[idx].is_some() && mask.contains(row, col);
        }
    }
    debug!(band = %expr, valid = raster.valid_count(), "band evaluated");
    Ok(raster)
}

fn reduce_areas(
    store: &AssetStore,
    expr: &BandExpr,
    region: Option<&StudyArea>,
    categories: &[CategoryCode],
    params: &ReductionParams,
) -> ComputeResult<BTreeMap<CategoryCode, f64>> {
    params.validate()?;
    check_asset(store, expr)?;
    let grid = *store.grid();

    let Some(mask) = coverage(store, region) else {
        warn!(band = %expr, "study area does not intersect the asset extent");
        return Ok(BTreeMap::new());
    };
    let (rows, cols) = (mask.rows(), mask.cols());

    let k = params.block_size(grid.native_resolution_m());
    let block_rows = rows.start / k..(rows.end - 1) / k + 1;
    let block_cols = cols.start / k..(cols.end - 1) / k + 1;
    let sampled = (block_rows.len() as u64).saturating_mul(block_cols.len() as u64);
    if sampled > params.max_pixels {
        return Err(ComputeError::TooManyPixels {
            pixels: sampled,
            max_pixels: params.max_pixels,
        });
    }

    let values = materialize(store, expr, &rows, &cols)?;
    let mut sums: BTreeMap<CategoryCode, f64> = categories.iter().map(|c| (*c, 0.0)).collect();
    let mut any_valid = false;

    for block_row in block_rows {
        let top = block_row * k;
        let height = k.min(grid.height - top);
        let row = (top + k / 2).min(grid.height - 1);
        for block_col in block_cols.clone() {
            let left = block_col * k;
            let width = k.min(grid.width - left);
            let col = (left + k / 2).min(grid.width - 1);
            if !mask.contains(row, col) {
                continue;
            }
            let idx = (row - rows.start) * cols.len() + (col - cols.start);
            let Some(value) = values[idx] else {
                continue;
            };
            any_valid = true;
            *sums.entry(CategoryCode(value)).or_insert(0.0) +=
                params.pixel_area.block_weight(&grid, top, height, width);
        }
    }

    if !any_valid {
        return Ok(BTreeMap::new());
    }
    debug!(band = %expr, block = k, sampled, "category areas reduced");
    Ok(sums)
}
