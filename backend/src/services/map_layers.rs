//! Map view description: center, zoom, one classification layer per year and
//! the study-area outline.

use serde::{Deserialize, Serialize};

use crate::compute::{ComputeError, ComputeResult, LandCoverEngine};
use crate::models::{year_band_name, CategoryRaster, GridSpec, ImageStack, Legend, StudyArea};

/// `[lat, lon]` of the default view over Maranhão.
pub const DEFAULT_CENTER: [f64; 2] = [-5.0, -45.0];
pub const DEFAULT_ZOOM: u8 = 6;
pub const AREA_ZOOM: u8 = 9;
pub const OUTLINE_TITLE: &str = "Área de estudo";
pub const OUTLINE_COLOR: &str = "red";
pub const OUTLINE_WIDTH: u8 = 2;

pub fn layer_title(year: i32) -> String {
    format!("Classificação {}", year)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisParams {
    pub min: u8,
    pub max: u8,
    pub palette: Vec<String>,
}

impl VisParams {
    pub fn from_legend(legend: &Legend) -> Self {
        Self {
            min: legend.min_code().map(|c| c.value()).unwrap_or(0),
            max: legend.max_code().map(|c| c.value()).unwrap_or(0),
            palette: legend.palette(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationLayer {
    pub year: i32,
    pub band: String,
    pub title: String,
    pub vis: VisParams,
    /// The layer is clipped to the study area outline.
    pub clipped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineLayer {
    pub title: String,
    pub color: String,
    pub width: u8,
    pub geometry: geojson::Geometry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub asset_id: String,
    /// `[lat, lon]`
    pub center: [f64; 2],
    pub zoom: u8,
    pub outline: Option<OutlineLayer>,
    /// In selection order; the last one draws on top.
    pub layers: Vec<ClassificationLayer>,
}

pub fn build_map_view(
    asset_id: &str,
    years: &[i32],
    area: Option<&StudyArea>,
    legend: &Legend,
) -> MapView {
    let vis = VisParams::from_legend(legend);
    let (center, zoom) = match area.and_then(|a| a.centroid()) {
        Some((lon, lat)) => ([lat, lon], AREA_ZOOM),
        None => (DEFAULT_CENTER, DEFAULT_ZOOM),
    };
    MapView {
        asset_id: asset_id.to_string(),
        center,
        zoom,
        outline: area.map(|a| OutlineLayer {
            title: OUTLINE_TITLE.to_string(),
            color: OUTLINE_COLOR.to_string(),
            width: OUTLINE_WIDTH,
            geometry: a.to_geojson(),
        }),
        layers: years
            .iter()
            .map(|&year| ClassificationLayer {
                year,
                band: year_band_name(year),
                title: layer_title(year),
                vis: vis.clone(),
                clipped: area.is_some(),
            })
            .collect(),
    }
}

/// Materialized pixels of one layer. Masked pixels are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerRaster {
    pub year: i32,
    pub grid: GridSpec,
    pub values: Vec<Option<u8>>,
}

impl From<(i32, CategoryRaster)> for LayerRaster {
    fn from((year, raster): (i32, CategoryRaster)) -> Self {
        let values = raster
            .data
            .iter()
            .zip(&raster.valid)
            .map(|(v, ok)| ok.then_some(*v))
            .collect();
        Self {
            year,
            grid: raster.grid,
            values,
        }
    }
}

/// Pixels of the asset window a layer over `area` would materialize.
fn layer_pixels(grid: &GridSpec, area: Option<&StudyArea>) -> u64 {
    let window = match area {
        Some(area) => area.bounding_rect().and_then(|rect| grid.window(&rect)),
        None => return grid.len() as u64,
    };
    window
        .map(|(rows, cols)| (rows.len() as u64).saturating_mul(cols.len() as u64))
        .unwrap_or(0)
}

/// Evaluate one year's reclassified band, clipped to the study area.
///
/// Fails with [`ComputeError::TooManyPixels`] before reading any pixel when
/// the window exceeds `max_pixels`.
pub async fn render_layer(
    engine: &dyn LandCoverEngine,
    stack: &ImageStack,
    year: i32,
    area: Option<&StudyArea>,
    max_pixels: u64,
) -> ComputeResult<LayerRaster> {
    let band = stack.select_year(year).ok_or_else(|| ComputeError::BandNotFound {
        asset: engine.asset_id().to_string(),
        band: year_band_name(year),
    })?;
    if let Some(grid) = engine.grid() {
        let pixels = layer_pixels(&grid, area);
        if pixels > max_pixels {
            return Err(ComputeError::TooManyPixels { pixels, max_pixels });
        }
    }
    let raster = engine.evaluate(&band.expr, area).await?;
    Ok(LayerRaster::from((year, raster)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AreaSource;
    use geo::{polygon, MultiPolygon};

    fn area() -> StudyArea {
        StudyArea::new(
            "Alcântara",
            AreaSource::NamedRegion,
            MultiPolygon(vec![polygon![
                (x: -45.0, y: -3.0),
                (x: -44.0, y: -3.0),
                (x: -44.0, y: -2.0),
                (x: -45.0, y: -2.0),
                (x: -45.0, y: -3.0),
            ]]),
        )
        .unwrap()
    }

    #[test]
    fn test_default_view_without_area() {
        let view = build_map_view("asset", &[2023], None, &Legend::mapbiomas_default());
        assert_eq!(view.center, DEFAULT_CENTER);
        assert_eq!(view.zoom, 6);
        assert!(view.outline.is_none());
        assert_eq!(view.layers.len(), 1);
        assert_eq!(view.layers[0].title, "Classificação 2023");
        assert_eq!(view.layers[0].band, "classification_2023");
        assert!(!view.layers[0].clipped);
    }

    #[test]
    fn test_area_view_centres_and_outlines() {
        let area = area();
        let view = build_map_view("asset", &[2000, 2010], Some(&area), &Legend::mapbiomas_default());
        assert!((view.center[0] - -2.5).abs() < 1e-9);
        assert!((view.center[1] - -44.5).abs() < 1e-9);
        assert_eq!(view.zoom, 9);
        let outline = view.outline.unwrap();
        assert_eq!(outline.color, "red");
        assert_eq!(outline.width, 2);
        assert_eq!(view.layers.len(), 2);
        assert!(view.layers.iter().all(|l| l.clipped));
    }

    #[test]
    fn test_vis_params_from_default_legend() {
        let vis = VisParams::from_legend(&Legend::mapbiomas_default());
        assert_eq!(vis.min, 0);
        assert_eq!(vis.max, 6);
        assert_eq!(vis.palette.len(), 7);
        assert_eq!(vis.palette[5], "#2532e4");
    }

    #[test]
    fn test_layer_window_pixels() {
        // quarter-degree pixels; the area covers the north-east quadrant
        let grid = GridSpec::new(8, 8, -46.0, -44.0, -4.0, -2.0).unwrap();
        assert_eq!(layer_pixels(&grid, None), 64);
        assert_eq!(layer_pixels(&grid, Some(&area())), 16);
    }

    #[tokio::test]
    async fn test_layer_above_ceiling_is_refused() {
        use crate::compute::LocalEngine;
        use crate::models::ClassificationCodeMap;
        use crate::services::remap::reclassify_bands;
        use std::sync::Arc;

        let grid = GridSpec::new(4, 4, 0.0, 0.04, 0.0, 0.04).unwrap();
        let engine =
            LocalEngine::from_bands("asset", grid, [("classification_2000".to_string(), vec![1; 16])])
                .unwrap();
        let map = Arc::new(ClassificationCodeMap::new(&[1], &[1]).unwrap());
        let stack = reclassify_bands("asset", [2000], &map);

        let err = render_layer(&engine, &stack, 2000, None, 15).await.unwrap_err();
        assert!(matches!(err, ComputeError::TooManyPixels { pixels: 16, max_pixels: 15 }));
        let layer = render_layer(&engine, &stack, 2000, None, 16).await.unwrap();
        assert_eq!(layer.values.len(), 16);
    }

    #[test]
    fn test_layer_raster_masks_invalid_pixels() {
        let grid = GridSpec::new(2, 1, 0.0, 1.0, 0.0, 1.0).unwrap();
        let mut raster = CategoryRaster::new(grid, vec![1, 3]).unwrap();
        raster.valid[1] = false;
        let layer = LayerRaster::from((2020, raster));
        assert_eq!(layer.values, vec![Some(1), None]);
    }
}
