//! Disk asset to charts, without the HTTP layer.

mod support;

use std::sync::Arc;

use base64::Engine as _;
use shapefile::dbase::{FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing};

use lulc_dash::compute::EngineFactory;
use lulc_dash::models::{AreaSource, ClassificationCodeMap, Legend};
use lulc_dash::services::{build_charts, compute_area_statistics, reclassify_bands, render_layer};
use lulc_dash::study_area::{RegionTable, StudyAreaRequest, StudyAreaResolver, UploadedFile};

use support::{fixture_config, write_asset, write_regions, ASSET_ID, REGION};

#[tokio::test]
async fn test_statistics_from_disk_asset() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config(dir.path(), false);
    let engine = EngineFactory::create_or_empty("local", &config.dataset.asset_dir, ASSET_ID);
    let regions = Arc::new(RegionTable::load(&config.regions.path, "NM_MUNICIP").unwrap());
    let resolver = StudyAreaResolver::new(regions);
    let area = resolver
        .resolve(&StudyAreaRequest::region(REGION))
        .area
        .unwrap();

    let code_map = Arc::new(ClassificationCodeMap::mapbiomas_default());
    let legend = Legend::mapbiomas_default();
    let stack = reclassify_bands(ASSET_ID, [2022, 2023], &code_map);

    let report = compute_area_statistics(
        engine.as_ref(),
        &stack,
        &[2022, 2023],
        Some(&area),
        &legend,
        &config.aggregation_options(),
    )
    .await
    .unwrap();

    assert!(report.failed_years.is_empty(), "{:?}", report.warnings);
    assert!((report.year_total_km2(2023) - 50.0).abs() < 1e-6);
    assert!((report.year_total_km2(2022) - 50.0).abs() < 1e-6);

    let charts = build_charts(&report.rows, &legend, None);
    let pie = charts.pie.unwrap();
    assert_eq!(pie.year, 2023);
    let forest = pie.slices.iter().find(|s| s.name == "Floresta").unwrap();
    assert!((forest.percent - 100.0).abs() < 1e-9);
    assert!(pie
        .slices
        .iter()
        .filter(|s| s.name != "Floresta")
        .all(|s| s.area_km2 == 0.0));
}

#[tokio::test]
async fn test_unclipped_layer_covers_whole_grid() {
    let dir = tempfile::tempdir().unwrap();
    let asset_dir = write_asset(dir.path());
    let engine = EngineFactory::create_or_empty("local", &asset_dir, ASSET_ID);
    let code_map = Arc::new(ClassificationCodeMap::mapbiomas_default());
    let stack = reclassify_bands(ASSET_ID, [2023], &code_map);

    let layer = render_layer(engine.as_ref(), &stack, 2023, None, 100).await.unwrap();

    assert_eq!(layer.values.len(), 100);
    assert_eq!(layer.values.iter().filter(|v| **v == Some(1)).count(), 50);
    assert_eq!(layer.values.iter().filter(|v| **v == Some(3)).count(), 50);
}

#[tokio::test]
async fn test_missing_asset_fails_each_year() {
    let dir = tempfile::tempdir().unwrap();
    let engine = EngineFactory::create_or_empty("local", &dir.path().join("absent"), ASSET_ID);
    let regions = Arc::new(RegionTable::load(&write_regions(dir.path()), "NM_MUNICIP").unwrap());
    let area = StudyAreaResolver::new(regions)
        .resolve(&StudyAreaRequest::region(REGION))
        .area
        .unwrap();
    let code_map = Arc::new(ClassificationCodeMap::mapbiomas_default());
    let stack = reclassify_bands(ASSET_ID, [2023], &code_map);
    let config = fixture_config(dir.path(), false);

    let report = compute_area_statistics(
        engine.as_ref(),
        &stack,
        &[2023],
        Some(&area),
        &Legend::mapbiomas_default(),
        &config.aggregation_options(),
    )
    .await
    .unwrap();

    assert_eq!(report.failed_years, vec![2023]);
    assert!(!report.warnings.is_empty());
}

/// Write a one-record polygon shapefile and return its components as uploads.
fn shapefile_uploads(dir: &std::path::Path, name: &str) -> Vec<UploadedFile> {
    let shp = dir.join("area.shp");
    {
        let table = TableWriterBuilder::new().add_character_field("name".try_into().unwrap(), 50);
        let mut writer = shapefile::Writer::from_path(&shp, table).unwrap();
        let polygon = Polygon::new(PolygonRing::Outer(vec![
            Point::new(-45.0, -3.0),
            Point::new(-45.0, -2.9),
            Point::new(-44.95, -2.9),
            Point::new(-44.95, -3.0),
            Point::new(-45.0, -3.0),
        ]));
        let mut record = Record::default();
        record.insert("name".to_string(), FieldValue::Character(Some(name.to_string())));
        writer.write_shape_and_record(&polygon, &record).unwrap();
    }

    ["shp", "shx", "dbf"]
        .iter()
        .map(|ext| {
            let bytes = std::fs::read(dir.join(format!("area.{}", ext))).unwrap();
            UploadedFile {
                name: format!("Area.{}", ext.to_uppercase()),
                content_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
            }
        })
        .collect()
}

#[test]
fn test_shapefile_upload_takes_precedence() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = shapefile_uploads(dir.path(), "Fazenda Boa Vista");
    let resolver = StudyAreaResolver::new(Arc::new(RegionTable::empty()));

    let outcome = resolver.resolve(&StudyAreaRequest {
        shapefile: uploads,
        geojson: None,
        region: Some("nowhere".to_string()),
    });

    let area = outcome.area.unwrap();
    assert_eq!(area.name(), "Fazenda Boa Vista");
    assert_eq!(area.source(), AreaSource::Shapefile);
    assert_eq!(outcome.attempts.len(), 1);
    let (lon, lat) = area.centroid().unwrap();
    assert!((lon + 44.975).abs() < 1e-9);
    assert!((lat + 2.95).abs() < 1e-9);
}

#[test]
fn test_incomplete_shapefile_falls_back_to_region() {
    let dir = tempfile::tempdir().unwrap();
    let mut uploads = shapefile_uploads(dir.path(), "x");
    uploads.retain(|u| !u.name.ends_with("DBF"));
    let regions = Arc::new(RegionTable::load(&write_regions(dir.path()), "NM_MUNICIP").unwrap());
    let resolver = StudyAreaResolver::new(regions);

    let outcome = resolver.resolve(&StudyAreaRequest {
        shapefile: uploads,
        geojson: None,
        region: Some(REGION.to_string()),
    });

    assert_eq!(outcome.area.unwrap().name(), REGION);
    assert_eq!(outcome.attempts.len(), 2);
    assert!(!outcome.attempts[0].ok);
    assert_eq!(outcome.attempts[0].error_code.as_deref(), Some("INCOMPLETE_SHAPEFILE"));
}
