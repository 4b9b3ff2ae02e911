#![allow(dead_code)]

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lulc_dash::compute::{AssetManifest, BandFile, MANIFEST_FILE};
use lulc_dash::config::AppConfig;
use tiff::encoder::{colortype, TiffEncoder};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores the variables on unwind and serializes access to the process
/// environment, which tests running in parallel would otherwise race on.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

// =============================================================================
// Fixture dataset
// =============================================================================

pub const ASSET_ID: &str = "test/mapbiomas";
pub const REGION: &str = "Alcântara";
pub const WIDTH: usize = 10;
pub const HEIGHT: usize = 10;
/// `[min_lon, min_lat, max_lon, max_lat]`
pub const BOUNDS: [f64; 4] = [-45.0, -3.0, -44.9, -2.9];

/// Raw MapBiomas codes: forest formation, pasture, river.
pub const RAW_FOREST: u8 = 3;
pub const RAW_PASTURE: u8 = 15;
pub const RAW_WATER: u8 = 33;

/// 2023: forest in the western half, pasture in the eastern half.
pub fn band_2023() -> Vec<u8> {
    (0..WIDTH * HEIGHT)
        .map(|i| if i % WIDTH < 5 { RAW_FOREST } else { RAW_PASTURE })
        .collect()
}

/// 2022: all water.
pub fn band_2022() -> Vec<u8> {
    vec![RAW_WATER; WIDTH * HEIGHT]
}

pub fn write_tiff(path: &Path, width: u32, height: u32, data: &[u8]) {
    let file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    encoder
        .write_image::<colortype::Gray8>(width, height, data)
        .unwrap();
}

/// Write a two-year asset directory under `dir`.
pub fn write_asset(dir: &Path) -> PathBuf {
    let asset_dir = dir.join("asset");
    std::fs::create_dir_all(&asset_dir).unwrap();
    let bands = [("classification_2022", band_2022()), ("classification_2023", band_2023())];
    for (name, data) in &bands {
        write_tiff(
            &asset_dir.join(format!("{}.tif", name)),
            WIDTH as u32,
            HEIGHT as u32,
            data,
        );
    }
    let manifest = AssetManifest {
        asset_id: ASSET_ID.to_string(),
        width: WIDTH,
        height: HEIGHT,
        bounds: BOUNDS,
        nodata: None,
        bands: bands
            .iter()
            .map(|(name, _)| BandFile {
                name: name.to_string(),
                file: PathBuf::from(format!("{}.tif", name)),
            })
            .collect(),
    };
    std::fs::write(
        asset_dir.join(MANIFEST_FILE),
        serde_json::to_string_pretty(&manifest).unwrap(),
    )
    .unwrap();
    asset_dir
}

/// Polygon over the western half of the fixture grid.
pub fn western_half_geojson() -> serde_json::Value {
    serde_json::json!({
        "type": "Polygon",
        "coordinates": [[[-45.0, -3.0], [-44.95, -3.0], [-44.95, -2.9], [-45.0, -2.9], [-45.0, -3.0]]]
    })
}

/// Municipality boundaries with one region over the western half.
pub fn write_regions(dir: &Path) -> PathBuf {
    let path = dir.join("municipios.geojson");
    let collection = serde_json::json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "NM_MUNICIP": REGION },
                "geometry": western_half_geojson()
            },
            {
                "type": "Feature",
                "properties": { "NM_MUNICIP": "Longe" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-50.0, -10.0], [-49.0, -10.0], [-49.0, -9.0], [-50.0, -10.0]]]
                }
            }
        ]
    });
    std::fs::write(&path, collection.to_string()).unwrap();
    path
}

pub const INSURANCE_CSV: &str = "\
SG_UF_PROPRIEDADE;NM_RAZAO_SOCIAL;NR_APOLICE;NR_AREA_TOTAL;VL_PREMIO_LIQUIDO;VL_LIMITE_GARANTIA;NR_PRODUTIVIDADE_ESTIMADA;NR_PRODUTIVIDADE_SEGURADA;VL_SUBVENCAO_FEDERAL
MA;Seguradora A;001;10,5;100,00;1000;50;40;20
PI;Seguradora A;002;20;400,00;3000;60;45;60
MA;Seguradora B;003;30;200,00;2000;70;50;30
";

pub const STATES_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"SIGLA_UF": "MA", "NM_UF": "Maranhão"},
     "geometry": {"type": "Polygon", "coordinates": [[[-48,-10],[-41,-10],[-41,-1],[-48,-10]]]}},
    {"type": "Feature", "properties": {"SIGLA_UF": "PI", "NM_UF": "Piauí"},
     "geometry": {"type": "Polygon", "coordinates": [[[-46,-11],[-40,-11],[-40,-3],[-46,-11]]]}}
  ]
}"#;

/// Configuration over fixture files written to `dir`: one km² per pixel and
/// all data sources present. Pass `with_insurance = false` to leave the
/// insurance export missing.
pub fn fixture_config(dir: &Path, with_insurance: bool) -> AppConfig {
    let asset_dir = write_asset(dir);
    let regions = write_regions(dir);
    let records = dir.join("sisser.csv");
    let states = dir.join("estados.geojson");
    if with_insurance {
        std::fs::write(&records, INSURANCE_CSV).unwrap();
        std::fs::write(&states, STATES_GEOJSON).unwrap();
    }

    let toml = format!(
        r#"
[dataset]
asset_id = "{asset_id}"
asset_dir = "{asset_dir}"
first_year = 2022
last_year = 2023

[reduction]
pixel_area = {{ constant = 1000000.0 }}

[regions]
path = "{regions}"

[insurance]
records_path = "{records}"
states_path = "{states}"
"#,
        asset_id = ASSET_ID,
        asset_dir = toml_path(&asset_dir),
        regions = toml_path(&regions),
        records = toml_path(&records),
        states = toml_path(&states),
    );
    AppConfig::from_toml_str(&toml).unwrap()
}

fn toml_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}
