//! Application configuration file support.
//!
//! Settings are read from a TOML file. Every field has a default, so an empty
//! file (or none at all) reproduces the reference MapBiomas dashboard.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::compute::{EngineType, ReductionParams};
use crate::models::{
    ClassificationCodeMap, ClassificationError, CodeMapSpec, Legend, LegendEntry, UnmappedPolicy,
    YearRange,
};
use crate::services::AggregationOptions;
use crate::study_area::DEFAULT_NAME_PROPERTY;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "LULC_CONFIG";
pub const CONFIG_FILE_NAME: &str = "lulc.toml";

pub const MAPBIOMAS_ASSET_ID: &str =
    "projects/mapbiomas-public/assets/brazil/lulc/collection9/mapbiomas_collection90_integration_v1";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Classification(#[from] ClassificationError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub dataset: DatasetSettings,
    #[serde(default)]
    pub reduction: ReductionParams,
    #[serde(default)]
    pub classification: ClassificationSettings,
    #[serde(default)]
    pub regions: RegionSettings,
    #[serde(default)]
    pub statistics: StatisticsSettings,
    #[serde(default)]
    pub insurance: InsuranceSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request body ceiling; shapefile uploads arrive base64-encoded.
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_body_limit_mb() -> usize {
    50
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_mb: default_body_limit_mb(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSettings {
    #[serde(default = "default_asset_id")]
    pub asset_id: String,
    #[serde(default = "default_asset_dir")]
    pub asset_dir: PathBuf,
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default = "default_first_year")]
    pub first_year: i32,
    #[serde(default = "default_last_year")]
    pub last_year: i32,
}

fn default_asset_id() -> String {
    MAPBIOMAS_ASSET_ID.to_string()
}

fn default_asset_dir() -> PathBuf {
    PathBuf::from("data/mapbiomas")
}

fn default_engine() -> String {
    "local".to_string()
}

fn default_first_year() -> i32 {
    1985
}

fn default_last_year() -> i32 {
    2023
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            asset_id: default_asset_id(),
            asset_dir: default_asset_dir(),
            engine: default_engine(),
            first_year: default_first_year(),
            last_year: default_last_year(),
        }
    }
}

impl DatasetSettings {
    pub fn year_range(&self) -> Result<YearRange, ConfigError> {
        YearRange::new(self.first_year, self.last_year).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "dataset.first_year {} is after dataset.last_year {}",
                self.first_year, self.last_year
            ))
        })
    }

    pub fn engine_type(&self) -> Result<EngineType, ConfigError> {
        EngineType::from_str(&self.engine).map_err(ConfigError::Invalid)
    }
}

/// Code map and legend. Omitted lists fall back to the MapBiomas defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationSettings {
    #[serde(default = "default_codes")]
    pub codes: Vec<u8>,
    #[serde(default = "default_new_classes")]
    pub new_classes: Vec<u8>,
    #[serde(default)]
    pub unmapped: UnmappedPolicy,
    #[serde(default = "default_legend")]
    pub legend: Vec<LegendEntry>,
}

fn default_codes() -> Vec<u8> {
    CodeMapSpec::from(ClassificationCodeMap::mapbiomas_default()).codes
}

fn default_new_classes() -> Vec<u8> {
    CodeMapSpec::from(ClassificationCodeMap::mapbiomas_default()).new_classes
}

fn default_legend() -> Vec<LegendEntry> {
    Legend::mapbiomas_default().into()
}

impl Default for ClassificationSettings {
    fn default() -> Self {
        Self {
            codes: default_codes(),
            new_classes: default_new_classes(),
            unmapped: UnmappedPolicy::default(),
            legend: default_legend(),
        }
    }
}

impl ClassificationSettings {
    pub fn code_map(&self) -> Result<ClassificationCodeMap, ConfigError> {
        Ok(ClassificationCodeMap::new(&self.codes, &self.new_classes)?.with_unmapped(self.unmapped))
    }

    pub fn legend(&self) -> Result<Legend, ConfigError> {
        Ok(Legend::new(self.legend.clone())?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSettings {
    #[serde(default = "default_regions_path")]
    pub path: PathBuf,
    #[serde(default = "default_name_property")]
    pub name_property: String,
}

fn default_regions_path() -> PathBuf {
    PathBuf::from("assets/municipios_ma.geojson")
}

fn default_name_property() -> String {
    DEFAULT_NAME_PROPERTY.to_string()
}

impl Default for RegionSettings {
    fn default() -> Self {
        Self {
            path: default_regions_path(),
            name_property: default_name_property(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsSettings {
    #[serde(default = "default_true")]
    pub fill_missing_categories: bool,
    #[serde(default = "default_true")]
    pub require_study_area: bool,
}

fn default_true() -> bool {
    true
}

impl Default for StatisticsSettings {
    fn default() -> Self {
        Self {
            fill_missing_categories: true,
            require_study_area: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceSettings {
    #[serde(default = "default_records_path")]
    pub records_path: PathBuf,
    #[serde(default = "default_states_path")]
    pub states_path: PathBuf,
}

fn default_records_path() -> PathBuf {
    PathBuf::from("assets/sisser.csv")
}

fn default_states_path() -> PathBuf {
    PathBuf::from("assets/BR_UF_2020_filtrado.geojson")
}

impl Default for InsuranceSettings {
    fn default() -> Self {
        Self {
            records_path: default_records_path(),
            states_path: default_states_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location.
    ///
    /// `LULC_CONFIG` names the file explicitly. Otherwise `lulc.toml` is
    /// searched in the current directory, `backend/` and the parent
    /// directory. Without any file the defaults are used.
    pub fn from_default_location() -> Result<Self, ConfigError> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::from_file(path);
        }

        let search_paths = vec![
            PathBuf::from(CONFIG_FILE_NAME),
            PathBuf::from("backend").join(CONFIG_FILE_NAME),
            PathBuf::from("..").join(CONFIG_FILE_NAME),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Apply `HOST` and `PORT` from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = env::var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = env::var("PORT").ok().and_then(|s| s.parse().ok()) {
            self.server.port = port;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dataset.year_range()?;
        self.dataset.engine_type()?;
        self.reduction
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let map = self.classification.code_map()?;
        let legend = self.classification.legend()?;
        legend.validate_covers(&map)?;
        Ok(())
    }

    pub fn aggregation_options(&self) -> AggregationOptions {
        AggregationOptions {
            params: self.reduction,
            fill_missing_categories: self.statistics.fill_missing_categories,
            require_study_area: self.statistics.require_study_area,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::PixelArea;
    use crate::models::CategoryCode;

    #[test]
    fn test_empty_file_gives_reference_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.dataset.asset_id, MAPBIOMAS_ASSET_ID);
        assert_eq!(config.dataset.year_range().unwrap().len(), 39);
        assert_eq!(config.reduction.scale_m, 30.0);
        assert_eq!(config.reduction.max_pixels, 10_000_000_000_000);
        assert_eq!(config.classification.code_map().unwrap().len(), 38);
        assert_eq!(config.classification.legend().unwrap().codes().len(), 7);
        assert_eq!(config.regions.name_property, "NM_MUNICIP");
        assert!(config.statistics.require_study_area);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_parse_custom_config() {
        let toml = r##"
[server]
port = 9000

[dataset]
asset_dir = "/srv/mapbiomas"
first_year = 2000
last_year = 2010

[reduction]
scale_m = 60.0
pixel_area = { constant = 1.0 }

[classification]
codes = [1, 2]
new_classes = [1, 1]
unmapped = { default = 0 }

[[classification.legend]]
code = 0
name = "Outros"
color = "#ffffff"

[[classification.legend]]
code = 1
name = "Floresta"
color = "#1f8d49"

[statistics]
fill_missing_categories = false
"##;
        let config = AppConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.dataset.asset_dir, PathBuf::from("/srv/mapbiomas"));
        assert_eq!(config.dataset.year_range().unwrap().len(), 11);
        assert_eq!(config.reduction.pixel_area, PixelArea::Constant(1.0));
        let map = config.classification.code_map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.unmapped_policy(), UnmappedPolicy::Default(CategoryCode(0)));

        let options = config.aggregation_options();
        assert!(!options.fill_missing_categories);
        assert!(options.require_study_area);
        assert_eq!(options.params.scale_m, 60.0);
    }

    #[test]
    fn test_invalid_year_range_rejected() {
        let err = AppConfig::from_toml_str("[dataset]\nfirst_year = 2020\nlast_year = 2000\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_legend_must_cover_code_map() {
        let toml = r##"
[classification]
codes = [1]
new_classes = [9]
"##;
        let err = AppConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Classification(_)));
    }

    #[test]
    fn test_unknown_engine_rejected() {
        let err = AppConfig::from_toml_str("[dataset]\nengine = \"cloud\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lulc.toml");
        fs::write(&path, "[server]\nhost = \"127.0.0.1\"\n").unwrap();
        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(AppConfig::from_file(dir.path().join("missing.toml")).is_err());
    }
}
