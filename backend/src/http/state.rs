//! Application state for the HTTP server.

use std::sync::Arc;

use tracing::{info, warn};

use crate::compute::{EngineFactory, LandCoverEngine};
use crate::config::{AppConfig, ConfigError};
use crate::models::{ClassificationCodeMap, ImageStack, Legend, YearRange};
use crate::services::{reclassify_bands, AggregationOptions, InsuranceDataset, SessionStore, StateBoundaries};
use crate::study_area::{RegionTable, StudyAreaResolver};

/// Shared application state passed to all handlers.
///
/// Everything except the session store is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub asset_id: Arc<str>,
    pub engine: Arc<dyn LandCoverEngine>,
    pub resolver: StudyAreaResolver,
    pub code_map: Arc<ClassificationCodeMap>,
    pub legend: Arc<Legend>,
    /// Reclassified band of every year of the dataset.
    pub stack: Arc<ImageStack>,
    pub years: YearRange,
    pub options: AggregationOptions,
    pub sessions: SessionStore,
    pub insurance: Option<Arc<InsuranceDataset>>,
    pub state_boundaries: Option<Arc<StateBoundaries>>,
}

impl AppState {
    /// Assemble the state from already loaded parts.
    pub fn new(
        config: &AppConfig,
        engine: Arc<dyn LandCoverEngine>,
        regions: Arc<RegionTable>,
    ) -> Result<Self, ConfigError> {
        let years = config.dataset.year_range()?;
        let code_map = Arc::new(config.classification.code_map()?);
        let legend = Arc::new(config.classification.legend()?);
        legend.validate_covers(&code_map)?;
        let stack = reclassify_bands(&config.dataset.asset_id, years.years(), &code_map);

        Ok(Self {
            asset_id: Arc::from(config.dataset.asset_id.as_str()),
            engine,
            resolver: StudyAreaResolver::new(regions),
            code_map,
            legend,
            stack: Arc::new(stack),
            years,
            options: config.aggregation_options(),
            sessions: SessionStore::new(years),
            insurance: None,
            state_boundaries: None,
        })
    }

    pub fn with_insurance(mut self, dataset: InsuranceDataset, boundaries: Option<StateBoundaries>) -> Self {
        self.insurance = Some(Arc::new(dataset));
        self.state_boundaries = boundaries.map(Arc::new);
        self
    }

    /// Load every data source named in the configuration.
    ///
    /// Only an invalid configuration is fatal. A missing asset, boundary file
    /// or insurance export disables the endpoints that need it.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let engine = EngineFactory::create_or_empty(
            &config.dataset.engine,
            &config.dataset.asset_dir,
            &config.dataset.asset_id,
        );
        let regions = Arc::new(RegionTable::load_or_empty(
            &config.regions.path,
            &config.regions.name_property,
        ));
        let state = Self::new(config, engine, regions)?;

        match InsuranceDataset::load(&config.insurance.records_path) {
            Ok(dataset) => {
                let boundaries = match StateBoundaries::load(&config.insurance.states_path) {
                    Ok(b) => Some(b),
                    Err(e) => {
                        warn!(error = %e, "insurance choropleth disabled");
                        None
                    }
                };
                info!(records = dataset.len(), "insurance dashboard enabled");
                Ok(state.with_insurance(dataset, boundaries))
            }
            Err(e) => {
                warn!(error = %e, "insurance dashboard disabled");
                Ok(state)
            }
        }
    }
}
