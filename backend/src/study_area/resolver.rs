//! Resolution of one study area from the three input channels.
//!
//! Channels are tried in a fixed order: shapefile bundle, pasted GeoJSON,
//! named region. The first channel that yields a valid area wins. A failing
//! channel is recorded in the outcome and the next one is tried.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::geojson_input::{parse_geojson_str, parse_geojson_value};
use super::regions::RegionTable;
use super::shapefile_input::{ShapefileBundle, UploadedFile};
use super::StudyAreaError;
use crate::models::{AreaSource, StudyArea};

/// Area name used when the input carries none.
pub const DEFAULT_AREA_NAME: &str = "Área Carregada";

/// User input for one resolution. Every channel is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyAreaRequest {
    /// Shapefile components (`.shp`, `.shx`, `.dbf`, optionally `.prj`).
    #[serde(default)]
    pub shapefile: Vec<UploadedFile>,
    /// GeoJSON as pasted text or as an embedded JSON object.
    #[serde(default)]
    pub geojson: Option<serde_json::Value>,
    /// Exact name of a region in the boundary dataset.
    #[serde(default)]
    pub region: Option<String>,
}

impl StudyAreaRequest {
    pub fn region(name: impl Into<String>) -> Self {
        Self {
            region: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn geojson_text(text: impl Into<String>) -> Self {
        Self {
            geojson: Some(serde_json::Value::String(text.into())),
            ..Default::default()
        }
    }

    fn has_geojson(&self) -> bool {
        match &self.geojson {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }

    fn region_name(&self) -> Option<&str> {
        self.region.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// True when no channel carries any input.
    pub fn is_empty(&self) -> bool {
        self.shapefile.is_empty() && !self.has_geojson() && self.region_name().is_none()
    }
}

/// Result of trying one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionAttempt {
    pub source: AreaSource,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResolutionAttempt {
    fn success(source: AreaSource) -> Self {
        Self {
            source,
            ok: true,
            error_code: None,
            error: None,
        }
    }

    fn failure(source: AreaSource, error: &StudyAreaError) -> Self {
        Self {
            source,
            ok: false,
            error_code: Some(error.code().to_string()),
            error: Some(error.to_string()),
        }
    }
}

/// The resolved area, if any, and one attempt entry per channel tried.
#[derive(Debug, Clone, Default)]
pub struct ResolutionOutcome {
    pub area: Option<StudyArea>,
    pub attempts: Vec<ResolutionAttempt>,
}

impl ResolutionOutcome {
    /// No channel carried input.
    pub fn is_no_input(&self) -> bool {
        self.attempts.is_empty()
    }

    /// The last channel error, when nothing resolved.
    pub fn last_error(&self) -> Option<&ResolutionAttempt> {
        if self.area.is_some() {
            return None;
        }
        self.attempts.iter().rev().find(|a| !a.ok)
    }
}

/// Resolves study areas against the startup region table.
#[derive(Debug, Clone)]
pub struct StudyAreaResolver {
    regions: Arc<RegionTable>,
}

impl StudyAreaResolver {
    pub fn new(regions: Arc<RegionTable>) -> Self {
        Self { regions }
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    pub fn resolve(&self, request: &StudyAreaRequest) -> ResolutionOutcome {
        let mut outcome = ResolutionOutcome::default();

        if !request.shapefile.is_empty() {
            match resolve_shapefile(&request.shapefile) {
                Ok(area) => return self.finish(outcome, area),
                Err(e) => self.record_failure(&mut outcome, AreaSource::Shapefile, e),
            }
        }

        if request.has_geojson() {
            if let Some(value) = &request.geojson {
                match resolve_geojson(value) {
                    Ok(area) => return self.finish(outcome, area),
                    Err(e) => self.record_failure(&mut outcome, AreaSource::GeoJson, e),
                }
            }
        }

        if let Some(name) = request.region_name() {
            match self.regions.resolve(name) {
                Ok(area) => return self.finish(outcome, area),
                Err(e) => self.record_failure(&mut outcome, AreaSource::NamedRegion, e),
            }
        }

        if outcome.is_no_input() {
            debug!("no study-area input supplied");
        }
        outcome
    }

    fn finish(&self, mut outcome: ResolutionOutcome, area: StudyArea) -> ResolutionOutcome {
        info!(
            area = %area.name(),
            source = ?area.source(),
            fingerprint = %area.fingerprint(),
            "study area resolved"
        );
        outcome.attempts.push(ResolutionAttempt::success(area.source()));
        outcome.area = Some(area);
        outcome
    }

    fn record_failure(&self, outcome: &mut ResolutionOutcome, source: AreaSource, error: StudyAreaError) {
        warn!(source = ?source, error = %error, "study-area input rejected");
        outcome.attempts.push(ResolutionAttempt::failure(source, &error));
    }
}

fn resolve_shapefile(files: &[UploadedFile]) -> Result<StudyArea, StudyAreaError> {
    let bundle = ShapefileBundle::from_uploads(files)?;
    let (name, geometry) = bundle.read_first_polygon()?;
    StudyArea::new(
        name.unwrap_or_else(|| DEFAULT_AREA_NAME.to_string()),
        AreaSource::Shapefile,
        geometry,
    )
}

fn resolve_geojson(value: &serde_json::Value) -> Result<StudyArea, StudyAreaError> {
    let geometry = match value {
        serde_json::Value::String(text) => parse_geojson_str(text)?,
        other => parse_geojson_value(other.clone())?,
    };
    StudyArea::new(DEFAULT_AREA_NAME, AreaSource::GeoJson, geometry)
}
