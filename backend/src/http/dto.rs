//! Data Transfer Objects for the HTTP API.
//!
//! Service-layer types already derive Serialize/Deserialize and are returned
//! as is; the types here wrap them into request and response envelopes.

use serde::{Deserialize, Serialize};

use crate::models::{LegendEntry, StudyAreaSummary};
use crate::services::area_stats::AreaReport;
use crate::services::charts::ChartBundle;
use crate::services::insurance::{
    CompanyShare, CompanySummary, InsuranceTotals, StateHighlights, StateSummary,
};
use crate::services::session::{AreaChange, SessionSnapshot};
use crate::study_area::{ResolutionAttempt, StudyAreaRequest};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// `loaded` or `unavailable`
    pub engine: String,
    pub asset_id: String,
    pub regions: usize,
    pub insurance: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionListResponse {
    pub regions: Vec<String>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegendResponse {
    pub entries: Vec<LegendEntry>,
    /// Colors indexed by category value from `min` to `max`.
    pub palette: Vec<String>,
    pub min: Option<u8>,
    pub max: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearsResponse {
    pub first: i32,
    pub last: i32,
    pub years: Vec<i32>,
    pub default_year: i32,
}

/// Response of a successful study-area resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub area: StudyAreaSummary,
    pub geometry: geojson::Geometry,
    pub attempts: Vec<ResolutionAttempt>,
}

/// One-shot statistics: study-area input plus the years to aggregate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatisticsRequest {
    #[serde(flatten)]
    pub area: StudyAreaRequest,
    #[serde(default)]
    pub years: Vec<i32>,
    /// Year of the pie chart; the latest selected year when absent.
    #[serde(default)]
    pub pie_year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsResponse {
    pub area: Option<StudyAreaSummary>,
    pub report: AreaReport,
    pub charts: ChartBundle,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatisticsQuery {
    #[serde(default)]
    pub pie_year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub session: SessionSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStudyAreaResponse {
    pub change: AreaChange,
    pub session: SessionSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetYearsRequest {
    pub years: Vec<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyQuery {
    /// `policy_count`, `state_count`, `area_total` or `premium_total`
    #[serde(default)]
    pub metric: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRankingResponse {
    pub metric: String,
    pub label: String,
    pub companies: Vec<CompanySummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceSummaryResponse {
    pub records: usize,
    pub totals: InsuranceTotals,
    pub highlights: Option<StateHighlights>,
    pub states_by_policy_count: Vec<StateSummary>,
    pub area_shares: Vec<CompanyShare>,
    pub premium_shares: Vec<CompanyShare>,
}
