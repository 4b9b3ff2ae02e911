//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! service layer for business logic.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{debug, info};

use super::dto::{
    CompanyQuery, CompanyRankingResponse, CreateSessionResponse, HealthResponse,
    InsuranceSummaryResponse, LegendResponse, RegionListResponse, ResolveResponse,
    SetYearsRequest, StatisticsQuery, StatisticsRequest, StatisticsResponse,
    UpdateStudyAreaResponse, YearsResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::models::StudyArea;
use crate::services::insurance::{CompanyStateSummary, CorrelationMatrix, StateSummary};
use crate::services::session::DEFAULT_YEAR;
use crate::services::{
    build_charts, build_map_view, compute_area_statistics, render_layer, CompanyMetric,
    InsuranceDataset, LayerRaster, MapView, SessionSnapshot,
};
use crate::study_area::{ResolutionAttempt, ResolutionOutcome, StudyAreaRequest};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check and reference data
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let engine = if state.engine.grid().is_some() {
        "loaded"
    } else {
        "unavailable"
    };
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        engine: engine.to_string(),
        asset_id: state.asset_id.to_string(),
        regions: state.resolver.regions().len(),
        insurance: state.insurance.is_some(),
    }))
}

/// GET /v1/regions
pub async fn list_regions(State(state): State<AppState>) -> HandlerResult<RegionListResponse> {
    let regions: Vec<String> = state
        .resolver
        .regions()
        .names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let total = regions.len();
    Ok(Json(RegionListResponse { regions, total }))
}

/// GET /v1/legend
pub async fn get_legend(State(state): State<AppState>) -> HandlerResult<LegendResponse> {
    Ok(Json(LegendResponse {
        entries: state.legend.entries().cloned().collect(),
        palette: state.legend.palette(),
        min: state.legend.min_code().map(|c| c.value()),
        max: state.legend.max_code().map(|c| c.value()),
    }))
}

/// GET /v1/years
pub async fn get_years(State(state): State<AppState>) -> HandlerResult<YearsResponse> {
    let default_year = if state.years.contains(DEFAULT_YEAR) {
        DEFAULT_YEAR
    } else {
        state.years.last
    };
    Ok(Json(YearsResponse {
        first: state.years.first,
        last: state.years.last,
        years: state.years.years().collect(),
        default_year,
    }))
}

// =============================================================================
// Study area and one-shot statistics
// =============================================================================

/// Run the resolver off the async runtime; shapefiles go through temp files.
async fn resolve(state: &AppState, request: StudyAreaRequest) -> Result<ResolutionOutcome, AppError> {
    let resolver = state.resolver.clone();
    tokio::task::spawn_blocking(move || resolver.resolve(&request))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))
}

/// Resolved area, or the error describing why no channel produced one.
fn require_area(outcome: ResolutionOutcome) -> Result<(StudyArea, Vec<ResolutionAttempt>), AppError> {
    if outcome.is_no_input() {
        return Err(AppError::BadRequest(
            "provide a shapefile, a GeoJSON geometry or a region name".to_string(),
        ));
    }
    match outcome.area {
        Some(area) => Ok((area, outcome.attempts)),
        None => Err(AppError::StudyArea(outcome.attempts)),
    }
}

/// POST /v1/study-area/resolve
pub async fn resolve_study_area(
    State(state): State<AppState>,
    Json(request): Json<StudyAreaRequest>,
) -> HandlerResult<ResolveResponse> {
    let (area, attempts) = require_area(resolve(&state, request).await?)?;
    Ok(Json(ResolveResponse {
        geometry: area.to_geojson(),
        area: area.summary(),
        attempts,
    }))
}

/// POST /v1/land-cover/statistics
///
/// Resolve the area in the body and aggregate the requested years.
pub async fn land_cover_statistics(
    State(state): State<AppState>,
    Json(request): Json<StatisticsRequest>,
) -> HandlerResult<StatisticsResponse> {
    for &year in &request.years {
        if !state.years.contains(year) {
            return Err(AppError::BadRequest(format!(
                "year {} is outside the available range {}-{}",
                year, state.years.first, state.years.last
            )));
        }
    }

    let area = if request.area.is_empty() {
        None
    } else {
        Some(require_area(resolve(&state, request.area).await?)?.0)
    };
    statistics_response(&state, area.as_ref(), &request.years, request.pie_year).await
}

async fn statistics_response(
    state: &AppState,
    area: Option<&StudyArea>,
    years: &[i32],
    pie_year: Option<i32>,
) -> HandlerResult<StatisticsResponse> {
    let report = compute_area_statistics(
        state.engine.as_ref(),
        &state.stack,
        years,
        area,
        &state.legend,
        &state.options,
    )
    .await?;
    let charts = build_charts(&report.rows, &state.legend, pie_year);
    Ok(Json(StatisticsResponse {
        area: area.map(StudyArea::summary),
        report,
        charts,
    }))
}

// =============================================================================
// Dashboard sessions
// =============================================================================

/// POST /v1/sessions
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), AppError> {
    let session_id = state.sessions.create();
    let session = state.sessions.snapshot(&session_id)?;
    info!(session = %session_id, "dashboard session opened");
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            session,
        }),
    ))
}

/// GET /v1/sessions/{session_id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> HandlerResult<SessionSnapshot> {
    Ok(Json(state.sessions.snapshot(&session_id)?))
}

/// DELETE /v1/sessions/{session_id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(&session_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /v1/sessions/{session_id}/study-area
///
/// A failed resolution keeps the session's current area and answers with
/// the per-channel errors.
pub async fn update_session_study_area(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<StudyAreaRequest>,
) -> HandlerResult<UpdateStudyAreaResponse> {
    // fail fast on unknown sessions before touching uploads
    state.sessions.get(&session_id)?;
    let outcome = resolve(&state, request).await?;
    let failed = !outcome.is_no_input() && outcome.area.is_none();
    let attempts = outcome.attempts.clone();
    let change = state.sessions.apply_resolution(&session_id, outcome)?;
    if failed {
        return Err(AppError::StudyArea(attempts));
    }
    Ok(Json(UpdateStudyAreaResponse {
        change,
        session: state.sessions.snapshot(&session_id)?,
    }))
}

/// PUT /v1/sessions/{session_id}/years
pub async fn set_session_years(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<SetYearsRequest>,
) -> HandlerResult<SessionSnapshot> {
    let years = state.sessions.set_years(&session_id, &request.years)?;
    debug!(session = %session_id, ?years, "years selected");
    Ok(Json(state.sessions.snapshot(&session_id)?))
}

/// GET /v1/sessions/{session_id}/map
pub async fn get_session_map(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> HandlerResult<MapView> {
    let session = state.sessions.get(&session_id)?;
    Ok(Json(build_map_view(
        &state.asset_id,
        &session.years,
        session.area.as_ref(),
        &state.legend,
    )))
}

/// GET /v1/sessions/{session_id}/layers/{year}
pub async fn get_session_layer(
    State(state): State<AppState>,
    Path((session_id, year)): Path<(String, i32)>,
) -> HandlerResult<LayerRaster> {
    let session = state.sessions.get(&session_id)?;
    if !state.years.contains(year) {
        return Err(AppError::NotFound(format!("no classification for year {}", year)));
    }
    let layer = render_layer(
        state.engine.as_ref(),
        &state.stack,
        year,
        session.area.as_ref(),
        state.options.params.max_pixels,
    )
    .await?;
    Ok(Json(layer))
}

/// GET /v1/sessions/{session_id}/statistics
pub async fn get_session_statistics(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<StatisticsQuery>,
) -> HandlerResult<StatisticsResponse> {
    let session = state.sessions.get(&session_id)?;
    statistics_response(&state, session.area.as_ref(), &session.years, query.pie_year).await
}

// =============================================================================
// Insurance dashboard
// =============================================================================

fn insurance(state: &AppState) -> Result<Arc<InsuranceDataset>, AppError> {
    state
        .insurance
        .clone()
        .ok_or_else(|| AppError::Unavailable("insurance dataset is not loaded".to_string()))
}

/// GET /v1/insurance/summary
pub async fn insurance_summary(
    State(state): State<AppState>,
) -> HandlerResult<InsuranceSummaryResponse> {
    let data = insurance(&state)?;
    Ok(Json(InsuranceSummaryResponse {
        records: data.len(),
        totals: data.totals(),
        highlights: data.highlights(),
        states_by_policy_count: data.states_by_policy_count(),
        area_shares: data.company_shares(CompanyMetric::AreaTotal),
        premium_shares: data.company_shares(CompanyMetric::PremiumTotal),
    }))
}

/// GET /v1/insurance/states
pub async fn insurance_states(State(state): State<AppState>) -> HandlerResult<Vec<StateSummary>> {
    Ok(Json(insurance(&state)?.state_summaries()))
}

/// GET /v1/insurance/companies?metric=
pub async fn insurance_companies(
    State(state): State<AppState>,
    Query(query): Query<CompanyQuery>,
) -> HandlerResult<CompanyRankingResponse> {
    let data = insurance(&state)?;
    let metric = match query.metric.as_deref() {
        Some(name) => name.parse::<CompanyMetric>()?,
        None => CompanyMetric::default(),
    };
    let metric_name = serde_json::to_value(metric)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    Ok(Json(CompanyRankingResponse {
        metric: metric_name,
        label: metric.label().to_string(),
        companies: data.companies_by(metric),
    }))
}

/// GET /v1/insurance/companies/by-state
pub async fn insurance_companies_by_state(
    State(state): State<AppState>,
) -> HandlerResult<Vec<CompanyStateSummary>> {
    Ok(Json(insurance(&state)?.company_state_breakdown()))
}

/// GET /v1/insurance/correlations
pub async fn insurance_correlations(
    State(state): State<AppState>,
) -> HandlerResult<CorrelationMatrix> {
    Ok(Json(insurance(&state)?.correlation_matrix()))
}

/// GET /v1/insurance/choropleth
pub async fn insurance_choropleth(
    State(state): State<AppState>,
) -> HandlerResult<geojson::FeatureCollection> {
    let data = insurance(&state)?;
    let boundaries = state
        .state_boundaries
        .clone()
        .ok_or_else(|| AppError::Unavailable("state boundaries are not loaded".to_string()))?;
    Ok(Json(data.choropleth(&boundaries)))
}
