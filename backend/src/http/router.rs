//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Default request body ceiling in bytes.
pub const DEFAULT_BODY_LIMIT: usize = 50 * 1024 * 1024;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    create_router_with_limit(state, DEFAULT_BODY_LIMIT)
}

pub fn create_router_with_limit(state: AppState, body_limit: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Reference data
        .route("/regions", get(handlers::list_regions))
        .route("/legend", get(handlers::get_legend))
        .route("/years", get(handlers::get_years))
        // Stateless land-cover endpoints
        .route("/study-area/resolve", post(handlers::resolve_study_area))
        .route("/land-cover/statistics", post(handlers::land_cover_statistics))
        // Dashboard sessions
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/{session_id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/sessions/{session_id}/study-area", put(handlers::update_session_study_area))
        .route("/sessions/{session_id}/years", put(handlers::set_session_years))
        .route("/sessions/{session_id}/map", get(handlers::get_session_map))
        .route("/sessions/{session_id}/layers/{year}", get(handlers::get_session_layer))
        .route("/sessions/{session_id}/statistics", get(handlers::get_session_statistics))
        // Insurance dashboard
        .route("/insurance/summary", get(handlers::insurance_summary))
        .route("/insurance/states", get(handlers::insurance_states))
        .route("/insurance/companies", get(handlers::insurance_companies))
        .route("/insurance/companies/by-state", get(handlers::insurance_companies_by_state))
        .route("/insurance/correlations", get(handlers::insurance_correlations))
        .route("/insurance/choropleth", get(handlers::insurance_choropleth));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        // Shapefile components arrive base64-encoded in the JSON body.
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::EngineFactory;
    use crate::config::AppConfig;
    use crate::study_area::RegionTable;
    use std::sync::Arc;

    #[test]
    fn test_router_creation() {
        let state = AppState::new(
            &AppConfig::default(),
            EngineFactory::create_empty(),
            Arc::new(RegionTable::empty()),
        )
        .unwrap();
        let _router = create_router(state);
    }
}
