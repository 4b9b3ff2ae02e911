//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::compute::ComputeError;
use crate::services::{AggregationError, InsuranceError, SessionError};
use crate::study_area::ResolutionAttempt;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Resource not found
    NotFound(String),
    /// Invalid request (validation error)
    BadRequest(String),
    /// A data source needed by the endpoint failed to load at startup
    Unavailable(String),
    /// Internal server error
    Internal(String),
    /// Land-cover evaluation error
    Compute(ComputeError),
    /// No input channel produced a study area
    StudyArea(Vec<ResolutionAttempt>),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg)),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg))
            }
            AppError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiError::new("UNAVAILABLE", msg),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", msg),
            ),
            AppError::Compute(e) => {
                let status = if e.is_client_error() {
                    StatusCode::BAD_REQUEST
                } else if matches!(e, ComputeError::NoAsset) {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                (status, ApiError::new("COMPUTE_ERROR", e.to_string()))
            }
            AppError::StudyArea(attempts) => {
                let last = attempts.iter().rev().find(|a| !a.ok);
                let code = last
                    .and_then(|a| a.error_code.clone())
                    .unwrap_or_else(|| "STUDY_AREA_ERROR".to_string());
                let message = last
                    .and_then(|a| a.error.clone())
                    .unwrap_or_else(|| "no study area could be resolved".to_string());
                let details = serde_json::to_value(&attempts).unwrap_or(serde_json::Value::Null);
                (
                    StatusCode::BAD_REQUEST,
                    ApiError::new(code, message).with_details(details),
                )
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<ComputeError> for AppError {
    fn from(err: ComputeError) -> Self {
        AppError::Compute(err)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) => AppError::NotFound(err.to_string()),
            SessionError::YearOutOfRange { .. } => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<AggregationError> for AppError {
    fn from(err: AggregationError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<InsuranceError> for AppError {
    fn from(err: InsuranceError) -> Self {
        match err {
            InsuranceError::UnknownMetric(_) => AppError::BadRequest(err.to_string()),
            _ => AppError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AreaSource;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Unavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::Compute(ComputeError::NoAsset), StatusCode::SERVICE_UNAVAILABLE),
            (
                AppError::Compute(ComputeError::TaskFailed("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::Compute(ComputeError::InvalidParams("x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Compute(ComputeError::TooManyPixels { pixels: 2, max_pixels: 1 }),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_session_errors_map_to_http() {
        let err: AppError = SessionError::NotFound("abc".into()).into();
        assert!(matches!(err, AppError::NotFound(_)));
        let err: AppError = SessionError::YearOutOfRange { year: 1900, first: 1985, last: 2023 }.into();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_study_area_error_is_bad_request() {
        let err = AppError::StudyArea(vec![ResolutionAttempt {
            source: AreaSource::GeoJson,
            ok: false,
            error_code: Some("INVALID_JSON".into()),
            error: Some("invalid JSON".into()),
        }]);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
