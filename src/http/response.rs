//! Translation of limiter errors into HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::FloodgateError;

/// What an enforcement point does when the counter store fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Let the request through uncounted.
    Open,
    /// Reject the request with 503 Service Unavailable.
    #[default]
    Closed,
}

/// JSON body of every rejection.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for FloodgateError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            FloodgateError::RateLimitExceeded { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, self.to_string())
            }
            FloodgateError::Storage(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Rate limit storage unavailable".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}
