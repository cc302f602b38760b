use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::Serialize;
use thiserror::Error;

/// Error taxonomy for the HTTP API
///
/// Every variant maps to a `{code, message}` JSON body where `code` follows
/// the `<CATEGORY>_<HTTPSTATUS>` convention. Ownership failures are reported
/// as `NotFound` so that callers cannot probe for other users' resources.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Missing or invalid authorization token")]
    Unauthorized,

    #[error("Insufficient dracma balance")]
    InsufficientBalance,

    #[error("Service credential required")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Rate limit exceeded")]
    RateLimited { reset_at_ms: i64 },

    #[error("{0}")]
    Business(String),

    #[error("Internal error")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(rename = "resetAt", skip_serializing_if = "Option::is_none")]
    reset_at: Option<i64>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InsufficientBalance => StatusCode::PAYMENT_REQUIRED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Business(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VAL_400",
            ApiError::Unauthorized => "AUTH_401",
            ApiError::InsufficientBalance => "BUS_402",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::NotFound(_) => "VAL_404",
            ApiError::MethodNotAllowed => "VAL_405",
            ApiError::RateLimited { .. } => "RATE_LIMIT",
            ApiError::Business(_) => "BUS_500",
            ApiError::Internal(_) => "INT_500",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Internal detail goes to the log, callers get a generic message
        let message = match &self {
            ApiError::Internal(detail) => {
                error!("Internal error: {}", detail);
                "An unexpected error occurred".to_string()
            }
            other => other.to_string(),
        };

        let reset_at = match &self {
            ApiError::RateLimited { reset_at_ms } => Some(*reset_at_ms),
            _ => None,
        };

        let body = ErrorBody {
            code: self.code(),
            message,
            reset_at,
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(format!("database error: {}", e))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Internal(format!("serialization error: {}", e))
    }
}
