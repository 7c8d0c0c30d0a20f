//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors and auth/rate-limit/idempotency failures to their
//! HTTP status codes (§6/§7). Never exposes internal error details in
//! production responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured JSON error response body: `{error:{code,message}, request_id}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
    pub request_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid ids: {0}")]
    InvalidIds(String),

    #[error("missing payload: {0}")]
    MissingPayload(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("no project: {0}")]
    NoProject(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("user exists: {0}")]
    UserExists(String),

    #[error("idempotency conflict: {0}")]
    IdempotencyConflict(String),

    #[error("rate limited")]
    RateLimited { retry_after_secs: u64 },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("webhook send failed: {0}")]
    WebhookSendFailed(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            Self::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "invalid_url"),
            Self::InvalidIds(_) => (StatusCode::BAD_REQUEST, "invalid_ids"),
            Self::MissingPayload(_) => (StatusCode::BAD_REQUEST, "missing_payload"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::InvalidToken(_) => (StatusCode::UNAUTHORIZED, "invalid_token"),
            Self::NoProject(_) => (StatusCode::FORBIDDEN, "no_project"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::UserExists(_) => (StatusCode::CONFLICT, "user_exists"),
            Self::IdempotencyConflict(_) => (StatusCode::CONFLICT, "idempotency_conflict"),
            Self::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error"),
            Self::WebhookSendFailed(_) => (StatusCode::BAD_GATEWAY, "webhook.send_failed"),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Render with a request id threaded in from the request-span extension.
    pub fn into_response_with_request_id(self, request_id: String) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::WebhookSendFailed(_) => "A webhook delivery error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, request_id, "internal server error"),
            Self::WebhookSendFailed(_) => tracing::warn!(error = %self, request_id, "webhook send failed"),
            Self::Unauthorized(_) | Self::InvalidToken(_) | Self::NoProject(_) => {
                tracing::info!(error = %self, request_id, "auth rejected")
            }
            _ => {}
        }

        let mut response = (
            status,
            Json(ErrorBody {
                error: ErrorDetail {
                    code: code.to_string(),
                    message,
                    details: None,
                },
                request_id,
            }),
        )
            .into_response();

        if let Self::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert("retry-after", retry_after_secs.to_string().parse().unwrap());
        }

        response
    }
}

/// Fallback `IntoResponse` for contexts without a resolved request id
/// (e.g. errors raised before the tracing span is established).
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_response_with_request_id(uuid::Uuid::new_v4().to_string())
    }
}

impl From<orbicheck_core::OrbiError> for ApiError {
    fn from(err: orbicheck_core::OrbiError) -> Self {
        match err {
            orbicheck_core::OrbiError::Validation(e) => Self::Validation(e.to_string()),
            orbicheck_core::OrbiError::NotFound(msg) => Self::NotFound(msg),
            orbicheck_core::OrbiError::Conflict(msg) => Self::UserExists(msg),
            orbicheck_core::OrbiError::Upstream(msg) => Self::Internal(msg),
            orbicheck_core::OrbiError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
