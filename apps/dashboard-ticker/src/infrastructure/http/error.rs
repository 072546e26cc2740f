//! API error responses.
//!
//! Every failure is rendered as `{"error": "<message>"}`.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::application::ports::StoreError;
use crate::application::services::TickerError;

/// Request failure with its HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Malformed or rejected input.
    #[error("{0}")]
    BadRequest(String),
    /// Unknown dashboard, feed or content item.
    #[error("{0}")]
    NotFound(String),
    /// Resource already exists.
    #[error("{0}")]
    Conflict(String),
    /// Anything else; details are logged, not returned.
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DashboardNotFound(_)
            | StoreError::FeedNotFound(_)
            | StoreError::ContentNotFound(_) => Self::NotFound(err.to_string()),
            StoreError::DashboardExists(_) => Self::Conflict(err.to_string()),
            StoreError::DefaultDashboardProtected
            | StoreError::InvalidInput(_)
            | StoreError::InvalidConfig(_) => Self::BadRequest(err.to_string()),
            StoreError::Unavailable { .. } => {
                tracing::error!(error = %err, "Store failure");
                Self::Internal
            }
        }
    }
}

impl From<TickerError> for ApiError {
    fn from(err: TickerError) -> Self {
        match err {
            TickerError::UnknownDashboard(id) => StoreError::DashboardNotFound(id).into(),
            TickerError::Store(inner) => inner.into(),
            TickerError::ConnectionClosed(_) => {
                tracing::error!(error = %err, "Ticker failure");
                Self::Internal
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
