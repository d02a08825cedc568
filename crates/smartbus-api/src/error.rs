//! Error types for the SmartBus HTTP surface.
//!
//! [`ApiError`] unifies every failure a handler can hit into one enum
//! that converts into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. The
//! body is always `{"error": <message>, "status": <code>}`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use smartbus_core::{IngestError, StoreError, ValidationError};
use tracing::warn;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A request payload failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The request body was not JSON of the expected shape.
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// A path parameter was not a valid identifier.
    #[error("invalid id: {0}")]
    InvalidId(String),

    /// The ingestion path rejected or failed to persist a report.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// A store rejected a write or failed a read.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection.body_text())
    }
}

impl ApiError {
    /// The HTTP status this error maps to.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::InvalidBody(_)
            | Self::InvalidId(_)
            | Self::Ingest(IngestError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Ingest(IngestError::UnknownBus(_))
            | Self::Store(StoreError::UnknownBus(_) | StoreError::UnknownRoute(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Store(StoreError::DuplicateStopOrder { .. }) => StatusCode::CONFLICT,
            Self::Ingest(IngestError::Persistence(_)) | Self::Store(StoreError::Backend { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "Request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
