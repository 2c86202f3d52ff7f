use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::archive::ArchiveError;
use crate::report::ReportError;
use crate::session::SessionError;

/// Error body for every API route: `{"ok": false, "error": "..."}`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request<E: std::fmt::Display>(e: E) -> Self {
        Self::BadRequest(e.to_string())
    }

    /// Log the detail, expose only `public`.
    pub fn internal<E: std::fmt::Display>(public: &str, detail: E) -> Self {
        error!("{}: {}", public, detail);
        Self::Internal(public.to_string())
    }

    pub fn auditor_required() -> Self {
        Self::Unauthorized("auditor login required".to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "ok": false, "error": self.to_string() }))).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::UnknownTask(_) => ApiError::NotFound(err.to_string()),
            SessionError::MissingIdentifier => ApiError::BadRequest(err.to_string()),
            SessionError::AlreadyStarted | SessionError::NotStarted => {
                ApiError::Conflict(err.to_string())
            }
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<ArchiveError> for ApiError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ArchiveError::AlreadyExists(_) => ApiError::Conflict(err.to_string()),
            ArchiveError::InvalidName(_) => ApiError::BadRequest(err.to_string()),
            ArchiveError::Io(detail) => ApiError::internal("archive unavailable", detail),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::internal("background task failed", err)
    }
}
