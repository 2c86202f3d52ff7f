//! Report submission, reception and download.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::archive::{validate_name, ArchiveError};
use crate::report::{
    encode, new_report_id, null_as_default, receive_filename, report_filename, Report,
    SubmitReportRequest,
};
use crate::server::error::ApiError;
use crate::server::views::{ReceiveResponse, SubmitResponse};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct ReceiveReportRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub filename: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

/// Persist a freshly encoded report, then try the auditor webhook.
///
/// A failed write fails the request; a failed forward only shows up in the
/// response fields.
pub async fn write_and_forward(
    state: &Arc<AppState>,
    report_id: &str,
    filename: &str,
    text: String,
) -> Result<SubmitResponse, ApiError> {
    let store = Arc::clone(&state.store);
    let name = filename.to_string();
    let bytes = text.clone().into_bytes();
    tokio::task::spawn_blocking(move || store.write(&name, &bytes))
        .await?
        .map_err(|e| ApiError::internal("failed to save report", e))?;
    info!("Saved report {}", filename);

    let outcome = state.forwarder.forward(filename, &text).await;
    Ok(SubmitResponse::new(report_id, filename, outcome))
}

pub async fn post_report(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubmitReportRequest>, JsonRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let Json(body) = payload?;
    let report_id = new_report_id();
    let report = Report::from_submission(&state.catalog, &report_id, &body)?;
    let filename = report_filename(&report_id);
    let response = write_and_forward(&state, &report_id, &filename, encode(&report)).await?;
    Ok(Json(response))
}

pub async fn post_receive_report(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ReceiveReportRequest>, JsonRejection>,
) -> Result<Json<ReceiveResponse>, ApiError> {
    let Json(body) = payload?;
    let filename = receive_filename(&body.filename, state.clock.now());

    let store = Arc::clone(&state.store);
    let name = filename.clone();
    let content = body.content.into_bytes();
    tokio::task::spawn_blocking(move || store.write(&name, &content))
        .await?
        .map_err(|e| match e {
            ArchiveError::AlreadyExists(_) | ArchiveError::InvalidName(_) => ApiError::from(e),
            other => ApiError::internal("failed to save report", other),
        })?;
    info!("Received report {}", filename);

    Ok(Json(ReceiveResponse {
        ok: true,
        view_url: format!("/auditor/reports/{}", filename),
        saved_as: filename,
    }))
}

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    attachment(&state, filename).await
}

/// Read a stored report and send it back as a download.
pub async fn attachment(state: &Arc<AppState>, filename: String) -> Result<Response, ApiError> {
    let bytes = read_report(state, &filename).await?;
    let disposition = format!("attachment; filename=\"{}\"", filename);
    Ok((
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

pub async fn read_report(state: &Arc<AppState>, filename: &str) -> Result<Vec<u8>, ApiError> {
    validate_name(filename)?;
    let store = Arc::clone(&state.store);
    let name = filename.to_string();
    let bytes = tokio::task::spawn_blocking(move || store.read(&name)).await??;
    Ok(bytes)
}
