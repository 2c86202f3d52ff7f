//! Cleaning session routes.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::reports::write_and_forward;
use crate::report::{encode, new_report_id, report_filename};
use crate::server::error::ApiError;
use crate::server::sessions::{BrowserSession, BrowserState};
use crate::server::views::{ImageResponse, SessionView, SubmitResponse, TaskView};
use crate::server::AppState;
use crate::session::{SessionError, SessionPhase};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRequest {
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub cleaner_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    pub image_base64: String,
}

#[derive(Debug, Deserialize)]
pub struct NotesRequest {
    #[serde(default)]
    pub notes: String,
}

pub async fn get_catalog(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "tasks": state.catalog.tasks(),
        "maxScore": state.catalog.max_score(),
    }))
}

/// Apply any classification answers that arrived since the last request.
fn settle_pending(browser: &mut BrowserState, now: DateTime<Utc>) {
    for task_id in browser.gateway.pending_tasks() {
        let verdict = browser
            .gateway
            .poll(&task_id, now)
            .and_then(|status| status.verdict());
        if let Some(verdict) = verdict {
            // Pending ids always come from catalog tasks.
            let _ = browser.session.apply_verdict(&task_id, &verdict, now);
        }
    }
}

fn view(browser: &BrowserState, now: DateTime<Utc>) -> Json<SessionView> {
    Json(SessionView::build(&browser.session, &browser.gateway, now))
}

fn task_view(browser: &BrowserState, task_id: &str) -> Result<TaskView, ApiError> {
    let task = browser
        .session
        .catalog()
        .get(task_id)
        .ok_or_else(|| SessionError::UnknownTask(task_id.to_string()))?;
    Ok(TaskView::build(task, &browser.session, &browser.gateway))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Extension(browser): Extension<BrowserSession>,
) -> Json<SessionView> {
    let now = state.clock.now();
    let mut guard = browser.lock();
    settle_pending(&mut guard, now);
    view(&guard, now)
}

pub async fn put_identity(
    State(state): State<Arc<AppState>>,
    Extension(browser): Extension<BrowserSession>,
    payload: Result<Json<IdentityRequest>, JsonRejection>,
) -> Result<Json<SessionView>, ApiError> {
    let Json(body) = payload?;
    let now = state.clock.now();
    let mut guard = browser.lock();
    guard.session.set_identity(&body.room_id, &body.cleaner_id);
    Ok(view(&guard, now))
}

pub async fn post_start(
    State(state): State<Arc<AppState>>,
    Extension(browser): Extension<BrowserSession>,
) -> Result<Json<SessionView>, ApiError> {
    let now = state.clock.now();
    let mut guard = browser.lock();
    guard.session.start(now)?;
    Ok(view(&guard, now))
}

pub async fn post_finish(
    State(state): State<Arc<AppState>>,
    Extension(browser): Extension<BrowserSession>,
) -> Result<Json<SessionView>, ApiError> {
    let now = state.clock.now();
    let mut guard = browser.lock();
    settle_pending(&mut guard, now);
    guard.session.finish(now)?;
    Ok(view(&guard, now))
}

pub async fn post_reset(
    State(state): State<Arc<AppState>>,
    Extension(browser): Extension<BrowserSession>,
) -> Json<SessionView> {
    let now = state.clock.now();
    let mut guard = browser.lock();
    guard.session.reset();
    guard.gateway.reset();
    view(&guard, now)
}

pub async fn post_image(
    State(state): State<Arc<AppState>>,
    Extension(browser): Extension<BrowserSession>,
    Path(task_id): Path<String>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> Result<Json<ImageResponse>, ApiError> {
    if !state.catalog.contains(&task_id) {
        return Err(SessionError::UnknownTask(task_id).into());
    }
    let Json(body) = payload?;
    let bytes = decode_image_payload(&body.image_base64)?;

    let now = state.clock.now();
    let mut guard = browser.lock();
    let classification = guard.gateway.submit(&task_id, &bytes, now);
    if let Some(verdict) = classification.verdict() {
        guard.session.apply_verdict(&task_id, &verdict, now)?;
    }
    let task = task_view(&guard, &task_id)?;
    Ok(Json(ImageResponse {
        classification,
        task,
    }))
}

/// Accept plain base64 or a `data:<type>;base64,` URL.
fn decode_image_payload(payload: &str) -> Result<Vec<u8>, ApiError> {
    let payload = payload.trim();
    let encoded = match payload.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => payload,
    };
    if encoded.is_empty() {
        return Err(ApiError::bad_request("imageBase64 is empty"));
    }
    STANDARD
        .decode(encoded)
        .map_err(|_| ApiError::bad_request("imageBase64 is not valid base64"))
}

pub async fn post_retry(
    Extension(browser): Extension<BrowserSession>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskView>, ApiError> {
    let mut guard = browser.lock();
    let task = task_view(&guard, &task_id)?;
    guard.gateway.retry(&task_id);
    info!("Retry requested for task '{}'", task_id);
    Ok(Json(TaskView {
        classification: guard.gateway.state_label(&task_id),
        ..task
    }))
}

pub async fn put_notes(
    Extension(browser): Extension<BrowserSession>,
    Path(task_id): Path<String>,
    payload: Result<Json<NotesRequest>, JsonRejection>,
) -> Result<Json<TaskView>, ApiError> {
    let Json(body) = payload?;
    let mut guard = browser.lock();
    guard.session.set_notes(&task_id, &body.notes)?;
    Ok(Json(task_view(&guard, &task_id)?))
}

/// Finish a running session, then write and forward its report.
pub async fn post_export(
    State(state): State<Arc<AppState>>,
    Extension(browser): Extension<BrowserSession>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let now = state.clock.now();
    let report_id = new_report_id();

    let report = {
        let mut guard = browser.lock();
        settle_pending(&mut guard, now);
        if guard.session.room_id().is_empty() || guard.session.cleaner_id().is_empty() {
            return Err(SessionError::MissingIdentifier.into());
        }
        if guard.session.phase() == SessionPhase::Running {
            guard.session.finish(now)?;
        }
        guard.session.to_report(&report_id, now)?
    };

    let filename = report_filename(&report.report_id);
    let response = write_and_forward(&state, &report.report_id, &filename, encode(&report)).await?;
    Ok(Json(response))
}
