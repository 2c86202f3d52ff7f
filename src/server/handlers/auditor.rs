//! Auditor login and the report archive.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::reports::{attachment, read_report};
use crate::report::decode;
use crate::server::error::ApiError;
use crate::server::sessions::BrowserSession;
use crate::server::views::{ArchiveIndex, ArchiveRow, LoginStatus, ReportView};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

fn require_auditor(browser: &BrowserSession) -> Result<(), ApiError> {
    if browser.lock().audit_gate.is_authenticated() {
        Ok(())
    } else {
        Err(ApiError::auditor_required())
    }
}

pub async fn get_login(
    State(state): State<Arc<AppState>>,
    Extension(browser): Extension<BrowserSession>,
) -> Json<LoginStatus> {
    let authenticated = browser.lock().audit_gate.is_authenticated();
    Json(LoginStatus {
        authenticated,
        operator_warning: state.credential.operator_warning(),
    })
}

pub async fn post_login(
    State(state): State<Arc<AppState>>,
    Extension(browser): Extension<BrowserSession>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    if browser
        .lock()
        .audit_gate
        .login(&state.credential, &body.password)
    {
        Ok(Json(json!({ "ok": true })))
    } else {
        Err(ApiError::Unauthorized("incorrect password".to_string()))
    }
}

pub async fn post_logout(Extension(browser): Extension<BrowserSession>) -> Json<Value> {
    browser.lock().audit_gate.logout();
    Json(json!({ "ok": true }))
}

pub async fn get_index(
    State(state): State<Arc<AppState>>,
    Extension(browser): Extension<BrowserSession>,
) -> Result<Json<ArchiveIndex>, ApiError> {
    require_auditor(&browser)?;

    let store = Arc::clone(&state.store);
    let reports = tokio::task::spawn_blocking(move || {
        let entries = store.list()?;
        let rows = entries
            .into_iter()
            .map(|entry| {
                let meta = match store.read(&entry.filename) {
                    Ok(bytes) => decode(&String::from_utf8_lossy(&bytes)),
                    Err(e) => {
                        warn!("Could not read {} for listing: {}", entry.filename, e);
                        Default::default()
                    }
                };
                ArchiveRow { entry, meta }
            })
            .collect::<Vec<_>>();
        Ok::<_, crate::archive::ArchiveError>(rows)
    })
    .await??;

    Ok(Json(ArchiveIndex { reports }))
}

pub async fn get_view(
    State(state): State<Arc<AppState>>,
    Extension(browser): Extension<BrowserSession>,
    Path(filename): Path<String>,
) -> Result<Json<ReportView>, ApiError> {
    require_auditor(&browser)?;
    let bytes = read_report(&state, &filename).await?;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    Ok(Json(ReportView {
        meta: decode(&text),
        filename,
        text,
    }))
}

pub async fn get_download(
    State(state): State<Arc<AppState>>,
    Extension(browser): Extension<BrowserSession>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    require_auditor(&browser)?;
    attachment(&state, filename).await
}
