//! HTTP API over the cleaning session, the report archive and the auditor
//! gate.

pub mod error;
mod handlers;
pub mod sessions;
pub mod views;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::{middleware, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::archive::{FsReportStore, ReportStore};
use crate::audit::AuditorCredential;
use crate::catalog::{default_catalog, load_catalog, TaskCatalog};
use crate::classifier::{Classifier, RemoteClassifier, UnavailableClassifier};
use crate::config::AppConfig;
use crate::error::CleaningAuditError;
use crate::forward::ReportForwarder;
use crate::session::{Clock, SystemClock};

pub use error::ApiError;
pub use sessions::{BrowserSession, BrowserSessions, SESSION_COOKIE};

/// Shared collaborators for every request.
pub struct AppState {
    pub catalog: Arc<TaskCatalog>,
    pub store: Arc<dyn ReportStore>,
    pub clock: Arc<dyn Clock>,
    pub forwarder: ReportForwarder,
    pub credential: AuditorCredential,
    pub sessions: BrowserSessions,
}

impl AppState {
    pub fn new(
        catalog: Arc<TaskCatalog>,
        store: Arc<dyn ReportStore>,
        classifier: Arc<dyn Classifier>,
        clock: Arc<dyn Clock>,
        forwarder: ReportForwarder,
        credential: AuditorCredential,
        classify_timeout: Duration,
    ) -> Self {
        let sessions = BrowserSessions::new(Arc::clone(&catalog), classifier, classify_timeout);
        Self {
            catalog,
            store,
            clock,
            forwarder,
            credential,
            sessions,
        }
    }

    /// Wire up the production collaborators described by `config`.
    pub fn from_config(
        config: &AppConfig,
        credential: AuditorCredential,
    ) -> Result<Self, CleaningAuditError> {
        config.validate()?;

        let catalog = match &config.catalog_path {
            Some(path) => load_catalog(path)
                .map_err(|e| CleaningAuditError::Catalog(format!("{:#}", e)))?,
            None => default_catalog(),
        };
        info!(
            "Task catalog: {} tasks, max score {}",
            catalog.len(),
            catalog.max_score()
        );

        let store = FsReportStore::new(&config.reports_dir).map_err(CleaningAuditError::Archive)?;

        let classifier: Arc<dyn Classifier> = match config.classifier_url()? {
            Some(url) => {
                info!("Classifier endpoint: {}", url);
                Arc::new(
                    RemoteClassifier::new(url, config.classify_timeout())
                        .map_err(CleaningAuditError::Classifier)?,
                )
            }
            None => {
                info!("No classifier endpoint configured");
                Arc::new(UnavailableClassifier)
            }
        };

        let forwarder =
            ReportForwarder::new(config.auditor_url()?).map_err(CleaningAuditError::Http)?;
        match forwarder.endpoint() {
            Some(url) => info!("Forwarding reports to {}", url),
            None => info!("No auditor endpoint configured, reports stay local"),
        }

        Ok(Self::new(
            Arc::new(catalog),
            Arc::new(store),
            classifier,
            Arc::new(SystemClock),
            forwarder,
            credential,
            config.classify_timeout(),
        ))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    // Only these routes carry per-browser state; the rest never mint a cookie.
    let browser_routes = Router::new()
        .route("/api/session", get(handlers::session::get_session))
        .route("/api/session/identity", put(handlers::session::put_identity))
        .route("/api/session/start", post(handlers::session::post_start))
        .route("/api/session/finish", post(handlers::session::post_finish))
        .route("/api/session/reset", post(handlers::session::post_reset))
        .route("/api/session/export", post(handlers::session::post_export))
        .route(
            "/api/session/tasks/{id}/image",
            post(handlers::session::post_image),
        )
        .route(
            "/api/session/tasks/{id}/retry",
            post(handlers::session::post_retry),
        )
        .route(
            "/api/session/tasks/{id}/notes",
            put(handlers::session::put_notes),
        )
        .route(
            "/auditor/login",
            get(handlers::auditor::get_login).post(handlers::auditor::post_login),
        )
        .route("/auditor/logout", post(handlers::auditor::post_logout))
        .route("/auditor", get(handlers::auditor::get_index))
        .route("/auditor/reports/{filename}", get(handlers::auditor::get_view))
        .route(
            "/auditor/download/{filename}",
            get(handlers::auditor::get_download),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            sessions::attach_browser_session,
        ));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/api/catalog", get(handlers::session::get_catalog))
        .route("/api/report", post(handlers::reports::post_report))
        .route(
            "/api/receive_report",
            post(handlers::reports::post_receive_report),
        )
        .route("/reports/{filename}", get(handlers::reports::get_report))
        .merge(browser_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
