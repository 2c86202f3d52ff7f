//! Cookie-keyed per-browser state.
//!
//! Each browser gets one cleaning session, one classification table and one
//! auditor flag. The entry mutex is a `std::sync::Mutex`; handlers take it
//! for one synchronous step and release it before any `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::AppState;
use crate::audit::AuditGate;
use crate::catalog::TaskCatalog;
use crate::classifier::{ClassificationGateway, Classifier};
use crate::session::Session;

pub const SESSION_COOKIE: &str = "cleaning_sid";

/// Entries untouched for this long are dropped.
pub const SESSION_IDLE_HOURS: i64 = 12;

pub struct BrowserState {
    pub session: Session,
    pub gateway: ClassificationGateway,
    pub audit_gate: AuditGate,
}

/// Handle to one browser's entry, placed in request extensions.
#[derive(Clone)]
pub struct BrowserSession {
    pub id: String,
    state: Arc<Mutex<BrowserState>>,
}

impl BrowserSession {
    pub fn lock(&self) -> MutexGuard<'_, BrowserState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct Entry {
    state: Arc<Mutex<BrowserState>>,
    last_seen: DateTime<Utc>,
}

pub struct BrowserSessions {
    catalog: Arc<TaskCatalog>,
    classifier: Arc<dyn Classifier>,
    classify_timeout: Duration,
    idle_timeout: chrono::Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl BrowserSessions {
    pub fn new(
        catalog: Arc<TaskCatalog>,
        classifier: Arc<dyn Classifier>,
        classify_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            classifier,
            classify_timeout,
            idle_timeout: chrono::Duration::hours(SESSION_IDLE_HOURS),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up the entry for a cookie value, or create a fresh one.
    ///
    /// Returns the handle and whether it was newly created. Unknown ids are
    /// never adopted; the browser gets a new server-chosen id instead. Idle
    /// entries are swept first, so an expired cookie also gets a new id.
    pub fn resolve(
        &self,
        cookie_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> (BrowserSession, bool) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        let before = entries.len();
        entries.retain(|_, entry| now - entry.last_seen <= self.idle_timeout);
        if entries.len() < before {
            info!("Expired {} idle browser sessions", before - entries.len());
        }

        if let Some(id) = cookie_id {
            if let Some(entry) = entries.get_mut(id) {
                entry.last_seen = now;
                return (
                    BrowserSession {
                        id: id.to_string(),
                        state: Arc::clone(&entry.state),
                    },
                    false,
                );
            }
        }

        let id = hex::encode(rand::random::<[u8; 16]>());
        let state = Arc::new(Mutex::new(BrowserState {
            session: Session::new(Arc::clone(&self.catalog)),
            gateway: ClassificationGateway::new(
                Arc::clone(&self.classifier),
                self.classify_timeout,
            ),
            audit_gate: AuditGate::new(),
        }));
        entries.insert(
            id.clone(),
            Entry {
                state: Arc::clone(&state),
                last_seen: now,
            },
        );
        debug!("Created browser session {} ({} total)", id, entries.len());
        (BrowserSession { id, state }, true)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Value of our cookie in the request's `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
}

/// Middleware: attach the browser's entry and set the cookie when new.
pub async fn attach_browser_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie = cookie_value(request.headers());
    let (browser, created) = state.sessions.resolve(cookie.as_deref(), state.clock.now());
    let id = browser.id.clone();
    request.extensions_mut().insert(browser);

    let mut response = next.run(request).await;
    if created {
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!("Could not build session cookie: {}", e),
        }
    }
    response
}
