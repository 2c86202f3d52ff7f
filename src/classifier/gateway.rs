//! Per-task classification bookkeeping.
//!
//! Turns "here is a photo for task X" into at most one request to the
//! classifier per distinct image, tracks the deadline, and reduces the
//! answer into a `Verdict`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::image_prep::{fingerprint, prepare_image};
use super::types::{ClassificationStatus, Classifier, RequestKey, Verdict};

/// Default time a request may stay pending before it expires.
pub const DEFAULT_CLASSIFY_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, PartialEq)]
enum RequestState {
    Pending,
    Resolved(Verdict),
    Expired,
}

#[derive(Debug, Clone)]
struct TrackedRequest {
    key: RequestKey,
    started_at: DateTime<Utc>,
    state: RequestState,
}

pub struct ClassificationGateway {
    classifier: Arc<dyn Classifier>,
    timeout: chrono::Duration,
    requests: HashMap<String, TrackedRequest>,
    nonces: HashMap<String, u32>,
}

impl ClassificationGateway {
    pub fn new(classifier: Arc<dyn Classifier>, timeout: Duration) -> Self {
        let timeout = chrono::Duration::from_std(timeout)
            .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_CLASSIFY_TIMEOUT.as_secs() as i64));
        Self {
            classifier,
            timeout,
            requests: HashMap::new(),
            nonces: HashMap::new(),
        }
    }

    /// Submit image bytes for a task.
    ///
    /// Identical bytes under the same retry nonce are never dispatched twice;
    /// the existing request is polled instead.
    pub fn submit(
        &mut self,
        task_id: &str,
        image_bytes: &[u8],
        now: DateTime<Utc>,
    ) -> ClassificationStatus {
        let fp = fingerprint(image_bytes);
        let nonce = self.nonce(task_id);

        if let Some(tracked) = self.requests.get(task_id) {
            if tracked.key.fingerprint == fp && tracked.key.nonce == nonce {
                debug!("Duplicate submission for task '{}' ({})", task_id, fp);
                return self.poll(task_id, now).unwrap_or(ClassificationStatus::Pending);
            }
        }

        let image = match prepare_image(image_bytes) {
            Ok(image) => image,
            Err(e) => {
                warn!("Rejected image for task '{}': {}", task_id, e);
                // The rejected photo supersedes any earlier one still in flight.
                self.retry(task_id);
                return ClassificationStatus::Ready {
                    verdict: Verdict::Error {
                        reason: "invalid_image".to_string(),
                    },
                };
            }
        };

        self.drop_request(task_id);

        let key = RequestKey {
            task_id: task_id.to_string(),
            fingerprint: fp,
            nonce,
        };
        info!("Dispatching classification {}", key);
        self.classifier.dispatch(&key, &image);
        self.requests.insert(
            task_id.to_string(),
            TrackedRequest {
                key,
                started_at: now,
                state: RequestState::Pending,
            },
        );

        self.poll(task_id, now).unwrap_or(ClassificationStatus::Pending)
    }

    /// Check a task's request. `None` if nothing was ever submitted.
    ///
    /// A pending request past its deadline expires here and is discarded at
    /// the classifier.
    pub fn poll(&mut self, task_id: &str, now: DateTime<Utc>) -> Option<ClassificationStatus> {
        let tracked = self.requests.get_mut(task_id)?;

        let status = match &tracked.state {
            RequestState::Resolved(verdict) => ClassificationStatus::Ready {
                verdict: verdict.clone(),
            },
            RequestState::Expired => ClassificationStatus::Expired,
            RequestState::Pending => {
                if let Some(raw) = self.classifier.poll(&tracked.key) {
                    let verdict = raw.into_verdict();
                    debug!("Classification {} resolved: {:?}", tracked.key, verdict);
                    tracked.state = RequestState::Resolved(verdict.clone());
                    ClassificationStatus::Ready { verdict }
                } else if now - tracked.started_at > self.timeout {
                    warn!("Classification {} timed out", tracked.key);
                    self.classifier.discard(&tracked.key);
                    tracked.state = RequestState::Expired;
                    ClassificationStatus::Expired
                } else {
                    ClassificationStatus::Pending
                }
            }
        };

        Some(status)
    }

    /// Make the next submission for this task a fresh request, even with
    /// identical bytes.
    pub fn retry(&mut self, task_id: &str) {
        self.drop_request(task_id);
        *self.nonces.entry(task_id.to_string()).or_insert(0) += 1;
        debug!("Retry nonce for '{}' is now {}", task_id, self.nonce(task_id));
    }

    /// Forget every request. Nonces keep counting so a late answer for an
    /// old request can never match a new one.
    pub fn reset(&mut self) {
        let task_ids: Vec<String> = self.requests.keys().cloned().collect();
        for task_id in task_ids {
            self.retry(&task_id);
        }
    }

    /// Task ids with a request still waiting for an answer.
    pub fn pending_tasks(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .requests
            .iter()
            .filter(|(_, r)| r.state == RequestState::Pending)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// `none`, `pending`, `ready` or `expired`, for the session view.
    pub fn state_label(&self, task_id: &str) -> &'static str {
        match self.requests.get(task_id).map(|r| &r.state) {
            None => "none",
            Some(RequestState::Pending) => "pending",
            Some(RequestState::Resolved(_)) => "ready",
            Some(RequestState::Expired) => "expired",
        }
    }

    fn nonce(&self, task_id: &str) -> u32 {
        self.nonces.get(task_id).copied().unwrap_or(0)
    }

    fn drop_request(&mut self, task_id: &str) {
        if let Some(old) = self.requests.remove(task_id) {
            if old.state == RequestState::Pending {
                self.classifier.discard(&old.key);
            }
        }
    }
}
