//! Type definitions for image classification.
//!
//! The external classifier speaks in loosely shaped payloads (a ranked list
//! of labels, or an error marker). Everything past the gateway only sees the
//! closed `Verdict` enum.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::image_prep::CanonicalImage;

/// Labels that count as a clean result.
pub const PASSING_LABELS: [&str; 2] = ["perfect", "good"];

/// One ranked label from the classifier.
///
/// Accepts Teachable Machine field names (`className`, `probability`) too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(alias = "className")]
    pub label: String,
    #[serde(alias = "probability")]
    pub confidence: f32,
}

/// Raw classifier output, before reduction.
#[derive(Debug, Clone, PartialEq)]
pub enum RawClassification {
    Predictions(Vec<Prediction>),
    Failed(String),
}

impl RawClassification {
    /// Reduce to a verdict: the highest-confidence label decides.
    pub fn into_verdict(self) -> Verdict {
        match self {
            RawClassification::Failed(reason) => Verdict::Error { reason },
            RawClassification::Predictions(predictions) => {
                let top = predictions.into_iter().max_by(|a, b| {
                    a.confidence
                        .partial_cmp(&b.confidence)
                        .unwrap_or(std::cmp::Ordering::Less)
                });
                match top {
                    None => {
                        warn!("Classifier returned an empty prediction list");
                        Verdict::Error {
                            reason: "empty_prediction".to_string(),
                        }
                    }
                    Some(p) => {
                        let normalized = p.label.trim().to_lowercase();
                        if PASSING_LABELS.contains(&normalized.as_str()) {
                            Verdict::Ok {
                                label: p.label,
                                confidence: p.confidence,
                            }
                        } else {
                            Verdict::NeedsFix {
                                label: p.label,
                                confidence: p.confidence,
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Reduced outcome of one classification attempt for one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Verdict {
    Ok { label: String, confidence: f32 },
    NeedsFix { label: String, confidence: f32 },
    Error { reason: String },
    Timeout,
}

/// What a caller sees when it asks about a classification request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ClassificationStatus {
    Pending,
    Ready { verdict: Verdict },
    Expired,
}

impl ClassificationStatus {
    /// The verdict to apply to the session, if the request is settled.
    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            ClassificationStatus::Pending => None,
            ClassificationStatus::Ready { verdict } => Some(verdict.clone()),
            ClassificationStatus::Expired => Some(Verdict::Timeout),
        }
    }
}

/// Identity of one classification request.
///
/// A new fingerprint or a bumped retry nonce makes a new request; anything
/// else is a duplicate of the one already in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub task_id: String,
    pub fingerprint: String,
    pub nonce: u32,
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tm_{}_{}_{}", self.task_id, self.fingerprint, self.nonce)
    }
}

/// The external image classifier.
///
/// Modeled as a black box that is told about a request once and then asked
/// about it repeatedly; `None` from `poll` means "no answer yet".
pub trait Classifier: Send + Sync {
    fn dispatch(&self, key: &RequestKey, image: &CanonicalImage);

    fn poll(&self, key: &RequestKey) -> Option<RawClassification>;

    /// Forget a request whose answer is no longer wanted.
    fn discard(&self, _key: &RequestKey) {}
}

/// Stand-in used when no classifier endpoint is configured.
pub struct UnavailableClassifier;

impl Classifier for UnavailableClassifier {
    fn dispatch(&self, key: &RequestKey, _image: &CanonicalImage) {
        warn!("No classifier configured, request {} will fail", key);
    }

    fn poll(&self, _key: &RequestKey) -> Option<RawClassification> {
        Some(RawClassification::Failed(
            "classifier_unavailable".to_string(),
        ))
    }
}
