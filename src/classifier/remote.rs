//! HTTP classifier client.
//!
//! Each dispatch spawns one background request on the tokio runtime; its
//! answer lands in a result slot that the gateway polls later.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};
use url::Url;

use super::image_prep::CanonicalImage;
use super::types::{Classifier, Prediction, RawClassification, RequestKey};

enum Slot {
    Waiting,
    Done(RawClassification),
}

type Slots = Arc<Mutex<HashMap<RequestKey, Slot>>>;

/// Accepted response shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassifierResponse {
    Ranked(Vec<Prediction>),
    Wrapped { predictions: Vec<Prediction> },
    Failed { error: String },
}

pub struct RemoteClassifier {
    client: reqwest::Client,
    endpoint: Url,
    slots: Slots,
}

impl RemoteClassifier {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        Ok(Self {
            client,
            endpoint,
            slots: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestKey, Slot>> {
        lock_slots(&self.slots)
    }
}

fn lock_slots(slots: &Slots) -> MutexGuard<'_, HashMap<RequestKey, Slot>> {
    slots.lock().unwrap_or_else(|e| e.into_inner())
}

impl Classifier for RemoteClassifier {
    fn dispatch(&self, key: &RequestKey, image: &CanonicalImage) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                error!("No tokio runtime for classification {}", key);
                self.lock().insert(
                    key.clone(),
                    Slot::Done(RawClassification::Failed(
                        "classifier_unavailable".to_string(),
                    )),
                );
                return;
            }
        };

        self.lock().insert(key.clone(), Slot::Waiting);

        let body = json!({
            "taskId": key.task_id,
            "requestKey": key.to_string(),
            "image": image.to_data_url(),
        });
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let slots = Arc::clone(&self.slots);
        let key = key.clone();

        handle.spawn(async move {
            let raw = classify_remote(&client, endpoint, &body).await;
            let mut slots = lock_slots(&slots);
            // A discarded request has no slot left; drop the answer.
            if let Some(slot) = slots.get_mut(&key) {
                *slot = Slot::Done(raw);
            }
        });
    }

    fn poll(&self, key: &RequestKey) -> Option<RawClassification> {
        let mut slots = self.lock();
        if !matches!(slots.get(key), Some(Slot::Done(_))) {
            return None;
        }
        match slots.remove(key) {
            Some(Slot::Done(raw)) => Some(raw),
            _ => None,
        }
    }

    fn discard(&self, key: &RequestKey) {
        self.lock().remove(key);
    }
}

async fn classify_remote(
    client: &reqwest::Client,
    endpoint: Url,
    body: &serde_json::Value,
) -> RawClassification {
    let response = match client.post(endpoint).json(body).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("Classifier request failed: {}", e);
            return RawClassification::Failed("classifier_unreachable".to_string());
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!("Classifier returned HTTP {}", status);
        return RawClassification::Failed(format!("classifier_http_{}", status.as_u16()));
    }

    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to read classifier response: {}", e);
            return RawClassification::Failed("classifier_unreachable".to_string());
        }
    };

    parse_response(&text)
}

fn parse_response(text: &str) -> RawClassification {
    match serde_json::from_str::<ClassifierResponse>(text) {
        Ok(ClassifierResponse::Ranked(predictions))
        | Ok(ClassifierResponse::Wrapped { predictions }) => {
            RawClassification::Predictions(predictions)
        }
        Ok(ClassifierResponse::Failed { error }) => RawClassification::Failed(error),
        Err(e) => {
            warn!("Unrecognized classifier response: {}", e);
            RawClassification::Failed("classifier_bad_response".to_string())
        }
    }
}
