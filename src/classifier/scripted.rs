//! Deterministic in-process classifier.
//!
//! Answers are scripted per task id; requests stay pending until a reply is
//! scripted for their task. Used by the test suites and handy for demos
//! without a model server.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::image_prep::CanonicalImage;
use super::types::{Classifier, Prediction, RawClassification, RequestKey};

#[derive(Default)]
struct ScriptState {
    replies: HashMap<String, RawClassification>,
    live: HashSet<RequestKey>,
    dispatched: Vec<RequestKey>,
    discarded: Vec<RequestKey>,
}

#[derive(Default)]
pub struct ScriptedClassifier {
    state: Mutex<ScriptState>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every live and future request for `task_id` with `raw`.
    pub fn reply(&self, task_id: &str, raw: RawClassification) {
        self.lock().replies.insert(task_id.to_string(), raw);
    }

    pub fn reply_labels(&self, task_id: &str, labels: &[(&str, f32)]) {
        let predictions = labels
            .iter()
            .map(|(label, confidence)| Prediction {
                label: label.to_string(),
                confidence: *confidence,
            })
            .collect();
        self.reply(task_id, RawClassification::Predictions(predictions));
    }

    pub fn dispatch_count(&self) -> usize {
        self.lock().dispatched.len()
    }

    pub fn dispatched(&self) -> Vec<RequestKey> {
        self.lock().dispatched.clone()
    }

    pub fn discarded(&self) -> Vec<RequestKey> {
        self.lock().discarded.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Classifier for ScriptedClassifier {
    fn dispatch(&self, key: &RequestKey, _image: &CanonicalImage) {
        let mut state = self.lock();
        state.live.insert(key.clone());
        state.dispatched.push(key.clone());
    }

    fn poll(&self, key: &RequestKey) -> Option<RawClassification> {
        let state = self.lock();
        if !state.live.contains(key) {
            return None;
        }
        state.replies.get(&key.task_id).cloned()
    }

    fn discard(&self, key: &RequestKey) {
        let mut state = self.lock();
        if state.live.remove(key) {
            state.discarded.push(key.clone());
        }
    }
}
