//! Report data model and construction from client submissions.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::catalog::TaskCatalog;
use crate::session::TaskStatus;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("roomId and cleanerId are required")]
    MissingIdentifier,

    #[error("unknown status '{status}' for task '{task_id}'")]
    UnknownStatus { task_id: String, status: String },
}

/// Immutable record of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub report_id: String,
    pub room_id: String,
    pub cleaner_id: String,
    /// Rendered timestamp, or empty
    pub started_at: String,
    /// Rendered timestamp, or empty
    pub finished_at: String,
    pub duration_seconds: u64,
    pub total_score: u32,
    /// One record per catalog task, in catalog order
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: String,
    pub status: TaskStatus,
    pub score: u32,
    pub checked_at: String,
    pub notes: String,
}

/// Summary fields recovered from report text. Empty when absent or malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialMeta {
    pub room_id: String,
    pub cleaner_id: String,
    pub total_score: String,
    pub finished_at: String,
}

/// Body of `POST /api/report`.
///
/// Every field is optional and `null` reads as the field's default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmitReportRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub room_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cleaner_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub started_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub finished_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub duration_seconds: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_score: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub tasks: HashMap<String, SubmittedTask>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmittedTask {
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub score: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub checked_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub notes: String,
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Fresh 12-char lowercase hex report id.
pub fn new_report_id() -> String {
    hex::encode(rand::random::<[u8; 6]>())
}

impl Report {
    /// Build a report from a client submission.
    ///
    /// Scores are recomputed from the catalog; the client's numbers are only
    /// compared and logged. Unknown task ids are dropped and missing ones
    /// are filled with unchecked defaults.
    pub fn from_submission(
        catalog: &TaskCatalog,
        report_id: &str,
        request: &SubmitReportRequest,
    ) -> Result<Self, ReportError> {
        let room_id = request.room_id.trim();
        let cleaner_id = request.cleaner_id.trim();
        if room_id.is_empty() || cleaner_id.is_empty() {
            return Err(ReportError::MissingIdentifier);
        }

        for task_id in request.tasks.keys() {
            if !catalog.contains(task_id) {
                warn!("Dropping unknown task '{}' from submitted report", task_id);
            }
        }

        let mut tasks = Vec::with_capacity(catalog.len());
        for task in catalog.tasks() {
            let record = match request.tasks.get(&task.id) {
                None => TaskRecord {
                    id: task.id.clone(),
                    status: TaskStatus::Unchecked,
                    score: 0,
                    checked_at: String::new(),
                    notes: String::new(),
                },
                Some(submitted) => {
                    let status = TaskStatus::parse(&submitted.status).ok_or_else(|| {
                        ReportError::UnknownStatus {
                            task_id: task.id.clone(),
                            status: submitted.status.clone(),
                        }
                    })?;
                    let score = if status == TaskStatus::Passed {
                        task.weight
                    } else {
                        0
                    };
                    if submitted.score != i64::from(score) {
                        warn!(
                            "Task '{}' submitted score {} but scores {}",
                            task.id, submitted.score, score
                        );
                    }
                    TaskRecord {
                        id: task.id.clone(),
                        status,
                        score,
                        checked_at: submitted.checked_at.trim().to_string(),
                        notes: submitted.notes.clone(),
                    }
                }
            };
            tasks.push(record);
        }

        let total_score: u32 = tasks.iter().map(|t| t.score).sum();
        if request.total_score != i64::from(total_score) {
            warn!(
                "Submitted totalScore {} differs from derived {}",
                request.total_score, total_score
            );
        }

        Ok(Report {
            report_id: report_id.to_string(),
            room_id: room_id.to_string(),
            cleaner_id: cleaner_id.to_string(),
            started_at: request.started_at.trim().to_string(),
            finished_at: request.finished_at.trim().to_string(),
            duration_seconds: request.duration_seconds.max(0) as u64,
            total_score,
            tasks,
        })
    }
}
