//! JSON shapes returned by the API.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::archive::ReportEntry;
use crate::catalog::Task;
use crate::classifier::{ClassificationGateway, ClassificationStatus};
use crate::forward::ForwardOutcome;
use crate::report::PartialMeta;
use crate::session::{format_optional, Session, SessionPhase, TaskStatus};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: String,
    pub label: String,
    pub order: u32,
    pub weight: u32,
    pub advice: String,
    pub status: TaskStatus,
    pub score: u32,
    pub checked_at: String,
    pub notes: String,
    /// `none`, `pending`, `ready` or `expired`
    pub classification: &'static str,
}

impl TaskView {
    pub fn build(task: &Task, session: &Session, gateway: &ClassificationGateway) -> Self {
        let state = session.task(&task.id).cloned().unwrap_or_default();
        Self {
            id: task.id.clone(),
            label: task.label.clone(),
            order: task.order,
            weight: task.weight,
            advice: task.advice.clone(),
            status: state.status,
            score: state.score,
            checked_at: format_optional(state.checked_at.as_ref()),
            notes: state.notes,
            classification: gateway.state_label(&task.id),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub room_id: String,
    pub cleaner_id: String,
    pub phase: SessionPhase,
    pub started_at: String,
    pub finished_at: String,
    pub elapsed_seconds: u64,
    pub total_score: u32,
    pub max_score: u32,
    pub tasks: Vec<TaskView>,
}

impl SessionView {
    /// Elapsed time stops at `finished_at` once the session is finished.
    pub fn build(session: &Session, gateway: &ClassificationGateway, now: DateTime<Utc>) -> Self {
        let elapsed_to = session.finished_at().copied().unwrap_or(now);
        Self {
            room_id: session.room_id().to_string(),
            cleaner_id: session.cleaner_id().to_string(),
            phase: session.phase(),
            started_at: format_optional(session.started_at()),
            finished_at: format_optional(session.finished_at()),
            elapsed_seconds: session.elapsed_seconds(elapsed_to),
            total_score: session.total_score(),
            max_score: session.max_score(),
            tasks: session
                .catalog()
                .tasks()
                .iter()
                .map(|task| TaskView::build(task, session, gateway))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub classification: ClassificationStatus,
    pub task: TaskView,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub ok: bool,
    pub report_id: String,
    pub filename: String,
    pub download_url: String,
    pub sent_to_auditor: bool,
    pub send_error: String,
}

impl SubmitResponse {
    pub fn new(report_id: &str, filename: &str, outcome: ForwardOutcome) -> Self {
        Self {
            ok: true,
            report_id: report_id.to_string(),
            filename: filename.to_string(),
            download_url: format!("/reports/{}", filename),
            sent_to_auditor: outcome.sent,
            send_error: outcome.error,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReceiveResponse {
    pub ok: bool,
    pub saved_as: String,
    pub view_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginStatus {
    pub authenticated: bool,
    pub operator_warning: Option<&'static str>,
}

/// Archive listing row: file facts plus the decoded summary.
#[derive(Debug, Serialize)]
pub struct ArchiveRow {
    #[serde(flatten)]
    pub entry: ReportEntry,
    #[serde(flatten)]
    pub meta: PartialMeta,
}

#[derive(Debug, Serialize)]
pub struct ArchiveIndex {
    pub reports: Vec<ArchiveRow>,
}

#[derive(Debug, Serialize)]
pub struct ReportView {
    pub filename: String,
    pub meta: PartialMeta,
    pub text: String,
}
