use std::cmp;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::TaskCatalog;
use crate::classifier::Verdict;
use crate::report::{Report, TaskRecord};

use super::clock::format_optional;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session already started")]
    AlreadyStarted,

    #[error("session has not been started")]
    NotStarted,

    #[error("unknown task '{0}'")]
    UnknownTask(String),

    #[error("roomId and cleanerId are required")]
    MissingIdentifier,
}

/// Normalized per-task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Unchecked,
    Passed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Unchecked => "unchecked",
            TaskStatus::Passed => "passed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Parse a status, accepting the legacy spellings older clients send.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "" | "pending" | "todo" | "unchecked" => Some(TaskStatus::Unchecked),
            "done" | "good" | "perfect" | "passed" => Some(TaskStatus::Passed),
            "fix" | "bad" | "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

/// Session-level phase derived from the timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    NotStarted,
    Running,
    Finished,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskState {
    pub status: TaskStatus,
    /// Either 0 or the task weight; never partial.
    pub score: u32,
    pub checked_at: Option<DateTime<Utc>>,
    pub notes: String,
}

/// One cleaning pass over the whole catalog.
///
/// Every catalog task always has a `TaskState`; nothing outside the catalog
/// ever gets one.
#[derive(Debug, Clone)]
pub struct Session {
    catalog: Arc<TaskCatalog>,
    room_id: String,
    cleaner_id: String,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    tasks: HashMap<String, TaskState>,
}

impl Session {
    pub fn new(catalog: Arc<TaskCatalog>) -> Self {
        let tasks = default_task_states(&catalog);
        Self {
            catalog,
            room_id: String::new(),
            cleaner_id: String::new(),
            started_at: None,
            finished_at: None,
            tasks,
        }
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn cleaner_id(&self) -> &str {
        &self.cleaner_id
    }

    pub fn started_at(&self) -> Option<&DateTime<Utc>> {
        self.started_at.as_ref()
    }

    pub fn finished_at(&self) -> Option<&DateTime<Utc>> {
        self.finished_at.as_ref()
    }

    pub fn phase(&self) -> SessionPhase {
        match (self.started_at, self.finished_at) {
            (None, _) => SessionPhase::NotStarted,
            (Some(_), None) => SessionPhase::Running,
            (Some(_), Some(_)) => SessionPhase::Finished,
        }
    }

    pub fn set_identity(&mut self, room_id: &str, cleaner_id: &str) {
        self.room_id = room_id.trim().to_string();
        self.cleaner_id = cleaner_id.trim().to_string();
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.started_at.is_some() {
            return Err(SessionError::AlreadyStarted);
        }
        self.started_at = Some(now);
        self.finished_at = None;
        info!("Session started for room '{}'", self.room_id);
        Ok(())
    }

    /// Stamp `finished_at`. Calling it again overwrites the stamp.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.started_at.is_none() {
            return Err(SessionError::NotStarted);
        }
        self.finished_at = Some(now);
        info!(
            "Session finished for room '{}' with score {}",
            self.room_id,
            self.total_score()
        );
        Ok(())
    }

    /// Back to the initial state. Room and cleaner ids are form inputs and
    /// are kept.
    pub fn reset(&mut self) {
        self.started_at = None;
        self.finished_at = None;
        self.tasks = default_task_states(&self.catalog);
        info!("Session reset for room '{}'", self.room_id);
    }

    pub fn task(&self, task_id: &str) -> Option<&TaskState> {
        self.tasks.get(task_id)
    }

    /// Reduce a classification verdict into the task's state.
    ///
    /// `Ok` passes the task, `NeedsFix` fails it, `Error` and `Timeout`
    /// put it back to unchecked without touching `checked_at`. Notes are
    /// never modified here.
    pub fn apply_verdict(
        &mut self,
        task_id: &str,
        verdict: &Verdict,
        now: DateTime<Utc>,
    ) -> Result<&TaskState, SessionError> {
        let weight = self
            .catalog
            .get(task_id)
            .map(|t| t.weight)
            .ok_or_else(|| SessionError::UnknownTask(task_id.to_string()))?;
        let state = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| SessionError::UnknownTask(task_id.to_string()))?;

        let new_status = match verdict {
            Verdict::Ok { .. } => TaskStatus::Passed,
            Verdict::NeedsFix { .. } => TaskStatus::Failed,
            Verdict::Error { .. } | Verdict::Timeout => TaskStatus::Unchecked,
        };

        if new_status != state.status && new_status != TaskStatus::Unchecked {
            state.checked_at = Some(now);
        }
        state.status = new_status;
        state.score = if new_status == TaskStatus::Passed {
            weight
        } else {
            0
        };

        debug!(
            "Task '{}' -> {} ({} pts)",
            task_id,
            state.status.as_str(),
            state.score
        );
        Ok(&*state)
    }

    pub fn set_notes(&mut self, task_id: &str, notes: &str) -> Result<(), SessionError> {
        let state = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| SessionError::UnknownTask(task_id.to_string()))?;
        state.notes = notes.to_string();
        Ok(())
    }

    pub fn total_score(&self) -> u32 {
        self.tasks.values().map(|t| t.score).sum()
    }

    pub fn max_score(&self) -> u32 {
        self.catalog.max_score()
    }

    /// Whole seconds since start; 0 before start or under clock skew.
    pub fn elapsed_seconds(&self, at: DateTime<Utc>) -> u64 {
        match self.started_at {
            None => 0,
            Some(started) => cmp::max((at - started).num_seconds(), 0) as u64,
        }
    }

    /// Build the immutable report for this session.
    ///
    /// Duration runs to `finished_at`, or to `now` for a session that was
    /// never finished.
    pub fn to_report(&self, report_id: &str, now: DateTime<Utc>) -> Result<Report, SessionError> {
        if self.room_id.is_empty() || self.cleaner_id.is_empty() {
            return Err(SessionError::MissingIdentifier);
        }
        if self.started_at.is_none() {
            return Err(SessionError::NotStarted);
        }

        let end = self.finished_at.unwrap_or(now);
        let tasks = self
            .catalog
            .tasks()
            .iter()
            .map(|task| {
                let state = self.tasks.get(&task.id).cloned().unwrap_or_default();
                TaskRecord {
                    id: task.id.clone(),
                    status: state.status,
                    score: state.score,
                    checked_at: format_optional(state.checked_at.as_ref()),
                    notes: state.notes,
                }
            })
            .collect();

        Ok(Report {
            report_id: report_id.to_string(),
            room_id: self.room_id.clone(),
            cleaner_id: self.cleaner_id.clone(),
            started_at: format_optional(self.started_at.as_ref()),
            finished_at: format_optional(self.finished_at.as_ref()),
            duration_seconds: self.elapsed_seconds(end),
            total_score: self.total_score(),
            tasks,
        })
    }
}

fn default_task_states(catalog: &TaskCatalog) -> HashMap<String, TaskState> {
    catalog
        .tasks()
        .iter()
        .map(|t| (t.id.clone(), TaskState::default()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::trash_and_bed;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap()
    }

    fn ok() -> Verdict {
        Verdict::Ok {
            label: "good".to_string(),
            confidence: 0.9,
        }
    }

    fn needs_fix() -> Verdict {
        Verdict::NeedsFix {
            label: "bad".to_string(),
            confidence: 0.8,
        }
    }

    fn assert_score_invariant(session: &Session) {
        for task in session.catalog().tasks() {
            let state = session.task(&task.id).unwrap();
            match state.status {
                TaskStatus::Passed => assert_eq!(state.score, task.weight),
                _ => assert_eq!(state.score, 0),
            }
        }
        assert!(session.total_score() <= session.max_score());
    }

    #[test]
    fn test_new_session_defaults() {
        let session = Session::new(trash_and_bed());
        assert_eq!(session.phase(), SessionPhase::NotStarted);
        assert_eq!(session.total_score(), 0);
        assert_eq!(session.task("bed"), Some(&TaskState::default()));
        assert!(session.task("sink").is_none());
    }

    #[test]
    fn test_start_twice_fails() {
        let mut session = Session::new(trash_and_bed());
        session.start(t0()).unwrap();
        assert_eq!(session.start(t0()), Err(SessionError::AlreadyStarted));
        assert_eq!(session.phase(), SessionPhase::Running);
    }

    #[test]
    fn test_finish_before_start_fails() {
        let mut session = Session::new(trash_and_bed());
        assert_eq!(session.finish(t0()), Err(SessionError::NotStarted));
        assert!(session.finished_at().is_none());
    }

    #[test]
    fn test_finish_twice_last_call_wins() {
        let mut session = Session::new(trash_and_bed());
        session.start(t0()).unwrap();
        session.finish(t0() + Duration::seconds(60)).unwrap();
        session.finish(t0() + Duration::seconds(120)).unwrap();
        assert_eq!(session.finished_at(), Some(&(t0() + Duration::seconds(120))));
        assert_eq!(session.phase(), SessionPhase::Finished);
    }

    #[test]
    fn test_scoring_scenario() {
        let mut session = Session::new(trash_and_bed());
        session.apply_verdict("trash", &ok(), t0()).unwrap();
        session.apply_verdict("bed", &needs_fix(), t0()).unwrap();
        assert_eq!(session.total_score(), 10);
        assert_eq!(session.task("bed").unwrap().status, TaskStatus::Failed);

        session.apply_verdict("bed", &ok(), t0()).unwrap();
        assert_eq!(session.total_score(), 40);
        assert_score_invariant(&session);
    }

    #[test]
    fn test_unknown_task_rejected() {
        let mut session = Session::new(trash_and_bed());
        assert_eq!(
            session.apply_verdict("sink", &ok(), t0()).unwrap_err(),
            SessionError::UnknownTask("sink".to_string())
        );
        assert!(session.set_notes("sink", "x").is_err());
    }

    #[test]
    fn test_checked_at_only_moves_on_status_change() {
        let mut session = Session::new(trash_and_bed());
        session.apply_verdict("bed", &ok(), t0()).unwrap();
        session
            .apply_verdict("bed", &ok(), t0() + Duration::seconds(30))
            .unwrap();
        assert_eq!(session.task("bed").unwrap().checked_at, Some(t0()));

        session
            .apply_verdict("bed", &needs_fix(), t0() + Duration::seconds(45))
            .unwrap();
        assert_eq!(
            session.task("bed").unwrap().checked_at,
            Some(t0() + Duration::seconds(45))
        );
    }

    #[test]
    fn test_error_and_timeout_revert_without_touching_checked_at_or_notes() {
        let mut session = Session::new(trash_and_bed());
        session.set_notes("bed", "pillow stain").unwrap();
        session.apply_verdict("bed", &ok(), t0()).unwrap();

        session
            .apply_verdict("bed", &Verdict::Timeout, t0() + Duration::seconds(5))
            .unwrap();
        let state = session.task("bed").unwrap();
        assert_eq!(state.status, TaskStatus::Unchecked);
        assert_eq!(state.score, 0);
        assert_eq!(state.checked_at, Some(t0()));
        assert_eq!(state.notes, "pillow stain");

        session
            .apply_verdict(
                "trash",
                &Verdict::Error {
                    reason: "invalid_image".to_string(),
                },
                t0(),
            )
            .unwrap();
        assert_eq!(session.task("trash").unwrap().checked_at, None);
    }

    #[test]
    fn test_verdict_sequences_keep_score_invariant() {
        let verdicts = [
            ok(),
            needs_fix(),
            Verdict::Timeout,
            ok(),
            ok(),
            Verdict::Error {
                reason: "x".to_string(),
            },
            needs_fix(),
        ];
        let mut session = Session::new(trash_and_bed());
        for (i, verdict) in verdicts.iter().enumerate() {
            let id = if i % 2 == 0 { "trash" } else { "bed" };
            session
                .apply_verdict(id, verdict, t0() + Duration::seconds(i as i64))
                .unwrap();
            assert_score_invariant(&session);
        }
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut session = Session::new(trash_and_bed());
        session.set_identity(" 101 ", "alice");
        session.start(t0()).unwrap();
        session.apply_verdict("bed", &ok(), t0()).unwrap();
        session.set_notes("trash", "bin cracked").unwrap();
        session.finish(t0() + Duration::seconds(10)).unwrap();

        session.reset();

        let fresh = Session::new(trash_and_bed());
        assert_eq!(session.phase(), SessionPhase::NotStarted);
        assert!(session.started_at().is_none());
        assert!(session.finished_at().is_none());
        assert_eq!(session.total_score(), 0);
        for task in fresh.catalog().tasks() {
            assert_eq!(session.task(&task.id), fresh.task(&task.id));
        }
        assert_eq!(session.room_id(), "101");

        // Can start again after a reset.
        session.start(t0() + Duration::seconds(20)).unwrap();
    }

    #[test]
    fn test_elapsed_seconds() {
        let mut session = Session::new(trash_and_bed());
        assert_eq!(session.elapsed_seconds(t0()), 0);

        session.start(t0()).unwrap();
        assert_eq!(session.elapsed_seconds(t0() + Duration::milliseconds(90_900)), 90);
        assert_eq!(session.elapsed_seconds(t0() - Duration::seconds(5)), 0);
    }

    #[test]
    fn test_to_report_requires_identity_and_start() {
        let mut session = Session::new(trash_and_bed());
        session.start(t0()).unwrap();
        assert_eq!(
            session.to_report("abc", t0()).unwrap_err(),
            SessionError::MissingIdentifier
        );

        let mut unstarted = Session::new(trash_and_bed());
        unstarted.set_identity("101", "alice");
        assert_eq!(
            unstarted.to_report("abc", t0()).unwrap_err(),
            SessionError::NotStarted
        );
    }

    #[test]
    fn test_to_report_orders_tasks_and_measures_duration() {
        let mut session = Session::new(trash_and_bed());
        session.set_identity("101", "alice");
        session.start(t0()).unwrap();
        session.apply_verdict("bed", &ok(), t0() + Duration::seconds(30)).unwrap();
        session.set_notes("trash", "ok").unwrap();
        session.finish(t0() + Duration::seconds(125)).unwrap();

        let report = session.to_report("abc123", t0() + Duration::seconds(999)).unwrap();
        assert_eq!(report.duration_seconds, 125);
        assert_eq!(report.total_score, 30);
        assert_eq!(report.started_at, "2026-05-04T10:00:00Z");
        assert_eq!(report.finished_at, "2026-05-04T10:02:05Z");

        let ids: Vec<&str> = report.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["trash", "bed"]);
        assert_eq!(report.tasks[1].checked_at, "2026-05-04T10:00:30Z");
        assert_eq!(report.tasks[0].notes, "ok");
    }

    #[test]
    fn test_to_report_unfinished_uses_now() {
        let mut session = Session::new(trash_and_bed());
        session.set_identity("101", "alice");
        session.start(t0()).unwrap();

        let report = session.to_report("abc", t0() + Duration::seconds(42)).unwrap();
        assert_eq!(report.finished_at, "");
        assert_eq!(report.duration_seconds, 42);
    }

    #[test]
    fn test_task_status_parse_aliases() {
        assert_eq!(TaskStatus::parse("pending"), Some(TaskStatus::Unchecked));
        assert_eq!(TaskStatus::parse("todo"), Some(TaskStatus::Unchecked));
        assert_eq!(TaskStatus::parse("Perfect"), Some(TaskStatus::Passed));
        assert_eq!(TaskStatus::parse("done"), Some(TaskStatus::Passed));
        assert_eq!(TaskStatus::parse("bad"), Some(TaskStatus::Failed));
        assert_eq!(TaskStatus::parse("fix"), Some(TaskStatus::Failed));
        assert_eq!(TaskStatus::parse("sparkling"), None);
    }
}
