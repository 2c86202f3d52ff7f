//! Canonical text form of a report.
//!
//! The format is line-oriented `key: value` text headed by
//! `CLEANING_REPORT_V1`, with one indented block per task. Decoding only
//! recovers the summary fields an auditor listing needs and never fails.

use chrono::{DateTime, Utc};

use super::types::{PartialMeta, Report};

pub const REPORT_HEADER: &str = "CLEANING_REPORT_V1";

/// Lines scanned by [`decode`] before giving up.
pub const META_SCAN_LINES: usize = 40;

/// Render a report. Deterministic; tasks keep the order they have in the
/// report (catalog order).
pub fn encode(report: &Report) -> String {
    let mut lines = vec![
        REPORT_HEADER.to_string(),
        field("report_id", &report.report_id),
        field("roomId", &report.room_id),
        field("cleanerId", &report.cleaner_id),
        field("startedAt", &report.started_at),
        field("finishedAt", &report.finished_at),
        field("durationSeconds", &report.duration_seconds.to_string()),
        field("totalScore", &report.total_score.to_string()),
        String::new(),
        "tasks:".to_string(),
    ];

    for task in &report.tasks {
        lines.push(format!("- {}", field("id", &task.id)));
        lines.push(format!("  {}", field("status", task.status.as_str())));
        lines.push(format!("  {}", field("score", &task.score.to_string())));
        lines.push(format!("  {}", field("checkedAt", &task.checked_at)));
        lines.push(format!("  {}", field("notes", &task.notes)));
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// `key: value` with line breaks in the value flattened to spaces.
fn field(key: &str, value: &str) -> String {
    let flat: String = value
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    format!("{}: {}", key, flat)
}

/// Pull summary fields out of report text. A later line overrides an
/// earlier one for the same field.
pub fn decode(text: &str) -> PartialMeta {
    let mut meta = PartialMeta::default();

    for line in text.lines().take(META_SCAN_LINES) {
        let line = line.trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key {
            "roomId" => meta.room_id = value.to_string(),
            "cleanerId" => meta.cleaner_id = value.to_string(),
            "totalScore" => {
                meta.total_score = match value.parse::<u64>() {
                    Ok(score) => score.to_string(),
                    Err(_) => String::new(),
                };
            }
            "finishedAt" => meta.finished_at = value.to_string(),
            _ => {}
        }
    }

    meta
}

/// Replace every char outside `[A-Za-z0-9_.-]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn report_filename(report_id: &str) -> String {
    sanitize_filename(&format!("cleaning_report_{}.txt", report_id))
}

/// Name for a report pushed to the receive endpoint.
///
/// Blank or non-`.txt` names get a timestamped default.
pub fn receive_filename(requested: &str, now: DateTime<Utc>) -> String {
    let requested = requested.trim();
    if requested.is_empty() || !requested.ends_with(".txt") {
        return format!("cleaning_report_{}.txt", now.format("%Y%m%d_%H%M%S"));
    }
    sanitize_filename(requested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::TaskRecord;
    use crate::session::TaskStatus;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn report() -> Report {
        Report {
            report_id: "a1b2c3d4e5f6".to_string(),
            room_id: "501".to_string(),
            cleaner_id: "c-7".to_string(),
            started_at: "2026-03-01T09:00:00Z".to_string(),
            finished_at: "2026-03-01T09:20:00Z".to_string(),
            duration_seconds: 1200,
            total_score: 10,
            tasks: vec![
                TaskRecord {
                    id: "trash".to_string(),
                    status: TaskStatus::Passed,
                    score: 10,
                    checked_at: "2026-03-01T09:02:00Z".to_string(),
                    notes: String::new(),
                },
                TaskRecord {
                    id: "bed".to_string(),
                    status: TaskStatus::Failed,
                    score: 0,
                    checked_at: "2026-03-01T09:05:00Z".to_string(),
                    notes: "pillow\nstained".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_encode_exact_text() {
        let expected = [
            "CLEANING_REPORT_V1",
            "report_id: a1b2c3d4e5f6",
            "roomId: 501",
            "cleanerId: c-7",
            "startedAt: 2026-03-01T09:00:00Z",
            "finishedAt: 2026-03-01T09:20:00Z",
            "durationSeconds: 1200",
            "totalScore: 10",
            "",
            "tasks:",
            "- id: trash",
            "  status: passed",
            "  score: 10",
            "  checkedAt: 2026-03-01T09:02:00Z",
            "  notes: ",
            "- id: bed",
            "  status: failed",
            "  score: 0",
            "  checkedAt: 2026-03-01T09:05:00Z",
            "  notes: pillow stained",
            "",
        ]
        .join("\n");
        assert_eq!(encode(&report()), expected);
    }

    #[test]
    fn test_encode_is_deterministic() {
        assert_eq!(encode(&report()), encode(&report()));
    }

    #[test]
    fn test_decode_recovers_summary() {
        let meta = decode(&encode(&report()));
        assert_eq!(
            meta,
            PartialMeta {
                room_id: "501".to_string(),
                cleaner_id: "c-7".to_string(),
                total_score: "10".to_string(),
                finished_at: "2026-03-01T09:20:00Z".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_finished_at() {
        let mut report = report();
        report.finished_at = String::new();
        let text = encode(&report);
        assert!(text.lines().any(|l| l == "finishedAt: "));
        assert_eq!(decode(&text).finished_at, "");
    }

    #[test]
    fn test_decode_garbage_degrades() {
        assert_eq!(decode("hello\nworld"), PartialMeta::default());
        assert_eq!(decode(""), PartialMeta::default());
    }

    #[test]
    fn test_decode_malformed_score_is_empty() {
        let meta = decode("roomId: 7\ntotalScore: lots\n");
        assert_eq!(meta.room_id, "7");
        assert_eq!(meta.total_score, "");

        assert_eq!(decode("totalScore: -5").total_score, "");
    }

    #[test]
    fn test_decode_last_occurrence_wins() {
        let meta = decode("roomId: 1\nroomId: 2\ntotalScore: 5\ntotalScore: 9\n");
        assert_eq!(meta.room_id, "2");
        assert_eq!(meta.total_score, "9");

        let meta = decode("totalScore: 5\ntotalScore: lots\n");
        assert_eq!(meta.total_score, "");
    }

    #[test]
    fn test_decode_stops_after_scan_window() {
        let mut text = "filler\n".repeat(META_SCAN_LINES);
        text.push_str("roomId: late\n");
        assert_eq!(decode(&text).room_id, "");
    }

    #[test]
    fn test_decode_keeps_colons_in_values() {
        assert_eq!(
            decode("finishedAt: 2026-03-01T09:20:00Z").finished_at,
            "2026-03-01T09:20:00Z"
        );
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize_filename("room 5 (a).txt"), "room_5__a_.txt");
        assert_eq!(sanitize_filename("ok-name_1.txt"), "ok-name_1.txt");
    }

    #[test]
    fn test_report_filename() {
        assert_eq!(
            report_filename("a1b2c3d4e5f6"),
            "cleaning_report_a1b2c3d4e5f6.txt"
        );
    }

    #[test]
    fn test_receive_filename() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 7).unwrap();
        assert_eq!(
            receive_filename("", now),
            "cleaning_report_20260301_090507.txt"
        );
        assert_eq!(
            receive_filename("report.pdf", now),
            "cleaning_report_20260301_090507.txt"
        );
        assert_eq!(receive_filename(" my report.txt ", now), "my_report.txt");
    }
}
