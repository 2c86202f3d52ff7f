use serde::Serialize;
use thiserror::Error;

/// Layout of `ReportEntry::modified_at`.
pub const MODIFIED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    #[error("report '{0}' not found")]
    NotFound(String),

    #[error("report '{0}' already exists")]
    AlreadyExists(String),

    #[error("invalid report name '{0}'")]
    InvalidName(String),

    #[error("archive I/O error: {0}")]
    Io(String),
}

/// One row of the archive listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub filename: String,
    /// Empty if the modification time is unavailable
    pub modified_at: String,
    pub size_bytes: u64,
}
