use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Local, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::types::{ArchiveError, ReportEntry, MODIFIED_AT_FORMAT};
use crate::report::sanitize_filename;

/// Append-mostly storage for report text.
///
/// Records are immutable once written. All operations are synchronous;
/// callers in async contexts should use `tokio::task::spawn_blocking`.
pub trait ReportStore: Send + Sync {
    /// Store a new record. Fails with `AlreadyExists` rather than overwrite.
    fn write(&self, filename: &str, content: &[u8]) -> Result<(), ArchiveError>;

    /// `.txt` records, newest name first.
    fn list(&self) -> Result<Vec<ReportEntry>, ArchiveError>;

    fn read(&self, filename: &str) -> Result<Vec<u8>, ArchiveError>;
}

/// Accept only names that are already sanitized `.txt` names.
pub fn validate_name(filename: &str) -> Result<(), ArchiveError> {
    let valid = !filename.is_empty()
        && filename != "."
        && filename != ".."
        && filename.ends_with(".txt")
        && sanitize_filename(filename) == filename;
    if valid {
        Ok(())
    } else {
        Err(ArchiveError::InvalidName(filename.to_string()))
    }
}

fn sort_newest_first(entries: &mut [ReportEntry]) {
    entries.sort_by(|a, b| b.filename.cmp(&a.filename));
}

/// Reports as files in one flat directory.
pub struct FsReportStore {
    dir: PathBuf,
}

impl FsReportStore {
    /// Open (and create if needed) the reports directory.
    pub fn new(dir: &Path) -> Result<Self, String> {
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create reports dir {:?}: {}", dir, e))?;
        info!("Report archive at {:?}", dir);
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ReportStore for FsReportStore {
    fn write(&self, filename: &str, content: &[u8]) -> Result<(), ArchiveError> {
        validate_name(filename)?;
        let target = self.dir.join(filename);
        if target.exists() {
            return Err(ArchiveError::AlreadyExists(filename.to_string()));
        }

        // Temp file in the same directory so the final link is atomic.
        let mut temp =
            NamedTempFile::new_in(&self.dir).map_err(|e| ArchiveError::Io(e.to_string()))?;
        temp.write_all(content)
            .map_err(|e| ArchiveError::Io(e.to_string()))?;
        temp.flush().map_err(|e| ArchiveError::Io(e.to_string()))?;

        temp.persist_noclobber(&target).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                ArchiveError::AlreadyExists(filename.to_string())
            } else {
                ArchiveError::Io(e.error.to_string())
            }
        })?;

        info!("Wrote report {:?} ({} bytes)", target, content.len());
        Ok(())
    }

    fn list(&self) -> Result<Vec<ReportEntry>, ArchiveError> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| ArchiveError::Io(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let filename = entry.file_name().to_string_lossy().to_string();
            if !filename.ends_with(".txt") {
                continue;
            }

            let (modified_at, size_bytes) = match entry.metadata() {
                Ok(meta) => {
                    let modified_at = meta
                        .modified()
                        .map(|t| {
                            DateTime::<Local>::from(t)
                                .format(MODIFIED_AT_FORMAT)
                                .to_string()
                        })
                        .unwrap_or_default();
                    (modified_at, meta.len())
                }
                Err(_) => (String::new(), 0),
            };

            entries.push(ReportEntry {
                filename,
                modified_at,
                size_bytes,
            });
        }

        sort_newest_first(&mut entries);
        debug!("Listed {} reports in {:?}", entries.len(), self.dir);
        Ok(entries)
    }

    fn read(&self, filename: &str) -> Result<Vec<u8>, ArchiveError> {
        validate_name(filename)?;
        let path = self.dir.join(filename);
        std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ArchiveError::NotFound(filename.to_string())
            } else {
                ArchiveError::Io(e.to_string())
            }
        })
    }
}

struct MemoryRecord {
    content: Vec<u8>,
    written_at: DateTime<Utc>,
}

/// In-process store; contents vanish with the process.
#[derive(Default)]
pub struct MemoryReportStore {
    records: Mutex<BTreeMap<String, MemoryRecord>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, MemoryRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ReportStore for MemoryReportStore {
    fn write(&self, filename: &str, content: &[u8]) -> Result<(), ArchiveError> {
        validate_name(filename)?;
        let mut records = self.lock();
        if records.contains_key(filename) {
            return Err(ArchiveError::AlreadyExists(filename.to_string()));
        }
        records.insert(
            filename.to_string(),
            MemoryRecord {
                content: content.to_vec(),
                written_at: Utc::now(),
            },
        );
        info!("Stored report '{}' in memory", filename);
        Ok(())
    }

    fn list(&self) -> Result<Vec<ReportEntry>, ArchiveError> {
        let mut entries: Vec<ReportEntry> = self
            .lock()
            .iter()
            .map(|(name, record)| ReportEntry {
                filename: name.clone(),
                modified_at: DateTime::<Local>::from(record.written_at)
                    .format(MODIFIED_AT_FORMAT)
                    .to_string(),
                size_bytes: record.content.len() as u64,
            })
            .collect();
        sort_newest_first(&mut entries);
        Ok(entries)
    }

    fn read(&self, filename: &str) -> Result<Vec<u8>, ArchiveError> {
        validate_name(filename)?;
        self.lock()
            .get(filename)
            .map(|r| r.content.clone())
            .ok_or_else(|| ArchiveError::NotFound(filename.to_string()))
    }
}
