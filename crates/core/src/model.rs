use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const REPORT_VERSION: &str = "1.0.0";

/// Read-only snapshot of one file, taken once at enumeration time. The
/// snapshot is not refreshed if the file changes mid-run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub file_name: String,
    /// Lower-cased, with leading dot; empty when the file has no extension.
    pub extension: String,
    pub size_bytes: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    pub fn from_path(path: PathBuf) -> Result<Self> {
        let metadata = std::fs::metadata(&path)
            .with_context(|| format!("failed to read metadata for {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self {
            extension: extension_of(&path),
            file_name,
            size_bytes: metadata.len(),
            modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
            path,
        })
    }
}

pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

/// Result of one (file, sink) backup attempt. Failures are independent and
/// never abort the rest of the file's processing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupOutcome {
    pub sink_name: String,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackupOutcome {
    pub fn success(sink_name: impl Into<String>) -> Self {
        Self {
            sink_name: sink_name.into(),
            succeeded: true,
            error: None,
        }
    }

    pub fn failure(sink_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            sink_name: sink_name.into(),
            succeeded: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlacementResult {
    pub original_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_path: Option<PathBuf>,
    pub moved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity_ok: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run-wide counters. Owned by the pipeline for the duration of one run and
/// handed out by value once finalized.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub total_files: u64,
    pub moved_files: u64,
    pub skipped_files: u64,
    pub errors: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileDecision {
    Skipped,
    Moved,
    Error,
}

/// Everything that happened to a single file, as recorded in the run report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub decision: FileDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backups: Vec<BackupOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<PlacementResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    pub report_version: String,
    pub run_id: String,
    pub root: String,
    pub started_at: String,
    pub finished_at: String,
    pub summary: RunSummary,
    pub results: Vec<FileOutcome>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Enumerating,
    Filtering,
    BackingUp,
    Placing,
    Done,
}

/// Progress callback payload, one per phase transition of the run or of an
/// individual file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunEvent {
    pub seq: u64,
    pub run_id: String,
    pub phase: RunPhase,
    pub file: Option<String>,
    pub processed: u64,
    pub moved: u64,
    pub skipped: u64,
    pub errors: u64,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::extension_of;

    #[test]
    fn extension_is_lowercased_with_leading_dot() {
        assert_eq!(extension_of(Path::new("/tmp/photo.JPG")), ".jpg");
        assert_eq!(extension_of(Path::new("/tmp/archive.tar.gz")), ".gz");
        assert_eq!(extension_of(Path::new("/tmp/README")), "");
    }
}
