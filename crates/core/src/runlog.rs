use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::model::BackupOutcome;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Skip,
    Backup,
    Move,
    Error,
}

/// One per-file decision in the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunLogEntry {
    pub timestamp: String,
    pub run_id: String,
    pub file: String,
    pub action: LogAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backups: Vec<BackupOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity_ok: Option<bool>,
}

impl RunLogEntry {
    pub fn new(run_id: &str, file: &Path, action: LogAction) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            run_id: run_id.to_string(),
            file: file.to_string_lossy().to_string(),
            action,
            reason: None,
            destination: None,
            backups: Vec::new(),
            integrity_ok: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_destination(mut self, destination: &Path) -> Self {
        self.destination = Some(destination.to_string_lossy().to_string());
        self
    }

    pub fn with_backups(mut self, backups: &[BackupOutcome]) -> Self {
        self.backups = backups.to_vec();
        self
    }

    pub fn with_integrity(mut self, integrity_ok: Option<bool>) -> Self {
        self.integrity_ok = integrity_ok;
        self
    }
}

/// Append-only JSONL audit log. Each entry is written as a single line and
/// flushed on its own, so a crash mid-run loses at most the entry being
/// written.
pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open run log {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, entry: &RunLogEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry).context("failed to serialize log entry")?;
        line.push('\n');
        self.file
            .write_all(line.as_bytes())
            .with_context(|| format!("failed to append to run log {}", self.path.display()))?;
        self.file
            .flush()
            .with_context(|| format!("failed to flush run log {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use super::{LogAction, RunLog, RunLogEntry};
    use crate::model::BackupOutcome;

    #[test]
    fn entries_round_trip_as_one_json_line_each() {
        let temp = TempDir::new().expect("tempdir");
        let log_path = temp.path().join("run.log.jsonl");
        let mut log = RunLog::open(&log_path).expect("open log");

        log.append(
            &RunLogEntry::new("run-1", Path::new("/data/b.txt"), LogAction::Skip)
                .with_reason("below size threshold"),
        )
        .expect("append skip");
        log.append(
            &RunLogEntry::new("run-1", Path::new("/data/a.jpg"), LogAction::Move)
                .with_destination(Path::new("/data/Images/a.jpg"))
                .with_integrity(Some(true)),
        )
        .expect("append move");

        let content = fs::read_to_string(&log_path).expect("read log");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let skip: RunLogEntry = serde_json::from_str(lines[0]).expect("parse skip");
        assert_eq!(skip.action, LogAction::Skip);
        assert_eq!(skip.reason.as_deref(), Some("below size threshold"));

        let moved: RunLogEntry = serde_json::from_str(lines[1]).expect("parse move");
        assert_eq!(moved.action, LogAction::Move);
        assert_eq!(moved.integrity_ok, Some(true));
    }

    #[test]
    fn reopening_appends_rather_than_truncates() {
        let temp = TempDir::new().expect("tempdir");
        let log_path = temp.path().join("run.log.jsonl");

        {
            let mut log = RunLog::open(&log_path).expect("open first");
            log.append(
                &RunLogEntry::new("run-1", Path::new("/data/a.jpg"), LogAction::Backup)
                    .with_backups(&[BackupOutcome::success("local")]),
            )
            .expect("append");
        }
        {
            let mut log = RunLog::open(&log_path).expect("open second");
            log.append(&RunLogEntry::new(
                "run-2",
                Path::new("/data/c.pdf"),
                LogAction::Error,
            ))
            .expect("append");
        }

        let content = fs::read_to_string(&log_path).expect("read log");
        assert_eq!(content.lines().count(), 2);
    }
}
