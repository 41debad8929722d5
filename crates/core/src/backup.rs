use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{RunConfig, SinkKind};
use crate::model::{BackupOutcome, FileRecord};

/// Sink name reserved for the local timestamped copy.
pub const LOCAL_SINK_NAME: &str = "local";

const BACKUP_DIR_NAME: &str = "backup";

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("upload rejected: {0}")]
    Rejected(String),
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Remote backup capability: a single `upload`. Concrete cloud providers
/// implement this outside the core; the pipeline never sees their SDKs or
/// error types, only the tagged per-sink outcome.
pub trait RemoteSink: Send + Sync {
    fn name(&self) -> &str;

    fn upload(&self, path: &Path) -> Result<(), SinkError>;
}

/// A configured sink plus the ceiling on how long one upload may block.
#[derive(Clone)]
pub struct SinkHandle {
    pub sink: Arc<dyn RemoteSink>,
    pub timeout: Duration,
}

impl SinkHandle {
    pub fn new(sink: Arc<dyn RemoteSink>, timeout: Duration) -> Self {
        Self { sink, timeout }
    }
}

/// Copies files into a directory, typically a mounted drive. The in-tree
/// reference implementation of [`RemoteSink`].
pub struct MirrorSink {
    name: String,
    target: PathBuf,
}

impl MirrorSink {
    pub fn new(name: impl Into<String>, target: PathBuf) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }
}

impl RemoteSink for MirrorSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn upload(&self, path: &Path) -> Result<(), SinkError> {
        let file_name = path
            .file_name()
            .ok_or_else(|| SinkError::Rejected(format!("no file name in {}", path.display())))?;
        fs::create_dir_all(&self.target)?;
        fs::copy(path, self.target.join(file_name))?;
        Ok(())
    }
}

/// Builds the sink list declared in the configuration.
pub fn build_sinks(config: &RunConfig) -> Vec<SinkHandle> {
    config
        .remote_sinks
        .iter()
        .map(|sink| {
            let remote: Arc<dyn RemoteSink> = match sink.kind {
                SinkKind::Mirror => Arc::new(MirrorSink::new(sink.name.clone(), sink.path.clone())),
            };
            SinkHandle::new(remote, Duration::from_secs(sink.timeout_seconds))
        })
        .collect()
}

/// Performs the local timestamped copy and fans out to the remote sinks.
/// Every outcome is tagged per sink; no failure aborts the others or the
/// file's subsequent placement.
pub struct BackupCoordinator {
    sinks: Vec<SinkHandle>,
}

impl BackupCoordinator {
    pub fn new(sinks: Vec<SinkHandle>) -> Self {
        Self { sinks }
    }

    pub fn backup(&self, record: &FileRecord) -> Vec<BackupOutcome> {
        let mut outcomes = Vec::with_capacity(self.sinks.len() + 1);
        outcomes.push(self.local_backup(record));
        for handle in &self.sinks {
            outcomes.push(upload_with_timeout(handle, record));
        }
        outcomes
    }

    /// Copies the file into a `backup/` folder beside it, named
    /// `{timestamp}_{original_filename}`. Creates the folder on demand.
    fn local_backup(&self, record: &FileRecord) -> BackupOutcome {
        let Some(parent) = record.path.parent() else {
            return BackupOutcome::failure(
                LOCAL_SINK_NAME,
                format!("no parent directory for {}", record.path.display()),
            );
        };

        let backup_dir = parent.join(BACKUP_DIR_NAME);
        if let Err(err) = fs::create_dir_all(&backup_dir) {
            return BackupOutcome::failure(
                LOCAL_SINK_NAME,
                format!("failed to create {}: {err}", backup_dir.display()),
            );
        }

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let backup_path = backup_dir.join(format!("{timestamp}_{}", record.file_name));
        match fs::copy(&record.path, &backup_path) {
            Ok(_) => {
                info!(
                    source = %record.path.display(),
                    backup = %backup_path.display(),
                    "local backup written"
                );
                BackupOutcome::success(LOCAL_SINK_NAME)
            }
            Err(err) => BackupOutcome::failure(
                LOCAL_SINK_NAME,
                format!("failed to copy to {}: {err}", backup_path.display()),
            ),
        }
    }
}

/// Runs the upload on its own thread and waits no longer than the handle's
/// timeout, so one unreachable sink cannot stall the batch. A timed-out
/// upload keeps running detached; its late result is discarded.
fn upload_with_timeout(handle: &SinkHandle, record: &FileRecord) -> BackupOutcome {
    let sink_name = handle.sink.name().to_string();
    let (tx, rx) = mpsc::channel();
    let worker_sink = Arc::clone(&handle.sink);
    let path = record.path.clone();
    thread::spawn(move || {
        let result = worker_sink.upload(&path).map_err(|err| err.to_string());
        let _ = tx.send(result);
    });

    match rx.recv_timeout(handle.timeout) {
        Ok(Ok(())) => {
            info!(sink = %sink_name, file = %record.path.display(), "remote backup uploaded");
            BackupOutcome::success(sink_name)
        }
        Ok(Err(err)) => {
            warn!(sink = %sink_name, file = %record.path.display(), error = %err, "remote backup failed");
            BackupOutcome::failure(sink_name, err)
        }
        Err(RecvTimeoutError::Timeout) => {
            warn!(sink = %sink_name, file = %record.path.display(), "remote backup timed out");
            BackupOutcome::failure(
                sink_name,
                format!("timed out after {}s", handle.timeout.as_secs()),
            )
        }
        Err(RecvTimeoutError::Disconnected) => BackupOutcome::failure(
            sink_name,
            "upload thread exited without reporting a result",
        ),
    }
}
