use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{bail, Result};
use chrono::{SecondsFormat, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::backup::{build_sinks, BackupCoordinator, SinkHandle};
use crate::config::RunConfig;
use crate::filter;
use crate::model::{
    FileDecision, FileOutcome, FileRecord, RunEvent, RunPhase, RunReport, RunSummary,
    REPORT_VERSION,
};
use crate::notify::{LogNotifier, NotificationSink};
use crate::place::Placer;
use crate::runlog::{LogAction, RunLog, RunLogEntry};

pub const DEFAULT_LOG_NAME: &str = "folder-steward.log.jsonl";

#[derive(Clone)]
pub struct PipelineOptions {
    pub root: PathBuf,
    pub config: RunConfig,
    pub sinks: Vec<SinkHandle>,
    pub notifiers: Vec<Arc<dyn NotificationSink>>,
    pub run_id: Option<String>,
    pub emit_events: bool,
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl PipelineOptions {
    /// Options wired straight from configuration: declared sinks plus the
    /// log notifier.
    pub fn from_config(root: PathBuf, config: RunConfig) -> Self {
        Self {
            sinks: build_sinks(&config),
            notifiers: vec![Arc::new(LogNotifier)],
            root,
            config,
            run_id: None,
            emit_events: false,
            cancel_flag: None,
        }
    }
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("sinks", &self.sinks.len())
            .field("notifiers", &self.notifiers.len())
            .field("run_id", &self.run_id)
            .field("emit_events", &self.emit_events)
            .finish()
    }
}

pub fn run(options: &PipelineOptions) -> Result<RunReport> {
    run_with_callback(options, |_| {})
}

/// Processes the immediate files of the root once, in listing order. Each
/// file walks filter → backup → place; per-file failures become result
/// fields and counters, never run failures. Only an unenumerable root is
/// fatal, and it is detected before any file is touched.
pub fn run_with_callback<F>(options: &PipelineOptions, mut on_event: F) -> Result<RunReport>
where
    F: FnMut(RunEvent),
{
    let root = options.root.as_path();
    if !root.is_dir() {
        bail!(
            "root path is not an accessible directory: {}",
            root.display()
        );
    }

    let run_id = options
        .run_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let started_at = Utc::now();
    let mut warnings = Vec::new();
    let mut summary = RunSummary::default();
    let mut results = Vec::new();
    let mut seq = 0_u64;

    let excludes = ExcludeMatcher::new(&options.config.excludes, &mut warnings);
    let categories = options.config.category_table();
    let log_path = options
        .config
        .log_file
        .clone()
        .unwrap_or_else(|| root.join(DEFAULT_LOG_NAME));
    let mut log = RunLog::open(&log_path)?;

    emit(
        options,
        &mut on_event,
        &run_id,
        &mut seq,
        RunPhase::Enumerating,
        None,
        &summary,
    );

    let records = enumerate_files(root, &excludes, &log_path, &mut warnings);
    info!(root = %root.display(), files = records.len(), run_id = %run_id, "run started");

    let coordinator = BackupCoordinator::new(options.sinks.clone());
    let placer = Placer::new(root, &categories);

    for record in &records {
        if is_cancelled(options) {
            warnings.push("run canceled; summary reflects a partial batch".to_string());
            break;
        }

        summary.total_files += 1;
        emit(
            options,
            &mut on_event,
            &run_id,
            &mut seq,
            RunPhase::Filtering,
            Some(&record.file_name),
            &summary,
        );

        if let Some(reason) = filter::skip_reason(
            record,
            options.config.min_size_mb,
            options.config.max_age_days,
            Utc::now(),
        ) {
            summary.skipped_files += 1;
            info!(file = %record.path.display(), reason = reason.as_str(), "skipping file");
            append_entry(
                &mut log,
                RunLogEntry::new(&run_id, &record.path, LogAction::Skip)
                    .with_reason(reason.as_str()),
                &mut warnings,
            );
            results.push(FileOutcome {
                path: record.path.clone(),
                decision: FileDecision::Skipped,
                skip_reason: Some(reason.as_str().to_string()),
                backups: Vec::new(),
                placement: None,
            });
            continue;
        }

        emit(
            options,
            &mut on_event,
            &run_id,
            &mut seq,
            RunPhase::BackingUp,
            Some(&record.file_name),
            &summary,
        );
        let backups = coordinator.backup(record);
        append_entry(
            &mut log,
            RunLogEntry::new(&run_id, &record.path, LogAction::Backup).with_backups(&backups),
            &mut warnings,
        );

        emit(
            options,
            &mut on_event,
            &run_id,
            &mut seq,
            RunPhase::Placing,
            Some(&record.file_name),
            &summary,
        );
        let placement = placer.place(record);

        if placement.moved && placement.error.is_none() {
            summary.moved_files += 1;
            let mut entry = RunLogEntry::new(&run_id, &record.path, LogAction::Move)
                .with_integrity(placement.integrity_ok);
            if let Some(final_path) = &placement.final_path {
                entry = entry.with_destination(final_path);
            }
            append_entry(&mut log, entry, &mut warnings);
            results.push(FileOutcome {
                path: record.path.clone(),
                decision: FileDecision::Moved,
                skip_reason: None,
                backups,
                placement: Some(placement),
            });
        } else {
            summary.errors += 1;
            let mut entry = RunLogEntry::new(&run_id, &record.path, LogAction::Error)
                .with_integrity(placement.integrity_ok);
            if let Some(error) = &placement.error {
                entry = entry.with_reason(error.clone());
            }
            if let Some(final_path) = &placement.final_path {
                entry = entry.with_destination(final_path);
            }
            append_entry(&mut log, entry, &mut warnings);
            results.push(FileOutcome {
                path: record.path.clone(),
                decision: FileDecision::Error,
                skip_reason: None,
                backups,
                placement: Some(placement),
            });
        }
    }

    emit(
        options,
        &mut on_event,
        &run_id,
        &mut seq,
        RunPhase::Done,
        None,
        &summary,
    );

    for notifier in &options.notifiers {
        if let Err(err) = notifier.notify(&summary) {
            warnings.push(format!("notification via {} failed: {err}", notifier.name()));
        }
    }

    Ok(RunReport {
        report_version: REPORT_VERSION.to_string(),
        run_id,
        root: root.to_string_lossy().to_string(),
        started_at: started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        finished_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        summary,
        results,
        warnings,
    })
}

/// Lists the immediate regular files of the root, once. Subdirectories
/// (category folders, `backup/`) are never descended into; the active run
/// log is not treated as input.
fn enumerate_files(
    root: &Path,
    excludes: &ExcludeMatcher,
    log_path: &Path,
    warnings: &mut Vec<String>,
) -> Vec<FileRecord> {
    let mut records = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false);

    for item in walker {
        let entry = match item {
            Ok(entry) => entry,
            Err(err) => {
                warnings.push(format!("listing error under {}: {err}", root.display()));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if path == log_path {
            continue;
        }
        if excludes.is_excluded(&path) {
            info!(file = %path.display(), "excluded by pattern");
            continue;
        }
        match FileRecord::from_path(path) {
            Ok(record) => records.push(record),
            Err(err) => warnings.push(err.to_string()),
        }
    }
    records
}

fn append_entry(log: &mut RunLog, entry: RunLogEntry, warnings: &mut Vec<String>) {
    if let Err(err) = log.append(&entry) {
        warn!(error = %err, "run log write failed");
        warnings.push(err.to_string());
    }
}

fn emit<F>(
    options: &PipelineOptions,
    on_event: &mut F,
    run_id: &str,
    seq: &mut u64,
    phase: RunPhase,
    file: Option<&str>,
    summary: &RunSummary,
) where
    F: FnMut(RunEvent),
{
    *seq = seq.saturating_add(1);
    if options.emit_events {
        on_event(RunEvent {
            seq: *seq,
            run_id: run_id.to_string(),
            phase,
            file: file.map(|name| name.to_string()),
            processed: summary.total_files,
            moved: summary.moved_files,
            skipped: summary.skipped_files,
            errors: summary.errors,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        });
    }
}

fn is_cancelled(options: &PipelineOptions) -> bool {
    options
        .cancel_flag
        .as_ref()
        .is_some_and(|flag| flag.load(Ordering::Relaxed))
}

/// Glob patterns compile into one set; anything without glob metacharacters
/// falls back to a lower-cased substring match on the full path.
struct ExcludeMatcher {
    globset: Option<GlobSet>,
    substrings: Vec<String>,
}

impl ExcludeMatcher {
    fn new(patterns: &[String], warnings: &mut Vec<String>) -> Self {
        let mut builder = GlobSetBuilder::new();
        let mut substrings = Vec::new();
        let mut compiled = 0_usize;

        for pattern in patterns {
            let pattern = pattern.trim();
            if pattern.is_empty() {
                continue;
            }
            if !pattern.contains(['*', '?', '[', ']', '{', '}']) {
                substrings.push(pattern.to_lowercase());
                continue;
            }
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                    compiled += 1;
                }
                Err(err) => {
                    warnings.push(format!(
                        "invalid exclude glob '{pattern}': {err}; using substring fallback"
                    ));
                    substrings.push(pattern.to_lowercase());
                }
            }
        }

        let globset = if compiled == 0 {
            None
        } else {
            match builder.build() {
                Ok(set) => Some(set),
                Err(err) => {
                    warnings.push(format!(
                        "failed to compile exclude globs: {err}; glob excludes disabled"
                    ));
                    None
                }
            }
        };

        Self {
            globset,
            substrings,
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        if let Some(globset) = &self.globset {
            if globset.is_match(path) {
                return true;
            }
        }
        if self.substrings.is_empty() {
            return false;
        }
        let lowered = path.to_string_lossy().to_lowercase();
        self.substrings
            .iter()
            .any(|pattern| lowered.contains(pattern))
    }
}
