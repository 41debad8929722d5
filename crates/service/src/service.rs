use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::thread;

use anyhow::{anyhow, Context, Result};
use folder_steward_core::{
    collect_doctor_info, run_with_callback, DoctorInfo, PipelineOptions, RunConfig, RunEvent,
    RunReport, RunSummary,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One organize run, as requested by an embedding UI or scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub run_id: Option<String>,
    pub root: PathBuf,
    #[serde(default)]
    pub config: RunConfig,
    /// Optional run report output path (JSON).
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default = "default_emit_events")]
    pub emit_events: bool,
}

fn default_emit_events() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunSessionStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSessionSnapshot {
    pub run_id: String,
    pub status: RunSessionStatus,
    pub report_path: Option<PathBuf>,
    pub summary: Option<RunSummary>,
    pub error: Option<String>,
    pub total_events: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRunResponse {
    pub run_id: String,
    pub status: RunSessionStatus,
}

#[derive(Debug, Clone)]
struct RunSession {
    status: RunSessionStatus,
    report_path: Option<PathBuf>,
    report: Option<RunReport>,
    error: Option<String>,
    events: Vec<RunEvent>,
    cancel_flag: Arc<AtomicBool>,
}

static SESSIONS: Lazy<Mutex<HashMap<String, RunSession>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Starts the pipeline on a background thread and returns the run id the
/// caller polls with.
pub fn start_run(request: RunRequest) -> Result<String> {
    let run_id = request
        .run_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let cancel_flag = Arc::new(AtomicBool::new(false));

    {
        let mut sessions = lock_sessions()?;
        sessions.insert(
            run_id.clone(),
            RunSession {
                status: RunSessionStatus::Running,
                report_path: request.output.clone(),
                report: None,
                error: None,
                events: Vec::new(),
                cancel_flag: Arc::clone(&cancel_flag),
            },
        );
    }

    let thread_run_id = run_id.clone();
    thread::spawn(move || {
        let mut options = PipelineOptions::from_config(request.root, request.config);
        options.run_id = Some(thread_run_id.clone());
        options.emit_events = request.emit_events;
        options.cancel_flag = Some(Arc::clone(&cancel_flag));

        let run_result = run_with_callback(&options, |event| {
            if let Ok(mut sessions) = lock_sessions() {
                if let Some(session) = sessions.get_mut(&thread_run_id) {
                    session.events.push(event);
                }
            }
        });

        match run_result {
            Ok(report) => {
                if let Some(path) = &request.output {
                    let write_result = serde_json::to_string_pretty(&report)
                        .context("failed to serialize run report")
                        .and_then(|payload| {
                            fs::write(path, payload).with_context(|| {
                                format!("failed to write report to {}", path.display())
                            })
                        });

                    if let Err(err) = write_result {
                        fail_session(&thread_run_id, err.to_string());
                        return;
                    }
                }

                if let Ok(mut sessions) = lock_sessions() {
                    if let Some(session) = sessions.get_mut(&thread_run_id) {
                        session.report = Some(report);
                        session.status = if cancel_flag.load(Ordering::Relaxed) {
                            RunSessionStatus::Cancelled
                        } else {
                            RunSessionStatus::Completed
                        };
                        session.error = None;
                    }
                }
            }
            Err(err) => fail_session(&thread_run_id, err.to_string()),
        }
    });

    Ok(run_id)
}

pub fn poll_run_events(run_id: &str, from_seq: u64) -> Result<Vec<RunEvent>> {
    let sessions = lock_sessions()?;
    let session = sessions
        .get(run_id)
        .ok_or_else(|| anyhow!("run session not found: {run_id}"))?;

    Ok(session
        .events
        .iter()
        .filter(|event| event.seq > from_seq)
        .cloned()
        .collect())
}

pub fn cancel_run(run_id: &str) -> Result<CancelRunResponse> {
    let mut sessions = lock_sessions()?;
    let session = sessions
        .get_mut(run_id)
        .ok_or_else(|| anyhow!("run session not found: {run_id}"))?;

    session.cancel_flag.store(true, Ordering::Relaxed);
    if session.status == RunSessionStatus::Running {
        session.status = RunSessionStatus::Cancelled;
    }

    Ok(CancelRunResponse {
        run_id: run_id.to_string(),
        status: session.status.clone(),
    })
}

pub fn get_run_session(run_id: &str) -> Result<RunSessionSnapshot> {
    let sessions = lock_sessions()?;
    let session = sessions
        .get(run_id)
        .ok_or_else(|| anyhow!("run session not found: {run_id}"))?;

    Ok(RunSessionSnapshot {
        run_id: run_id.to_string(),
        status: session.status.clone(),
        report_path: session.report_path.clone(),
        summary: session.report.as_ref().map(|report| report.summary),
        error: session.error.clone(),
        total_events: session.events.len() as u64,
    })
}

pub fn doctor() -> DoctorInfo {
    collect_doctor_info()
}

fn fail_session(run_id: &str, error: String) {
    if let Ok(mut sessions) = lock_sessions() {
        if let Some(session) = sessions.get_mut(run_id) {
            session.status = RunSessionStatus::Failed;
            session.error = Some(error);
        }
    }
}

fn lock_sessions() -> Result<std::sync::MutexGuard<'static, HashMap<String, RunSession>>> {
    SESSIONS
        .lock()
        .map_err(|_| anyhow!("run session registry lock poisoned"))
}
