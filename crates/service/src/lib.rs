pub mod service;

pub use service::{
    cancel_run, doctor, get_run_session, poll_run_events, start_run, CancelRunResponse,
    RunRequest, RunSessionSnapshot, RunSessionStatus,
};
