pub mod backup;
pub mod classify;
pub mod config;
pub mod doctor;
pub mod filter;
pub mod integrity;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod place;
pub mod runlog;

pub use backup::{
    build_sinks, BackupCoordinator, MirrorSink, RemoteSink, SinkError, SinkHandle, LOCAL_SINK_NAME,
};
pub use classify::{classify, Category, DEFAULT_CATEGORIES};
pub use config::{RunConfig, SinkConfig, SinkKind};
pub use doctor::{collect_doctor_info, DiskSummary, DoctorInfo};
pub use filter::{is_eligible, skip_reason, SkipReason};
pub use model::{
    BackupOutcome, FileDecision, FileOutcome, FileRecord, PlacementResult, RunEvent, RunPhase,
    RunReport, RunSummary, REPORT_VERSION,
};
pub use notify::{LogNotifier, NotificationSink};
pub use pipeline::{run, run_with_callback, PipelineOptions, DEFAULT_LOG_NAME};
pub use place::{PlaceError, Placer};
pub use runlog::{LogAction, RunLog, RunLogEntry};
