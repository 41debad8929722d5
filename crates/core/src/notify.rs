use anyhow::Result;
use tracing::info;

use crate::model::RunSummary;

/// Completion-reporting capability, invoked exactly once per run with the
/// finalized summary. Transports (email, sound, desktop toast) live outside
/// the core and implement this trait.
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    fn notify(&self, summary: &RunSummary) -> Result<()>;
}

/// Reports completion to the structured log.
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn notify(&self, summary: &RunSummary) -> Result<()> {
        info!(
            total_files = summary.total_files,
            moved_files = summary.moved_files,
            skipped_files = summary.skipped_files,
            errors = summary.errors,
            "file organization complete"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{LogNotifier, NotificationSink};
    use crate::model::RunSummary;

    #[test]
    fn log_notifier_accepts_any_summary() {
        let summary = RunSummary {
            total_files: 3,
            moved_files: 1,
            skipped_files: 2,
            errors: 0,
        };
        assert!(LogNotifier.notify(&summary).is_ok());
        assert_eq!(LogNotifier.name(), "log");
    }
}
