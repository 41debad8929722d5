use chrono::{DateTime, Duration, Utc};

use crate::model::FileRecord;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    BelowSizeThreshold,
    OlderThanAgeThreshold,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::BelowSizeThreshold => "below size threshold",
            SkipReason::OlderThanAgeThreshold => "older than age threshold",
        }
    }
}

/// Decides whether a file qualifies for processing. Pure function of the
/// record, the thresholds, and the injected `now`; no hidden clock.
pub fn is_eligible(
    record: &FileRecord,
    min_size_mb: f64,
    max_age_days: i64,
    now: DateTime<Utc>,
) -> bool {
    skip_reason(record, min_size_mb, max_age_days, now).is_none()
}

/// Like [`is_eligible`] but names the first threshold the file fails, for
/// the run log. A file with an unreadable modification time fails the age
/// bound.
pub fn skip_reason(
    record: &FileRecord,
    min_size_mb: f64,
    max_age_days: i64,
    now: DateTime<Utc>,
) -> Option<SkipReason> {
    let min_bytes = (min_size_mb * BYTES_PER_MB).max(0.0) as u64;
    if record.size_bytes < min_bytes {
        return Some(SkipReason::BelowSizeThreshold);
    }

    let cutoff = now - Duration::days(max_age_days);
    match record.modified_at {
        Some(modified) if modified >= cutoff => None,
        _ => Some(SkipReason::OlderThanAgeThreshold),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::{Duration, Utc};

    use super::{is_eligible, skip_reason, SkipReason};
    use crate::model::FileRecord;

    fn record(size_bytes: u64, age_days: i64) -> FileRecord {
        FileRecord {
            path: PathBuf::from("/data/sample.jpg"),
            file_name: "sample.jpg".to_string(),
            extension: ".jpg".to_string(),
            size_bytes,
            modified_at: Some(Utc::now() - Duration::days(age_days)),
        }
    }

    #[test]
    fn recent_large_file_is_eligible() {
        assert!(is_eligible(&record(2 * 1024 * 1024, 0), 1.0, 7, Utc::now()));
    }

    #[test]
    fn small_file_is_skipped_for_size() {
        let reason = skip_reason(&record(512 * 1024, 0), 1.0, 7, Utc::now());
        assert_eq!(reason, Some(SkipReason::BelowSizeThreshold));
    }

    #[test]
    fn old_file_is_skipped_for_age() {
        let reason = skip_reason(&record(3 * 1024 * 1024, 30), 1.0, 7, Utc::now());
        assert_eq!(reason, Some(SkipReason::OlderThanAgeThreshold));
    }

    #[test]
    fn missing_mtime_fails_the_age_bound() {
        let mut sample = record(2 * 1024 * 1024, 0);
        sample.modified_at = None;
        assert_eq!(
            skip_reason(&sample, 1.0, 7, Utc::now()),
            Some(SkipReason::OlderThanAgeThreshold)
        );
    }

    #[test]
    fn thresholds_are_caller_overridable() {
        // 0.25 MB floor admits the half-megabyte file.
        assert!(is_eligible(&record(512 * 1024, 0), 0.25, 7, Utc::now()));
        // 60 day window admits the month-old file.
        assert!(is_eligible(&record(2 * 1024 * 1024, 30), 1.0, 60, Utc::now()));
    }
}
