use std::fs::{self, OpenOptions};
use std::time::{Duration, SystemTime};

use anyhow::Result;
use tempfile::TempDir;

use folder_steward_core::pipeline::{run, PipelineOptions, DEFAULT_LOG_NAME};
use folder_steward_core::runlog::{LogAction, RunLogEntry};
use folder_steward_core::RunConfig;

const MB: usize = 1024 * 1024;

fn write_with_age(path: &std::path::Path, bytes: &[u8], age_days: u64) -> Result<()> {
    fs::write(path, bytes)?;
    if age_days > 0 {
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_modified(SystemTime::now() - Duration::from_secs(age_days * 24 * 3600))?;
    }
    Ok(())
}

#[test]
fn organizes_a_mixed_folder_with_default_thresholds() -> Result<()> {
    let temp = TempDir::new()?;
    let root = temp.path();

    // 2 MB, recent: moves. 0.5 MB: size skip. 3 MB but 30 days old: age skip.
    write_with_age(&root.join("a.jpg"), &vec![1_u8; 2 * MB], 0)?;
    write_with_age(&root.join("b.txt"), &vec![2_u8; MB / 2], 0)?;
    write_with_age(&root.join("c.pdf"), &vec![3_u8; 3 * MB], 30)?;

    let report = run(&PipelineOptions::from_config(
        root.to_path_buf(),
        RunConfig::default(),
    ))?;

    assert_eq!(report.summary.total_files, 3);
    assert_eq!(report.summary.moved_files, 1);
    assert_eq!(report.summary.skipped_files, 2);
    assert_eq!(report.summary.errors, 0);

    assert!(root.join("Images/a.jpg").exists());
    assert!(!root.join("a.jpg").exists());
    assert!(root.join("b.txt").exists(), "size-skipped file stays put");
    assert!(root.join("c.pdf").exists(), "age-skipped file stays put");

    // Only the moved file was backed up; skipped files never reach backup.
    let backups: Vec<_> = fs::read_dir(root.join("backup"))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(backups.len(), 1);
    assert!(backups[0].ends_with("_a.jpg"));

    Ok(())
}

#[test]
fn second_run_resolves_collisions_without_overwriting() -> Result<()> {
    let temp = TempDir::new()?;
    let root = temp.path();
    let config = RunConfig {
        min_size_mb: 0.0,
        ..RunConfig::default()
    };

    write_with_age(&root.join("photo.jpg"), b"first shoot", 0)?;
    run(&PipelineOptions::from_config(root.to_path_buf(), config.clone()))?;
    assert!(root.join("Images/photo.jpg").exists());

    // Same name arrives again with different content.
    write_with_age(&root.join("photo.jpg"), b"second shoot", 0)?;
    let report = run(&PipelineOptions::from_config(root.to_path_buf(), config.clone()))?;
    assert_eq!(report.summary.moved_files, 1);

    let images: Vec<_> = fs::read_dir(root.join("Images"))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(images.len(), 2, "collision must produce a second file");
    assert!(images.iter().any(|name| name == "photo.jpg"));
    assert!(images
        .iter()
        .any(|name| name.starts_with("photo_") && name.ends_with(".jpg")));
    assert_eq!(fs::read(root.join("Images/photo.jpg"))?, b"first shoot");

    // Third run over the already-organized tree finds nothing to move:
    // category folders are not enumerated.
    let idle = run(&PipelineOptions::from_config(root.to_path_buf(), config))?;
    assert_eq!(idle.summary.total_files, 0);
    assert_eq!(idle.summary.moved_files, 0);

    Ok(())
}

#[test]
fn run_log_records_every_per_file_decision() -> Result<()> {
    let temp = TempDir::new()?;
    let root = temp.path();
    let config = RunConfig {
        min_size_mb: 1.0,
        ..RunConfig::default()
    };

    write_with_age(&root.join("a.jpg"), &vec![1_u8; 2 * MB], 0)?;
    write_with_age(&root.join("tiny.txt"), b"too small", 0)?;
    write_with_age(&root.join("weird.xyz"), &vec![4_u8; 2 * MB], 0)?;

    let report = run(&PipelineOptions::from_config(root.to_path_buf(), config))?;
    assert_eq!(report.summary.moved_files, 1);
    assert_eq!(report.summary.skipped_files, 1);
    assert_eq!(report.summary.errors, 1);

    let entries: Vec<RunLogEntry> = fs::read_to_string(root.join(DEFAULT_LOG_NAME))?
        .lines()
        .map(|line| serde_json::from_str(line).expect("log line parses"))
        .collect();

    // skip + (backup, move) + (backup, error), all stamped with this run.
    assert_eq!(entries.len(), 5);
    assert!(entries.iter().all(|entry| entry.run_id == report.run_id));
    assert!(entries
        .iter()
        .any(|entry| entry.action == LogAction::Skip
            && entry.reason.as_deref() == Some("below size threshold")));
    assert!(entries
        .iter()
        .any(|entry| entry.action == LogAction::Move && entry.integrity_ok == Some(true)));
    assert!(entries
        .iter()
        .any(|entry| entry.action == LogAction::Error
            && entry.reason.as_deref() == Some("unrecognized file type")));
    assert_eq!(
        entries
            .iter()
            .filter(|entry| entry.action == LogAction::Backup)
            .count(),
        2
    );

    Ok(())
}

#[test]
fn configured_mirror_sink_receives_every_processed_file() -> Result<()> {
    let temp = TempDir::new()?;
    let root = temp.path().join("inbox");
    let mirror = temp.path().join("offsite");
    fs::create_dir_all(&root)?;

    let config: RunConfig = serde_json::from_str(&format!(
        r#"{{
            "min_size_mb": 0.0,
            "remote_sinks": [
                {{"name": "offsite", "kind": "mirror", "path": {:?}, "timeout_seconds": 5}}
            ]
        }}"#,
        mirror.to_string_lossy()
    ))?;

    write_with_age(&root.join("song.mp3"), b"audio frames", 0)?;
    let report = run(&PipelineOptions::from_config(root.clone(), config))?;

    assert_eq!(report.summary.moved_files, 1);
    assert_eq!(report.summary.errors, 0);
    assert!(root.join("Audios/song.mp3").exists());
    assert!(mirror.join("song.mp3").exists());

    let outcome = &report.results[0];
    assert!(outcome.backups.iter().all(|backup| backup.succeeded));

    Ok(())
}
