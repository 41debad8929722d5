use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::classify::{classify, Category};
use crate::integrity;
use crate::model::{FileRecord, PlacementResult};

const MAX_RENAME_ATTEMPTS: u32 = 16;

#[derive(Debug, Error)]
pub enum PlaceError {
    #[error("unrecognized file type")]
    UnrecognizedType,
    #[error("destination names exhausted under {dir}")]
    NameExhausted { dir: String },
    #[error("digest failed: {0}")]
    Digest(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Resolves a file's destination inside the organized root and performs an
/// integrity-verified move. Errors never escape [`Placer::place`]; they are
/// folded into the returned [`PlacementResult`] so one bad file cannot
/// interrupt the batch.
pub struct Placer<'a> {
    root: &'a Path,
    categories: &'a [Category],
}

impl<'a> Placer<'a> {
    pub fn new(root: &'a Path, categories: &'a [Category]) -> Self {
        Self { root, categories }
    }

    pub fn place(&self, record: &FileRecord) -> PlacementResult {
        match self.try_place(record) {
            Ok(result) => result,
            Err(err) => PlacementResult {
                original_path: record.path.clone(),
                final_path: None,
                moved: false,
                integrity_ok: None,
                error: Some(err.to_string()),
            },
        }
    }

    fn try_place(&self, record: &FileRecord) -> Result<PlacementResult, PlaceError> {
        let category =
            classify(self.categories, &record.extension).ok_or(PlaceError::UnrecognizedType)?;

        let dest_dir = self.root.join(&category.name);
        fs::create_dir_all(&dest_dir).map_err(|source| PlaceError::Io {
            context: format!("failed to create {}", dest_dir.display()),
            source,
        })?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let destination = resolve_destination(&dest_dir, &record.file_name, &timestamp)?;

        // The source digest is taken before anything moves, so the
        // destination can always be checked against what the file held at
        // the start of placement.
        let source_digest =
            integrity::digest(&record.path).map_err(|err| PlaceError::Digest(err.to_string()))?;

        match fs::rename(&record.path, &destination) {
            Ok(()) => Ok(self.verify_after_rename(record, destination, &source_digest)),
            // Rename fails across volumes; fall back to copy + verify +
            // delete, which retains the source until the copy proves good.
            Err(_) => copy_verify_delete(&record.path, &destination, &source_digest),
        }
    }

    fn verify_after_rename(
        &self,
        record: &FileRecord,
        destination: PathBuf,
        source_digest: &str,
    ) -> PlacementResult {
        let mut result = PlacementResult {
            original_path: record.path.clone(),
            final_path: Some(destination.clone()),
            moved: true,
            integrity_ok: None,
            error: None,
        };

        match integrity::digest(&destination) {
            Ok(dest_digest) if dest_digest == source_digest => {
                info!(
                    source = %record.path.display(),
                    destination = %destination.display(),
                    "moved and verified"
                );
                result.integrity_ok = Some(true);
            }
            Ok(_) => {
                warn!(
                    destination = %destination.display(),
                    "integrity mismatch after move"
                );
                result.integrity_ok = Some(false);
                result.error = Some("integrity mismatch after move".to_string());
            }
            Err(err) => {
                result.error = Some(format!("could not verify destination: {err}"));
            }
        }
        result
    }
}

/// Copies the source to the destination, confirms the destination digest
/// against the retained source digest, and only then removes the source.
/// On mismatch the corrupt destination copy is rolled back and the source
/// kept in place.
fn copy_verify_delete(
    source: &Path,
    destination: &Path,
    expected_digest: &str,
) -> Result<PlacementResult, PlaceError> {
    if let Err(err) = fs::copy(source, destination) {
        let _ = fs::remove_file(destination);
        return Err(PlaceError::Io {
            context: format!(
                "failed to copy {} to {}",
                source.display(),
                destination.display()
            ),
            source: err,
        });
    }

    let dest_digest = match integrity::digest(destination) {
        Ok(digest) => digest,
        Err(err) => {
            let _ = fs::remove_file(destination);
            return Err(PlaceError::Digest(err.to_string()));
        }
    };

    if dest_digest != expected_digest {
        let _ = fs::remove_file(destination);
        warn!(
            source = %source.display(),
            destination = %destination.display(),
            "integrity mismatch after copy; destination rolled back"
        );
        return Ok(PlacementResult {
            original_path: source.to_path_buf(),
            final_path: None,
            moved: false,
            integrity_ok: Some(false),
            error: Some("integrity mismatch after copy; destination rolled back".to_string()),
        });
    }

    fs::remove_file(source).map_err(|err| PlaceError::Io {
        context: format!("copied but failed to remove source {}", source.display()),
        source: err,
    })?;

    info!(
        source = %source.display(),
        destination = %destination.display(),
        "copied, verified and source removed"
    );
    Ok(PlacementResult {
        original_path: source.to_path_buf(),
        final_path: Some(destination.to_path_buf()),
        moved: true,
        integrity_ok: Some(true),
        error: None,
    })
}

/// Picks a destination name that does not collide with an existing file:
/// the original name, then a timestamp suffix, then a bounded counter on
/// top of the timestamp. Never overwrites.
fn resolve_destination(
    dir: &Path,
    file_name: &str,
    timestamp: &str,
) -> Result<PathBuf, PlaceError> {
    let plain = dir.join(file_name);
    if !plain.exists() {
        return Ok(plain);
    }

    let (stem, ext) = split_name(file_name);
    let suffixed = dir.join(format!("{stem}_{timestamp}{ext}"));
    if !suffixed.exists() {
        return Ok(suffixed);
    }

    for attempt in 1..=MAX_RENAME_ATTEMPTS {
        let candidate = dir.join(format!("{stem}_{timestamp}_{attempt}{ext}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(PlaceError::NameExhausted {
        dir: dir.display().to_string(),
    })
}

fn split_name(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name.split_at(idx),
        _ => (file_name, ""),
    }
}
