use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::classify::{normalize_extension, Category, DEFAULT_CATEGORIES};

/// Declares one remote backup destination. Credentials and endpoints live
/// here rather than in process-wide constants so test doubles can stand in
/// for real sinks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SinkConfig {
    pub name: String,
    #[serde(default)]
    pub kind: SinkKind,
    /// Target directory for `mirror` sinks.
    pub path: PathBuf,
    #[serde(default = "default_sink_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Copies the file into a directory, typically a mounted drive.
    #[default]
    Mirror,
}

fn default_sink_timeout_seconds() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    #[serde(default = "default_min_size_mb")]
    pub min_size_mb: f64,
    #[serde(default = "default_max_age_days")]
    pub max_age_days: i64,
    /// Glob or substring patterns; matching files are never enumerated.
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub remote_sinks: Vec<SinkConfig>,
    /// Category name to extension list. Omitted means the built-in table.
    #[serde(default)]
    pub categories: Option<BTreeMap<String, Vec<String>>>,
    /// Run log location. Omitted means `folder-steward.log.jsonl` in the
    /// organized root.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_min_size_mb() -> f64 {
    1.0
}

fn default_max_age_days() -> i64 {
    7
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            min_size_mb: default_min_size_mb(),
            max_age_days: default_max_age_days(),
            excludes: Vec::new(),
            remote_sinks: Vec::new(),
            categories: None,
            log_file: None,
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Materializes the category table this run classifies against. A
    /// configured table replaces the built-in one wholesale.
    pub fn category_table(&self) -> Vec<Category> {
        match &self.categories {
            Some(map) => map
                .iter()
                .map(|(name, extensions)| Category {
                    name: name.clone(),
                    extensions: extensions
                        .iter()
                        .map(|ext| normalize_extension(ext))
                        .collect(),
                })
                .collect(),
            None => DEFAULT_CATEGORIES.clone(),
        }
    }
}
