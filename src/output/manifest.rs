//! Run manifest published next to the result files
//!
//! Downstream importers poll `index.json` to learn which finalized result
//! file is current and when it was produced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Contents of `index.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// File name of the finalized result, relative to the output root
    pub current_path: String,

    /// When the run was finalized
    pub updated_at: DateTime<Utc>,

    /// Number of data rows in the finalized result
    pub record_count: usize,

    /// URL the crawl started from
    pub start_url: String,
}

impl RunManifest {
    pub fn new(current_path: impl Into<String>, record_count: usize, start_url: impl Into<String>) -> Self {
        Self {
            current_path: current_path.into(),
            updated_at: Utc::now(),
            record_count,
            start_url: start_url.into(),
        }
    }

    /// Reads a manifest back from disk
    pub fn load(path: &Path) -> Result<Self, super::RecorderError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes the manifest as pretty JSON, replacing any previous one atomically
    pub fn write(&self, path: &Path) -> Result<(), super::RecorderError> {
        let json = serde_json::to_string_pretty(self)?;
        super::replace_file(path, json.as_bytes())
    }
}
