//! Output module for recording crawl results
//!
//! This module handles:
//! - Appending page records to the per-run append-log
//! - Publishing the sorted result, the latest copy and the run manifest
//! - Summarizing finalized results

mod manifest;
mod recorder;
pub mod stats;

pub use manifest::RunManifest;
pub use recorder::{read_records, FinalizedRun, Recorder, RunPaths, CSV_FIELDS};
pub use stats::{print_statistics, CrawlStatistics};

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while writing or publishing results
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Sibling path used while a file is being replaced
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `contents` to `path` through a staging file and a rename
pub(crate) fn replace_file(path: &Path, contents: &[u8]) -> Result<(), RecorderError> {
    let staging = staging_path(path);
    fs::write(&staging, contents)?;
    fs::rename(&staging, path)?;
    Ok(())
}

/// Copies `from` over `to` through a staging file and a rename
pub(crate) fn copy_atomically(from: &Path, to: &Path) -> Result<(), RecorderError> {
    let staging = staging_path(to);
    fs::copy(from, &staging)?;
    fs::rename(&staging, to)?;
    Ok(())
}
