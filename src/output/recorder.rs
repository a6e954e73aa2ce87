//! Result recorder
//!
//! Rows are appended to a per-run temp CSV as soon as each page completes.
//! Finalizing re-reads that file, sorts it by URL and publishes the sorted
//! result, the cross-run latest copy and the run manifest.

use super::manifest::RunManifest;
use super::stats::CrawlStatistics;
use super::{copy_atomically, replace_file, RecorderError};
use crate::crawler::PageRecord;
use chrono::Local;
use csv::{ReaderBuilder, Writer, WriterBuilder};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Column order of every result file
pub const CSV_FIELDS: [&str; 8] = [
    "url",
    "status_code",
    "title",
    "h1",
    "meta_description",
    "referrer",
    "canonical_url",
    "depth",
];

/// File locations for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub root: PathBuf,
    /// Append-log written while crawling
    pub temp: PathBuf,
    /// Finalized, url-sorted result
    pub final_file: PathBuf,
    /// Copy of the newest finalized result, overwritten every run
    pub latest: PathBuf,
    /// `index.json` run manifest
    pub manifest: PathBuf,
    /// Log file for the run
    pub log: PathBuf,
}

impl RunPaths {
    /// Paths under `root` for the run identified by `stamp`
    pub fn new(root: impl Into<PathBuf>, stamp: &str) -> Self {
        let root = root.into();
        Self {
            temp: root.join(format!("temp_{}.csv", stamp)),
            final_file: root.join(format!("crawl_result_{}.csv", stamp)),
            latest: root.join("crawl_result_latest.csv"),
            manifest: root.join("index.json"),
            log: root.join(format!("crawler_log_{}.log", stamp)),
            root,
        }
    }

    /// Paths stamped with today's local date (`YYYYMMDD`)
    pub fn for_today(root: impl Into<PathBuf>) -> Self {
        let stamp = Local::now().format("%Y%m%d").to_string();
        Self::new(root, &stamp)
    }
}

/// Where the finalized artifacts ended up
#[derive(Debug, Clone)]
pub struct FinalizedRun {
    pub final_path: PathBuf,
    pub latest_path: PathBuf,
    pub manifest_path: PathBuf,
    pub statistics: CrawlStatistics,
}

/// Appends page records and publishes the finalized result
///
/// Writes are serialized through a mutex so concurrent callers never
/// interleave rows. Each row is flushed before `write` returns, so the
/// append-log survives a crash mid-run.
#[derive(Debug)]
pub struct Recorder {
    paths: RunPaths,
    start_url: String,
    writer: Mutex<Writer<File>>,
}

impl Recorder {
    /// Creates the output root and a fresh append-log holding only the header
    ///
    /// An existing append-log with the same stamp is truncated.
    pub fn initialize(paths: RunPaths, start_url: impl Into<String>) -> Result<Self, RecorderError> {
        fs::create_dir_all(&paths.root)?;

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&paths.temp)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(CSV_FIELDS)?;
        writer.flush()?;

        tracing::info!("Recording results to {}", paths.temp.display());

        Ok(Self {
            paths,
            start_url: start_url.into(),
            writer: Mutex::new(writer),
        })
    }

    pub fn paths(&self) -> &RunPaths {
        &self.paths
    }

    /// Appends one record with line breaks escaped
    pub fn write(&self, record: &PageRecord) -> Result<(), RecorderError> {
        let mut writer = self.lock();
        writer.serialize(record.escaped())?;
        writer.flush()?;
        tracing::trace!("Recorded {} ({})", record.url, record.status_code);
        Ok(())
    }

    /// Publishes the finalized result
    ///
    /// 1. Reads every row back from the append-log, skipping malformed rows
    /// 2. Stable-sorts by URL
    /// 3. Writes the dated result file with the header
    /// 4. Replaces the latest copy
    /// 5. Replaces `index.json`
    pub fn finalize(&self) -> Result<FinalizedRun, RecorderError> {
        // Held throughout so no row lands after the read-back
        let mut writer = self.lock();
        writer.flush()?;

        let mut records = read_records(&self.paths.temp)?;
        records.sort_by(|a, b| a.url.cmp(&b.url));
        tracing::info!("Finalizing {} records", records.len());

        let mut sorted = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        sorted.write_record(CSV_FIELDS)?;
        for record in &records {
            sorted.serialize(record)?;
        }
        let bytes = sorted
            .into_inner()
            .map_err(|e| RecorderError::Io(e.into_error()))?;

        replace_file(&self.paths.final_file, &bytes)?;
        tracing::info!("Wrote {}", self.paths.final_file.display());

        copy_atomically(&self.paths.final_file, &self.paths.latest)?;
        tracing::info!("Updated {}", self.paths.latest.display());

        let current_path = self
            .paths
            .final_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        RunManifest::new(current_path, records.len(), self.start_url.clone())
            .write(&self.paths.manifest)?;
        tracing::info!("Published {}", self.paths.manifest.display());

        Ok(FinalizedRun {
            final_path: self.paths.final_file.clone(),
            latest_path: self.paths.latest.clone(),
            manifest_path: self.paths.manifest.clone(),
            statistics: CrawlStatistics::from_records(&records),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Writer<File>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reads page records from a result file with a header row
///
/// Rows that do not deserialize are logged and skipped.
pub fn read_records(path: &Path) -> Result<Vec<PageRecord>, RecorderError> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut records = Vec::new();

    for (index, row) in reader.deserialize::<PageRecord>().enumerate() {
        match row {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(
                "Skipping malformed row {} in {}: {}",
                index + 1,
                path.display(),
                e
            ),
        }
    }

    Ok(records)
}
