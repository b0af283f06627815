//! Append-only summary sink
//!
//! The CSV file gets a header row the first time it is written; every later
//! append adds exactly one record. Single writer only: a crash between the
//! header and the first record, or two concurrent writers, can leave the
//! file malformed.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::{SyncError, SyncResult};
use crate::models::{FolderSummaryRecord, SummaryRecord};

/// Append-only sink for one row per materialized message
pub trait SummarySink: Send + Sync {
    fn append(&self, record: &SummaryRecord) -> SyncResult<()>;
}

/// CSV file recorder (comma-delimited, standard quoting)
pub struct CsvSummaryRecorder {
    path: PathBuf,
}

impl CsvSummaryRecorder {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_inner(&self, record: &SummaryRecord) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        // An empty file never received its header
        let needs_header = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);

        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(record).map_err(io::Error::other)?;
        writer.flush()
    }
}

impl SummarySink for CsvSummaryRecorder {
    fn append(&self, record: &SummaryRecord) -> SyncResult<()> {
        self.append_inner(record)
            .map_err(|e| SyncError::materialization(&self.path, e))
    }
}

/// Read every record from a summary CSV (header row expected)
pub fn read_summary(path: &Path) -> io::Result<Vec<SummaryRecord>> {
    let mut reader = csv::Reader::from_path(path).map_err(io::Error::other)?;
    reader
        .deserialize()
        .collect::<Result<Vec<SummaryRecord>, csv::Error>>()
        .map_err(io::Error::other)
}

/// Replace `path` with a folder summary (header plus one row per record)
pub fn write_folder_summary(path: &Path, records: &[FolderSummaryRecord]) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path).map_err(io::Error::other)?;
    for record in records {
        writer.serialize(record).map_err(io::Error::other)?;
    }
    writer.flush()
}

/// Read every record from a folder summary CSV
pub fn read_folder_summary(path: &Path) -> io::Result<Vec<FolderSummaryRecord>> {
    let mut reader = csv::Reader::from_path(path).map_err(io::Error::other)?;
    reader
        .deserialize()
        .collect::<Result<Vec<FolderSummaryRecord>, csv::Error>>()
        .map_err(io::Error::other)
}

/// In-memory sink for tests
#[derive(Default)]
pub struct InMemorySummaryRecorder {
    records: Mutex<Vec<SummaryRecord>>,
    fail_appends: Mutex<bool>,
}

impl InMemorySummaryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_appends(&self, fail: bool) {
        *self.fail_appends.lock().unwrap_or_else(PoisonError::into_inner) = fail;
    }

    pub fn records(&self) -> Vec<SummaryRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SummarySink for InMemorySummaryRecorder {
    fn append(&self, record: &SummaryRecord) -> SyncResult<()> {
        if *self.fail_appends.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(SyncError::materialization(
                "memory",
                io::Error::other("append rejected"),
            ));
        }
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(subject: &str) -> SummaryRecord {
        SummaryRecord {
            from: "alerts@bank.example".to_string(),
            date_time_received: "2025-07-26T09:00:00".to_string(),
            to: "eyr@firm.example, legal@firm.example".to_string(),
            subject: subject.to_string(),
            attachments: "oficio.pdf".to_string(),
        }
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let recorder = CsvSummaryRecorder::new(&path);

        recorder.append(&record("first")).unwrap();
        recorder.append(&record("second")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "from,dateTimeReceived,to,subject,attachments");
        assert_eq!(
            content.matches("from,dateTimeReceived").count(),
            1,
            "header must appear exactly once"
        );
    }

    #[test]
    fn test_embedded_delimiters_are_quoted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let recorder = CsvSummaryRecorder::new(&path);

        recorder.append(&record("Embargo, \"urgente\"")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"eyr@firm.example, legal@firm.example\""));
        assert!(content.contains("\"Embargo, \"\"urgente\"\"\""));

        let records = read_summary(&path).unwrap();
        assert_eq!(records, vec![record("Embargo, \"urgente\"")]);
    }

    #[test]
    fn test_empty_existing_file_gets_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        fs::write(&path, "").unwrap();

        CsvSummaryRecorder::new(&path).append(&record("only")).unwrap();
        assert_eq!(read_summary(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_folder_summary_leads_with_folder_and_replaces_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rebuilt.csv");
        fs::write(&path, "stale contents\n").unwrap();

        let rows = vec![
            FolderSummaryRecord::new(1, record("first")),
            FolderSummaryRecord::new(10, record("tenth")),
        ];
        write_folder_summary(&path, &rows).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content.lines().next().unwrap(),
            "folder,from,dateTimeReceived,to,subject,attachments"
        );
        assert!(!content.contains("stale"));
        let read_back = read_folder_summary(&path).unwrap();
        assert_eq!(read_back, rows);
        assert_eq!(read_back[1].record(), record("tenth"));
    }

    #[test]
    fn test_append_failure_is_materialization() {
        let dir = tempdir().unwrap();
        // The path is a directory, so opening it for append fails
        let recorder = CsvSummaryRecorder::new(dir.path());
        let err = recorder.append(&record("x")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Materialization);
    }
}
