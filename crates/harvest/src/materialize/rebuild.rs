//! Rebuild a summary from already-materialized folders

use anyhow::{Context, Result};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use super::DOCUMENT_FILE_NAME;
use super::render::parse_header;
use crate::models::FolderSummaryRecord;
use crate::storage::write_folder_summary;

/// Numbered message folders of `day_dir`, in numeric order.
///
/// Entries that are not directories or not named by an integer are ignored.
pub fn day_folders(day_dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
    let mut folders = Vec::new();
    for entry in
        fs::read_dir(day_dir).with_context(|| format!("Failed to list {}", day_dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(index) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<u64>().ok())
        {
            folders.push((index, entry.path()));
        }
    }
    folders.sort_by_key(|(index, _)| *index);
    Ok(folders)
}

/// Read one summary row per numbered folder of `day_dir`.
///
/// Folders without a readable document header are skipped with a warning.
pub fn scan_day(day_dir: &Path) -> Result<Vec<FolderSummaryRecord>> {
    let mut records = Vec::new();
    for (index, folder) in day_folders(day_dir)? {
        let document_path = folder.join(DOCUMENT_FILE_NAME);
        let document = match fs::read_to_string(&document_path) {
            Ok(document) => document,
            Err(e) => {
                warn!("Skipping {}: {}", document_path.display(), e);
                continue;
            }
        };
        let Some(record) = parse_header(&document) else {
            warn!("Skipping {}: no header block", document_path.display());
            continue;
        };
        records.push(FolderSummaryRecord::new(index, record));
    }
    Ok(records)
}

/// Regenerate the summary of `day_dir` into `output`, replacing it.
///
/// Returns the number of rows written.
pub fn rebuild_summary(day_dir: &Path, output: &Path) -> Result<usize> {
    let records = scan_day(day_dir)?;
    write_folder_summary(output, &records)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        "Rebuilt {} summary rows from {} into {}",
        records.len(),
        day_dir.display(),
        output.display()
    );
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materialize::Materializer;
    use crate::models::{EmailAddress, FetchedMessage, MessageBody};
    use crate::storage::read_folder_summary;
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::tempdir;

    fn materialize_day(root: &Path, folders: &[(u64, u32)]) -> PathBuf {
        let day = NaiveDate::from_ymd_opt(2025, 7, 26).unwrap();
        let materializer = Materializer::new(root);
        for (index, hour) in folders {
            let msg = FetchedMessage::builder(
                format!("m{}", index),
                Utc.with_ymd_and_hms(2025, 7, 26, *hour, 0, 0).unwrap(),
            )
            .from(EmailAddress::new("alerts@bank.example"))
            .subject(format!("Oficio {}", index))
            .body(MessageBody::Text("texto".into()))
            .build();
            materializer.materialize(&msg, day, *index).unwrap();
        }
        root.join("20250726")
    }

    #[test]
    fn test_scan_orders_numerically_and_skips_gaps() {
        let dir = tempdir().unwrap();
        let day_dir = materialize_day(dir.path(), &[(2, 10), (10, 11), (1, 9)]);
        fs::create_dir(day_dir.join("11")).unwrap();
        fs::create_dir(day_dir.join("notes")).unwrap();

        let records = scan_day(&day_dir).unwrap();

        let folders: Vec<u64> = records.iter().map(|r| r.folder).collect();
        assert_eq!(folders, vec![1, 2, 10]);
        let subjects: Vec<&str> = records.iter().map(|r| r.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Oficio 1", "Oficio 2", "Oficio 10"]);
    }

    #[test]
    fn test_rebuild_writes_folder_column() {
        let dir = tempdir().unwrap();
        let day_dir = materialize_day(dir.path(), &[(1, 9), (3, 12)]);
        let output = dir.path().join("rebuilt.csv");

        assert_eq!(rebuild_summary(&day_dir, &output).unwrap(), 2);

        let rows = read_folder_summary(&output).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].folder, 3);
        assert_eq!(rows[1].date_time_received, "2025-07-26T12:00:00");
    }

    #[test]
    fn test_rebuild_missing_dir_fails() {
        let dir = tempdir().unwrap();
        assert!(rebuild_summary(&dir.path().join("19990101"), &dir.path().join("out.csv")).is_err());
    }
}
