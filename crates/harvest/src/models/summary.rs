//! Tabular summary row and materialized output paths

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::checkpoint::format_timestamp;
use super::message::{FetchedMessage, join_addresses};

/// Column names of the summary sink, in order
pub const SUMMARY_COLUMNS: [&str; 5] = ["from", "dateTimeReceived", "to", "subject", "attachments"];

/// One summary row per materialized message, all fields rendered as text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub from: String,
    pub date_time_received: String,
    pub to: String,
    pub subject: String,
    pub attachments: String,
}

impl SummaryRecord {
    pub fn from_message(message: &FetchedMessage) -> Self {
        Self {
            from: message.from.email.clone(),
            date_time_received: format_timestamp(&message.received_at),
            to: join_addresses(&message.to),
            subject: message.subject.clone(),
            attachments: message.attachment_names(),
        }
    }
}

/// Summary row regenerated from a materialized folder, led by the folder index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderSummaryRecord {
    pub folder: u64,
    pub from: String,
    pub date_time_received: String,
    pub to: String,
    pub subject: String,
    pub attachments: String,
}

impl FolderSummaryRecord {
    pub fn new(folder: u64, record: SummaryRecord) -> Self {
        Self {
            folder,
            from: record.from,
            date_time_received: record.date_time_received,
            to: record.to,
            subject: record.subject,
            attachments: record.attachments,
        }
    }

    /// The row without its folder index
    pub fn record(&self) -> SummaryRecord {
        SummaryRecord {
            from: self.from.clone(),
            date_time_received: self.date_time_received.clone(),
            to: self.to.clone(),
            subject: self.subject.clone(),
            attachments: self.attachments.clone(),
        }
    }
}

/// Files written for one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedOutput {
    /// Folder holding everything for this message
    pub output_path: PathBuf,
    /// The rendered header + body document
    pub rendered_document_path: PathBuf,
    pub attachment_paths: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attachment, EmailAddress};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_record_from_message() {
        let received = Utc.with_ymd_and_hms(2025, 7, 26, 9, 0, 0).unwrap();
        let message = FetchedMessage::builder("m1", received)
            .from(EmailAddress::with_name("Bank", "alerts@bank.example"))
            .to(vec![
                EmailAddress::new("eyr@firm.example"),
                EmailAddress::new("legal@firm.example"),
            ])
            .subject("Embargo, oficio 123")
            .attachment(Attachment::new("oficio.pdf", b"pdf".to_vec()))
            .build();

        let record = SummaryRecord::from_message(&message);
        assert_eq!(record.from, "alerts@bank.example");
        assert_eq!(record.date_time_received, "2025-07-26T09:00:00");
        assert_eq!(record.to, "eyr@firm.example, legal@firm.example");
        assert_eq!(record.subject, "Embargo, oficio 123");
        assert_eq!(record.attachments, "oficio.pdf");
    }
}
