//! Domain models for the harvester

mod checkpoint;
mod message;
mod query;
mod summary;

pub use checkpoint::{Checkpoint, TIMESTAMP_FORMAT, format_timestamp, parse_timestamp};
pub use message::{Attachment, EmailAddress, FetchedMessage, FetchedMessageBuilder, MessageBody, join_addresses};
pub use query::MailboxQuery;
pub use summary::{FolderSummaryRecord, MaterializedOutput, SUMMARY_COLUMNS, SummaryRecord};
