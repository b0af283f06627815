//! Mail harvester - incremental, checkpointed mailbox export
//!
//! This crate provides:
//! - Domain models (Checkpoint, MailboxQuery, FetchedMessage, SummaryRecord)
//! - Checkpoint and summary storage with single-writer semantics
//! - Message materialization to numbered output folders
//! - Mailbox and credential seams, with Microsoft Graph adapters
//! - The resumable synchronization engine (pagination + orchestration)
//! - PDF rendering and per-folder bundles of a harvested day
//!
//! Only one synchronization run may use a given state file and output
//! directory at a time.

pub mod config;
pub mod error;
pub mod graph;
pub mod mailbox;
pub mod materialize;
pub mod models;
pub mod pdf;
pub mod storage;
pub mod sync;

pub use config::{GraphCredentials, HarvestConfig};
pub use error::{ErrorKind, SyncError, SyncResult};
pub use graph::{ClientCredentialsAuth, GraphMailboxClient};
pub use mailbox::{CredentialProvider, InMemoryMailbox, ItemRef, MailboxClient, Page, PageView, SearchFilter};
pub use materialize::{DOCUMENT_FILE_NAME, Materializer, day_folders, rebuild_summary, scan_day};
pub use models::{
    Attachment, Checkpoint, EmailAddress, FetchedMessage, FolderSummaryRecord, MailboxQuery,
    MaterializedOutput, MessageBody, SummaryRecord,
};
pub use pdf::{HtmlToPdf, PdfReport, RENDERED_PDF_FILE_NAME, Wkhtmltopdf, render_day};
pub use storage::{
    CheckpointStore, CsvSummaryRecorder, FileCheckpointStore, InMemoryCheckpointStore,
    InMemorySummaryRecorder, SummarySink, read_folder_summary, read_summary, write_folder_summary,
};
pub use sync::{
    CancelFlag, PageEntry, PaginationDriver, SyncOptions, SyncOrchestrator, SyncOutcome,
    SyncPhase, SyncReport, failure_line,
};
