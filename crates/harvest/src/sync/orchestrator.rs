//! Top-level synchronization run
//!
//! ```text
//! Idle -> LoadingCheckpoint -> Paginating -> Processing -> CommittingCheckpoint
//!                                   ^                              |
//!                                   +------------------------------+
//! Paginating -> Done            any state -> Failed
//! ```
//!
//! Each new message is materialized, recorded in the summary, and only then
//! committed to the checkpoint. A failure ends the run; checkpoints already
//! committed by earlier items stay valid.

use chrono::{NaiveDate, NaiveTime};
use log::{debug, error, info};
use std::io;
use std::time::Instant;

use super::cancel::CancelFlag;
use super::pagination::{PageEntry, PaginationDriver};
use crate::error::{ErrorKind, SyncError, SyncResult};
use crate::mailbox::MailboxClient;
use crate::materialize::Materializer;
use crate::models::{Checkpoint, FetchedMessage, MailboxQuery, SummaryRecord, format_timestamp};
use crate::storage::{CheckpointStore, SummarySink};

/// Static parameters of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Mailbox being harvested (for log lines)
    pub mailbox: String,
    pub sender: String,
    pub folder: String,
    /// Epoch used when no checkpoint is available, and the earliest window start
    pub default_start_date: NaiveDate,
    pub end_of_day: NaiveTime,
    pub page_size: usize,
}

impl SyncOptions {
    /// Query for a run starting from `checkpoint`.
    ///
    /// The window starts at the later of the watermark and midnight of the
    /// default start date, and ends on that same date at `end_of_day`.
    pub fn query_for(&self, checkpoint: &Checkpoint) -> MailboxQuery {
        let floor = Checkpoint::initial(self.default_start_date).watermark;
        let window_start = checkpoint.watermark.max(floor);
        MailboxQuery::for_day(&self.sender, window_start, self.end_of_day, self.page_size)
    }
}

/// Where the orchestrator is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    LoadingCheckpoint,
    Paginating,
    Processing { sequence: u64 },
    CommittingCheckpoint { sequence: u64 },
    Done,
    Failed(ErrorKind),
}

/// How a run ended
#[derive(Debug)]
pub enum SyncOutcome {
    Completed,
    /// Stopped at an item boundary on request
    Cancelled,
    Failed(SyncError),
}

/// Statistics and final state of one run
#[derive(Debug)]
pub struct SyncReport {
    /// Items returned by the search
    pub fetched: usize,
    /// Items already covered by the checkpoint
    pub skipped: usize,
    /// Messages written and committed
    pub materialized: usize,
    pub pages: usize,
    /// Checkpoint loaded at the start of the run
    pub initial_checkpoint: Option<Checkpoint>,
    /// Last durably committed checkpoint (equals the initial one if nothing was committed)
    pub checkpoint: Option<Checkpoint>,
    pub outcome: SyncOutcome,
    pub duration_ms: u64,
}

impl SyncReport {
    fn new() -> Self {
        Self {
            fetched: 0,
            skipped: 0,
            materialized: 0,
            pages: 0,
            initial_checkpoint: None,
            checkpoint: None,
            outcome: SyncOutcome::Completed,
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, SyncOutcome::Failed(_))
    }

    pub fn error(&self) -> Option<&SyncError> {
        match &self.outcome {
            SyncOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Terminal log line for a failed run
pub fn failure_line(err: &SyncError) -> String {
    match err {
        SyncError::Auth { message } => format!("Error acquiring access token: {}", message),
        SyncError::MailboxUnavailable { mailbox } => format!(
            "The specified SMTP address {} has no mailbox associated with it.",
            mailbox
        ),
        SyncError::RemoteService { message } => format!("Mailbox service error: {}", message),
        SyncError::Materialization { .. } | SyncError::CheckpointIo { .. } => {
            format!("Error: {}", err)
        }
    }
}

/// Drives one synchronization run over injected collaborators
pub struct SyncOrchestrator<'a> {
    options: SyncOptions,
    mailbox: &'a dyn MailboxClient,
    checkpoints: &'a dyn CheckpointStore,
    summary: &'a dyn SummarySink,
    materializer: &'a Materializer,
    cancel: CancelFlag,
    phase: SyncPhase,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(
        options: SyncOptions,
        mailbox: &'a dyn MailboxClient,
        checkpoints: &'a dyn CheckpointStore,
        summary: &'a dyn SummarySink,
        materializer: &'a Materializer,
    ) -> Self {
        Self {
            options,
            mailbox,
            checkpoints,
            summary,
            materializer,
            cancel: CancelFlag::new(),
            phase: SyncPhase::Idle,
        }
    }

    /// Use an externally owned cancellation flag
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    fn transition(&mut self, next: SyncPhase) {
        debug!("Sync phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    /// Run one synchronization to completion, cancellation, or first failure.
    ///
    /// Never returns an error: failures are logged once and reported in
    /// [`SyncReport::outcome`]. Re-running resumes from the last committed
    /// checkpoint.
    pub fn run(&mut self) -> SyncReport {
        let start = Instant::now();
        let mut report = SyncReport::new();
        self.phase = SyncPhase::Idle;

        let result = self.execute(&mut report);
        report.duration_ms = start.elapsed().as_millis() as u64;
        debug!(
            "{} fetched, {} skipped, {} materialized in {} pages ({} ms)",
            report.fetched, report.skipped, report.materialized, report.pages, report.duration_ms
        );

        match result {
            Ok(()) => {
                self.transition(SyncPhase::Done);
                match report.outcome {
                    SyncOutcome::Cancelled => info!(
                        "Synchronization cancelled after {} new messages.",
                        report.materialized
                    ),
                    _ => info!(
                        "Synchronization completed: {} new, {} already processed.",
                        report.materialized, report.skipped
                    ),
                }
            }
            Err(e) => {
                self.transition(SyncPhase::Failed(e.kind()));
                error!("{}", failure_line(&e));
                report.outcome = SyncOutcome::Failed(e);
            }
        }

        report
    }

    fn execute(&mut self, report: &mut SyncReport) -> SyncResult<()> {
        self.transition(SyncPhase::LoadingCheckpoint);
        let mut checkpoint = self.checkpoints.load(self.options.default_start_date);
        report.initial_checkpoint = Some(checkpoint);
        report.checkpoint = Some(checkpoint);

        self.mailbox.authenticate()?;

        let query = self.options.query_for(&checkpoint);
        info!(
            "Harvesting {} from {} between {} and {} (checkpoint {} / {})",
            self.options.mailbox,
            query.sender,
            format_timestamp(&query.window_start),
            format_timestamp(&query.window_end),
            format_timestamp(&checkpoint.watermark),
            checkpoint.sequence
        );

        self.transition(SyncPhase::Paginating);
        let mut driver =
            PaginationDriver::new(self.mailbox, self.options.folder.clone(), &query, checkpoint);

        loop {
            if self.cancel.is_cancelled() {
                report.outcome = SyncOutcome::Cancelled;
                break;
            }

            let Some(entry) = driver.next() else {
                break;
            };
            report.pages = driver.pages_fetched();
            report.fetched += 1;

            match entry? {
                PageEntry::AlreadySynced(item) => {
                    report.skipped += 1;
                    debug!(
                        "Skipping {} ({}), already processed",
                        item.id,
                        format_timestamp(&item.received_at)
                    );
                }
                PageEntry::New(message) => {
                    checkpoint = self.process(&message, &query, checkpoint)?;
                    report.checkpoint = Some(checkpoint);
                    report.materialized += 1;
                    self.transition(SyncPhase::Paginating);
                }
            }
        }

        report.pages = driver.pages_fetched();
        Ok(())
    }

    /// Materialize, record, and commit one message. Returns the new checkpoint.
    fn process(
        &mut self,
        message: &FetchedMessage,
        query: &MailboxQuery,
        checkpoint: Checkpoint,
    ) -> SyncResult<Checkpoint> {
        let sequence = checkpoint.next_sequence().ok_or_else(|| {
            SyncError::checkpoint_io(
                self.checkpoints.location(),
                io::Error::new(io::ErrorKind::InvalidData, "checkpoint sequence exhausted"),
            )
        })?;
        self.transition(SyncPhase::Processing { sequence });

        let output = self.materializer.materialize(message, query.day(), sequence)?;
        debug!(
            "Wrote {} with {} attachments",
            output.rendered_document_path.display(),
            output.attachment_paths.len()
        );
        self.summary.append(&SummaryRecord::from_message(message))?;

        self.transition(SyncPhase::CommittingCheckpoint { sequence });
        let next = checkpoint.advanced(message.received_at, sequence);
        self.checkpoints.commit(&next)?;

        info!(
            "Processed: {} ({})",
            message.subject,
            format_timestamp(&message.received_at)
        );
        Ok(next)
    }
}
