//! Incremental synchronization engine
//!
//! Resumable from the persisted checkpoint: re-running never re-processes a
//! message that was already committed.

mod cancel;
mod orchestrator;
mod pagination;

pub use cancel::CancelFlag;
pub use orchestrator::{SyncOptions, SyncOrchestrator, SyncOutcome, SyncPhase, SyncReport, failure_line};
pub use pagination::{PageEntry, PaginationDriver};
