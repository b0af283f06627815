//! Durable state written by a synchronization run
//!
//! The checkpoint store and summary sink are trait seams so the
//! orchestrator can run against files or in-memory doubles.

mod atomic;
mod checkpoint;
mod summary;

pub use atomic::write_atomic;
pub use checkpoint::{CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore};
pub use summary::{
    CsvSummaryRecorder, InMemorySummaryRecorder, SummarySink, read_folder_summary, read_summary,
    write_folder_summary,
};
