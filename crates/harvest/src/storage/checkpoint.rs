//! Checkpoint persistence
//!
//! Load never fails: anything unreadable falls back to the default
//! checkpoint. Commit replaces the whole state atomically.

use chrono::NaiveDate;
use log::{debug, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::atomic::write_atomic;
use crate::error::{SyncError, SyncResult};
use crate::models::Checkpoint;

/// Persists the synchronization watermark between runs.
///
/// Single writer: only one synchronization run may use a given store at a time.
pub trait CheckpointStore: Send + Sync {
    /// Read the persisted checkpoint, or `Checkpoint::initial(epoch)` if it is
    /// absent, unreadable, or malformed.
    fn load(&self, epoch: NaiveDate) -> Checkpoint;

    /// Durably replace the persisted checkpoint
    fn commit(&self, checkpoint: &Checkpoint) -> SyncResult<()>;

    /// Where the checkpoint lives, for error reports
    fn location(&self) -> PathBuf {
        PathBuf::from("<memory>")
    }
}

/// Two-line text file store (timestamp, then sequence)
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self, epoch: NaiveDate) -> Checkpoint {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No checkpoint at {}, starting from {}", self.path.display(), epoch);
                return Checkpoint::initial(epoch);
            }
            Err(e) => {
                warn!(
                    "Unreadable checkpoint {} ({}), starting from {}",
                    self.path.display(),
                    e,
                    epoch
                );
                return Checkpoint::initial(epoch);
            }
        };

        match Checkpoint::parse(&text) {
            Some(checkpoint) => checkpoint,
            None => {
                warn!(
                    "Malformed checkpoint {}, starting from {}",
                    self.path.display(),
                    epoch
                );
                Checkpoint::initial(epoch)
            }
        }
    }

    fn commit(&self, checkpoint: &Checkpoint) -> SyncResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| SyncError::checkpoint_io(&self.path, e))?;
        }
        write_atomic(&self.path, checkpoint.to_text().as_bytes())
            .map_err(|e| SyncError::checkpoint_io(&self.path, e))
    }

    fn location(&self) -> PathBuf {
        self.path.clone()
    }
}

/// In-memory store for tests, recording every commit
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    current: Mutex<Option<Checkpoint>>,
    history: Mutex<Vec<Checkpoint>>,
    fail_commits: Mutex<bool>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already holds `checkpoint`
    pub fn with_checkpoint(checkpoint: Checkpoint) -> Self {
        let store = Self::new();
        *store.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(checkpoint);
        store
    }

    /// Make subsequent commits fail (or succeed again)
    pub fn set_fail_commits(&self, fail: bool) {
        *self.fail_commits.lock().unwrap_or_else(PoisonError::into_inner) = fail;
    }

    pub fn current(&self) -> Option<Checkpoint> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every successfully committed checkpoint, oldest first
    pub fn history(&self) -> Vec<Checkpoint> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn load(&self, epoch: NaiveDate) -> Checkpoint {
        self.current().unwrap_or_else(|| Checkpoint::initial(epoch))
    }

    fn commit(&self, checkpoint: &Checkpoint) -> SyncResult<()> {
        if *self.fail_commits.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(SyncError::checkpoint_io(
                "memory",
                io::Error::other("commit rejected"),
            ));
        }
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(*checkpoint);
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*checkpoint);
        Ok(())
    }
}
