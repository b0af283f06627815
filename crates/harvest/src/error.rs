//! Error taxonomy for a synchronization run
//!
//! Every failure that can end a run is one of a small, closed set of kinds.
//! The orchestrator switches on [`ErrorKind`] to pick the terminal log line.

use std::io;
use std::path::PathBuf;

/// Fieldless discriminant of [`SyncError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Auth,
    MailboxUnavailable,
    RemoteService,
    Materialization,
    CheckpointIo,
}

/// A failure that terminates a synchronization run
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Credential acquisition failed; no mailbox state was touched
    #[error("Error acquiring access token: {message}")]
    Auth { message: String },

    /// The targeted address has no mailbox store behind it
    #[error("The mailbox {mailbox} has no mailbox store associated with it")]
    MailboxUnavailable { mailbox: String },

    /// Any other protocol or service failure from the mailbox client
    #[error("Mailbox service error: {message}")]
    RemoteService { message: String },

    /// Writing one message's output (document, attachment, summary row) failed
    #[error("Failed to materialize {}: {source}", path.display())]
    Materialization {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Persisting the checkpoint failed; the in-memory advance is discarded
    #[error("Failed to commit checkpoint {}: {source}", path.display())]
    CheckpointIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SyncError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteService {
            message: message.into(),
        }
    }

    pub fn mailbox_unavailable(mailbox: impl Into<String>) -> Self {
        Self::MailboxUnavailable {
            mailbox: mailbox.into(),
        }
    }

    pub fn materialization(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Materialization {
            path: path.into(),
            source,
        }
    }

    pub fn checkpoint_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::CheckpointIo {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Auth { .. } => ErrorKind::Auth,
            SyncError::MailboxUnavailable { .. } => ErrorKind::MailboxUnavailable,
            SyncError::RemoteService { .. } => ErrorKind::RemoteService,
            SyncError::Materialization { .. } => ErrorKind::Materialization,
            SyncError::CheckpointIo { .. } => ErrorKind::CheckpointIo,
        }
    }
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
