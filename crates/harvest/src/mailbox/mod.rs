//! Remote mailbox seams
//!
//! The harvester only needs two capabilities from a mail service: a
//! filtered, ordered, paged search returning item references, and a bind
//! that fetches one item in full. Token acquisition sits behind
//! [`CredentialProvider`].

mod memory;

use chrono::{DateTime, Utc};

use crate::error::SyncResult;
use crate::models::{FetchedMessage, MailboxQuery};

pub use memory::InMemoryMailbox;

/// Server-side predicate: sender equals `sender` AND
/// `received_from <= receive time <= received_to`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    pub sender: String,
    pub received_from: DateTime<Utc>,
    pub received_to: DateTime<Utc>,
}

impl From<&MailboxQuery> for SearchFilter {
    fn from(query: &MailboxQuery) -> Self {
        Self {
            sender: query.sender.clone(),
            received_from: query.window_start,
            received_to: query.window_end,
        }
    }
}

impl SearchFilter {
    pub fn matches(&self, sender: &str, received_at: DateTime<Utc>) -> bool {
        sender.eq_ignore_ascii_case(&self.sender)
            && received_at >= self.received_from
            && received_at <= self.received_to
    }
}

/// One bounded page request. Results are always ordered ascending by
/// receive time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageView {
    pub page_size: usize,
    pub offset: usize,
}

impl PageView {
    pub fn first(page_size: usize) -> Self {
        Self {
            page_size,
            offset: 0,
        }
    }

    pub fn next(self) -> Self {
        Self {
            page_size: self.page_size,
            offset: self.offset + self.page_size,
        }
    }
}

/// Lightweight reference to a remote item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    pub id: String,
    pub received_at: DateTime<Utc>,
}

/// One page of search results
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<ItemRef>,
    /// False once this page is the last one
    pub more_available: bool,
}

/// Query and fetch capability over a remote mail store
pub trait MailboxClient {
    /// Fail early if the session cannot be established
    fn authenticate(&self) -> SyncResult<()> {
        Ok(())
    }

    /// Search `folder` with `filter`, returning the page described by `view`
    fn find_items(&self, folder: &str, filter: &SearchFilter, view: PageView) -> SyncResult<Page>;

    /// Fetch one item with sender, recipients, subject, body and attachments
    fn bind(&self, item: &ItemRef) -> SyncResult<FetchedMessage>;
}

/// Supplies an access token for an application identity
pub trait CredentialProvider: Send + Sync {
    fn access_token(&self) -> SyncResult<String>;
}
