//! In-memory mailbox used as a fixture in tests and dry runs

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use super::{ItemRef, MailboxClient, Page, PageView, SearchFilter};
use crate::error::{SyncError, SyncResult};
use crate::models::FetchedMessage;

#[derive(Default)]
struct Faults {
    auth: Option<String>,
    unavailable: bool,
    /// Fail find_items once this many pages have been served
    find_after_pages: Option<usize>,
    bind_ids: HashSet<String>,
}

/// Fixed set of messages served with the same filtering, ordering and
/// paging rules a real mail service applies.
#[derive(Default)]
pub struct InMemoryMailbox {
    address: String,
    messages: Mutex<Vec<FetchedMessage>>,
    faults: Mutex<Faults>,
    find_calls: Mutex<usize>,
    bound_ids: Mutex<Vec<String>>,
}

impl InMemoryMailbox {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn with_messages(address: impl Into<String>, messages: Vec<FetchedMessage>) -> Self {
        let mailbox = Self::new(address);
        for message in messages {
            mailbox.add_message(message);
        }
        mailbox
    }

    pub fn add_message(&self, message: FetchedMessage) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    /// Make `authenticate` fail with an auth error
    pub fn fail_auth(&self, message: impl Into<String>) {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner).auth = Some(message.into());
    }

    /// Report the mailbox as having no store
    pub fn set_unavailable(&self) {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner).unavailable = true;
    }

    /// Serve `pages` pages, then fail every further search
    pub fn fail_find_after(&self, pages: usize) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .find_after_pages = Some(pages);
    }

    pub fn fail_bind(&self, id: impl Into<String>) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .bind_ids
            .insert(id.into());
    }

    /// Number of find_items calls served so far
    pub fn find_calls(&self) -> usize {
        *self.find_calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ids passed to bind, in call order
    pub fn bound_ids(&self) -> Vec<String> {
        self.bound_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn check_available(&self) -> SyncResult<()> {
        if self.faults.lock().unwrap_or_else(PoisonError::into_inner).unavailable {
            return Err(SyncError::mailbox_unavailable(&self.address));
        }
        Ok(())
    }
}

impl MailboxClient for InMemoryMailbox {
    fn authenticate(&self) -> SyncResult<()> {
        match &self.faults.lock().unwrap_or_else(PoisonError::into_inner).auth {
            Some(message) => Err(SyncError::auth(message.clone())),
            None => Ok(()),
        }
    }

    fn find_items(&self, _folder: &str, filter: &SearchFilter, view: PageView) -> SyncResult<Page> {
        self.check_available()?;

        let mut calls = self.find_calls.lock().unwrap_or_else(PoisonError::into_inner);
        let fail_after = self
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .find_after_pages;
        if fail_after.is_some_and(|pages| *calls >= pages) {
            return Err(SyncError::remote("page request failed"));
        }
        *calls += 1;

        let mut matching: Vec<ItemRef> = self
            .messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|m| filter.matches(&m.from.email, m.received_at))
            .map(|m| ItemRef {
                id: m.id.clone(),
                received_at: m.received_at,
            })
            .collect();
        // Stable sort keeps insertion order among identical timestamps
        matching.sort_by_key(|item| item.received_at);

        let total = matching.len();
        let items: Vec<ItemRef> = matching
            .into_iter()
            .skip(view.offset)
            .take(view.page_size)
            .collect();

        Ok(Page {
            items,
            more_available: view.offset + view.page_size < total,
        })
    }

    fn bind(&self, item: &ItemRef) -> SyncResult<FetchedMessage> {
        self.check_available()?;
        if self
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .bind_ids
            .contains(&item.id)
        {
            return Err(SyncError::remote(format!("bind failed for {}", item.id)));
        }

        self.bound_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item.id.clone());

        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|m| m.id == item.id)
            .cloned()
            .ok_or_else(|| SyncError::remote(format!("item {} not found", item.id)))
    }
}
