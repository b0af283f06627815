//! Paged iteration over the remote search results
//!
//! Issues bounded page requests in ascending receive-time order until a page
//! reports nothing further, and classifies every item against the checkpoint
//! read at the start of the run. Not resumable mid-page: a new run starts a
//! new driver from offset zero.

use std::collections::VecDeque;

use log::debug;

use crate::error::SyncResult;
use crate::mailbox::{ItemRef, MailboxClient, PageView, SearchFilter};
use crate::models::{Checkpoint, FetchedMessage, MailboxQuery};

/// One classified search result
#[derive(Debug)]
pub enum PageEntry {
    /// Newer than the checkpoint; fetched in full
    New(FetchedMessage),
    /// Already covered by the checkpoint; never bound
    AlreadySynced(ItemRef),
}

/// Lazy, finite sequence of [`PageEntry`] for one query.
///
/// The first error ends the sequence.
pub struct PaginationDriver<'a> {
    client: &'a dyn MailboxClient,
    folder: String,
    filter: SearchFilter,
    view: PageView,
    checkpoint: Checkpoint,
    pending: VecDeque<ItemRef>,
    exhausted: bool,
    pages_fetched: usize,
}

impl<'a> PaginationDriver<'a> {
    pub fn new(
        client: &'a dyn MailboxClient,
        folder: impl Into<String>,
        query: &MailboxQuery,
        checkpoint: Checkpoint,
    ) -> Self {
        Self {
            client,
            folder: folder.into(),
            filter: SearchFilter::from(query),
            view: PageView::first(query.page_size.max(1)),
            checkpoint,
            pending: VecDeque::new(),
            exhausted: false,
            pages_fetched: 0,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    fn fetch_page(&mut self) -> SyncResult<()> {
        let page = self.client.find_items(&self.folder, &self.filter, self.view)?;
        self.pages_fetched += 1;
        debug!(
            "Page {} at offset {}: {} items, more available: {}",
            self.pages_fetched,
            self.view.offset,
            page.items.len(),
            page.more_available
        );

        // An empty page ends the sequence even if the service claims more
        if !page.more_available || page.items.is_empty() {
            self.exhausted = true;
        }
        self.view = self.view.next();
        self.pending.extend(page.items);
        Ok(())
    }

    fn classify(&self, item: ItemRef) -> SyncResult<PageEntry> {
        if !self.checkpoint.admits(item.received_at) {
            return Ok(PageEntry::AlreadySynced(item));
        }
        self.client.bind(&item).map(PageEntry::New)
    }
}

impl Iterator for PaginationDriver<'_> {
    type Item = SyncResult<PageEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                let entry = self.classify(item);
                if entry.is_err() {
                    self.pending.clear();
                    self.exhausted = true;
                }
                return Some(entry);
            }

            if self.exhausted {
                return None;
            }

            if let Err(e) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mailbox::InMemoryMailbox;
    use crate::models::EmailAddress;
    use chrono::{DateTime, NaiveTime, TimeZone, Utc};

    const SENDER: &str = "alerts@bank.example";

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 26, h, m, 0).unwrap()
    }

    fn msg(id: &str, received_at: DateTime<Utc>) -> FetchedMessage {
        FetchedMessage::builder(id, received_at)
            .from(EmailAddress::new(SENDER))
            .subject(id)
            .build()
    }

    fn query(page_size: usize) -> MailboxQuery {
        MailboxQuery::for_day(SENDER, at(0, 0), NaiveTime::from_hms_opt(23, 59, 0).unwrap(), page_size)
    }

    fn ids(entries: &[PageEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| match e {
                PageEntry::New(m) => format!("new:{}", m.id),
                PageEntry::AlreadySynced(i) => format!("skip:{}", i.id),
            })
            .collect()
    }

    #[test]
    fn test_iterates_all_pages_in_order() {
        let mailbox = InMemoryMailbox::with_messages(
            "eyr@firm.example",
            vec![msg("c", at(11, 0)), msg("a", at(9, 0)), msg("e", at(13, 0)), msg("b", at(10, 0)), msg("d", at(12, 0))],
        );
        let checkpoint = Checkpoint::new(at(0, 0), 0);

        let mut driver = PaginationDriver::new(&mailbox, "inbox", &query(2), checkpoint);
        let entries: Vec<PageEntry> = driver.by_ref().collect::<SyncResult<_>>().unwrap();

        assert_eq!(ids(&entries), vec!["new:a", "new:b", "new:c", "new:d", "new:e"]);
        assert_eq!(driver.pages_fetched(), 3);
    }

    #[test]
    fn test_skips_items_at_or_before_watermark_without_binding() {
        let mailbox = InMemoryMailbox::with_messages(
            "eyr@firm.example",
            vec![msg("a", at(9, 0)), msg("b", at(10, 0)), msg("c", at(11, 0))],
        );
        let checkpoint = Checkpoint::new(at(10, 0), 2);

        let driver = PaginationDriver::new(&mailbox, "inbox", &query(50), checkpoint);
        let entries: Vec<PageEntry> = driver.collect::<SyncResult<_>>().unwrap();

        assert_eq!(ids(&entries), vec!["skip:a", "skip:b", "new:c"]);
        assert_eq!(mailbox.bound_ids(), vec!["c".to_string()]);
    }

    #[test]
    fn test_window_end_boundary_included_once() {
        let end = at(23, 59);
        let mailbox = InMemoryMailbox::with_messages(
            "eyr@firm.example",
            vec![msg("edge", end), msg("after", end + chrono::Duration::seconds(1))],
        );

        let driver = PaginationDriver::new(&mailbox, "inbox", &query(1), Checkpoint::new(at(0, 0), 0));
        let entries: Vec<PageEntry> = driver.collect::<SyncResult<_>>().unwrap();

        assert_eq!(ids(&entries), vec!["new:edge"]);
    }

    #[test]
    fn test_page_failure_ends_sequence() {
        let mailbox = InMemoryMailbox::with_messages(
            "eyr@firm.example",
            vec![msg("a", at(9, 0)), msg("b", at(10, 0)), msg("c", at(11, 0))],
        );
        mailbox.fail_find_after(1);

        let mut driver = PaginationDriver::new(&mailbox, "inbox", &query(2), Checkpoint::new(at(0, 0), 0));

        assert!(matches!(driver.next(), Some(Ok(PageEntry::New(_)))));
        assert!(matches!(driver.next(), Some(Ok(PageEntry::New(_)))));
        match driver.next() {
            Some(Err(e)) => assert_eq!(e.kind(), ErrorKind::RemoteService),
            other => panic!("expected page failure, got {:?}", other),
        }
        assert!(driver.next().is_none());
    }

    #[test]
    fn test_empty_mailbox_fetches_one_page() {
        let mailbox = InMemoryMailbox::new("eyr@firm.example");
        let mut driver = PaginationDriver::new(&mailbox, "inbox", &query(50), Checkpoint::new(at(0, 0), 0));

        assert!(driver.next().is_none());
        assert_eq!(mailbox.find_calls(), 1);
    }
}
