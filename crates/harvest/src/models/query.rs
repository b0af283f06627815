//! Query parameters for one synchronization run

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Fixed filter and page size used for every page request of a run.
///
/// The receive-time window is closed on both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxQuery {
    /// Only messages from this address are harvested
    pub sender: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub page_size: usize,
}

impl MailboxQuery {
    /// Build the query for a window starting at `window_start` and ending on
    /// the same calendar date at `end_of_day`.
    pub fn for_day(
        sender: impl Into<String>,
        window_start: DateTime<Utc>,
        end_of_day: NaiveTime,
        page_size: usize,
    ) -> Self {
        let window_end = window_start.date_naive().and_time(end_of_day).and_utc();
        Self {
            sender: sender.into(),
            window_start,
            window_end,
            page_size,
        }
    }

    /// Calendar date the window belongs to
    pub fn day(&self) -> NaiveDate {
        self.window_start.date_naive()
    }

    /// Closed-interval membership test on the receive-time window
    pub fn contains(&self, received_at: DateTime<Utc>) -> bool {
        received_at >= self.window_start && received_at <= self.window_end
    }
}
