//! Synchronization watermark persisted between runs

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Textual timestamp layout used by the checkpoint file and summary rows.
/// Fractional seconds are written only when non-zero.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Format a receive timestamp the way it is persisted
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a persisted timestamp (naive layout, read as UTC) or an RFC 3339 string
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Everything received at or before `watermark` has been materialized,
/// and output folders up to `sequence` are taken.
///
/// Both fields only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    /// Receive timestamp of the last committed message
    pub watermark: DateTime<Utc>,
    /// Folder index of the last committed message (0 = nothing committed yet)
    pub sequence: u64,
}

impl Checkpoint {
    pub fn new(watermark: DateTime<Utc>, sequence: u64) -> Self {
        Self {
            watermark,
            sequence,
        }
    }

    /// Default checkpoint for an absent or unreadable state file:
    /// midnight of the epoch date, sequence 0.
    pub fn initial(epoch: NaiveDate) -> Self {
        Self {
            watermark: epoch.and_time(chrono::NaiveTime::MIN).and_utc(),
            sequence: 0,
        }
    }

    /// True if nothing has ever been committed against this checkpoint
    pub fn is_fresh(&self) -> bool {
        self.sequence == 0
    }

    /// Decide whether an item received at `received_at` still needs processing.
    ///
    /// Strictly newer than the watermark, except that a fresh checkpoint also
    /// admits an item exactly at the watermark (nothing can have been
    /// committed at that instant yet).
    pub fn admits(&self, received_at: DateTime<Utc>) -> bool {
        received_at > self.watermark || (self.is_fresh() && received_at == self.watermark)
    }

    /// Folder index the next materialized message will use, or `None` once
    /// the sequence is exhausted
    pub fn next_sequence(&self) -> Option<u64> {
        self.sequence.checked_add(1)
    }

    /// Checkpoint after committing a message received at `received_at`
    /// into folder `sequence`. Never moves either field backwards.
    pub fn advanced(&self, received_at: DateTime<Utc>, sequence: u64) -> Self {
        Self {
            watermark: self.watermark.max(received_at),
            sequence: self.sequence.max(sequence),
        }
    }

    /// Serialize to the two-line persisted layout
    pub fn to_text(&self) -> String {
        format!("{}\n{}", format_timestamp(&self.watermark), self.sequence)
    }

    /// Parse the two-line persisted layout.
    ///
    /// Returns `None` for anything other than exactly two lines holding a
    /// timestamp and a decimal integer.
    pub fn parse(text: &str) -> Option<Self> {
        let lines: Vec<&str> = text.lines().collect();
        if lines.len() != 2 {
            return None;
        }
        let watermark = parse_timestamp(lines[0])?;
        let sequence = lines[1].trim().parse::<u64>().ok()?;
        Some(Self {
            watermark,
            sequence,
        })
    }
}
