//! Per-item results and batch aggregation.
//!
//! Every task produces an [`ItemResult`]; workers fold their own results into
//! a private [`BatchSummary`] and the driver merges them after the join, so
//! continuing past a failed item is a matter of recording it, not of
//! catching anything.

use std::fmt;

/// Outcome of a single transfer or deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    /// The store call succeeded.
    Succeeded,
    /// The store call (or local preparation) failed.
    Failed(String),
    /// The item was never attempted.
    Skipped(String),
}

/// Result of one item, tagged with its source and destination identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
    /// Where the data came from (local path or remote key).
    pub source: String,
    /// Where the data went (remote key or local path). Empty for deletions.
    pub dest: String,
    /// What happened.
    pub status: ItemStatus,
}

impl ItemResult {
    /// A successful item.
    pub fn succeeded(source: impl Into<String>, dest: impl Into<String>) -> Self {
        Self::with_status(source, dest, ItemStatus::Succeeded)
    }

    /// A failed item.
    pub fn failed(
        source: impl Into<String>,
        dest: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Self::with_status(source, dest, ItemStatus::Failed(reason.to_string()))
    }

    /// An item that was deliberately not attempted.
    pub fn skipped(
        source: impl Into<String>,
        dest: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::with_status(source, dest, ItemStatus::Skipped(reason.into()))
    }

    fn with_status(source: impl Into<String>, dest: impl Into<String>, status: ItemStatus) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            status,
        }
    }
}

/// Aggregate of a batch of item results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Items that completed.
    pub succeeded: usize,
    /// Items that were not attempted.
    pub skipped: usize,
    /// Items that failed, kept for reporting.
    pub failed: Vec<ItemResult>,
}

impl BatchSummary {
    /// Fold one item result into the summary.
    pub fn record(&mut self, item: ItemResult) {
        match item.status {
            ItemStatus::Succeeded => self.succeeded += 1,
            ItemStatus::Skipped(_) => self.skipped += 1,
            ItemStatus::Failed(_) => self.failed.push(item),
        }
    }

    /// Fold another summary into this one.
    pub fn merge(&mut self, other: Self) {
        self.succeeded += other.succeeded;
        self.skipped += other.skipped;
        self.failed.extend(other.failed);
    }

    /// Total number of items seen.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed.len()
    }

    /// Whether any item failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}
