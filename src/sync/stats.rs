//! Backfill counters.

use serde::Serialize;
use std::fmt;
use std::ops::AddAssign;

/// Summary of a backfill estimate or run.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct BackfillStats {
    /// Unsynced receipts considered
    pub receipt_count: usize,
    /// Combined size of their local files
    pub total_size_bytes: u64,
    pub already_synced_count: usize,
    pub uploaded_count: usize,
    pub skipped_count: usize,
    pub error_count: usize,
}

impl BackfillStats {
    /// Receipts that reached a final outcome in this run.
    pub fn processed(&self) -> usize {
        self.already_synced_count + self.uploaded_count + self.skipped_count + self.error_count
    }
}

impl AddAssign for BackfillStats {
    fn add_assign(&mut self, other: Self) {
        self.receipt_count += other.receipt_count;
        self.total_size_bytes += other.total_size_bytes;
        self.already_synced_count += other.already_synced_count;
        self.uploaded_count += other.uploaded_count;
        self.skipped_count += other.skipped_count;
        self.error_count += other.error_count;
    }
}

impl fmt::Display for BackfillStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} receipts ({} bytes): {} uploaded, {} already synced, {} skipped, {} errors",
            self.receipt_count,
            self.total_size_bytes,
            self.uploaded_count,
            self.already_synced_count,
            self.skipped_count,
            self.error_count
        )
    }
}
