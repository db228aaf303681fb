//! Per-folder day index ledger.
//!
//! One JSON document per day folder:
//!
//! ```json
//! {
//!   "date": "2025-06-14",
//!   "last_updated": "2025-06-14T18:00:00Z",
//!   "receipts": [
//!     {
//!       "receipt_id": "r-1",
//!       "filename": "2025-06-14_1.jpg",
//!       "amount_tracked": 12.5,
//!       "currency_code": "CAD",
//!       "category": "Meals",
//!       "checksum_sha256": "9f86d0...",
//!       "captured_at": "2025-06-14T10:30:00",
//!       "updated_at": "2025-06-14T18:00:00Z"
//!     }
//!   ]
//! }
//! ```
//!
//! Entries written by other clients may carry `amount_tracked` as a decimal
//! string and naive timestamps; both are accepted on read (see
//! [`crate::model::lenient`]) and written back in the canonical form above.

use crate::error::{Result, SyncError};
use crate::model::folder::calendar_day;
use crate::model::lenient;
use crate::model::receipt::Receipt;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One receipt as recorded in a day index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReceiptIndexEntry {
    pub receipt_id: String,
    pub filename: String,
    #[serde(
        serialize_with = "rust_decimal::serde::float::serialize",
        deserialize_with = "lenient::decimal"
    )]
    pub amount_tracked: Decimal,
    pub currency_code: String,
    pub category: String,
    pub checksum_sha256: String,
    pub captured_at: String,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl ReceiptIndexEntry {
    /// Project a local receipt into an index entry stored under `filename`.
    pub fn from_receipt(receipt: &Receipt, filename: impl Into<String>) -> Self {
        Self {
            receipt_id: receipt.receipt_id.clone(),
            filename: filename.into(),
            amount_tracked: receipt.amount_tracked,
            currency_code: receipt.currency_code.clone(),
            category: receipt.category.clone(),
            checksum_sha256: receipt.checksum_sha256.clone(),
            captured_at: receipt.captured_at.clone(),
            updated_at: receipt.updated_at,
        }
    }

    pub fn captured_day(&self) -> Option<NaiveDate> {
        calendar_day(&self.captured_at)
    }
}

/// Authoritative metadata ledger for one day folder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayIndex {
    pub date: String,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub receipts: Vec<ReceiptIndexEntry>,
}

impl DayIndex {
    pub fn new(date: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            date: date.into(),
            last_updated: now,
            receipts: Vec::new(),
        }
    }

    /// Parse an index document read from `path`.
    ///
    /// Malformed content is reported as [`SyncError::IndexCorrupt`], never
    /// replaced by an empty index.
    pub fn parse(bytes: &[u8], path: &Path) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| SyncError::IndexCorrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn entry_by_id(&self, receipt_id: &str) -> Option<&ReceiptIndexEntry> {
        self.receipts.iter().find(|e| e.receipt_id == receipt_id)
    }

    pub fn entry_by_filename(&self, filename: &str) -> Option<&ReceiptIndexEntry> {
        self.receipts.iter().find(|e| e.filename == filename)
    }

    pub fn contains_filename(&self, filename: &str) -> bool {
        self.entry_by_filename(filename).is_some()
    }

    /// Insert `entry`, replacing any entry with the same receipt id in place.
    pub fn upsert(&mut self, entry: ReceiptIndexEntry, now: DateTime<Utc>) {
        match self
            .receipts
            .iter_mut()
            .find(|e| e.receipt_id == entry.receipt_id)
        {
            Some(existing) => *existing = entry,
            None => self.receipts.push(entry),
        }
        self.last_updated = now;
    }
}
