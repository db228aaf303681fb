//! Locally-captured receipt rows.

use crate::error::{Result, SyncError};
use crate::model::folder::calendar_day;
use crate::naming::parse_filename;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Synchronization lifecycle of a receipt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Captured, never queued for upload
    #[default]
    Local,
    /// Queued for upload
    Pending,
    /// Bytes present in remote storage
    Synced,
    /// Remote day index carries the entry
    Indexed,
    /// Last upload attempt failed
    Failed,
}

impl SyncStatus {
    /// Whether the receipt still needs to reach remote storage.
    pub fn is_unsynced(self) -> bool {
        matches!(self, Self::Local | Self::Pending | Self::Failed)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Pending => write!(f, "pending"),
            Self::Synced => write!(f, "synced"),
            Self::Indexed => write!(f, "indexed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One captured receipt as owned by the local store.
///
/// `filename` and its folder placement never change once assigned. A
/// correction is a new receipt pointing back through `supersedes_filename`,
/// see [`Receipt::supersede`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Receipt {
    pub receipt_id: String,

    /// Capture-local ISO-8601 timestamp
    pub captured_at: String,

    pub timezone: String,

    /// `YYYY-MM-DD_N.jpg`, date equal to the captured date
    pub filename: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub amount_tracked: Decimal,

    pub currency_code: String,
    pub country: String,
    pub region: String,
    pub category: String,

    #[serde(default)]
    pub notes: Option<String>,

    /// Tri-state: unknown, taxable, not taxable
    #[serde(default)]
    pub tax_applicable: Option<bool>,

    /// 64 lowercase hex characters
    pub checksum_sha256: String,

    pub device_id: String,
    pub capture_session_id: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub conflict: bool,

    #[serde(default)]
    pub supersedes_filename: Option<String>,

    #[serde(default)]
    pub sync_status: SyncStatus,

    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub indexed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub local_path: Option<String>,

    #[serde(default)]
    pub remote_path: Option<String>,

    #[serde(default)]
    pub expired: bool,
}

impl Receipt {
    /// Capture-local calendar day, if `captured_at` starts with a valid date.
    pub fn captured_day(&self) -> Option<NaiveDate> {
        calendar_day(&self.captured_at)
    }

    /// Check the filename grammar and that its date equals the captured day.
    pub fn validate_filename(&self) -> Result<()> {
        let parsed = parse_filename(&self.filename).ok_or_else(|| {
            SyncError::InvalidFilename(format!("{} does not match YYYY-MM-DD_N.jpg", self.filename))
        })?;

        let captured = self.captured_day().ok_or_else(|| {
            SyncError::InvalidFilename(format!(
                "captured_at {} has no calendar date",
                self.captured_at
            ))
        })?;

        if parsed.date != captured.format("%Y-%m-%d").to_string() {
            return Err(SyncError::InvalidFilename(format!(
                "{} is dated {} but was captured on {}",
                self.filename, parsed.date, captured
            )));
        }

        Ok(())
    }

    /// Build the correction record for this receipt.
    ///
    /// The original row is left untouched; the new one gets a fresh id, its
    /// own freshly-allocated filename, and `supersedes_filename` pointing at
    /// the file it replaces. Sync state starts over at [`SyncStatus::Local`].
    pub fn supersede(
        &self,
        receipt_id: impl Into<String>,
        filename: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let corrected = Self {
            receipt_id: receipt_id.into(),
            filename: filename.into(),
            supersedes_filename: Some(self.filename.clone()),
            created_at: now,
            updated_at: now,
            sync_status: SyncStatus::Local,
            uploaded_at: None,
            indexed_at: None,
            local_path: None,
            remote_path: None,
            conflict: false,
            ..self.clone()
        };

        if corrected.filename == self.filename {
            return Err(SyncError::InvalidFilename(format!(
                "correction must not reuse {}",
                self.filename
            )));
        }
        corrected.validate_filename()?;
        Ok(corrected)
    }
}
