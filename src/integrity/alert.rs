//! Integrity alerts and their review store.

use crate::error::{Result, ResultExt as _, SyncError};
use crate::integrity::auditor::AuditReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Kind of discrepancy found during an audit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum AlertType {
    /// File on disk with no index entry
    OrphanFile,
    /// Index entry with no file on disk
    OrphanEntry,
    /// `.jpg` not following `YYYY-MM-DD_N.jpg`
    InvalidFilename,
    /// File dated differently from its day folder
    FolderMismatch,
    /// Recomputed digest differs from the indexed one
    ChecksumMismatch,
    /// File type that never belongs in a day folder
    UnexpectedFile,
}

impl AlertType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OrphanFile => "orphanFile",
            Self::OrphanEntry => "orphanEntry",
            Self::InvalidFilename => "invalidFilename",
            Self::FolderMismatch => "folderMismatch",
            Self::ChecksumMismatch => "checksumMismatch",
            Self::UnexpectedFile => "unexpectedFile",
        }
    }

    /// Suggested follow-up shown to the reviewer.
    pub fn recommended_action(self) -> &'static str {
        match self {
            Self::OrphanFile => "Add an index entry for this file or quarantine it",
            Self::OrphanEntry => "Restore the missing file from backup or remove the index entry",
            Self::InvalidFilename => "Quarantine the file and re-import it under an allocated name",
            Self::FolderMismatch => "Quarantine the file and re-import it into its dated folder",
            Self::ChecksumMismatch => "Restore the original file from backup or quarantine it",
            Self::UnexpectedFile => "Move the file out of the receipts tree or quarantine it",
        }
    }

    /// Whether the alert points at a file that exists on disk.
    pub fn has_file(self) -> bool {
        !matches!(self, Self::OrphanEntry)
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point-in-time integrity finding.
///
/// A new scan always produces new alerts; `dismissed` and `quarantined` are
/// review flags set later by the reviewer, never by the scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntegrityAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub path: String,
    pub description: String,
    pub recommended_action: String,
    pub detected_at: DateTime<Utc>,
    #[serde(default)]
    pub dismissed: bool,
    #[serde(default)]
    pub quarantined: bool,
}

impl IntegrityAlert {
    pub fn new(
        alert_type: AlertType,
        path: impl Into<String>,
        description: impl Into<String>,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            alert_type,
            path: path.into(),
            description: description.into(),
            recommended_action: alert_type.recommended_action().to_owned(),
            detected_at,
            dismissed: false,
            quarantined: false,
        }
    }

    /// Still awaiting a reviewer decision.
    pub fn is_open(&self) -> bool {
        !self.dismissed && !self.quarantined
    }
}

/// Persisted alerts awaiting review, keyed by day folder.
///
/// Each folder keeps only its latest report: recording a new scan replaces
/// the previous one wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertStore {
    #[serde(default)]
    reports: BTreeMap<String, AuditReport>,

    #[serde(skip)]
    path: PathBuf,
}

impl AlertStore {
    /// Load the store from `path`; a missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                reports: BTreeMap::new(),
                path: path.to_path_buf(),
            });
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read alert store from {}", path.display()))?;

        let mut store: Self =
            serde_json::from_str(&contents).context("Failed to parse alert store JSON")?;
        store.path = path.to_path_buf();
        Ok(store)
    }

    /// Save the store back to the path it was loaded from.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create alert store directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize alerts")?;

        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write alert store to {}", self.path.display()))?;

        Ok(())
    }

    /// Replace the stored report for the report's folder.
    ///
    /// `a/b` and `a/b/` name the same folder.
    pub fn record(&mut self, mut report: AuditReport) {
        let trimmed = report.folder.trim_end_matches('/').len();
        report.folder.truncate(trimmed);
        self.reports.insert(report.folder.clone(), report);
    }

    pub fn reports(&self) -> impl Iterator<Item = &AuditReport> {
        self.reports.values()
    }

    /// Every stored alert, open or not, folder by folder.
    pub fn alerts(&self) -> impl Iterator<Item = &IntegrityAlert> {
        self.reports.values().flat_map(|r| r.alerts.iter())
    }

    pub fn open_alerts(&self) -> impl Iterator<Item = &IntegrityAlert> {
        self.alerts().filter(|a| a.is_open())
    }

    pub fn get(&self, id: &str) -> Option<&IntegrityAlert> {
        self.alerts().find(|a| a.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut IntegrityAlert> {
        self.reports
            .values_mut()
            .flat_map(|r| r.alerts.iter_mut())
            .find(|a| a.id == id)
            .ok_or_else(|| SyncError::AlertNotFound(id.to_owned()))
    }

    pub fn dismiss(&mut self, id: &str) -> Result<()> {
        self.get_mut(id)?.dismissed = true;
        Ok(())
    }

    pub fn mark_quarantined(&mut self, id: &str) -> Result<()> {
        self.get_mut(id)?.quarantined = true;
        Ok(())
    }
}
