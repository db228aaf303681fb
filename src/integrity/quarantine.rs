//! Quarantine log.
//!
//! Every quarantine appends one entry recording which alert triggered it and
//! where the file went. The log is bounded to the most recent entries.

use crate::error::{Result, ResultExt as _, io_error};
use crate::integrity::alert::AlertType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maximum number of entries kept in the log.
pub const MAX_LOG_ENTRIES: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuarantineEntry {
    pub timestamp: DateTime<Utc>,
    pub alert_type: AlertType,
    pub alert_id: String,
    pub source_path: String,
    pub destination_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuarantineLog {
    entries: Vec<QuarantineEntry>,
}

impl QuarantineLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: QuarantineEntry) {
        self.entries.push(entry);

        // Keep only last MAX_LOG_ENTRIES entries
        if self.entries.len() > MAX_LOG_ENTRIES {
            self.entries.drain(0..self.entries.len() - MAX_LOG_ENTRIES);
        }
    }

    pub fn entries(&self) -> &[QuarantineEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Load the log from `path`; a missing file yields an empty log.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read quarantine log from {}", path.display()))?;
        serde_json::from_str(&contents).context("Failed to parse quarantine log JSON")
    }

    /// Write the log to `path` through a temporary file and a rename, so a
    /// reader never sees a partially written log.
    pub async fn save(&self, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize quarantine log")?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| io_error(path, e))?;
        Ok(path.to_path_buf())
    }
}
