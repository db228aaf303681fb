//! Persistent configuration for receiptsync.
//!
//! Stored as JSON under the platform config directory. Missing fields fall back
//! to their defaults, so older config files keep loading after upgrades.

use crate::error::{Result, ResultExt as _, SyncError};
use crate::integrity::hasher::DEFAULT_CHUNK_SIZE;
use crate::sync::BackfillOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "receiptsync";

/// receiptsync configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    /// Root of the local day-folder tree that audits run against
    pub local_root: PathBuf,
    /// Directory mirroring the remote store
    pub remote_root: PathBuf,
    /// Local receipt ledger (JSON)
    pub store_path: PathBuf,
    /// Folder under `local_root` receiving quarantined files
    pub quarantine_dir_name: String,
    /// Per-day index filename
    pub index_filename: String,
    /// Read size used while hashing
    pub hash_chunk_size: usize,
    /// Master switch for uploads
    pub sync_enabled: bool,
    pub max_allocation_attempts: u32,
    pub update_remote_index: bool,
    pub max_parallel_folders: usize,
    /// Persisted alerts awaiting review
    pub alert_store_path: PathBuf,
    /// Persisted quarantine log
    pub quarantine_log_path: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            local_root: data_dir.join("local"),
            remote_root: data_dir.join("remote"),
            store_path: data_dir.join("receipts.json"),
            quarantine_dir_name: "_quarantine".to_owned(),
            index_filename: "index.json".to_owned(),
            hash_chunk_size: DEFAULT_CHUNK_SIZE,
            sync_enabled: true,
            max_allocation_attempts: 3,
            update_remote_index: true,
            max_parallel_folders: 1,
            alert_store_path: data_dir.join("alerts.json"),
            quarantine_log_path: data_dir.join("quarantine_log.json"),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

impl SyncConfig {
    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SyncError::Config("Failed to get config directory".to_owned()))?;
        Ok(config_dir.join(APP_DIR).join("config.json"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| SyncError::Config(format!("Failed to parse config JSON: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        Ok(())
    }

    /// Reject values that would make the services misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.hash_chunk_size == 0 {
            return Err(SyncError::Config("hash_chunk_size must be at least 1".to_owned()));
        }
        if self.max_allocation_attempts == 0 {
            return Err(SyncError::Config(
                "max_allocation_attempts must be at least 1".to_owned(),
            ));
        }
        if self.max_parallel_folders == 0 {
            return Err(SyncError::Config(
                "max_parallel_folders must be at least 1".to_owned(),
            ));
        }
        if self.index_filename.is_empty() || self.quarantine_dir_name.is_empty() {
            return Err(SyncError::Config(
                "index_filename and quarantine_dir_name must not be empty".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn backfill_options(&self) -> BackfillOptions {
        BackfillOptions {
            max_allocation_attempts: self.max_allocation_attempts,
            update_remote_index: self.update_remote_index,
            max_parallel_folders: self.max_parallel_folders,
        }
    }
}
