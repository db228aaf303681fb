//! JSON-file receipt ledger.
//!
//! The ledger is a single JSON document holding every receipt row. Relative
//! `local_path` values resolve against the ledger's directory. Every change is
//! written through to disk via a temporary file and an atomic rename.

use crate::error::{Result, ResultExt as _, SyncError, io_error};
use crate::model::{Receipt, SyncStatus};
use crate::sync::traits::LocalReceiptStore;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Ledger {
    #[serde(default)]
    receipts: Vec<Receipt>,
}

/// [`LocalReceiptStore`] persisted as one JSON file.
#[derive(Debug)]
pub struct JsonReceiptStore {
    path: PathBuf,
    base_dir: PathBuf,
    ledger: Mutex<Ledger>,
}

impl JsonReceiptStore {
    /// Open the ledger at `path`; a missing file starts an empty ledger.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let ledger = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                SyncError::Store(format!("Failed to parse ledger {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ledger::default(),
            Err(e) => return Err(io_error(&path, e)),
        };

        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Self {
            path,
            base_dir,
            ledger: Mutex::new(ledger),
        })
    }

    /// Add or replace a receipt row by id.
    pub async fn insert(&self, receipt: Receipt) -> Result<()> {
        let mut ledger = self.ledger.lock().await;
        match ledger
            .receipts
            .iter_mut()
            .find(|r| r.receipt_id == receipt.receipt_id)
        {
            Some(existing) => *existing = receipt,
            None => ledger.receipts.push(receipt),
        }
        self.persist(&ledger).await
    }

    /// Snapshot of every row.
    pub async fn receipts(&self) -> Vec<Receipt> {
        self.ledger.lock().await.receipts.clone()
    }

    async fn persist(&self, ledger: &Ledger) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        let json = serde_json::to_vec_pretty(ledger).context("Failed to serialize ledger")?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;
        Ok(())
    }
}

#[async_trait]
impl LocalReceiptStore for JsonReceiptStore {
    async fn get_unsynced_receipts(&self) -> Result<Vec<Receipt>> {
        let ledger = self.ledger.lock().await;
        Ok(ledger
            .receipts
            .iter()
            .filter(|r| r.sync_status.is_unsynced() && !r.expired)
            .cloned()
            .collect())
    }

    async fn get_local_path(&self, receipt_id: &str) -> Result<Option<PathBuf>> {
        let ledger = self.ledger.lock().await;
        let receipt = ledger
            .receipts
            .iter()
            .find(|r| r.receipt_id == receipt_id)
            .ok_or_else(|| SyncError::Store(format!("Unknown receipt {receipt_id}")))?;

        Ok(receipt.local_path.as_ref().map(|p| {
            let p = Path::new(p);
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                self.base_dir.join(p)
            }
        }))
    }

    async fn mark_synced(&self, receipt_id: &str, remote_path: &str) -> Result<()> {
        let mut ledger = self.ledger.lock().await;
        let receipt = ledger
            .receipts
            .iter_mut()
            .find(|r| r.receipt_id == receipt_id)
            .ok_or_else(|| SyncError::Store(format!("Unknown receipt {receipt_id}")))?;

        let now = Utc::now();
        receipt.sync_status = SyncStatus::Synced;
        receipt.remote_path = Some(remote_path.to_owned());
        receipt.uploaded_at = Some(now);
        receipt.updated_at = now;

        self.persist(&ledger).await
    }

    async fn get_file_size(&self, path: &Path) -> Result<u64> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| io_error(path, e))?;
        Ok(metadata.len())
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|e| io_error(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::receipt::tests::sample_receipt;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_missing_ledger_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonReceiptStore::open(temp_dir.path().join("receipts.json"))
            .await
            .unwrap();
        assert!(store.get_unsynced_receipts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_synced_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("receipts.json");
        let store = JsonReceiptStore::open(&path).await.unwrap();

        let mut receipt = sample_receipt("r-1", "2025-06-14T10:30:00", "2025-06-14_1.jpg");
        receipt.local_path = Some("images/r-1.jpg".to_owned());
        store.insert(receipt).await.unwrap();

        assert_eq!(
            store.get_local_path("r-1").await.unwrap(),
            Some(temp_dir.path().join("images/r-1.jpg"))
        );

        store
            .mark_synced("r-1", "Receipts/Canada/2025/2025-06/2025-06-14/2025-06-14_1.jpg")
            .await
            .unwrap();

        let reopened = JsonReceiptStore::open(&path).await.unwrap();
        assert!(reopened.get_unsynced_receipts().await.unwrap().is_empty());
        let rows = reopened.receipts().await;
        assert_eq!(rows[0].sync_status, SyncStatus::Synced);
        assert!(rows[0].uploaded_at.is_some());
    }

    #[tokio::test]
    async fn test_unknown_receipt_is_store_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonReceiptStore::open(temp_dir.path().join("receipts.json"))
            .await
            .unwrap();
        let err = store.mark_synced("nope", "x").await.unwrap_err();
        assert!(matches!(err, SyncError::Store(_)));
    }

    #[tokio::test]
    async fn test_expired_receipts_are_not_unsynced() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonReceiptStore::open(temp_dir.path().join("receipts.json"))
            .await
            .unwrap();
        let mut receipt = sample_receipt("r-1", "2025-06-14T10:30:00", "2025-06-14_1.jpg");
        receipt.expired = true;
        store.insert(receipt).await.unwrap();

        assert!(store.get_unsynced_receipts().await.unwrap().is_empty());
    }
}
