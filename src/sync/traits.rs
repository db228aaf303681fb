//! Collaborators consumed by the backfill uploader.

use crate::error::Result;
use crate::model::{DayIndex, Receipt};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Local ledger of captured receipts and their image files.
#[async_trait]
pub trait LocalReceiptStore: Send + Sync {
    /// Receipts whose status still needs a remote copy.
    async fn get_unsynced_receipts(&self) -> Result<Vec<Receipt>>;

    /// Local image path for a receipt, `None` if it has none on this device.
    async fn get_local_path(&self, receipt_id: &str) -> Result<Option<PathBuf>>;

    /// Record that the receipt lives at `remote_path` (`folder/filename`).
    async fn mark_synced(&self, receipt_id: &str, remote_path: &str) -> Result<()>;

    async fn get_file_size(&self, path: &Path) -> Result<u64>;

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Remote receipt storage organised in day folders.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Create `path` and any missing parents; succeeds if it already exists.
    async fn create_folder(&self, path: &str) -> Result<()>;

    /// File names directly inside `path`; empty if the folder does not exist.
    async fn list_files(&self, path: &str) -> Result<Vec<String>>;

    async fn upload_file(&self, path: &str, filename: &str, bytes: Vec<u8>) -> Result<()>;

    /// The folder's day index, `None` if it has none yet.
    async fn download_index(&self, path: &str) -> Result<Option<DayIndex>>;

    async fn upload_index(&self, path: &str, index: &DayIndex) -> Result<()>;
}

/// Decides whether remote traffic is allowed right now.
#[async_trait]
pub trait NetworkPolicy: Send + Sync {
    async fn can_sync(&self) -> bool;
}
