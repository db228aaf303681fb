//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use receiptsync::error::{Result, SyncError};
use receiptsync::integrity::{AuditFileSystem, AuditIndexReader, ChecksumService};
use receiptsync::model::{DayIndex, Receipt, ReceiptIndexEntry, SyncStatus};
use receiptsync::sync::{LocalReceiptStore, NetworkPolicy, RemoteStorage};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const DAY: &str = "2025-06-14";
pub const CANADA_DAY_FOLDER: &str = "Receipts/Canada/2025/2025-06/2025-06-14";

pub fn receipt(id: &str, captured_at: &str, bytes: &[u8]) -> Receipt {
    let created: DateTime<Utc> = "2025-06-14T18:00:00Z".parse().unwrap();
    let date = captured_at.get(..10).unwrap();
    Receipt {
        receipt_id: id.to_owned(),
        captured_at: captured_at.to_owned(),
        timezone: "America/Toronto".to_owned(),
        filename: format!("{date}_1.jpg"),
        amount_tracked: Decimal::new(1250, 2),
        currency_code: "CAD".to_owned(),
        country: "canada".to_owned(),
        region: "ON".to_owned(),
        category: "Meals".to_owned(),
        notes: None,
        tax_applicable: None,
        checksum_sha256: ChecksumService::compute_checksum(bytes),
        device_id: "device-1".to_owned(),
        capture_session_id: "session-1".to_owned(),
        source: "camera".to_owned(),
        created_at: created,
        updated_at: created,
        conflict: false,
        supersedes_filename: None,
        sync_status: SyncStatus::Local,
        uploaded_at: None,
        indexed_at: None,
        local_path: Some(format!("/local/{id}.jpg")),
        remote_path: None,
        expired: false,
    }
}

pub fn index_entry(receipt: &Receipt, filename: &str) -> ReceiptIndexEntry {
    ReceiptIndexEntry::from_receipt(receipt, filename)
}

/// Consume one pending injected fault, if any are left.
fn take_one(pending: &AtomicUsize) -> bool {
    pending
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Local store keeping receipts and image bytes in memory.
#[derive(Default)]
pub struct MemoryStore {
    receipts: Mutex<Vec<Receipt>>,
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    pub synced: Mutex<Vec<(String, String)>>,
    /// `mark_synced` calls still to fail
    pub fail_mark_synced: AtomicUsize,
}

impl MemoryStore {
    /// Add a receipt with its image bytes at its `local_path`.
    pub fn add(&self, receipt: Receipt, bytes: &[u8]) {
        if let Some(path) = &receipt.local_path {
            self.files
                .lock()
                .unwrap()
                .insert(PathBuf::from(path), bytes.to_vec());
        }
        self.receipts.lock().unwrap().push(receipt);
    }

    /// Add a receipt whose image is not present locally.
    pub fn add_without_file(&self, receipt: Receipt) {
        self.receipts.lock().unwrap().push(receipt);
    }

    pub fn remote_path(&self, id: &str) -> Option<String> {
        self.synced
            .lock()
            .unwrap()
            .iter()
            .find(|(rid, _)| rid == id)
            .map(|(_, path)| path.clone())
    }
}

#[async_trait]
impl LocalReceiptStore for MemoryStore {
    async fn get_unsynced_receipts(&self) -> Result<Vec<Receipt>> {
        Ok(self
            .receipts
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.sync_status.is_unsynced())
            .cloned()
            .collect())
    }

    async fn get_local_path(&self, receipt_id: &str) -> Result<Option<PathBuf>> {
        let receipts = self.receipts.lock().unwrap();
        let receipt = receipts
            .iter()
            .find(|r| r.receipt_id == receipt_id)
            .ok_or_else(|| SyncError::Store(format!("Unknown receipt {receipt_id}")))?;
        Ok(receipt.local_path.as_ref().map(PathBuf::from))
    }

    async fn mark_synced(&self, receipt_id: &str, remote_path: &str) -> Result<()> {
        if take_one(&self.fail_mark_synced) {
            return Err(SyncError::Store("ledger write failed".to_owned()));
        }
        let mut receipts = self.receipts.lock().unwrap();
        let receipt = receipts
            .iter_mut()
            .find(|r| r.receipt_id == receipt_id)
            .ok_or_else(|| SyncError::Store(format!("Unknown receipt {receipt_id}")))?;
        receipt.sync_status = SyncStatus::Synced;
        receipt.remote_path = Some(remote_path.to_owned());
        self.synced
            .lock()
            .unwrap()
            .push((receipt_id.to_owned(), remote_path.to_owned()));
        Ok(())
    }

    async fn get_file_size(&self, path: &Path) -> Result<u64> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|bytes| bytes.len() as u64)
            .ok_or_else(|| SyncError::NotFound(path.to_path_buf()))
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(path.to_path_buf()))
    }
}

/// Remote storage in memory, counting every call.
#[derive(Default)]
pub struct MemoryRemote {
    files: Mutex<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
    indexes: Mutex<HashMap<String, DayIndex>>,
    corrupt: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
    pub uploads: AtomicUsize,
    /// Listings still to be answered as if the folder were empty
    pub stale_listings: AtomicUsize,
    pub fail_uploads: AtomicBool,
    /// `upload_index` calls still to fail
    pub fail_index_uploads: AtomicUsize,
}

impl MemoryRemote {
    pub fn put_file(&self, folder: &str, name: &str, bytes: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .entry(folder.to_owned())
            .or_default()
            .insert(name.to_owned(), bytes.to_vec());
    }

    pub fn put_index(&self, folder: &str, index: DayIndex) {
        self.indexes.lock().unwrap().insert(folder.to_owned(), index);
    }

    pub fn mark_index_corrupt(&self, folder: &str) {
        self.corrupt.lock().unwrap().push(folder.to_owned());
    }

    pub fn file(&self, folder: &str, name: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(folder)
            .and_then(|f| f.get(name).cloned())
    }

    pub fn names(&self, folder: &str) -> Vec<String> {
        self.files
            .lock()
            .unwrap()
            .get(folder)
            .map(|f| f.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn index(&self, folder: &str) -> Option<DayIndex> {
        self.indexes.lock().unwrap().get(folder).cloned()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteStorage for MemoryRemote {
    async fn create_folder(&self, path: &str) -> Result<()> {
        self.touch();
        self.files
            .lock()
            .unwrap()
            .entry(path.to_owned())
            .or_default();
        Ok(())
    }

    async fn list_files(&self, path: &str) -> Result<Vec<String>> {
        self.touch();
        if take_one(&self.stale_listings) {
            return Ok(Vec::new());
        }
        Ok(self.names(path))
    }

    async fn upload_file(&self, path: &str, filename: &str, bytes: Vec<u8>) -> Result<()> {
        self.touch();
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(SyncError::Remote("upload rejected".to_owned()));
        }

        let mut files = self.files.lock().unwrap();
        let folder = files.entry(path.to_owned()).or_default();
        if folder.contains_key(filename) {
            return Err(SyncError::Remote(format!("{path}/{filename} already exists")));
        }
        folder.insert(filename.to_owned(), bytes);
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn download_index(&self, path: &str) -> Result<Option<DayIndex>> {
        self.touch();
        if self.corrupt.lock().unwrap().iter().any(|f| f == path) {
            return Err(SyncError::IndexCorrupt {
                path: PathBuf::from(path),
                reason: "expected value at line 1 column 1".to_owned(),
            });
        }
        Ok(self.indexes.lock().unwrap().get(path).cloned())
    }

    async fn upload_index(&self, path: &str, index: &DayIndex) -> Result<()> {
        self.touch();
        if take_one(&self.fail_index_uploads) {
            return Err(SyncError::Remote(format!("{path} index write rejected")));
        }
        self.indexes
            .lock()
            .unwrap()
            .insert(path.to_owned(), index.clone());
        Ok(())
    }
}

/// Network policy with a fixed answer, counting queries.
pub struct StaticPolicy {
    allow: bool,
    pub calls: AtomicUsize,
}

impl StaticPolicy {
    pub fn new(allow: bool) -> Self {
        Self {
            allow,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkPolicy for StaticPolicy {
    async fn can_sync(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.allow
    }
}

/// Network policy that parks each query until released.
#[derive(Default)]
pub struct GatedPolicy {
    pub entered: tokio::sync::Notify,
    pub release: tokio::sync::Notify,
}

#[async_trait]
impl NetworkPolicy for GatedPolicy {
    async fn can_sync(&self) -> bool {
        self.entered.notify_one();
        self.release.notified().await;
        true
    }
}

/// Audit filesystem over in-memory folders, recording quarantine calls.
#[derive(Default)]
pub struct MemoryAuditFs {
    folders: Mutex<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
    pub quarantined: Mutex<Vec<String>>,
    pub fail_listing: AtomicBool,
}

impl MemoryAuditFs {
    pub fn put(&self, folder: &str, name: &str, bytes: &[u8]) {
        self.folders
            .lock()
            .unwrap()
            .entry(folder.to_owned())
            .or_default()
            .insert(name.to_owned(), bytes.to_vec());
    }

    fn split(path: &str) -> (&str, &str) {
        path.rsplit_once('/').unwrap_or(("", path))
    }
}

#[async_trait]
impl AuditFileSystem for MemoryAuditFs {
    async fn list_day_folder_files(&self, folder: &str) -> Result<Vec<String>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(SyncError::Io(std::io::Error::other("disk went away")));
        }
        self.folders
            .lock()
            .unwrap()
            .get(folder)
            .map(|f| f.keys().cloned().collect())
            .ok_or_else(|| SyncError::NotFound(PathBuf::from(folder)))
    }

    async fn compute_checksum(&self, path: &str) -> Result<String> {
        let (folder, name) = Self::split(path);
        self.folders
            .lock()
            .unwrap()
            .get(folder)
            .and_then(|f| f.get(name))
            .map(|bytes| ChecksumService::compute_checksum(bytes))
            .ok_or_else(|| SyncError::NotFound(PathBuf::from(path)))
    }

    async fn file_exists(&self, path: &str) -> Result<bool> {
        let (folder, name) = Self::split(path);
        Ok(self
            .folders
            .lock()
            .unwrap()
            .get(folder)
            .is_some_and(|f| f.contains_key(name)))
    }

    async fn quarantine_file(&self, path: &str) -> Result<String> {
        let (folder, name) = Self::split(path);
        let bytes = self
            .folders
            .lock()
            .unwrap()
            .get_mut(folder)
            .and_then(|f| f.remove(name))
            .ok_or_else(|| SyncError::NotFound(PathBuf::from(path)))?;
        let destination = format!("_quarantine/{name}");
        self.put("_quarantine", name, &bytes);
        self.quarantined.lock().unwrap().push(path.to_owned());
        Ok(destination)
    }
}

/// Index reader over in-memory day indexes.
#[derive(Default)]
pub struct MemoryIndexReader {
    indexes: Mutex<HashMap<String, DayIndex>>,
}

impl MemoryIndexReader {
    pub fn put(&self, folder: &str, index: DayIndex) {
        self.indexes.lock().unwrap().insert(folder.to_owned(), index);
    }
}

#[async_trait]
impl AuditIndexReader for MemoryIndexReader {
    async fn read_day_index(&self, folder: &str) -> Result<Option<DayIndex>> {
        Ok(self.indexes.lock().unwrap().get(folder).cloned())
    }
}
