//! Backfill uploader.
//!
//! ## Processing order
//!
//! Unsynced receipts are sorted by `captured_at` ascending, ties broken by
//! `receipt_id` ascending, then grouped by destination day folder. Receipts
//! sharing a folder are always handled one after another, each re-reading the
//! folder listing and index so dedup and filename allocation see the uploads
//! that came before it. With one folder at a time (the default) folders are
//! visited in order of their earliest receipt; otherwise distinct folders run
//! concurrently up to [`BackfillOptions::max_parallel_folders`].
//!
//! ## Partial failure
//!
//! Once a file is uploaded the receipt is marked synced even if the day index
//! could not be written, so a rerun never stores the same bytes twice. The
//! auditor reports the unindexed file as an orphan.

use crate::error::{Result, SyncError};
use crate::integrity::fs::join_path;
use crate::model::{DayIndex, Receipt, ReceiptIndexEntry, destination_folder};
use crate::naming::FilenameAllocator;
use crate::sync::stats::BackfillStats;
use crate::sync::traits::{LocalReceiptStore, NetworkPolicy, RemoteStorage};
use chrono::{NaiveDate, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

/// Tuning knobs for a backfill run.
#[derive(Debug, Clone, Copy)]
pub struct BackfillOptions {
    /// Allocation retries when a filename is taken concurrently
    pub max_allocation_attempts: u32,
    /// Upsert the uploaded receipt into the remote day index
    pub update_remote_index: bool,
    /// Day folders processed at the same time
    pub max_parallel_folders: usize,
}

impl Default for BackfillOptions {
    fn default() -> Self {
        Self {
            max_allocation_attempts: 3,
            update_remote_index: true,
            max_parallel_folders: 1,
        }
    }
}

/// How a single receipt ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    AlreadySynced,
    Uploaded,
}

/// A receipt ready for remote processing.
struct Pending {
    receipt: Receipt,
    day: NaiveDate,
    local_path: PathBuf,
}

/// Collaborators shared with per-folder tasks.
#[derive(Clone)]
struct Worker {
    store: Arc<dyn LocalReceiptStore>,
    remote: Arc<dyn RemoteStorage>,
    allocator: FilenameAllocator,
    update_remote_index: bool,
}

/// Uploads unsynced local receipts to remote storage exactly once.
///
/// One uploader per local store: [`Self::run`] is single-flight, guarded by
/// an async mutex that is released when the run future completes or is
/// dropped.
pub struct BackfillUploader {
    worker: Worker,
    policy: Arc<dyn NetworkPolicy>,
    max_parallel_folders: usize,
    run_lock: Arc<Mutex<()>>,
}

impl BackfillUploader {
    pub fn new(
        store: Arc<dyn LocalReceiptStore>,
        remote: Arc<dyn RemoteStorage>,
        policy: Arc<dyn NetworkPolicy>,
        options: BackfillOptions,
    ) -> Self {
        Self {
            worker: Worker {
                store,
                remote,
                allocator: FilenameAllocator::new(options.max_allocation_attempts),
                update_remote_index: options.update_remote_index,
            },
            policy,
            max_parallel_folders: options.max_parallel_folders.max(1),
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Count and size the unsynced receipts without touching the network.
    ///
    /// Receipts without a local file still count but add no bytes.
    pub async fn calculate_stats(&self) -> Result<BackfillStats> {
        let receipts = self.worker.store.get_unsynced_receipts().await?;
        let mut total_size_bytes = 0;
        for receipt in &receipts {
            total_size_bytes += self.local_size(&receipt.receipt_id).await?;
        }

        Ok(BackfillStats {
            receipt_count: receipts.len(),
            total_size_bytes,
            ..Default::default()
        })
    }

    /// Run a backfill, waiting for any run already in flight to finish.
    ///
    /// # Errors
    ///
    /// Only failing to read the unsynced receipt list is an error. Per-receipt
    /// failures are counted in [`BackfillStats::error_count`].
    pub async fn run(&self) -> Result<BackfillStats> {
        let _guard = self.run_lock.lock().await;
        self.run_exclusive().await
    }

    /// Like [`Self::run`], but fails with [`SyncError::AlreadyRunning`]
    /// instead of waiting.
    pub async fn try_run(&self) -> Result<BackfillStats> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| SyncError::AlreadyRunning)?;
        self.run_exclusive().await
    }

    async fn local_size(&self, receipt_id: &str) -> Result<u64> {
        let Some(path) = self.worker.store.get_local_path(receipt_id).await? else {
            return Ok(0);
        };
        match self.worker.store.get_file_size(&path).await {
            Ok(size) => Ok(size),
            Err(e) if e.is_not_found() => Ok(0),
            Err(e) => Err(e),
        }
    }

    async fn run_exclusive(&self) -> Result<BackfillStats> {
        let mut receipts = self.worker.store.get_unsynced_receipts().await?;

        if !self.policy.can_sync().await {
            let mut stats = BackfillStats {
                receipt_count: receipts.len(),
                skipped_count: receipts.len(),
                ..Default::default()
            };
            for receipt in &receipts {
                stats.total_size_bytes += self.local_size(&receipt.receipt_id).await.unwrap_or(0);
            }
            tracing::info!("Backfill skipped, network policy disallows sync: {}", stats);
            return Ok(stats);
        }

        let mut stats = BackfillStats {
            receipt_count: receipts.len(),
            ..Default::default()
        };

        receipts.sort_by(|a, b| {
            a.captured_at
                .cmp(&b.captured_at)
                .then_with(|| a.receipt_id.cmp(&b.receipt_id))
        });

        // Folders in order of their earliest receipt
        let mut folders: Vec<(String, Vec<Pending>)> = Vec::new();
        for receipt in receipts {
            let local_path = match self.worker.store.get_local_path(&receipt.receipt_id).await {
                Ok(Some(path)) => path,
                Ok(None) => {
                    tracing::debug!("Receipt {} has no local file, skipping", receipt.receipt_id);
                    stats.skipped_count += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Failed to resolve local path of {}: {}", receipt.receipt_id, e);
                    stats.error_count += 1;
                    continue;
                }
            };

            match self.worker.store.get_file_size(&local_path).await {
                Ok(size) => stats.total_size_bytes += size,
                Err(e) if e.is_not_found() => {
                    tracing::debug!(
                        "Local file of {} is missing, skipping",
                        receipt.receipt_id
                    );
                    stats.skipped_count += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Failed to stat {}: {}", local_path.display(), e);
                    stats.error_count += 1;
                    continue;
                }
            }

            let Some(day) = receipt.captured_day() else {
                tracing::warn!(
                    "Receipt {} has unparseable captured_at {}",
                    receipt.receipt_id,
                    receipt.captured_at
                );
                stats.error_count += 1;
                continue;
            };

            let folder = destination_folder(day, &receipt.country);
            let item = Pending {
                receipt,
                day,
                local_path,
            };
            match folders.iter_mut().find(|(f, _)| *f == folder) {
                Some((_, pending)) => pending.push(item),
                None => folders.push((folder, vec![item])),
            }
        }

        if self.max_parallel_folders == 1 {
            for (folder, pending) in folders {
                stats += self.worker.process_folder(&folder, pending).await;
            }
            tracing::info!("Backfill complete: {}", stats);
            return Ok(stats);
        }

        let semaphore = Arc::new(Semaphore::new(self.max_parallel_folders));
        let mut tasks = JoinSet::new();
        for (folder, pending) in folders {
            let worker = self.worker.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                worker.process_folder(&folder, pending).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(folder_stats) => stats += folder_stats,
                Err(e) => {
                    tracing::error!("Backfill folder task failed: {}", e);
                    stats.error_count += 1;
                }
            }
        }

        tracing::info!("Backfill complete: {}", stats);
        Ok(stats)
    }
}

impl Worker {
    async fn process_folder(&self, folder: &str, pending: Vec<Pending>) -> BackfillStats {
        let mut stats = BackfillStats::default();
        for item in pending {
            match self.process_receipt(folder, &item).await {
                Ok(Outcome::AlreadySynced) => stats.already_synced_count += 1,
                Ok(Outcome::Uploaded) => stats.uploaded_count += 1,
                Err(e) => {
                    tracing::warn!("Backfill of {} failed: {}", item.receipt.receipt_id, e);
                    stats.error_count += 1;
                }
            }
        }
        stats
    }

    async fn process_receipt(&self, folder: &str, item: &Pending) -> Result<Outcome> {
        let receipt = &item.receipt;
        let listing = self.remote.list_files(folder).await?;
        let index = self.remote.download_index(folder).await?;

        if let Some(existing) = index.as_ref().and_then(|i| find_duplicate(i, receipt, item.day)) {
            let remote_path = join_path(folder, &existing.filename);
            self.store
                .mark_synced(&receipt.receipt_id, &remote_path)
                .await?;
            tracing::debug!("Receipt {} already at {}", receipt.receipt_id, remote_path);
            return Ok(Outcome::AlreadySynced);
        }

        self.remote.create_folder(folder).await?;

        let date = item.day.format("%Y-%m-%d").to_string();
        let filename = self
            .allocator
            .allocate_checked(&date, listing, || self.remote.list_files(folder))
            .await?;

        let bytes = self.store.read_file(&item.local_path).await?;
        self.remote.upload_file(folder, &filename, bytes).await?;

        if self.update_remote_index {
            let now = Utc::now();
            let mut index = index.unwrap_or_else(|| DayIndex::new(date.clone(), now));
            index.upsert(ReceiptIndexEntry::from_receipt(receipt, filename.clone()), now);
            // The bytes are stored; an index miss surfaces later as an orphan file
            if let Err(e) = self.remote.upload_index(folder, &index).await {
                tracing::warn!(
                    "Index update for {} in {} failed, file kept as {}: {}",
                    receipt.receipt_id,
                    folder,
                    filename,
                    e
                );
            }
        }

        let remote_path = join_path(folder, &filename);
        self.store
            .mark_synced(&receipt.receipt_id, &remote_path)
            .await?;
        tracing::debug!("Uploaded {} to {}", receipt.receipt_id, remote_path);
        Ok(Outcome::Uploaded)
    }
}

/// Remote entry already representing `receipt`, by id first, then by content.
fn find_duplicate<'a>(
    index: &'a DayIndex,
    receipt: &Receipt,
    day: NaiveDate,
) -> Option<&'a ReceiptIndexEntry> {
    index.entry_by_id(&receipt.receipt_id).or_else(|| {
        index.receipts.iter().find(|entry| {
            entry
                .checksum_sha256
                .eq_ignore_ascii_case(&receipt.checksum_sha256)
                && entry.captured_day() == Some(day)
        })
    })
}
