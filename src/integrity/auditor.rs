//! Day folder reconciliation.

use crate::error::{Result, SyncError};
use crate::integrity::alert::{AlertType, IntegrityAlert};
use crate::integrity::fs::{AuditFileSystem, AuditIndexReader, join_path};
use crate::integrity::quarantine::{QuarantineEntry, QuarantineLog};
use crate::model::folder::folder_day_segment;
use crate::naming::is_valid_filename;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Outcome of one complete audit pass over a day folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub folder: String,
    pub scanned_at: DateTime<Utc>,
    /// Files examined, index file excluded
    pub files_scanned: usize,
    pub alerts: Vec<IntegrityAlert>,
}

impl AuditReport {
    pub fn count(&self, alert_type: AlertType) -> usize {
        self.alerts
            .iter()
            .filter(|a| a.alert_type == alert_type)
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.alerts.is_empty()
    }
}

/// Audits day folders against their day index.
///
/// Holds no per-folder state between calls, so passes over different folders
/// may run concurrently.
pub struct IntegrityAuditor {
    fs: Arc<dyn AuditFileSystem>,
    index_reader: Arc<dyn AuditIndexReader>,
    index_filename: String,
    log: Mutex<QuarantineLog>,
    log_path: Option<PathBuf>,
}

impl IntegrityAuditor {
    pub fn new(
        fs: Arc<dyn AuditFileSystem>,
        index_reader: Arc<dyn AuditIndexReader>,
        index_filename: impl Into<String>,
    ) -> Self {
        Self {
            fs,
            index_reader,
            index_filename: index_filename.into(),
            log: Mutex::new(QuarantineLog::new()),
            log_path: None,
        }
    }

    /// Persist quarantine entries to `path`, continuing any log already there.
    pub fn with_quarantine_log(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        self.log = Mutex::new(QuarantineLog::load(&path)?);
        self.log_path = Some(path);
        Ok(self)
    }

    /// Snapshot of the quarantine log.
    pub async fn quarantine_log(&self) -> QuarantineLog {
        self.log.lock().await.clone()
    }

    /// Run one read-only pass over `folder`.
    ///
    /// # Errors
    ///
    /// Any failure listing the folder, reading the index, or hashing a file
    /// aborts the pass; no partial report is returned.
    pub async fn audit_day_folder(&self, folder: &str) -> Result<AuditReport> {
        let scanned_at = Utc::now();
        let files = self.fs.list_day_folder_files(folder).await?;
        let index = self.index_reader.read_day_index(folder).await?;
        let folder_day = folder_day_segment(folder);

        let mut alerts = Vec::new();
        let mut files_scanned = 0;

        for name in files.iter().filter(|n| **n != self.index_filename) {
            files_scanned += 1;
            let path = join_path(folder, name);

            let extension = name
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_ascii_lowercase())
                .unwrap_or_default();

            match extension.as_str() {
                "json" => continue,
                "jpg" => {}
                _ => {
                    alerts.push(IntegrityAlert::new(
                        AlertType::UnexpectedFile,
                        path,
                        format!("{name} is not a receipt image or index file"),
                        scanned_at,
                    ));
                    continue;
                }
            }

            if !is_valid_filename(name) {
                alerts.push(IntegrityAlert::new(
                    AlertType::InvalidFilename,
                    path,
                    format!("{name} does not match YYYY-MM-DD_N.jpg"),
                    scanned_at,
                ));
                continue;
            }

            if !index.as_ref().is_some_and(|i| i.contains_filename(name)) {
                alerts.push(IntegrityAlert::new(
                    AlertType::OrphanFile,
                    path.clone(),
                    format!("{name} has no entry in the day index"),
                    scanned_at,
                ));
            }

            let file_day = name.get(..10).unwrap_or_default();
            if folder_day != Some(file_day) {
                alerts.push(IntegrityAlert::new(
                    AlertType::FolderMismatch,
                    path,
                    format!(
                        "{name} is dated {file_day} but sits in folder dated {}",
                        folder_day.unwrap_or("(none)")
                    ),
                    scanned_at,
                ));
            }
        }

        if let Some(index) = &index {
            let on_disk: BTreeSet<&str> = files.iter().map(String::as_str).collect();

            for entry in &index.receipts {
                let path = join_path(folder, &entry.filename);

                if !on_disk.contains(entry.filename.as_str()) {
                    alerts.push(IntegrityAlert::new(
                        AlertType::OrphanEntry,
                        path,
                        format!(
                            "Index entry {} references missing file {}",
                            entry.receipt_id, entry.filename
                        ),
                        scanned_at,
                    ));
                    continue;
                }

                let actual = self.fs.compute_checksum(&path).await?;
                if !actual.eq_ignore_ascii_case(&entry.checksum_sha256) {
                    alerts.push(IntegrityAlert::new(
                        AlertType::ChecksumMismatch,
                        path,
                        format!(
                            "{} checksum mismatch: expected {}, actual {}",
                            entry.filename, entry.checksum_sha256, actual
                        ),
                        scanned_at,
                    ));
                }
            }
        }

        tracing::info!(
            "Audited {}: {} files, {} alerts",
            folder,
            files_scanned,
            alerts.len()
        );

        Ok(AuditReport {
            folder: folder.to_owned(),
            scanned_at,
            files_scanned,
            alerts,
        })
    }

    /// Move the file behind `alert` into quarantine and log the move.
    ///
    /// This is the only mutating operation of the auditor. It targets exactly
    /// one file. Quarantining the same alert twice fails with `NotFound`
    /// because the file is already gone.
    pub async fn quarantine(&self, alert: &IntegrityAlert) -> Result<QuarantineEntry> {
        if !alert.alert_type.has_file() {
            return Err(SyncError::InvalidPath(format!(
                "{} alert {} has no file to quarantine",
                alert.alert_type, alert.id
            )));
        }

        if !self.fs.file_exists(&alert.path).await? {
            return Err(SyncError::NotFound(PathBuf::from(&alert.path)));
        }

        let destination = self.fs.quarantine_file(&alert.path).await?;

        let entry = QuarantineEntry {
            timestamp: Utc::now(),
            alert_type: alert.alert_type,
            alert_id: alert.id.clone(),
            source_path: alert.path.clone(),
            destination_path: destination,
        };

        tracing::warn!(
            "Quarantined {} ({} alert {}) -> {}",
            entry.source_path,
            entry.alert_type,
            entry.alert_id,
            entry.destination_path
        );

        // Held across the save so concurrent quarantines persist in order
        let mut log = self.log.lock().await;
        log.push(entry.clone());
        if let Some(path) = &self.log_path {
            log.save(path).await?;
        }

        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity::fs::{JsonIndexReader, LocalAuditFileSystem};
    use crate::integrity::hasher::ChecksumService;
    use crate::model::{DayIndex, ReceiptIndexEntry};
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    const DAY: &str = "Receipts/Canada/2025/2025-06/2025-06-14";

    struct Fixture {
        temp_dir: TempDir,
        auditor: IntegrityAuditor,
    }

    impl Fixture {
        fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            std::fs::create_dir_all(temp_dir.path().join(DAY)).unwrap();
            let fs = Arc::new(LocalAuditFileSystem::new(
                temp_dir.path(),
                "_quarantine",
                ChecksumService::default(),
            ));
            let reader = Arc::new(JsonIndexReader::new(temp_dir.path(), "index.json"));
            let auditor = IntegrityAuditor::new(fs, reader, "index.json");
            Self { temp_dir, auditor }
        }

        fn write(&self, name: &str, bytes: &[u8]) {
            std::fs::write(self.temp_dir.path().join(DAY).join(name), bytes).unwrap();
        }

        fn write_index(&self, entries: &[(&str, &str)]) {
            let mut index = DayIndex::new("2025-06-14", Utc::now());
            for (i, (filename, checksum)) in entries.iter().enumerate() {
                index.receipts.push(ReceiptIndexEntry {
                    receipt_id: format!("r-{i}"),
                    filename: (*filename).to_owned(),
                    amount_tracked: Decimal::new(1250, 2),
                    currency_code: "CAD".to_owned(),
                    category: "Meals".to_owned(),
                    checksum_sha256: (*checksum).to_owned(),
                    captured_at: "2025-06-14T10:30:00".to_owned(),
                    updated_at: Utc::now(),
                });
            }
            self.write("index.json", index.to_json().unwrap().as_bytes());
        }
    }

    fn sha(bytes: &[u8]) -> String {
        ChecksumService::compute_checksum(bytes)
    }

    #[tokio::test]
    async fn test_clean_folder() {
        let fx = Fixture::new();
        fx.write("2025-06-14_1.jpg", b"one");
        fx.write_index(&[("2025-06-14_1.jpg", &sha(b"one"))]);

        let report = fx.auditor.audit_day_folder(DAY).await.unwrap();
        assert!(report.is_clean(), "unexpected alerts: {:?}", report.alerts);
        assert_eq!(report.files_scanned, 1);
    }

    #[tokio::test]
    async fn test_orphan_file() {
        let fx = Fixture::new();
        fx.write("2025-06-14_1.jpg", b"one");
        fx.write("2025-06-14_2.jpg", b"two");
        fx.write_index(&[("2025-06-14_1.jpg", &sha(b"one"))]);

        let report = fx.auditor.audit_day_folder(DAY).await.unwrap();
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].alert_type, AlertType::OrphanFile);
        assert!(report.alerts[0].path.ends_with("2025-06-14_2.jpg"));
    }

    #[tokio::test]
    async fn test_checksum_mismatch_mentions_both_digests() {
        let fx = Fixture::new();
        fx.write("2025-06-14_1.jpg", b"tampered");
        let expected = sha(b"original");
        fx.write_index(&[("2025-06-14_1.jpg", &expected)]);

        let report = fx.auditor.audit_day_folder(DAY).await.unwrap();
        assert_eq!(report.count(AlertType::ChecksumMismatch), 1);
        let description = &report.alerts[0].description;
        assert!(description.contains(&expected));
        assert!(description.contains(&sha(b"tampered")));
    }

    #[tokio::test]
    async fn test_audit_never_mutates() {
        let fx = Fixture::new();
        fx.write("notes.txt", b"x");
        fx.write("bad_filename.jpg", b"x");

        let report = fx.auditor.audit_day_folder(DAY).await.unwrap();
        assert_eq!(report.alerts.len(), 2);
        assert!(fx.temp_dir.path().join(DAY).join("notes.txt").exists());
        assert!(fx.temp_dir.path().join(DAY).join("bad_filename.jpg").exists());
        assert!(fx.auditor.quarantine_log().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_index_aborts_pass() {
        let fx = Fixture::new();
        fx.write("2025-06-14_1.jpg", b"one");
        fx.write("index.json", b"{ invalid json }");

        let err = fx.auditor.audit_day_folder(DAY).await.unwrap_err();
        assert!(matches!(err, SyncError::IndexCorrupt { .. }));
    }

    #[tokio::test]
    async fn test_quarantine_logs_one_entry() {
        let fx = Fixture::new();
        fx.write("photo.png", b"png");

        let report = fx.auditor.audit_day_folder(DAY).await.unwrap();
        let alert = &report.alerts[0];
        let entry = fx.auditor.quarantine(alert).await.unwrap();

        assert_eq!(entry.alert_type, AlertType::UnexpectedFile);
        assert_eq!(entry.alert_id, alert.id);
        assert_eq!(entry.source_path, alert.path);
        assert!(fx.temp_dir.path().join(&entry.destination_path).exists());
        assert_eq!(fx.auditor.quarantine_log().await.len(), 1);

        // The file is gone now, so a second attempt fails without logging.
        assert!(fx.auditor.quarantine(alert).await.is_err());
        assert_eq!(fx.auditor.quarantine_log().await.len(), 1);
    }

    #[tokio::test]
    async fn test_quarantine_rejects_orphan_entry() {
        let fx = Fixture::new();
        fx.write_index(&[("2025-06-14_1.jpg", &sha(b"one"))]);

        let report = fx.auditor.audit_day_folder(DAY).await.unwrap();
        assert_eq!(report.count(AlertType::OrphanEntry), 1);
        let err = fx.auditor.quarantine(&report.alerts[0]).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_quarantine_log_persists() {
        let fx = Fixture::new();
        fx.write("notes.txt", b"x");
        let log_path = fx.temp_dir.path().join("quarantine.json");

        let fs = Arc::new(LocalAuditFileSystem::new(
            fx.temp_dir.path(),
            "_quarantine",
            ChecksumService::default(),
        ));
        let reader = Arc::new(JsonIndexReader::new(fx.temp_dir.path(), "index.json"));
        let auditor = IntegrityAuditor::new(fs, reader, "index.json")
            .with_quarantine_log(&log_path)
            .unwrap();

        let report = auditor.audit_day_folder(DAY).await.unwrap();
        auditor.quarantine(&report.alerts[0]).await.unwrap();

        let log = QuarantineLog::load(&log_path).unwrap();
        assert_eq!(log.len(), 1);
    }
}
