//! Filesystem collaborators used by the auditor.
//!
//! Paths handed across these traits are `/`-separated and relative to a
//! receipts root, e.g. `Receipts/Canada/2025/2025-06/2025-06-14/2025-06-14_1.jpg`.

use crate::error::{Result, SyncError, io_error};
use crate::integrity::hasher::ChecksumService;
use crate::model::DayIndex;
use crate::model::folder::folder_day_segment;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Upper bound on suffixed names tried for one quarantined file.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Filesystem operations the auditor needs.
#[async_trait]
pub trait AuditFileSystem: Send + Sync {
    /// Names of the regular files directly inside `folder`.
    async fn list_day_folder_files(&self, folder: &str) -> Result<Vec<String>>;

    /// SHA-256 of the file at `path`.
    async fn compute_checksum(&self, path: &str) -> Result<String>;

    async fn file_exists(&self, path: &str) -> Result<bool>;

    /// Move the file at `path` out of its folder; returns where it went.
    async fn quarantine_file(&self, path: &str) -> Result<String>;
}

/// Reads the day index of a folder.
#[async_trait]
pub trait AuditIndexReader: Send + Sync {
    /// `Ok(None)` when the folder has no index yet.
    async fn read_day_index(&self, folder: &str) -> Result<Option<DayIndex>>;
}

/// Join a folder and a file name with `/`.
pub fn join_path(folder: &str, name: &str) -> String {
    let folder = folder.trim_end_matches('/');
    if folder.is_empty() {
        name.to_owned()
    } else {
        format!("{folder}/{name}")
    }
}

/// Resolve a `/`-separated relative path under `root`.
///
/// Absolute paths and `..` segments are rejected so nothing escapes the root.
pub(crate) fn resolve(root: &Path, relative: &str) -> Result<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in relative.split('/').filter(|s| !s.is_empty() && *s != ".") {
        if segment == ".." || segment.contains('\\') {
            return Err(SyncError::InvalidPath(format!(
                "{relative} escapes the receipts root"
            )));
        }
        path.push(segment);
    }
    if relative.starts_with('/') {
        return Err(SyncError::InvalidPath(format!(
            "{relative} must be relative to the receipts root"
        )));
    }
    Ok(path)
}

/// [`AuditFileSystem`] over a local directory tree.
#[derive(Debug, Clone)]
pub struct LocalAuditFileSystem {
    root: PathBuf,
    quarantine_dir: String,
    checksums: ChecksumService,
}

impl LocalAuditFileSystem {
    pub fn new(
        root: impl Into<PathBuf>,
        quarantine_dir: impl Into<String>,
        checksums: ChecksumService,
    ) -> Self {
        Self {
            root: root.into(),
            quarantine_dir: quarantine_dir.into(),
            checksums,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Pick a destination under the quarantine folder that does not exist yet.
    async fn free_destination(&self, dir: &str, name: &str) -> Result<String> {
        let plain = join_path(dir, name);
        if !self.file_exists(&plain).await? {
            return Ok(plain);
        }

        let stamp = Utc::now().format("%Y%m%dT%H%M%S%3f");
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = if attempt == 0 {
                join_path(dir, &format!("{stamp}_{name}"))
            } else {
                join_path(dir, &format!("{stamp}_{attempt}_{name}"))
            };
            if !self.file_exists(&candidate).await? {
                return Ok(candidate);
            }
        }

        Err(SyncError::InvalidPath(format!(
            "No free quarantine name for {name}"
        )))
    }
}

#[async_trait]
impl AuditFileSystem for LocalAuditFileSystem {
    async fn list_day_folder_files(&self, folder: &str) -> Result<Vec<String>> {
        let dir = resolve(&self.root, folder)?;
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
            let file_type = entry.file_type().await.map_err(|e| io_error(entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        names.sort();
        Ok(names)
    }

    async fn compute_checksum(&self, path: &str) -> Result<String> {
        let full = resolve(&self.root, path)?;
        self.checksums.compute_file_checksum(&full).await
    }

    async fn file_exists(&self, path: &str) -> Result<bool> {
        let full = resolve(&self.root, path)?;
        tokio::fs::try_exists(&full)
            .await
            .map_err(|e| io_error(&full, e))
    }

    async fn quarantine_file(&self, path: &str) -> Result<String> {
        let source = resolve(&self.root, path)?;
        if !tokio::fs::try_exists(&source)
            .await
            .map_err(|e| io_error(&source, e))?
        {
            return Err(SyncError::NotFound(source));
        }

        let (folder, name) = path
            .trim_end_matches('/')
            .rsplit_once('/')
            .unwrap_or(("", path));
        let day = folder_day_segment(folder).unwrap_or("unsorted");
        let dir = join_path(&self.quarantine_dir, day);

        let dir_path = resolve(&self.root, &dir)?;
        tokio::fs::create_dir_all(&dir_path)
            .await
            .map_err(|e| io_error(&dir_path, e))?;

        let destination = self.free_destination(&dir, name).await?;
        let dest_path = resolve(&self.root, &destination)?;
        tokio::fs::rename(&source, &dest_path)
            .await
            .map_err(|e| io_error(&source, e))?;

        Ok(destination)
    }
}

/// [`AuditIndexReader`] reading `<folder>/<index_filename>` under a root.
#[derive(Debug, Clone)]
pub struct JsonIndexReader {
    root: PathBuf,
    index_filename: String,
}

impl JsonIndexReader {
    pub fn new(root: impl Into<PathBuf>, index_filename: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            index_filename: index_filename.into(),
        }
    }
}

#[async_trait]
impl AuditIndexReader for JsonIndexReader {
    async fn read_day_index(&self, folder: &str) -> Result<Option<DayIndex>> {
        let path = resolve(&self.root, &join_path(folder, &self.index_filename))?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => DayIndex::parse(&bytes, &path).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}
