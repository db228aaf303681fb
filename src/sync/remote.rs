//! Directory-backed remote storage.
//!
//! Treats a local directory (a mounted drive, a sync client's folder) as the
//! remote store. Uploads never overwrite: a name that already exists at write
//! time is reported as a remote failure so the caller can allocate again.

use crate::error::{Result, SyncError, io_error};
use crate::integrity::fs::{join_path, resolve};
use crate::model::DayIndex;
use crate::sync::traits::RemoteStorage;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt as _;

#[derive(Debug, Clone)]
pub struct FsRemoteStorage {
    root: PathBuf,
    index_filename: String,
}

impl FsRemoteStorage {
    pub fn new(root: impl Into<PathBuf>, index_filename: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            index_filename: index_filename.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the remote root is currently mounted and readable.
    pub async fn is_reachable(&self) -> bool {
        tokio::fs::metadata(&self.root)
            .await
            .is_ok_and(|m| m.is_dir())
    }
}

#[async_trait]
impl RemoteStorage for FsRemoteStorage {
    async fn create_folder(&self, path: &str) -> Result<()> {
        let dir = resolve(&self.root, path)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))
    }

    async fn list_files(&self, path: &str) -> Result<Vec<String>> {
        let dir = resolve(&self.root, path)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&dir, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == self.index_filename {
                continue;
            }
            if entry
                .file_type()
                .await
                .map_err(|e| io_error(entry.path(), e))?
                .is_file()
            {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    async fn upload_file(&self, path: &str, filename: &str, bytes: Vec<u8>) -> Result<()> {
        let target = resolve(&self.root, &join_path(path, filename))?;
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    SyncError::Remote(format!("{} already exists", target.display()))
                } else {
                    io_error(&target, e)
                }
            })?;

        file.write_all(&bytes)
            .await
            .map_err(|e| io_error(&target, e))?;
        file.sync_all().await.map_err(|e| io_error(&target, e))?;
        Ok(())
    }

    async fn download_index(&self, path: &str) -> Result<Option<DayIndex>> {
        let target = resolve(&self.root, &join_path(path, &self.index_filename))?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => DayIndex::parse(&bytes, &target).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&target, e)),
        }
    }

    async fn upload_index(&self, path: &str, index: &DayIndex) -> Result<()> {
        let target = resolve(&self.root, &join_path(path, &self.index_filename))?;
        let tmp = target.with_extension("json.tmp");
        tokio::fs::write(&tmp, index.to_json()?)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(|e| io_error(&target, e))
    }
}
