//! Streaming SHA-256 computation.
//!
//! Receipt images are hashed without loading them into memory: files are read
//! through a fixed-size buffer and fed to the digest incrementally.

use crate::error::{Result, io_error};
use sha2::{Digest as _, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt as _;

/// Default buffer size for streaming file reads (8 KB).
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// SHA-256 of zero bytes.
pub const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Hash algorithm identifier stored alongside digests.
pub const HASH_ALGORITHM: &str = "SHA-256";

/// Computes content digests over bytes and files.
#[derive(Debug, Clone, Copy)]
pub struct ChecksumService {
    chunk_size: usize,
}

impl Default for ChecksumService {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ChecksumService {
    /// Create a service reading files `chunk_size` bytes at a time (minimum 1).
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// SHA-256 of `bytes` as 64 lowercase hex characters.
    pub fn compute_checksum(bytes: &[u8]) -> String {
        let hash = Sha256::digest(bytes);
        format!("{hash:x}")
    }

    /// SHA-256 of the file at `path`, streamed in bounded chunks.
    ///
    /// Equal to [`Self::compute_checksum`] over the full file content.
    ///
    /// # Errors
    ///
    /// [`crate::error::SyncError::NotFound`] if the file is absent; any other
    /// read failure as an I/O error.
    pub async fn compute_file_checksum(&self, path: &Path) -> Result<String> {
        let mut file = File::open(path).await.map_err(|e| io_error(path, e))?;

        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; self.chunk_size];

        loop {
            let bytes_read = file
                .read(&mut buffer)
                .await
                .map_err(|e| io_error(path, e))?;

            if bytes_read == 0 {
                break;
            }

            hasher.update(buffer.get(..bytes_read).unwrap_or_default());
        }

        let hash = hasher.finalize();
        Ok(format!("{hash:x}"))
    }
}

/// Whether `digest` looks like a SHA-256 hex digest (either case).
pub fn is_valid_digest(digest: &str) -> bool {
    digest.len() == 64 && digest.chars().all(|c| c.is_ascii_hexdigit())
}
