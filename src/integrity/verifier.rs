//! Digest verification logic.
//!
//! Recomputes a file's SHA-256 and compares it against an expected digest.
//! A mismatch is a normal outcome reported in the result, not an error.

use crate::error::Result;
use crate::integrity::hasher::{ChecksumService, HASH_ALGORITHM};
use serde::Serialize;
use std::path::Path;

/// Result of a digest verification check.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VerificationResult {
    /// Whether the recomputed digest equals the expected one
    pub passed: bool,

    /// Human-readable message describing the result
    pub message: String,

    /// Path to the file that was verified
    pub file_path: String,

    /// Expected digest as given by the caller
    pub expected_digest: String,

    /// Digest recomputed from the file
    pub actual_digest: String,
}

impl VerificationResult {
    /// Format verification result for CLI display.
    pub fn format_cli(&self) -> String {
        if self.passed {
            format!(
                "✓ PASS: File integrity verified\n  \
                File: {}\n  \
                Hash: {} ({HASH_ALGORITHM})",
                self.file_path, self.actual_digest
            )
        } else {
            format!(
                "✗ FAIL: {}\n  \
                File: {}\n  \
                Expected: {}\n  \
                Actual:   {}\n  \
                File may have been modified or corrupted",
                self.message, self.file_path, self.expected_digest, self.actual_digest
            )
        }
    }
}

/// Verify `path` against `expected`, returning full diagnostics.
///
/// Digests are compared case-insensitively.
///
/// # Errors
///
/// [`crate::error::SyncError::NotFound`] if the file is absent; other read
/// failures propagate as I/O errors.
pub async fn verify_detailed(
    checksums: &ChecksumService,
    path: &Path,
    expected: &str,
) -> Result<VerificationResult> {
    let actual = checksums.compute_file_checksum(path).await?;
    let passed = actual.eq_ignore_ascii_case(expected.trim());

    let message = if passed {
        "File integrity verified successfully".to_owned()
    } else {
        "Hash mismatch detected".to_owned()
    };

    Ok(VerificationResult {
        passed,
        message,
        file_path: path.display().to_string(),
        expected_digest: expected.to_owned(),
        actual_digest: actual,
    })
}

/// Boolean form of [`verify_detailed`].
pub async fn verify(checksums: &ChecksumService, path: &Path, expected: &str) -> Result<bool> {
    Ok(verify_detailed(checksums, path, expected).await?.passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[tokio::test]
    async fn test_verify_pass_case_insensitive() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("2025-06-14_1.jpg");
        std::fs::write(&file, b"hello world").unwrap();

        let checksums = ChecksumService::default();
        assert!(verify(&checksums, &file, HELLO_SHA256).await.unwrap());
        assert!(
            verify(&checksums, &file, &HELLO_SHA256.to_uppercase())
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_verify_mismatch_is_not_error() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("2025-06-14_1.jpg");
        std::fs::write(&file, b"MODIFIED CONTENT").unwrap();

        let result = verify_detailed(&ChecksumService::default(), &file, HELLO_SHA256)
            .await
            .unwrap();

        assert!(!result.passed);
        assert!(result.message.contains("Hash mismatch"));
        assert_ne!(result.expected_digest, result.actual_digest);

        let output = result.format_cli();
        assert!(output.contains("✗ FAIL"));
        assert!(output.contains("Expected:"));
        assert!(output.contains("Actual:"));
    }

    #[tokio::test]
    async fn test_verify_missing_file_propagates() {
        let temp_dir = TempDir::new().unwrap();
        let result = verify(
            &ChecksumService::default(),
            &temp_dir.path().join("gone.jpg"),
            HELLO_SHA256,
        )
        .await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_format_cli_pass() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("2025-06-14_1.jpg");
        std::fs::write(&file, b"hello world").unwrap();

        let result = verify_detailed(&ChecksumService::default(), &file, HELLO_SHA256)
            .await
            .unwrap();
        let output = result.format_cli();
        assert!(output.contains("✓ PASS"));
        assert!(output.contains("2025-06-14_1.jpg"));
    }
}
