//! Receipt Integrity Auditing
//!
//! Reconciles a day folder on disk against its day index and reports every
//! discrepancy as an [`IntegrityAlert`]. Auditing is read-only: nothing is
//! deleted, renamed, or rewritten while a folder is scanned. The only mutating
//! operation is [`IntegrityAuditor::quarantine`], which moves exactly one
//! previously-reported file aside and records the move.
//!
//! ## Usage
//!
//! ```no_run
//! use receiptsync::integrity::{
//!     ChecksumService, IntegrityAuditor, JsonIndexReader, LocalAuditFileSystem,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> receiptsync::error::Result<()> {
//! let checksums = ChecksumService::default();
//! let fs = Arc::new(LocalAuditFileSystem::new("/data/receipts", "_quarantine", checksums));
//! let index = Arc::new(JsonIndexReader::new("/data/receipts", "index.json"));
//! let auditor = IntegrityAuditor::new(fs, index, "index.json");
//!
//! let report = auditor.audit_day_folder("Receipts/Canada/2025/2025-06/2025-06-14").await?;
//! for alert in &report.alerts {
//!     println!("{}: {}", alert.alert_type, alert.description);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Checks
//!
//! Per file in the folder (the index file itself is skipped):
//!
//! 1. extension other than `.jpg`/`.json` → `unexpectedFile`
//! 2. `.jpg` not matching `YYYY-MM-DD_N.jpg` → `invalidFilename`
//! 3. well-formed `.jpg` missing from the index → `orphanFile`
//! 4. well-formed `.jpg` dated differently from its folder → `folderMismatch`
//!
//! Then, when an index exists:
//!
//! 5. index entry with no file on disk → `orphanEntry`
//! 6. index entry whose file digest differs → `checksumMismatch`
//!
//! ## Architecture
//!
//! - [`hasher`]: streaming SHA-256 ([`ChecksumService`])
//! - [`verifier`]: digest verification with diagnostics
//! - [`alert`]: alert types and the persisted alert review store
//! - [`fs`]: filesystem and index-reader collaborators plus local adapters
//! - [`auditor`]: the reconciliation pass and quarantine
//! - [`quarantine`]: the persisted quarantine log

pub mod alert;
pub mod auditor;
pub mod fs;
pub mod hasher;
pub mod quarantine;
pub mod verifier;

pub use alert::{AlertStore, AlertType, IntegrityAlert};
pub use auditor::{AuditReport, IntegrityAuditor};
pub use fs::{AuditFileSystem, AuditIndexReader, JsonIndexReader, LocalAuditFileSystem};
pub use hasher::{ChecksumService, EMPTY_SHA256};
pub use quarantine::{QuarantineEntry, QuarantineLog};
pub use verifier::{VerificationResult, verify, verify_detailed};
