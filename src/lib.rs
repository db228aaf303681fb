//! # receiptsync - Receipt Integrity & Synchronization
//!
//! Keeps a locally-captured receipt archive and its remote mirror consistent.
//! Receipt images live in day folders (`Receipts/<Country>/<YYYY>/<YYYY-MM>/<YYYY-MM-DD>/`)
//! named `YYYY-MM-DD_N.jpg`, with a per-day `index.json` describing them.
//!
//! ## Core Modules
//!
//! - [`integrity`]: SHA-256 checksums, day-folder audits, alerts and quarantine
//! - [`naming`]: Filename grammar and collision-free allocation
//! - [`model`]: Receipt rows, day index documents, folder layout
//! - [`sync`]: Backfill of unsynced receipts to remote storage
//! - [`config`]: Persistent configuration
//! - [`error`]: Error types and handling utilities
//! - [`logging`]: Console and rotating-file tracing setup
//!
//! ## Quick Start
//!
//! ```no_run
//! use receiptsync::config::SyncConfig;
//! use receiptsync::sync::{BackfillUploader, ConfigNetworkPolicy, FsRemoteStorage, JsonReceiptStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> receiptsync::error::Result<()> {
//! let config = SyncConfig::load()?;
//! let uploader = BackfillUploader::new(
//!     Arc::new(JsonReceiptStore::open(&config.store_path).await?),
//!     Arc::new(FsRemoteStorage::new(&config.remote_root, &config.index_filename)),
//!     Arc::new(ConfigNetworkPolicy::new(config.sync_enabled)),
//!     config.backfill_options(),
//! );
//!
//! let stats = uploader.run().await?;
//! println!("{stats}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Guarantees
//!
//! - A remote file is never overwritten, renamed or deleted by a backfill.
//! - Running a backfill twice converges: the second run uploads nothing new.
//! - An audit only reports. Files move only through an explicit quarantine.

#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod integrity;
pub mod logging;
pub mod model;
pub mod naming;
pub mod sync;
