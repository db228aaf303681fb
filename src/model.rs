//! Receipt data model
//!
//! Types shared by the auditor and the uploader:
//!
//! - [`receipt`]: the locally-owned [`Receipt`] row and its [`SyncStatus`]
//! - [`day_index`]: the per-folder [`DayIndex`] ledger and its JSON format
//! - [`folder`]: calendar-day parsing and destination folder placement
//!
//! The day index is the authoritative ledger; files on disk are the payload.
//! Storage of either is handled by collaborators, not by these types.

pub mod day_index;
pub mod folder;
pub mod lenient;
pub mod receipt;

pub use day_index::{DayIndex, ReceiptIndexEntry};
pub use folder::{CountryFolder, calendar_day, destination_folder};
pub use receipt::{Receipt, SyncStatus};
