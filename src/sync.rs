//! Backfill synchronization
//!
//! Migrates locally-captured receipts that never reached remote storage,
//! exactly once, using two dedup keys checked against the destination day
//! folder's remote index:
//!
//! - **identity**: an entry with the same receipt id
//! - **content**: an entry with the same checksum captured the same day
//!
//! ## Architecture
//!
//! ```text
//! BackfillUploader::run()
//!   │
//!   ├─> NetworkPolicy::can_sync()        (false ⇒ everything skipped)
//!   ├─> LocalReceiptStore                (unsynced rows, bytes, mark synced)
//!   ├─> RemoteStorage                    (listing, index, upload)
//!   └─> FilenameAllocator                (next free YYYY-MM-DD_N.jpg)
//! ```
//!
//! Collaborators are traits ([`traits`]) with local adapters in [`store`],
//! [`remote`] and [`policy`].

pub mod backfill;
pub mod policy;
pub mod remote;
pub mod stats;
pub mod store;
pub mod traits;

pub use backfill::{BackfillOptions, BackfillUploader};
pub use policy::ConfigNetworkPolicy;
pub use remote::FsRemoteStorage;
pub use stats::BackfillStats;
pub use store::JsonReceiptStore;
pub use traits::{LocalReceiptStore, NetworkPolicy, RemoteStorage};
