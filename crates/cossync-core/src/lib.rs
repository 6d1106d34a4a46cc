//! Bounded-concurrency synchronization between a local filesystem and an
//! object-storage bucket.
//!
//! A run is a single command (`upload`, `download` or `delete`) over one base
//! key. Uploads walk a local tree, downloads and deletions page through a
//! remote listing with marker continuation. Transfers go through a bounded
//! queue into a fixed pool of workers sharing one store handle.
//!
//! # Architecture
//!
//! ```text
//!   SyncConfig ──▶ SyncDriver (validate → connect → flow)
//!                      |
//!          +-----------+-------------+
//!          v                         v
//!   LocalWalk / ListingPager    delete_prefix (inline)
//!          |
//!          v
//!   WorkerPool (queue of 100, 3 workers)
//!          |
//!          v
//!   ObjectStore (S3-compatible client, in-memory store)
//! ```

pub mod config;
pub mod driver;
pub mod enumerate;
pub mod error;
pub mod keys;
pub mod pool;
pub mod store;
pub mod summary;
pub mod transfer;
pub mod types;

pub use config::SyncConfig;
pub use driver::{DriverState, HaltReason, SyncDriver, SyncReport};
pub use error::{SyncError, SyncResult};
pub use store::{InMemoryObjectStore, ObjectStore, SharedStore, StoreError};
pub use summary::{BatchSummary, ItemResult, ItemStatus};
pub use types::{Command, DeleteTask, ListRequest, ListingPage, ObjectSummary, TransferTask};
