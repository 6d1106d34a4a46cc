//! Storage client abstraction.
//!
//! [`ObjectStore`] is the only seam between the sync engine and a concrete
//! object-storage client. A single handle is shared by the enumerator and
//! every worker, so implementations must be safe for concurrent use.

pub mod memory;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{ListRequest, ListingPage};

pub use memory::InMemoryObjectStore;

/// Shared, immutable store handle.
pub type SharedStore = Arc<dyn ObjectStore>;

/// Errors reported by a storage client.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The object does not exist.
    #[error("no such key: {key}")]
    NotFound {
        /// The missing key.
        key: String,
    },

    /// Reading or writing the local side of a transfer failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The local path involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Transport, authentication or service-side failure.
    #[error("storage service error: {0}")]
    Service(String),
}

/// The four capabilities the sync engine needs from an object store.
///
/// Uses `#[async_trait]` so the trait stays object-safe for `Arc<dyn ObjectStore>`.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    /// Upload the file at `path` to `key`, overwriting any existing object.
    async fn put_object(&self, key: &str, path: &Path) -> Result<(), StoreError>;

    /// Download `key` into the file at `path`. Returns the number of bytes
    /// written.
    async fn get_object(&self, key: &str, path: &Path) -> Result<u64, StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete_object(&self, key: &str) -> Result<(), StoreError>;

    /// Fetch one page of keys under `request.prefix` after `request.marker`.
    async fn list_objects(&self, request: &ListRequest) -> Result<ListingPage, StoreError>;
}
