//! In-memory [`ObjectStore`] implementation.
//!
//! Objects live in a sorted map so listings come back in key order with
//! marker-based continuation, mirroring how an S3-compatible service pages
//! `ListObjects` results. Useful for tests and dry runs against a local tree.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::keys::encode_listing_value;
use crate::store::{ObjectStore, StoreError};
use crate::types::{ListRequest, ListingPage, ObjectSummary};

/// Default maximum number of keys returned in a single listing page.
const DEFAULT_PAGE_SIZE: usize = 1000;

/// Thread-safe in-memory object store.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use cossync_core::store::InMemoryObjectStore;
///
/// let store = InMemoryObjectStore::new(2);
/// store.insert("docs/a.txt", Bytes::from("a"));
/// assert_eq!(store.get("docs/a.txt").unwrap().as_ref(), b"a");
/// assert_eq!(store.len(), 1);
/// ```
///
/// Listings page by key order:
///
/// ```
/// use bytes::Bytes;
/// use cossync_core::{ListRequest, ObjectStore};
/// use cossync_core::store::InMemoryObjectStore;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryObjectStore::new(1);
/// store.insert("x/1.txt", Bytes::from("1"));
/// store.insert("x/2.txt", Bytes::from("2"));
///
/// let request = ListRequest {
///     prefix: "x/".to_owned(),
///     ..ListRequest::default()
/// };
/// let page = store.list_objects(&request).await.unwrap();
/// assert!(page.is_truncated);
/// assert_eq!(page.entries[0].key, "x/1.txt");
/// # });
/// ```
#[derive(Debug)]
pub struct InMemoryObjectStore {
    /// Object bodies keyed by object key.
    objects: RwLock<BTreeMap<String, Bytes>>,
    /// Max keys per listing page when the request does not say otherwise.
    page_size: usize,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl InMemoryObjectStore {
    /// Create an empty store paging listings by `page_size` keys.
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
        }
    }

    /// Insert or overwrite an object directly.
    pub fn insert(&self, key: impl Into<String>, data: Bytes) {
        self.objects.write().insert(key.into(), data);
    }

    /// Return a copy of an object's body.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.read().get(key).cloned()
    }

    /// All keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Whether the store holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn list_page(&self, request: &ListRequest) -> ListingPage {
        let max_keys = request
            .max_keys
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(self.page_size)
            .max(1);

        let store = self.objects.read();
        let mut keys: Vec<String> = Vec::new();
        let mut is_truncated = false;

        for key in store.keys() {
            // Skip keys at or before the marker.
            if !request.marker.is_empty() && key.as_str() <= request.marker.as_str() {
                continue;
            }
            if !key.starts_with(&request.prefix) {
                continue;
            }
            if keys.len() >= max_keys {
                is_truncated = true;
                break;
            }
            keys.push(key.clone());
        }
        drop(store);

        let next_marker = if is_truncated { keys.last().cloned() } else { None };
        let encode = |value: String| {
            if request.url_encoded {
                encode_listing_value(&value)
            } else {
                value
            }
        };

        ListingPage {
            entries: keys.into_iter().map(|k| ObjectSummary::new(encode(k))).collect(),
            continuation_marker: next_marker.map(encode),
            is_truncated,
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put_object(&self, key: &str, path: &Path) -> Result<(), StoreError> {
        let data = tokio::fs::read(path).await.map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        trace!(key, size = data.len(), "stored object");
        self.insert(key, Bytes::from(data));
        Ok(())
    }

    async fn get_object(&self, key: &str, path: &Path) -> Result<u64, StoreError> {
        let data = self.get(key).ok_or_else(|| StoreError::NotFound {
            key: key.to_owned(),
        })?;
        tokio::fs::write(path, &data)
            .await
            .map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(data.len() as u64)
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        self.objects.write().remove(key);
        Ok(())
    }

    async fn list_objects(&self, request: &ListRequest) -> Result<ListingPage, StoreError> {
        let page = self.list_page(request);
        debug!(
            prefix = %request.prefix,
            marker = %request.marker,
            count = page.entries.len(),
            is_truncated = page.is_truncated,
            "list_objects completed"
        );
        Ok(page)
    }
}
