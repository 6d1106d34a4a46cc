//! Marker-based paginated listing of a remote prefix.
//!
//! The pager asks the store for URL-encoded listings and decodes every key
//! and marker before comparing or reusing them. It keeps going strictly while
//! the store reports `is_truncated`; an absent marker on a truncated page is
//! replaced by the page's last key. Markers are opaque cursors and are never
//! ordered; only a marker that repeats the one just sent halts the listing
//! instead of spinning on the same page.

use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::{SyncError, SyncResult};
use crate::keys::decode_listing_value;
use crate::store::ObjectStore;
use crate::types::{KEY_SEPARATOR, ListRequest, ObjectSummary};

/// Walks the pages of a listing, one store call per [`ListingPager::next_page`].
#[derive(Debug)]
pub struct ListingPager<'a> {
    store: &'a dyn ObjectStore,
    prefix: String,
    marker: String,
    max_keys: Option<u32>,
    finished: bool,
    calls: usize,
}

impl<'a> ListingPager<'a> {
    /// Prepare to list everything under `prefix`.
    pub fn new(store: &'a dyn ObjectStore, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            marker: String::new(),
            max_keys: None,
            finished: false,
            calls: 0,
        }
    }

    /// Override the page size requested from the store.
    #[must_use]
    pub fn with_max_keys(mut self, max_keys: u32) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    /// Number of list calls issued so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// The decoded marker the next request will carry.
    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Fetch and decode the next page.
    ///
    /// Returns `Ok(None)` once the last page has been returned. After an
    /// error the pager is finished as well.
    pub async fn next_page(
        &mut self,
        cancel: &CancellationToken,
    ) -> SyncResult<Option<Vec<ObjectSummary>>> {
        if self.finished {
            return Ok(None);
        }
        if cancel.is_cancelled() {
            self.finished = true;
            return Err(SyncError::Cancelled);
        }

        let result = self.fetch(cancel).await;
        if result.is_err() {
            self.finished = true;
        }
        result.map(Some)
    }

    async fn fetch(&mut self, cancel: &CancellationToken) -> SyncResult<Vec<ObjectSummary>> {
        let request = ListRequest {
            prefix: self.prefix.clone(),
            marker: self.marker.clone(),
            url_encoded: true,
            max_keys: self.max_keys,
        };

        self.calls += 1;
        let page = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(SyncError::Cancelled),
            page = self.store.list_objects(&request) => page,
        };
        let page = page.map_err(|source| {
            error!(
                prefix = %request.prefix,
                marker = %request.marker,
                error = %source,
                "listing page fetch failed"
            );
            SyncError::Listing {
                prefix: request.prefix.clone(),
                marker: request.marker.clone(),
                source,
            }
        })?;

        let entries = page
            .entries
            .into_iter()
            .map(|entry| {
                let key = decode_listing_value(&entry.key)?;
                let is_directory_marker = entry.is_directory_marker || key.ends_with(KEY_SEPARATOR);
                Ok(ObjectSummary {
                    key,
                    is_directory_marker,
                })
            })
            .collect::<SyncResult<Vec<_>>>()?;

        if page.is_truncated {
            let next = match page.continuation_marker.as_deref().filter(|m| !m.is_empty()) {
                Some(raw) => decode_listing_value(raw)?,
                None => entries.last().map(|e| e.key.clone()).unwrap_or_default(),
            };
            if next.is_empty() || next == self.marker {
                return Err(SyncError::StalledListing {
                    marker: self.marker.clone(),
                });
            }
            self.marker = next;
        } else {
            self.finished = true;
        }

        debug!(
            prefix = %self.prefix,
            page = self.calls,
            count = entries.len(),
            finished = self.finished,
            "listing page decoded"
        );
        Ok(entries)
    }
}
