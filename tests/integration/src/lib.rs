//! Integration tests for cossync.
//!
//! Most tests drive [`SyncDriver`](cossync_core::SyncDriver) end to end
//! against an instrumented in-memory store and run during normal
//! `cargo test`. The tests in `test_live` need a running S3-compatible
//! server and are marked `#[ignore]`.
//!
//! Run the live tests with:
//! ```text
//! S3_ENDPOINT_URL=http://localhost:4566 cargo test -p cossync-integration -- --ignored
//! ```

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use cossync_core::{
    InMemoryObjectStore, ListRequest, ListingPage, ObjectStore, ObjectSummary, SharedStore,
    StoreError, SyncConfig,
};
use parking_lot::Mutex;

static INIT: Once = Once::new();

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

// ---------------------------------------------------------------------------
// Instrumented store
// ---------------------------------------------------------------------------

/// A single call observed by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    /// `put_object(key, path)`.
    Put {
        /// Destination key.
        key: String,
        /// Source file.
        path: PathBuf,
    },
    /// `get_object(key, path)`.
    Get {
        /// Source key.
        key: String,
        /// Destination file.
        path: PathBuf,
    },
    /// `delete_object(key)`.
    Delete {
        /// Deleted key.
        key: String,
    },
    /// `list_objects` with the given prefix and marker.
    List {
        /// Listed prefix.
        prefix: String,
        /// Resume marker, empty on the first page.
        marker: String,
    },
}

/// One scripted `list_objects` response.
#[derive(Debug, Clone)]
pub enum ScriptedPage {
    /// Return this page.
    Page(ListingPage),
    /// Fail with a service error.
    Fail(String),
}

impl ScriptedPage {
    /// A page of raw keys.
    pub fn keys(keys: &[&str], is_truncated: bool, marker: Option<&str>) -> Self {
        Self::Page(ListingPage {
            entries: keys.iter().map(|k| ObjectSummary::new(*k)).collect(),
            continuation_marker: marker.map(str::to_owned),
            is_truncated,
        })
    }
}

/// Wraps [`InMemoryObjectStore`], logging every call and tracking how many
/// transfers run at once.
#[derive(Debug)]
pub struct RecordingStore {
    inner: InMemoryObjectStore,
    calls: Mutex<Vec<StoreCall>>,
    failing_keys: Mutex<HashSet<String>>,
    script: Mutex<Option<VecDeque<ScriptedPage>>>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl Default for RecordingStore {
    fn default() -> Self {
        Self::new(InMemoryObjectStore::default())
    }
}

impl RecordingStore {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: InMemoryObjectStore) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            failing_keys: Mutex::new(HashSet::new()),
            script: Mutex::new(None),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Hold every transfer for `delay` so overlapping calls are observable.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Answer `list_objects` from `pages` instead of the wrapped store.
    #[must_use]
    pub fn with_listing_script(self, pages: Vec<ScriptedPage>) -> Self {
        *self.script.lock() = Some(pages.into());
        self
    }

    /// Make every transfer or deletion of `key` fail.
    pub fn fail_key(&self, key: impl Into<String>) {
        self.failing_keys.lock().insert(key.into());
    }

    /// The wrapped store.
    pub fn inner(&self) -> &InMemoryObjectStore {
        &self.inner
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// Keys passed to `put_object`, sorted.
    pub fn put_keys(&self) -> Vec<String> {
        self.keys_of(|call| match call {
            StoreCall::Put { key, .. } => Some(key.clone()),
            _ => None,
        })
    }

    /// Keys passed to `get_object`, sorted.
    pub fn get_keys(&self) -> Vec<String> {
        self.keys_of(|call| match call {
            StoreCall::Get { key, .. } => Some(key.clone()),
            _ => None,
        })
    }

    /// Keys passed to `delete_object`, sorted.
    pub fn delete_keys(&self) -> Vec<String> {
        self.keys_of(|call| match call {
            StoreCall::Delete { key } => Some(key.clone()),
            _ => None,
        })
    }

    /// Markers of each `list_objects` call, in call order.
    pub fn list_markers(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                StoreCall::List { marker, .. } => Some(marker.clone()),
                _ => None,
            })
            .collect()
    }

    /// Most transfers observed running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn keys_of(&self, pick: impl Fn(&StoreCall) -> Option<String>) -> Vec<String> {
        let mut keys: Vec<String> = self.calls.lock().iter().filter_map(pick).collect();
        keys.sort();
        keys
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().push(call);
    }

    fn check_failure(&self, key: &str) -> Result<(), StoreError> {
        if self.failing_keys.lock().contains(key) {
            return Err(StoreError::Service(format!("injected failure for {key}")));
        }
        Ok(())
    }

    async fn transfer<T>(
        &self,
        key: &str,
        op: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = match self.check_failure(key) {
            Ok(()) => op.await,
            Err(e) => Err(e),
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn put_object(&self, key: &str, path: &Path) -> Result<(), StoreError> {
        self.record(StoreCall::Put {
            key: key.to_owned(),
            path: path.to_path_buf(),
        });
        self.transfer(key, self.inner.put_object(key, path)).await
    }

    async fn get_object(&self, key: &str, path: &Path) -> Result<u64, StoreError> {
        self.record(StoreCall::Get {
            key: key.to_owned(),
            path: path.to_path_buf(),
        });
        self.transfer(key, self.inner.get_object(key, path)).await
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        self.record(StoreCall::Delete {
            key: key.to_owned(),
        });
        self.check_failure(key)?;
        self.inner.delete_object(key).await
    }

    async fn list_objects(&self, request: &ListRequest) -> Result<ListingPage, StoreError> {
        self.record(StoreCall::List {
            prefix: request.prefix.clone(),
            marker: request.marker.clone(),
        });
        let scripted = self
            .script
            .lock()
            .as_mut()
            .map(|pages| pages.pop_front());
        match scripted {
            None => self.inner.list_objects(request).await,
            Some(Some(ScriptedPage::Page(page))) => Ok(page),
            Some(Some(ScriptedPage::Fail(message))) => Err(StoreError::Service(message)),
            Some(None) => Err(StoreError::Service("listing script exhausted".to_owned())),
        }
    }
}

/// Share a recording store with the driver while keeping a handle for
/// assertions.
pub fn shared(store: &Arc<RecordingStore>) -> SharedStore {
    Arc::clone(store) as SharedStore
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A fully valid configuration for `command`.
#[must_use]
pub fn sync_config(command: &str, local_path: &Path, key: &str) -> SyncConfig {
    SyncConfig::builder()
        .command(command.to_owned())
        .bucket("integration-1250000000".to_owned())
        .region("ap-guangzhou".to_owned())
        .key(key.to_owned())
        .local_path(local_path.display().to_string())
        .secret_id("id".to_owned())
        .secret_key("secret".to_owned())
        .build()
}

/// Write `files` (relative path, contents) under `root`.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (relative, contents) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("create {}: {e}", parent.display()));
        }
        std::fs::write(&path, contents).unwrap_or_else(|e| panic!("write {}: {e}", path.display()));
    }
}

// ---------------------------------------------------------------------------
// Live server helpers
// ---------------------------------------------------------------------------

/// Endpoint URL for the server.
#[must_use]
pub fn endpoint_url() -> String {
    std::env::var("S3_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:4566".to_owned())
}

/// Create a configured S3 client pointing at the live server.
#[must_use]
pub fn s3_client() -> aws_sdk_s3::Client {
    init_tracing();

    let creds = Credentials::new("test", "test", None, None, "integration-test");

    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(creds)
        .endpoint_url(endpoint_url())
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(config)
}

/// A sync configuration targeting the live server.
#[must_use]
pub fn live_config(command: &str, bucket: &str, local_path: &Path, key: &str) -> SyncConfig {
    let mut config = sync_config(command, local_path, key);
    config.bucket = bucket.to_owned();
    config.region = "us-east-1".to_owned();
    config.secret_id = "test".to_owned();
    config.secret_key = "test".to_owned();
    config.endpoint = Some(endpoint_url());
    config.path_style = true;
    config
}

/// Generate a unique bucket name for a test.
#[must_use]
pub fn test_bucket_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Create a bucket and return its name. Caller is responsible for cleanup.
pub async fn create_test_bucket(client: &aws_sdk_s3::Client, prefix: &str) -> String {
    let name = test_bucket_name(prefix);
    client
        .create_bucket()
        .bucket(&name)
        .send()
        .await
        .unwrap_or_else(|e| panic!("failed to create bucket {name}: {e}"));
    name
}

/// Delete all objects in a bucket, then delete the bucket.
pub async fn cleanup_bucket(client: &aws_sdk_s3::Client, bucket: &str) {
    let mut continuation_token = None;
    loop {
        let mut req = client.list_objects_v2().bucket(bucket);
        if let Some(token) = continuation_token.take() {
            req = req.continuation_token(token);
        }
        let Ok(resp) = req.send().await else {
            return; // Bucket may not exist.
        };

        for obj in resp.contents() {
            if let Some(key) = obj.key() {
                let _ = client.delete_object().bucket(bucket).key(key).send().await;
            }
        }

        if resp.is_truncated() == Some(true) {
            continuation_token = resp.next_continuation_token().map(ToOwned::to_owned);
        } else {
            break;
        }
    }

    let _ = client.delete_bucket().bucket(bucket).send().await;
}

mod test_download;
