//! [`ObjectStore`] implementation over `aws-sdk-s3`.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::EncodingType;
use cossync_core::{
    ListRequest, ListingPage, ObjectStore, ObjectSummary, StoreError, SyncConfig, SyncResult,
};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::client::build_client;

/// Object store backed by an S3-compatible service.
///
/// Cheap to share: the SDK client is internally reference counted and safe
/// for concurrent use.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3ObjectStore")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl S3ObjectStore {
    /// Wrap an existing client.
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from `config` and bind it to the configured bucket.
    pub fn connect(config: &SyncConfig) -> SyncResult<Self> {
        let client = build_client(config)?;
        Ok(Self::new(client, config.bucket.clone()))
    }

    /// The bucket every operation targets.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Removes a download target on drop unless [`PartialFile::keep`] was
/// called. Covers early returns and a transfer future dropped mid-stream
/// on cancellation.
#[derive(Debug)]
struct PartialFile {
    path: PathBuf,
    keep: bool,
}

impl PartialFile {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            keep: false,
        }
    }

    fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed partial download"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to remove partial download");
            }
        }
    }
}

fn service_error<E>(err: E) -> StoreError
where
    E: std::error::Error,
{
    StoreError::Service(DisplayErrorContext(err).to_string())
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, key: &str, path: &Path) -> Result<(), StoreError> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| io_error(path, std::io::Error::other(e)))?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(service_error)?;
        debug!(key, "put object");
        Ok(())
    }

    async fn get_object(&self, key: &str, path: &Path) -> Result<u64, StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(GetObjectError::is_no_such_key) {
                    StoreError::NotFound {
                        key: key.to_owned(),
                    }
                } else {
                    service_error(e)
                }
            })?;

        let mut partial = PartialFile::new(path);
        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| io_error(path, e))?;
        let mut body = output.body;
        let mut written = 0u64;
        while let Some(chunk) = body.try_next().await.map_err(service_error)? {
            file.write_all(&chunk).await.map_err(|e| io_error(path, e))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| io_error(path, e))?;
        partial.keep();

        debug!(key, bytes = written, "got object");
        Ok(written)
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(service_error)?;
        debug!(key, "deleted object");
        Ok(())
    }

    async fn list_objects(&self, request: &ListRequest) -> Result<ListingPage, StoreError> {
        let mut call = self
            .client
            .list_objects()
            .bucket(&self.bucket)
            .prefix(&request.prefix);
        if !request.marker.is_empty() {
            call = call.marker(&request.marker);
        }
        if request.url_encoded {
            call = call.encoding_type(EncodingType::Url);
        }
        if let Some(max_keys) = request.max_keys {
            call = call.max_keys(i32::try_from(max_keys).unwrap_or(i32::MAX));
        }

        let output = call.send().await.map_err(service_error)?;

        let entries: Vec<ObjectSummary> = output
            .contents()
            .iter()
            .filter_map(|object| object.key())
            .map(ObjectSummary::new)
            .collect();
        let is_truncated = output.is_truncated().unwrap_or(false);
        let continuation_marker = output
            .next_marker()
            .filter(|marker| !marker.is_empty())
            .map(str::to_owned);

        debug!(
            prefix = %request.prefix,
            marker = %request.marker,
            entries = entries.len(),
            is_truncated,
            "listed objects"
        );

        Ok(ListingPage {
            entries,
            continuation_marker,
            is_truncated,
        })
    }
}
