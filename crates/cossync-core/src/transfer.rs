//! Worker-side task handlers for uploads and downloads.

use std::path::Path;

use async_trait::async_trait;
use tracing::{error, info};

use crate::pool::TaskHandler;
use crate::store::SharedStore;
use crate::summary::ItemResult;
use crate::types::TransferTask;

/// Uploads a local file to its remote key.
#[derive(Debug, Clone)]
pub struct UploadHandler {
    store: SharedStore,
}

impl UploadHandler {
    /// Create a handler sharing `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TaskHandler<TransferTask> for UploadHandler {
    async fn handle(&self, task: &TransferTask) -> ItemResult {
        match self
            .store
            .put_object(task.dest(), Path::new(task.source()))
            .await
        {
            Ok(()) => {
                info!(source = task.source(), dest = task.dest(), "uploaded file");
                ItemResult::succeeded(task.source(), task.dest())
            }
            Err(e) => {
                error!(source = task.source(), dest = task.dest(), error = %e, "failed to upload file");
                ItemResult::failed(task.source(), task.dest(), e)
            }
        }
    }

    fn cancelled(&self, task: &TransferTask) -> ItemResult {
        ItemResult::failed(task.source(), task.dest(), "cancelled")
    }
}

/// Downloads a remote object to its local path.
#[derive(Debug, Clone)]
pub struct DownloadHandler {
    store: SharedStore,
}

impl DownloadHandler {
    /// Create a handler sharing `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TaskHandler<TransferTask> for DownloadHandler {
    async fn handle(&self, task: &TransferTask) -> ItemResult {
        match self
            .store
            .get_object(task.source(), Path::new(task.dest()))
            .await
        {
            Ok(bytes) => {
                info!(source = task.source(), dest = task.dest(), bytes, "downloaded object");
                ItemResult::succeeded(task.source(), task.dest())
            }
            Err(e) => {
                error!(source = task.source(), dest = task.dest(), error = %e, "failed to download object");
                ItemResult::failed(task.source(), task.dest(), e)
            }
        }
    }

    fn cancelled(&self, task: &TransferTask) -> ItemResult {
        ItemResult::failed(task.source(), task.dest(), "cancelled")
    }
}
