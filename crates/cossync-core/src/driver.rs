//! Synchronization driver.
//!
//! [`SyncDriver`] moves through `Idle → Validating → Executing → Done`. It
//! validates the configuration, connects to the store only for a known
//! command, runs exactly one flow and returns a [`SyncReport`]:
//!
//! ```text
//! upload:   LocalWalk ──▶ queue ──▶ 3 × UploadHandler   ──▶ put_object
//! download: ListingPager ──▶ queue ──▶ 3 × DownloadHandler ──▶ get_object
//! delete:   ListingPager ──▶ delete_object (inline, page by page)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::enumerate::{
    ListingPager, LocalWalk, delete_prefix, enqueue_downloads, feed_queue, single_file_task,
};
use crate::error::{SyncError, SyncResult};
use crate::pool::WorkerPool;
use crate::store::SharedStore;
use crate::summary::BatchSummary;
use crate::transfer::{DownloadHandler, UploadHandler};
use crate::types::Command;

/// Lifecycle of a driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverState {
    /// Created, not started.
    Idle,
    /// Checking required configuration.
    Validating,
    /// Running the selected flow.
    Executing(Command),
    /// Finished, successfully or not.
    Done,
}

/// Why production stopped before the source was exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// The walk or listing failed.
    Enumeration(String),
    /// The run was cancelled or hit its deadline.
    Cancelled,
}

impl From<&SyncError> for HaltReason {
    fn from(err: &SyncError) -> Self {
        match err {
            SyncError::Cancelled => Self::Cancelled,
            other => Self::Enumeration(other.to_string()),
        }
    }
}

/// Outcome of a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// The command that ran.
    pub command: Command,
    /// Per-item results.
    pub summary: BatchSummary,
    /// List calls issued (download and delete only).
    pub listing_calls: usize,
    /// Set when enumeration stopped early.
    pub halted: Option<HaltReason>,
}

impl SyncReport {
    fn empty(command: Command) -> Self {
        Self {
            command,
            summary: BatchSummary::default(),
            listing_calls: 0,
            halted: None,
        }
    }

    /// Whether the run should exit successfully. Per-item failures do not
    /// count; an early halt does.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.halted.is_none()
    }
}

/// Runs one sync command end to end.
#[derive(Debug)]
pub struct SyncDriver {
    config: SyncConfig,
    state: DriverState,
}

impl SyncDriver {
    /// Create an idle driver.
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            state: DriverState::Idle,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> &DriverState {
        &self.state
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Validate, connect and execute.
    ///
    /// `connect` is called at most once, after validation succeeded and only
    /// for upload, download or delete. Validation and connection errors are
    /// returned as `Err`; everything else is reported in the [`SyncReport`].
    pub async fn run<F>(&mut self, connect: F, cancel: &CancellationToken) -> SyncResult<SyncReport>
    where
        F: FnOnce(&SyncConfig) -> SyncResult<SharedStore>,
    {
        let result = self.run_inner(connect, cancel).await;
        self.enter(DriverState::Done);
        result
    }

    async fn run_inner<F>(
        &mut self,
        connect: F,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncReport>
    where
        F: FnOnce(&SyncConfig) -> SyncResult<SharedStore>,
    {
        self.enter(DriverState::Validating);
        self.config.validate()?;

        let command = self.config.command();
        self.enter(DriverState::Executing(command.clone()));

        info!(
            command = %command,
            bucket = %self.config.bucket,
            key = %self.config.key,
            local_path = %self.config.local_path,
            "starting sync"
        );

        let report = match &command {
            Command::Unknown(name) => {
                warn!(command = %name, "unknown command, nothing to do");
                return Ok(SyncReport::empty(command.clone()));
            }
            Command::Upload => self.upload(connect(&self.config)?, cancel).await,
            Command::Download => self.download(connect(&self.config)?, cancel).await,
            Command::Delete => self.delete(connect(&self.config)?, cancel).await,
        };

        info!(
            command = %report.command,
            succeeded = report.summary.succeeded,
            failed = report.summary.failed.len(),
            skipped = report.summary.skipped,
            listing_calls = report.listing_calls,
            halted = report.halted.is_some(),
            "sync finished"
        );
        Ok(report)
    }

    fn enter(&mut self, state: DriverState) {
        debug!(from = ?self.state, to = ?state, "driver state change");
        self.state = state;
    }

    async fn upload(&self, store: SharedStore, cancel: &CancellationToken) -> SyncReport {
        let root = PathBuf::from(&self.config.local_path);
        let base_key = self.config.key.clone();
        let pool = WorkerPool::spawn(Arc::new(UploadHandler::new(store)), cancel);

        let produced = match tokio::fs::metadata(&root).await {
            Err(source) => Err(SyncError::LocalPath { path: root, source }),
            Ok(meta) if meta.is_file() => match single_file_task(&root, &base_key) {
                Ok(task) => match pool.queue().send(task).await {
                    Ok(()) => Ok(1),
                    Err(_) => Err(SyncError::Cancelled),
                },
                Err(e) => Err(e),
            },
            Ok(_) => {
                let queue = pool.queue().clone();
                let walk_cancel = cancel.clone();
                let walk = LocalWalk::new(root, base_key);
                tokio::task::spawn_blocking(move || feed_queue(walk, &queue, &walk_cancel))
                    .await
                    .unwrap_or_else(|e| Err(anyhow::anyhow!("walk task failed: {e}").into()))
            }
        };

        let summary = pool.finish().await;
        let mut report = SyncReport::empty(Command::Upload);
        report.summary = summary;
        match produced {
            Ok(queued) => debug!(queued, "local walk completed"),
            Err(e) => {
                error!(error = %e, "upload enumeration halted");
                report.halted = Some(HaltReason::from(&e));
            }
        }
        report
    }

    async fn download(&self, store: SharedStore, cancel: &CancellationToken) -> SyncReport {
        let root = PathBuf::from(&self.config.local_path);
        let base_key = self.config.key.as_str();
        let pool = WorkerPool::spawn(
            Arc::new(DownloadHandler::new(Arc::clone(&store))),
            cancel,
        );

        let pager = ListingPager::new(store.as_ref(), base_key);
        let enumeration = enqueue_downloads(pager, base_key, &root, pool.queue(), cancel).await;

        let mut report = SyncReport::empty(Command::Download);
        report.summary = pool.finish().await;
        report.summary.merge(enumeration.summary);
        report.listing_calls = enumeration.listing_calls;
        if let Some(e) = enumeration.halted {
            error!(error = %e, queued = enumeration.queued, "download enumeration halted");
            report.halted = Some(HaltReason::from(&e));
        }
        report
    }

    async fn delete(&self, store: SharedStore, cancel: &CancellationToken) -> SyncReport {
        let base_key = self.config.key.as_str();
        let pager = ListingPager::new(store.as_ref(), base_key);
        let enumeration = delete_prefix(store.as_ref(), pager, base_key, cancel).await;

        let mut report = SyncReport::empty(Command::Delete);
        report.summary = enumeration.summary;
        report.listing_calls = enumeration.listing_calls;
        if let Some(e) = enumeration.halted {
            error!(error = %e, "delete enumeration halted");
            report.halted = Some(HaltReason::from(&e));
        }
        report
    }
}
