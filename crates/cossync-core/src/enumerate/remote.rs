//! Flows driven by a remote listing.
//!
//! Downloads queue one task per listed object for the worker pool; deletions
//! run inline, one store call per listed key, interleaved with pagination.

use std::path::Path;

use async_channel::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::enumerate::{Enumeration, ListingPager};
use crate::error::SyncError;
use crate::keys::{local_destination, relative_key};
use crate::store::ObjectStore;
use crate::summary::ItemResult;
use crate::types::{DeleteTask, TransferTask};

/// List `base_key` and queue a download for every object under it.
///
/// Directory markers are skipped. The parent directory of each destination
/// is created here, before the task is queued, so workers never race on
/// directory creation. A listing failure stops production; tasks already
/// queued are left for the workers. Nothing more is queued once `cancel`
/// fires, even mid-page.
pub async fn enqueue_downloads(
    mut pager: ListingPager<'_>,
    base_key: &str,
    local_root: &Path,
    queue: &Sender<TransferTask>,
    cancel: &CancellationToken,
) -> Enumeration {
    let mut outcome = Enumeration::default();

    'pages: loop {
        let entries = match pager.next_page(cancel).await {
            Ok(Some(entries)) => entries,
            Ok(None) => break,
            Err(e) => {
                outcome.halted = Some(e);
                break;
            }
        };

        for entry in entries {
            if cancel.is_cancelled() {
                outcome.halted = Some(SyncError::Cancelled);
                break 'pages;
            }
            if entry.is_directory_marker {
                continue;
            }
            let Some(relative) = relative_key(base_key, &entry.key) else {
                warn!(key = %entry.key, base_key, "listed key outside base key, skipping");
                outcome
                    .summary
                    .record(ItemResult::skipped(&entry.key, "", "outside base key"));
                continue;
            };
            let Some(dest) = local_destination(local_root, relative) else {
                warn!(key = %entry.key, "key escapes destination directory, skipping");
                outcome
                    .summary
                    .record(ItemResult::skipped(&entry.key, "", "unsafe key"));
                continue;
            };
            let dest_display = dest.display().to_string();

            if let Some(parent) = dest.parent() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    error!(
                        key = %entry.key,
                        dest = %dest_display,
                        error = %e,
                        "failed to create destination directory"
                    );
                    outcome
                        .summary
                        .record(ItemResult::failed(&entry.key, &dest_display, e));
                    continue;
                }
            }

            if queue
                .send(TransferTask::new(entry.key, dest_display))
                .await
                .is_err()
            {
                outcome.halted = Some(if cancel.is_cancelled() {
                    SyncError::Cancelled
                } else {
                    anyhow::anyhow!("work queue closed while listing").into()
                });
                break 'pages;
            }
            outcome.queued += 1;
        }
    }

    outcome.listing_calls = pager.calls();
    outcome
}

/// List `base_key` and delete every key under it, directory markers included.
///
/// Deletion is synchronous within the listing loop: a page is fully processed
/// before the next one is requested. Failed deletions are recorded and the
/// loop moves on.
pub async fn delete_prefix(
    store: &dyn ObjectStore,
    mut pager: ListingPager<'_>,
    base_key: &str,
    cancel: &CancellationToken,
) -> Enumeration {
    let mut outcome = Enumeration::default();

    'pages: loop {
        let entries = match pager.next_page(cancel).await {
            Ok(Some(entries)) => entries,
            Ok(None) => break,
            Err(e) => {
                outcome.halted = Some(e);
                break;
            }
        };

        for entry in entries {
            if cancel.is_cancelled() {
                outcome.halted = Some(SyncError::Cancelled);
                break 'pages;
            }
            if relative_key(base_key, &entry.key).is_none() {
                warn!(key = %entry.key, base_key, "listed key outside base key, skipping");
                outcome
                    .summary
                    .record(ItemResult::skipped(&entry.key, "", "outside base key"));
                continue;
            }

            let task = DeleteTask::new(entry.key);
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    outcome.summary.record(ItemResult::failed(task.remote_key(), "", "cancelled"));
                    outcome.halted = Some(SyncError::Cancelled);
                    break 'pages;
                }
                result = store.delete_object(task.remote_key()) => result,
            };
            match result {
                Ok(()) => {
                    info!(key = task.remote_key(), "deleted object");
                    outcome
                        .summary
                        .record(ItemResult::succeeded(task.remote_key(), ""));
                }
                Err(e) => {
                    error!(key = task.remote_key(), error = %e, "failed to delete object");
                    outcome
                        .summary
                        .record(ItemResult::failed(task.remote_key(), "", e));
                }
            }
        }
    }

    outcome.listing_calls = pager.calls();
    outcome
}
