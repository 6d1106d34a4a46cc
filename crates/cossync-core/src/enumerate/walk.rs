//! Local directory walk for uploads.

use std::path::{Path, PathBuf};

use async_channel::Sender;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use walkdir::WalkDir;

use crate::error::{SyncError, SyncResult};
use crate::keys::{join_key, key_from_relative_path};
use crate::types::{KEY_SEPARATOR, TransferTask};

/// Lazy sequence of upload tasks for every regular file under a root.
///
/// Directories produce no task and symlinks are not followed. The first
/// error ends the sequence: callers are expected to stop at it.
#[derive(Debug)]
pub struct LocalWalk {
    root: PathBuf,
    base_key: String,
    entries: walkdir::IntoIter,
    failed: bool,
}

impl LocalWalk {
    /// Start walking `root`, mapping files under `base_key`.
    pub fn new(root: impl Into<PathBuf>, base_key: impl Into<String>) -> Self {
        let root = root.into();
        let entries = WalkDir::new(&root).follow_links(false).into_iter();
        Self {
            root,
            base_key: base_key.into(),
            entries,
            failed: false,
        }
    }

    fn task_for(&self, path: &Path) -> SyncResult<TransferTask> {
        let walk_error = |message: String| SyncError::Walk {
            path: path.to_path_buf(),
            message,
        };
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|e| walk_error(e.to_string()))?;
        let relative_key = key_from_relative_path(relative).map_err(walk_error)?;
        let source = path
            .to_str()
            .ok_or_else(|| walk_error("path is not valid UTF-8".to_owned()))?;
        Ok(TransferTask::new(
            source,
            join_key(&self.base_key, &relative_key),
        ))
    }
}

impl Iterator for LocalWalk {
    type Item = SyncResult<TransferTask>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    self.failed = true;
                    let path = e.path().unwrap_or(&self.root).to_path_buf();
                    return Some(Err(SyncError::Walk {
                        path,
                        message: e.to_string(),
                    }));
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let task = self.task_for(entry.path());
            self.failed = task.is_err();
            return Some(task);
        }
    }
}

/// The single task for uploading one file.
///
/// The key is used verbatim unless it ends with a separator, in which case
/// the file name is appended.
pub fn single_file_task(path: &Path, base_key: &str) -> SyncResult<TransferTask> {
    let source = path.to_str().ok_or_else(|| SyncError::Walk {
        path: path.to_path_buf(),
        message: "path is not valid UTF-8".to_owned(),
    })?;
    let key = if base_key.ends_with(KEY_SEPARATOR) {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SyncError::Walk {
                path: path.to_path_buf(),
                message: "file has no usable name".to_owned(),
            })?;
        join_key(base_key, name)
    } else {
        base_key.to_owned()
    };
    Ok(TransferTask::new(source, key))
}

/// Push every task of `walk` onto the queue, blocking while it is full.
///
/// Runs on a blocking thread. Stops at the first walk error, on cancellation,
/// or when the queue has no consumers left. Returns the number of tasks
/// queued.
pub fn feed_queue(
    walk: impl Iterator<Item = SyncResult<TransferTask>>,
    queue: &Sender<TransferTask>,
    cancel: &CancellationToken,
) -> SyncResult<usize> {
    let mut queued = 0usize;
    for task in walk {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        let task = task?;
        trace!(source = task.source(), dest = task.dest(), "queued upload");
        if queue.send_blocking(task).is_err() {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            return Err(anyhow::anyhow!("work queue closed while walking").into());
        }
        queued += 1;
    }
    Ok(queued)
}
