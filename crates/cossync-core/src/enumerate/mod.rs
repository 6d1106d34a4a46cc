//! Task producers: the local walk for uploads and the paginated remote
//! listing for downloads and deletions.

pub mod listing;
pub mod remote;
pub mod walk;

pub use listing::ListingPager;
pub use remote::{delete_prefix, enqueue_downloads};
pub use walk::{LocalWalk, feed_queue, single_file_task};

use crate::error::SyncError;
use crate::summary::BatchSummary;

/// What an enumeration pass produced besides the queued tasks themselves.
#[derive(Debug, Default)]
pub struct Enumeration {
    /// Tasks handed to the work queue.
    pub queued: usize,
    /// Items settled by the enumerator itself (skips, inline deletions,
    /// failed directory preparation).
    pub summary: BatchSummary,
    /// List calls issued.
    pub listing_calls: usize,
    /// The error that stopped production early, if any.
    pub halted: Option<SyncError>,
}
