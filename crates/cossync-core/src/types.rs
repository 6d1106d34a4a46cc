//! Task descriptors and listing shapes passed between the enumerator, the
//! work queue and the storage adapter.

use std::fmt;

/// Remote key separator. Keys ending with it are directory markers.
pub const KEY_SEPARATOR: char = '/';

/// The operation a sync run performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Upload a local file or directory tree.
    Upload,
    /// Download every object under a prefix.
    Download,
    /// Delete every object under a prefix.
    Delete,
    /// Anything else. Treated as a successful no-op.
    Unknown(String),
}

impl Command {
    /// Parse a command string. An empty value means [`Command::Upload`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("upload") {
            Self::Upload
        } else if value.eq_ignore_ascii_case("download") {
            Self::Download
        } else if value.eq_ignore_ascii_case("delete") {
            Self::Delete
        } else {
            Self::Unknown(value.to_owned())
        }
    }

    /// The canonical command name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Upload => "upload",
            Self::Download => "download",
            Self::Delete => "delete",
            Self::Unknown(other) => other,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transfer between a local file and a remote object.
///
/// For uploads `source` is a local file path and `dest` a remote key; for
/// downloads it is the other way around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTask {
    source: String,
    dest: String,
}

impl TransferTask {
    /// Create a new transfer task.
    pub fn new(source: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
        }
    }

    /// Where the data comes from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Where the data goes.
    #[must_use]
    pub fn dest(&self) -> &str {
        &self.dest
    }
}

/// Removal of a single remote object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTask {
    remote_key: String,
}

impl DeleteTask {
    /// Create a new delete task.
    pub fn new(remote_key: impl Into<String>) -> Self {
        Self {
            remote_key: remote_key.into(),
        }
    }

    /// The key to remove.
    #[must_use]
    pub fn remote_key(&self) -> &str {
        &self.remote_key
    }
}

/// A single entry of a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Object key, possibly URL-encoded when the request asked for it.
    pub key: String,
    /// Whether the key is a zero-byte "folder" placeholder.
    pub is_directory_marker: bool,
}

impl ObjectSummary {
    /// Build a summary, deriving the directory-marker flag from the key.
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        let is_directory_marker = key.ends_with(KEY_SEPARATOR);
        Self {
            key,
            is_directory_marker,
        }
    }
}

/// One page of a remote listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Entries in key order.
    pub entries: Vec<ObjectSummary>,
    /// Where the next page should resume, if the store provided one.
    pub continuation_marker: Option<String>,
    /// Whether more entries are available past this page.
    pub is_truncated: bool,
}

/// Parameters of a single list call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// Key prefix to list under.
    pub prefix: String,
    /// Resume after this key; empty for the first page.
    pub marker: String,
    /// Ask the store to URL-encode keys and markers in the response.
    pub url_encoded: bool,
    /// Page size hint. `None` leaves it to the store.
    pub max_keys: Option<u32>,
}
