//! Remote key arithmetic and listing value encoding.
//!
//! Keys are always `/`-separated regardless of the local platform. Mapping a
//! key back onto the local filesystem only ever produces paths below the
//! destination root.

use std::path::{Component, Path, PathBuf};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::error::SyncError;
use crate::types::KEY_SEPARATOR;

/// Characters left untouched when URL-encoding listing values.
const LISTING_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

// ---------------------------------------------------------------------------
// Listing value encoding
// ---------------------------------------------------------------------------

/// URL-decode a key or marker returned by a listing with URL encoding enabled.
///
/// `+` decodes to a space, as object stores encode listings with
/// form-urlencoding rules.
///
/// # Examples
///
/// ```
/// use cossync_core::keys::decode_listing_value;
///
/// assert_eq!(decode_listing_value("a+b%2Fc.txt").unwrap(), "a b/c.txt");
/// ```
pub fn decode_listing_value(raw: &str) -> Result<String, SyncError> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .map_err(|_| SyncError::KeyEncoding {
            value: raw.to_owned(),
        })
}

/// URL-encode a key the way a store does for `encoding-type=url` listings.
#[must_use]
pub fn encode_listing_value(key: &str) -> String {
    utf8_percent_encode(key, LISTING_ENCODE_SET).to_string()
}

// ---------------------------------------------------------------------------
// Key arithmetic
// ---------------------------------------------------------------------------

/// Join a base key and a relative key with exactly one separator.
///
/// # Examples
///
/// ```
/// use cossync_core::keys::join_key;
///
/// assert_eq!(join_key("data", "sub/b.txt"), "data/sub/b.txt");
/// assert_eq!(join_key("data/", "a.txt"), "data/a.txt");
/// assert_eq!(join_key("", "a.txt"), "a.txt");
/// ```
#[must_use]
pub fn join_key(base: &str, relative: &str) -> String {
    let relative = relative.trim_start_matches(KEY_SEPARATOR);
    let base = base.trim_end_matches(KEY_SEPARATOR);
    if base.is_empty() {
        relative.to_owned()
    } else if relative.is_empty() {
        base.to_owned()
    } else {
        format!("{base}{KEY_SEPARATOR}{relative}")
    }
}

/// Return `key` relative to `base`, or `None` when the key is not under it.
///
/// Matching is segment-aware: base `data` covers `data` and `data/...` but
/// not `database/...`. The returned relative key has no leading separator
/// and is empty when `key` equals `base`.
#[must_use]
pub fn relative_key<'a>(base: &str, key: &'a str) -> Option<&'a str> {
    if base.is_empty() {
        return Some(key.trim_start_matches(KEY_SEPARATOR));
    }
    let rest = key.strip_prefix(base)?;
    if base.ends_with(KEY_SEPARATOR) || rest.is_empty() || rest.starts_with(KEY_SEPARATOR) {
        Some(rest.trim_start_matches(KEY_SEPARATOR))
    } else {
        None
    }
}

/// Map a relative key onto `root`.
///
/// Returns `None` when any segment would step outside `root` (`..`, `.`,
/// drive prefixes or embedded platform separators). Empty segments from
/// doubled separators are ignored.
#[must_use]
pub fn local_destination(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in relative.split(KEY_SEPARATOR).filter(|s| !s.is_empty()) {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) if part == segment => path.push(part),
            _ => return None,
        }
    }
    Some(path)
}

/// Convert a path relative to an upload root into a `/`-separated key.
///
/// Fails when a component is not plain UTF-8 text.
pub fn key_from_relative_path(relative: &Path) -> Result<String, String> {
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| format!("non UTF-8 path component in {}", relative.display()))?;
                segments.push(part);
            }
            Component::CurDir => {}
            _ => return Err(format!("unexpected component in {}", relative.display())),
        }
    }
    Ok(segments.join("/"))
}
