//! Conflict-rename resolver
//!
//! When the remote store reports a version of a path that diverged from the
//! base the local action assumed, the local content is preserved under a
//! renamed path and the remote version is accepted as authoritative at the
//! original path. Resolution never merges content and never deletes data
//! from either side.
//!
//! The rename is deterministic for a given path and instant:
//! `document.txt` conflicting at 2024-01-01 10:00:00 becomes
//! `document_CONFLICT_2024-01-01_10-00-00.txt`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, Utc};

use crate::bus::Notification;

/// Timestamp layout embedded in conflict filenames (one-second granularity)
const CONFLICT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Record of one resolved conflict, published on the notification bus
///
/// Never persisted beyond the notification.
#[derive(Debug, Clone)]
pub struct ConflictRecord {
    /// The path where the divergence was detected.
    pub local_path: PathBuf,
    /// Where the local content was preserved.
    pub renamed_path: PathBuf,
    pub detected_at: DateTime<Utc>,
}

impl Notification for ConflictRecord {}

/// Compute the conflict name for `path` at the given instant
///
/// Splits the filename with standard extension-detection semantics
/// (`archive.tar.gz` has stem `archive.tar` and extension `gz`) and
/// produces `<stem>_CONFLICT_<timestamp>.<ext>`, preserving the parent
/// directory and the original extension.
///
/// The output never equals the input. Two calls for the same path within
/// the same second produce the same name; uniqueness at one-second
/// granularity is a documented limitation, not a guaranteed key.
pub fn conflict_path(path: &Path, at: NaiveDateTime) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str());
    let timestamp = at.format(CONFLICT_TIMESTAMP_FORMAT);

    let conflict_name = match ext {
        Some(ext) => format!("{}_CONFLICT_{}.{}", stem, timestamp, ext),
        None => format!("{}_CONFLICT_{}", stem, timestamp),
    };

    match path.parent() {
        Some(parent) if parent != Path::new("") => parent.join(conflict_name),
        _ => PathBuf::from(conflict_name),
    }
}

/// Compute the conflict name for `path` stamped with the current local time
pub fn rename(path: &Path) -> PathBuf {
    conflict_path(path, Local::now().naive_local())
}
