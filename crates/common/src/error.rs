//! Error taxonomy for the synchronization core
//!
//! No error in this crate is fatal to the agent process: watcher failures
//! are logged and dropped, execution failures surface through the
//! notification bus as [`StoreError`] classifications, an unauthenticated
//! session makes queued records wait rather than fail, and conflicts are
//! always resolved by rename. What remains as `SyncError` is the dispatch
//! seam: rejected submissions and a closed job channel.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A submission was rejected because an operation for the same path is
    /// already in flight.
    #[error("an action is already executing for {}", .0.display())]
    AlreadyExecuting(PathBuf),

    /// The executor's job channel was closed (shutdown in progress).
    #[error("executor job channel closed")]
    ChannelClosed,
}

/// Errors surfaced by the remote store collaborator.
///
/// A divergent concurrent version is not an error at this seam, it is a
/// [`RemoteOutcome::Diverged`](crate::store::RemoteOutcome) result.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Transient: the operation may succeed on a later attempt.
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    /// Non-transient: retrying will not help.
    #[error("fatal store error: {0}")]
    Fatal(String),
}
