//! Action record types

use std::path::PathBuf;

/// Which side first reported the change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Remote,
}

/// The synchronization operation a record will perform against the remote
/// store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Create,
    Update,
    Delete,
    Move {
        /// Destination of the move; the record's own path is the source.
        to: PathBuf,
    },
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Update => "update",
            ActionKind::Delete => "delete",
            ActionKind::Move { .. } => "move",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle state of an action record
///
/// Happy path: `LocalOnly -> Queued -> Executing -> Synced`. An executing
/// record may instead end `Failed` (retry budget exhausted) or pass through
/// `Conflict` (resolved synchronously by rename, after which a fresh record
/// is queued for the renamed path).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    /// Observed locally, not yet queued (promoted immediately).
    LocalOnly,
    /// Waiting for an executor worker.
    Queued,
    /// A remote operation for this path is in flight.
    Executing,
    /// Terminal: the remote store accepted the action.
    Synced,
    /// Terminal for this attempt chain: retry budget exhausted.
    Failed,
    /// The remote version diverged from the local base; being resolved.
    Conflict,
}

impl ActionState {
    /// Terminal states retire the record; any further change to the path
    /// starts a new record.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionState::Synced | ActionState::Failed)
    }
}

/// One pending or in-flight action for a watched path
///
/// Owned exclusively by the registry; the executor holds a transient clone
/// while the record is `Executing` and reports back through the registry on
/// completion.
#[derive(Debug, Clone)]
pub struct FileActionRecord {
    pub path: PathBuf,
    pub kind: ActionKind,
    pub state: ActionState,
    /// Execution attempts so far, bounded by `SyncConfig::max_attempts`.
    pub attempts: u32,
    pub origin: Origin,
}

impl FileActionRecord {
    /// Create a fresh record for a newly observed change
    ///
    /// Local-origin records start at `LocalOnly`; remote-origin changes skip
    /// local-only bookkeeping and enter at `Queued`.
    pub fn new(path: PathBuf, kind: ActionKind, origin: Origin) -> Self {
        let state = match origin {
            Origin::Local => ActionState::LocalOnly,
            Origin::Remote => ActionState::Queued,
        };
        Self {
            path,
            kind,
            state,
            attempts: 0,
            origin,
        }
    }
}
