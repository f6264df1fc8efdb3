//! Message value types published on the notification bus
//!
//! These are emitted by the aggregator and the executor as the lifecycle of
//! watched paths progresses, and consumed by presentation-layer observers.

use std::path::PathBuf;

use super::Notification;
use crate::action::ActionKind;

/// Per-window tally of raw filesystem events
///
/// Counts are raw tallies: every observed event is counted independently,
/// even multiple events for the same path within one window. Per-path
/// minimization happens downstream in the action registry, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregatedFileEventStatus {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    pub moved: usize,
}

impl AggregatedFileEventStatus {
    pub fn total(&self) -> usize {
        self.added + self.modified + self.deleted + self.moved
    }
}

/// Published when the executor hands an action to the remote store
#[derive(Debug, Clone)]
pub struct FileExecutionStarted {
    pub path: PathBuf,
    pub kind: ActionKind,
}

/// Published when a remote operation completed and the record went `Synced`
#[derive(Debug, Clone)]
pub struct FileExecutionSucceeded {
    pub path: PathBuf,
    /// The action type that was applied remotely.
    pub kind: ActionKind,
}

/// Published when a record exhausted its retry budget and went `Failed`
#[derive(Debug, Clone)]
pub struct FileExecutionFailed {
    pub path: PathBuf,
    pub reason: String,
}

/// Informational message for UI surfaces
#[derive(Debug, Clone)]
pub struct InformationMessage {
    pub title: String,
    pub description: String,
}

/// Warning message for UI surfaces
#[derive(Debug, Clone)]
pub struct WarningMessage {
    pub title: String,
    pub description: String,
}

impl Notification for AggregatedFileEventStatus {}
impl Notification for FileExecutionStarted {}
impl Notification for FileExecutionSucceeded {}
impl Notification for FileExecutionFailed {}
impl Notification for InformationMessage {}
impl Notification for WarningMessage {}
