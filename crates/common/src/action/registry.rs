//! The authoritative per-path map of pending and in-flight actions
//!
//! The registry serializes every read-modify-write on a path's record under
//! one lock, which is what upholds the invariant that at most one
//! non-terminal record exists per path at any instant. Terminal records are
//! removed immediately, so a later change to the same path always starts a
//! fresh record.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::conflict::{self, ConflictRecord};

use super::machine::{self, CompletionTransition, ExecutionOutcome, Merge};
use super::record::{ActionKind, ActionState, FileActionRecord, Origin};

/// What `record_event` did with an observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertEffect {
    /// A record is newly ready; the caller should wake the executor for
    /// this path.
    Enqueued(PathBuf),
    /// Folded into an existing queued record; nothing new to execute.
    Merged,
    /// The events cancelled out and the record was retired unexecuted.
    Dropped,
    /// An operation for this path is in flight; the event waits as a
    /// follow-up and is queued (not injected) when the operation returns.
    Deferred,
}

/// What the caller must do after a completion transition
#[derive(Debug)]
pub struct CompletionEffect {
    pub notice: CompletionNotice,
    /// Paths with freshly queued records (follow-ups, conflict renames).
    pub requeue: Vec<PathBuf>,
}

/// Bus-facing summary of a completion
#[derive(Debug)]
pub enum CompletionNotice {
    Synced { kind: ActionKind },
    Retrying { attempts: u32 },
    Failed { reason: String },
    Conflict(ConflictRecord),
    /// No record was in flight for the path (stale completion).
    Ignored,
}

struct Entry {
    record: FileActionRecord,
    /// Superseding event observed while `Executing`; applied once the
    /// in-flight operation terminates.
    follow_up: Option<(ActionKind, Origin)>,
}

/// Mutex-protected map from path to its single action record
#[derive(Debug)]
pub struct ActionRegistry {
    max_attempts: u32,
    inner: Mutex<HashMap<PathBuf, Entry>>,
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("record", &self.record)
            .field("has_follow_up", &self.follow_up.is_some())
            .finish()
    }
}

impl ActionRegistry {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Fold one observed event into the registry
    ///
    /// New paths get a fresh record (`LocalOnly` promoted immediately to
    /// `Queued`, or directly `Queued` for remote origin). Events against a
    /// queued record are merged by the state machine rules; events against
    /// an executing record are deferred as a follow-up.
    pub fn record_event(&self, path: PathBuf, kind: ActionKind, origin: Origin) -> UpsertEffect {
        let mut inner = self.inner.lock();
        match inner.get_mut(&path) {
            None => {
                let mut record = FileActionRecord::new(path.clone(), kind, origin);
                if record.state == ActionState::LocalOnly {
                    // No user action required between observation and queueing.
                    record.state = ActionState::Queued;
                }
                debug!(path = %path.display(), kind = %record.kind, "queued new action record");
                inner.insert(
                    path.clone(),
                    Entry {
                        record,
                        follow_up: None,
                    },
                );
                UpsertEffect::Enqueued(path)
            }
            Some(entry) if entry.record.state == ActionState::Executing => {
                entry.follow_up = match entry.follow_up.take() {
                    None => Some((kind, origin)),
                    Some((existing, prev_origin)) => match machine::merge_kinds(&existing, kind) {
                        Merge::Absorb => Some((existing, prev_origin)),
                        Merge::Replace(k) => Some((k, origin)),
                        Merge::Drop => None,
                    },
                };
                debug!(path = %path.display(), "deferred event behind in-flight operation");
                UpsertEffect::Deferred
            }
            Some(entry) => match machine::merge_kinds(&entry.record.kind, kind) {
                Merge::Absorb => UpsertEffect::Merged,
                Merge::Replace(k) => {
                    debug!(path = %path.display(), kind = %k, "superseded queued action");
                    entry.record.kind = k;
                    UpsertEffect::Merged
                }
                Merge::Drop => {
                    debug!(path = %path.display(), "events cancelled out, retiring record");
                    inner.remove(&path);
                    UpsertEffect::Dropped
                }
            },
        }
    }

    /// Claim a queued record for execution
    ///
    /// Returns a clone of the record after marking it `Executing`, or `None`
    /// if the path has no queued record (stale wake-up, or already in
    /// flight). This is the single hand-off point that keeps per-path
    /// execution strictly serialized.
    pub fn begin_execution(&self, path: &Path) -> Option<FileActionRecord> {
        let mut inner = self.inner.lock();
        let entry = inner.get_mut(path)?;
        if entry.record.state != ActionState::Queued {
            return None;
        }
        entry.record.state = ActionState::Executing;
        Some(entry.record.clone())
    }

    /// Whether an operation for this path is currently in flight
    pub fn is_executing(&self, path: &Path) -> bool {
        self.inner
            .lock()
            .get(path)
            .map(|e| e.record.state == ActionState::Executing)
            .unwrap_or(false)
    }

    /// Number of live (non-terminal) records
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Current record for a path, if any (observability/tests)
    pub fn get(&self, path: &Path) -> Option<FileActionRecord> {
        self.inner.lock().get(path).map(|e| e.record.clone())
    }

    /// Apply a classified execution result to the in-flight record
    ///
    /// Success retires the record as `Synced`; a recoverable failure within
    /// the attempt budget requeues it; an exhausted budget or fatal failure
    /// retires it as `Failed`. A conflict invokes the resolver synchronously:
    /// the local content is preserved under the conflict rename and queued as
    /// a fresh `Create`, while the original path settles `Synced` against the
    /// authoritative remote version.
    pub fn complete(&self, path: &Path, outcome: ExecutionOutcome) -> CompletionEffect {
        let mut inner = self.inner.lock();
        let Some(mut entry) = inner.remove(path) else {
            warn!(path = %path.display(), "completion for unknown record");
            return CompletionEffect {
                notice: CompletionNotice::Ignored,
                requeue: Vec::new(),
            };
        };
        if entry.record.state != ActionState::Executing {
            warn!(
                path = %path.display(),
                state = ?entry.record.state,
                "completion for record that was not executing"
            );
            inner.insert(path.to_path_buf(), entry);
            return CompletionEffect {
                notice: CompletionNotice::Ignored,
                requeue: Vec::new(),
            };
        }

        let mut requeue = Vec::new();
        let transition =
            machine::completion_transition(entry.record.attempts, self.max_attempts, outcome);
        let notice = match transition {
            CompletionTransition::Synced => {
                let kind = entry.record.kind.clone();
                entry.record.state = ActionState::Synced;
                Self::queue_follow_up(&mut inner, path, entry.follow_up.take(), &mut requeue);
                CompletionNotice::Synced { kind }
            }
            CompletionTransition::Requeue { attempts } => {
                entry.record.state = ActionState::Queued;
                entry.record.attempts = attempts;
                requeue.push(path.to_path_buf());
                inner.insert(path.to_path_buf(), entry);
                CompletionNotice::Retrying { attempts }
            }
            CompletionTransition::Failed { reason } => {
                entry.record.state = ActionState::Failed;
                // Terminal for this attempt chain; a deferred follow-up is a
                // later edit and starts a new record.
                Self::queue_follow_up(&mut inner, path, entry.follow_up.take(), &mut requeue);
                CompletionNotice::Failed { reason }
            }
            CompletionTransition::Conflict => {
                entry.record.state = ActionState::Conflict;
                let renamed = conflict::rename(path);
                let record = ConflictRecord {
                    local_path: path.to_path_buf(),
                    renamed_path: renamed.clone(),
                    detected_at: Utc::now(),
                };
                // The local copy, preserved under the new name, becomes the
                // basis of a fresh create; the remote version is accepted as
                // authoritative at the original path.
                inner.insert(
                    renamed.clone(),
                    Entry {
                        record: {
                            let mut r = FileActionRecord::new(
                                renamed.clone(),
                                ActionKind::Create,
                                Origin::Local,
                            );
                            r.state = ActionState::Queued;
                            r
                        },
                        follow_up: None,
                    },
                );
                requeue.push(renamed);
                Self::queue_follow_up(&mut inner, path, entry.follow_up.take(), &mut requeue);
                CompletionNotice::Conflict(record)
            }
        };

        CompletionEffect { notice, requeue }
    }

    fn queue_follow_up(
        inner: &mut HashMap<PathBuf, Entry>,
        path: &Path,
        follow_up: Option<(ActionKind, Origin)>,
        requeue: &mut Vec<PathBuf>,
    ) {
        if let Some((kind, origin)) = follow_up {
            let mut record = FileActionRecord::new(path.to_path_buf(), kind, origin);
            record.state = ActionState::Queued;
            inner.insert(
                path.to_path_buf(),
                Entry {
                    record,
                    follow_up: None,
                },
            );
            requeue.push(path.to_path_buf());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ActionRegistry {
        ActionRegistry::new(3)
    }

    #[test]
    fn test_new_local_event_is_queued() {
        let reg = registry();
        let effect = reg.record_event("a.txt".into(), ActionKind::Create, Origin::Local);
        assert_eq!(effect, UpsertEffect::Enqueued("a.txt".into()));
        assert_eq!(reg.get(Path::new("a.txt")).unwrap().state, ActionState::Queued);
    }

    #[test]
    fn test_create_update_collapses_to_single_create() {
        let reg = registry();
        reg.record_event("a.txt".into(), ActionKind::Create, Origin::Local);
        let effect = reg.record_event("a.txt".into(), ActionKind::Update, Origin::Local);
        assert_eq!(effect, UpsertEffect::Merged);

        let record = reg.get(Path::new("a.txt")).unwrap();
        assert_eq!(record.kind, ActionKind::Create);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_create_delete_cancels_record() {
        let reg = registry();
        reg.record_event("a.txt".into(), ActionKind::Create, Origin::Local);
        let effect = reg.record_event("a.txt".into(), ActionKind::Delete, Origin::Local);
        assert_eq!(effect, UpsertEffect::Dropped);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_begin_execution_claims_exactly_once() {
        let reg = registry();
        reg.record_event("a.txt".into(), ActionKind::Create, Origin::Local);

        let first = reg.begin_execution(Path::new("a.txt"));
        assert!(first.is_some());
        assert_eq!(first.unwrap().state, ActionState::Executing);

        // A second claim for the same path must be refused.
        assert!(reg.begin_execution(Path::new("a.txt")).is_none());
    }

    #[test]
    fn test_event_during_execution_is_deferred_then_requeued() {
        let reg = registry();
        reg.record_event("a.txt".into(), ActionKind::Create, Origin::Local);
        reg.begin_execution(Path::new("a.txt")).unwrap();

        let effect = reg.record_event("a.txt".into(), ActionKind::Update, Origin::Local);
        assert_eq!(effect, UpsertEffect::Deferred);

        let effect = reg.complete(Path::new("a.txt"), ExecutionOutcome::Success);
        assert!(matches!(effect.notice, CompletionNotice::Synced { .. }));
        assert_eq!(effect.requeue, vec![PathBuf::from("a.txt")]);

        let record = reg.get(Path::new("a.txt")).unwrap();
        assert_eq!(record.kind, ActionKind::Update);
        assert_eq!(record.state, ActionState::Queued);
    }

    #[test]
    fn test_success_retires_record() {
        let reg = registry();
        reg.record_event("a.txt".into(), ActionKind::Create, Origin::Local);
        reg.begin_execution(Path::new("a.txt")).unwrap();

        let effect = reg.complete(Path::new("a.txt"), ExecutionOutcome::Success);
        assert!(matches!(effect.notice, CompletionNotice::Synced { .. }));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_retry_increments_attempts_until_failed() {
        let reg = registry();
        reg.record_event("a.txt".into(), ActionKind::Update, Origin::Local);

        for expected_attempts in 1..3u32 {
            reg.begin_execution(Path::new("a.txt")).unwrap();
            let effect = reg.complete(
                Path::new("a.txt"),
                ExecutionOutcome::Retry("unreachable".into()),
            );
            match effect.notice {
                CompletionNotice::Retrying { attempts } => {
                    assert_eq!(attempts, expected_attempts)
                }
                other => panic!("expected Retrying, got {:?}", other),
            }
        }

        reg.begin_execution(Path::new("a.txt")).unwrap();
        let effect = reg.complete(
            Path::new("a.txt"),
            ExecutionOutcome::Retry("unreachable".into()),
        );
        assert!(matches!(effect.notice, CompletionNotice::Failed { .. }));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_conflict_queues_create_for_renamed_path() {
        let reg = registry();
        reg.record_event("report.docx".into(), ActionKind::Update, Origin::Local);
        reg.begin_execution(Path::new("report.docx")).unwrap();

        let effect = reg.complete(Path::new("report.docx"), ExecutionOutcome::Conflict);
        let record = match effect.notice {
            CompletionNotice::Conflict(record) => record,
            other => panic!("expected Conflict, got {:?}", other),
        };

        assert_eq!(record.local_path, PathBuf::from("report.docx"));
        assert_ne!(record.renamed_path, record.local_path);
        assert_eq!(effect.requeue, vec![record.renamed_path.clone()]);

        // The original path settled; the renamed path is queued as a create.
        assert!(reg.get(Path::new("report.docx")).is_none());
        let queued = reg.get(&record.renamed_path).unwrap();
        assert_eq!(queued.kind, ActionKind::Create);
        assert_eq!(queued.state, ActionState::Queued);
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let reg = registry();
        let effect = reg.complete(Path::new("ghost.txt"), ExecutionOutcome::Success);
        assert!(matches!(effect.notice, CompletionNotice::Ignored));
    }
}
