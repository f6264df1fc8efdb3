//! Pure merge and transition rules for action records
//!
//! These functions have no access to the registry map; they compute what
//! should happen and the registry applies it under its lock.

use super::record::ActionKind;

/// How a classified execution result drives the record's lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The remote store accepted the operation.
    Success,
    /// Recoverable failure; eligible for another attempt.
    Retry(String),
    /// The remote version diverged from the local base the action assumed.
    Conflict,
    /// Non-recoverable failure; retrying will not help.
    Fatal(String),
}

/// Decision for a second event arriving while a record is still waiting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Merge {
    /// The pending action already covers the new event.
    Absorb,
    /// The pending action is replaced by a different one.
    Replace(ActionKind),
    /// The events cancel out; the record is retired with nothing to do.
    Drop,
}

/// Merge a newly observed event into a not-yet-executing record
///
/// This is where per-path minimization happens: an editor save burst or a
/// create-then-edit sequence within one window collapses to a single
/// remote operation.
pub fn merge_kinds(existing: &ActionKind, incoming: ActionKind) -> Merge {
    use ActionKind::*;
    match (existing, incoming) {
        // A move always wins: the path itself is changing.
        (_, Move { to }) => Merge::Replace(Move { to }),
        // The pending create will upload the latest content anyway.
        (Create, Update) => Merge::Absorb,
        // Created and deleted before we ever told the remote: net nothing.
        (Create, Delete) => Merge::Drop,
        // The content change is moot, only the delete matters.
        (Update, Delete) => Merge::Replace(Delete),
        // Deleted and recreated while queued: the remote still has the old
        // content, so this is a content change.
        (Delete, Create) => Merge::Replace(Update),
        (a, b) if *a == b => Merge::Absorb,
        (_, incoming) => Merge::Replace(incoming),
    }
}

/// Transition applied when an executing record's operation terminates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionTransition {
    /// `Executing -> Synced`, record retired.
    Synced,
    /// `Executing -> Queued` with the incremented attempt count.
    Requeue { attempts: u32 },
    /// `Executing -> Failed`, record retired for this attempt chain.
    Failed { reason: String },
    /// `Executing -> Conflict`; the resolver runs synchronously from here.
    Conflict,
}

/// Classify a completed operation against the retry budget
pub fn completion_transition(
    attempts: u32,
    max_attempts: u32,
    outcome: ExecutionOutcome,
) -> CompletionTransition {
    match outcome {
        ExecutionOutcome::Success => CompletionTransition::Synced,
        ExecutionOutcome::Conflict => CompletionTransition::Conflict,
        ExecutionOutcome::Fatal(reason) => CompletionTransition::Failed { reason },
        ExecutionOutcome::Retry(reason) => {
            let attempts = attempts + 1;
            if attempts < max_attempts {
                CompletionTransition::Requeue { attempts }
            } else {
                CompletionTransition::Failed { reason }
            }
        }
    }
}
