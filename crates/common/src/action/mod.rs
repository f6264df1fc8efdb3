//! Per-path action records and their lifecycle
//!
//! Every watched path with a pending or in-flight synchronization action has
//! exactly one [`FileActionRecord`], owned by the [`ActionRegistry`]. The
//! pure merge and transition rules live in [`machine`]; the registry applies
//! them under its lock so the one-record-per-path invariant is enforced
//! structurally rather than by convention.

pub mod machine;
mod record;
mod registry;

pub use machine::{ExecutionOutcome, Merge};
pub use record::{ActionKind, ActionState, FileActionRecord, Origin};
pub use registry::{ActionRegistry, CompletionEffect, CompletionNotice, UpsertEffect};
