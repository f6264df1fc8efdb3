//! Synchronization core for skiff
//!
//! This crate provides the components that keep a watched folder consistent
//! with an eventually-consistent remote content store:
//! - Event debouncing and aggregation into per-window batches
//! - Per-path action records, merge rules and lifecycle state machine
//! - Asynchronous action execution with per-path serialization
//! - Deterministic conflict renaming (never merges, never deletes)
//! - Typed notification bus for observers

pub mod action;
pub mod aggregator;
pub mod bus;
pub mod config;
pub mod conflict;
pub mod error;
pub mod executor;
pub mod session;
pub mod store;

pub use action::{ActionKind, ActionState, ActionRegistry, FileActionRecord, Origin};
pub use aggregator::{AggregatedEventBatch, EventAggregator, EventKind, RawEvent};
pub use bus::{
    AggregatedFileEventStatus, FileExecutionFailed, FileExecutionStarted, FileExecutionSucceeded,
    InformationMessage, Notification, NotificationBus, SubscriptionId, WarningMessage,
};
pub use config::SyncConfig;
pub use conflict::{conflict_path, ConflictRecord};
pub use error::{Result, StoreError, SyncError};
pub use executor::{ActionDispatcher, ActionExecutor, ExecutionOutcome};
pub use session::SessionGate;
pub use store::{
    MemoryStore, OperationDescriptor, PendingOperation, RemoteEvent, RemoteOutcome, RemoteStore,
};
