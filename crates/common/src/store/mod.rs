//! Remote store collaborator seam
//!
//! The peer-to-peer content store is opaque to this core: it is anything
//! that can connect, accept one asynchronous operation per action, and push
//! remote change notifications. Networked backends implement [`RemoteStore`]
//! elsewhere; [`MemoryStore`] is the in-process loopback used for tests and
//! single-node operation.

mod memory;

pub use memory::MemoryStore;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::action::ActionKind;
use crate::aggregator::EventKind;
use crate::error::StoreError;

/// How the remote store settled an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// The store accepted and applied the action.
    Applied,
    /// The store's current version of the path diverged from the base the
    /// action assumed; a straight overwrite would discard one side's data.
    Diverged,
}

/// Instrumentation view of one remote operation
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub id: Uuid,
    pub path: PathBuf,
    pub kind: ActionKind,
}

/// Single-shot handle for one remote operation
///
/// Consuming `start` arms the underlying operation and yields the future of
/// its result, so starting twice is impossible by construction. There is no
/// mid-flight cancellation in this design; dropping the returned future
/// abandons the wait, not the operation.
pub struct PendingOperation {
    descriptor: OperationDescriptor,
    fut: BoxFuture<'static, Result<RemoteOutcome, StoreError>>,
}

impl PendingOperation {
    pub fn new(
        descriptor: OperationDescriptor,
        fut: BoxFuture<'static, Result<RemoteOutcome, StoreError>>,
    ) -> Self {
        Self { descriptor, fut }
    }

    /// Inspect the underlying operation without starting it
    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }

    /// Arm the operation and return the future of its eventual result
    pub fn start(self) -> BoxFuture<'static, Result<RemoteOutcome, StoreError>> {
        self.fut
    }
}

impl std::fmt::Debug for PendingOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingOperation")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// Change notification pushed by the remote store
#[derive(Debug, Clone)]
pub enum RemoteEvent {
    /// A peer changed a path; feeds the aggregator exactly like a local
    /// event, tagged with remote origin.
    Changed { path: PathBuf, kind: EventKind },
    /// A peer shared a folder with us; informational only.
    Shared { path: PathBuf, peer: String },
}

/// Async CRUD-and-subscribe contract of the remote store
#[async_trait]
pub trait RemoteStore: Send + Sync + std::fmt::Debug {
    /// Connect to the store, optionally joining via a bootstrap address
    ///
    /// Returns whether an existing network was joined (as opposed to a new
    /// one being formed).
    async fn connect_or_join(&self, bootstrap: Option<String>) -> Result<bool, StoreError>;

    /// Build the single-shot operation for one action
    ///
    /// The operation is not armed until `start` is called on the returned
    /// handle.
    async fn create_action(
        &self,
        path: &Path,
        kind: ActionKind,
    ) -> Result<PendingOperation, StoreError>;

    /// Register a listener for remote change notifications
    fn subscribe_remote_events(&self, listener: flume::Sender<RemoteEvent>);
}
