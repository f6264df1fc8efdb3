//! Action executor
//!
//! A bounded pool of worker tasks drains a job channel of paths that have a
//! queued record, claims each record from the registry (at most one
//! outstanding remote operation per path), runs the remote store's
//! single-shot operation, classifies the result and feeds it back into the
//! registry's transition rules, publishing lifecycle messages on the bus
//! around the call.
//!
//! Workers gate on the session: while no authenticated session is
//! established, queued records wait in the channel and are never dropped.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::action::{ActionRegistry, CompletionNotice, FileActionRecord};
use crate::bus::{
    FileExecutionFailed, FileExecutionStarted, FileExecutionSucceeded, NotificationBus,
    WarningMessage,
};
use crate::config::SyncConfig;
use crate::error::{Result, StoreError, SyncError};
use crate::session::SessionGate;
use crate::store::{RemoteOutcome, RemoteStore};

pub use crate::action::machine::ExecutionOutcome;

/// Cloneable handle for pushing work at the executor
///
/// `submit` is the checked entry point (rejects paths with an in-flight
/// operation); `wake` is the unchecked one used by the aggregator and the
/// registry's requeue effects, where the registry has already arbitrated.
#[derive(Debug, Clone)]
pub struct ActionDispatcher {
    tx: flume::Sender<PathBuf>,
    registry: Arc<ActionRegistry>,
}

impl ActionDispatcher {
    pub fn new(tx: flume::Sender<PathBuf>, registry: Arc<ActionRegistry>) -> Self {
        Self { tx, registry }
    }

    /// Submit a record for execution
    ///
    /// Rejects with [`SyncError::AlreadyExecuting`] if another record for
    /// the same path is in flight; the record is not submitted.
    pub fn submit(&self, record: &FileActionRecord) -> Result<()> {
        if self.registry.is_executing(&record.path) {
            return Err(SyncError::AlreadyExecuting(record.path.clone()));
        }
        self.wake(record.path.clone())
    }

    /// Signal that a path has a queued record ready to claim
    pub fn wake(&self, path: PathBuf) -> Result<()> {
        self.tx.send(path).map_err(|_| SyncError::ChannelClosed)
    }
}

struct ExecutorInner {
    store: Arc<dyn RemoteStore>,
    registry: Arc<ActionRegistry>,
    bus: NotificationBus,
    session: SessionGate,
    tx: flume::Sender<PathBuf>,
}

/// See module docs
pub struct ActionExecutor {
    inner: Arc<ExecutorInner>,
    rx: flume::Receiver<PathBuf>,
    workers: usize,
}

impl ActionExecutor {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        registry: Arc<ActionRegistry>,
        bus: NotificationBus,
        session: SessionGate,
        config: &SyncConfig,
    ) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            inner: Arc::new(ExecutorInner {
                store,
                registry,
                bus,
                session,
                tx,
            }),
            rx,
            workers: config.workers.max(1),
        }
    }

    /// Handle for producers; clone freely
    pub fn dispatcher(&self) -> ActionDispatcher {
        ActionDispatcher::new(self.inner.tx.clone(), self.inner.registry.clone())
    }

    /// Spawn the worker pool onto the current runtime
    ///
    /// Workers run until aborted; the agent owns the returned handles.
    pub fn spawn(self) -> Vec<tokio::task::JoinHandle<()>> {
        (0..self.workers)
            .map(|worker| {
                let inner = self.inner.clone();
                let rx = self.rx.clone();
                tokio::spawn(async move {
                    debug!(worker, "executor worker started");
                    Self::run_worker(inner, rx).await;
                    debug!(worker, "executor worker stopped");
                })
            })
            .collect()
    }

    async fn run_worker(inner: Arc<ExecutorInner>, rx: flume::Receiver<PathBuf>) {
        while let Ok(path) = rx.recv_async().await {
            // Queued records wait here while no session is established.
            inner.session.wait_authenticated().await;

            // Stale wake-ups (superseded, dropped, or already-claimed
            // records) fall through harmlessly.
            let Some(record) = inner.registry.begin_execution(&path) else {
                continue;
            };

            inner.bus.publish(FileExecutionStarted {
                path: path.clone(),
                kind: record.kind.clone(),
            });

            let outcome = Self::execute(&inner, &record).await;
            let effect = inner.registry.complete(&path, outcome);

            match effect.notice {
                CompletionNotice::Synced { kind } => {
                    info!(path = %path.display(), kind = %kind, "synced");
                    inner.bus.publish(FileExecutionSucceeded {
                        path: path.clone(),
                        kind,
                    });
                }
                CompletionNotice::Retrying { attempts } => {
                    debug!(path = %path.display(), attempts, "retrying");
                }
                CompletionNotice::Failed { reason } => {
                    warn!(path = %path.display(), reason = %reason, "action failed");
                    inner.bus.publish(FileExecutionFailed {
                        path: path.clone(),
                        reason,
                    });
                }
                CompletionNotice::Conflict(record) => {
                    info!(
                        path = %record.local_path.display(),
                        renamed = %record.renamed_path.display(),
                        "conflict resolved by rename"
                    );
                    inner.bus.publish(WarningMessage {
                        title: "Sync conflict".to_string(),
                        description: format!(
                            "{} changed remotely; your copy was kept as {}",
                            record.local_path.display(),
                            record.renamed_path.display()
                        ),
                    });
                    inner.bus.publish(record);
                }
                CompletionNotice::Ignored => {}
            }

            for requeue in effect.requeue {
                if inner.tx.send(requeue).is_err() {
                    warn!("job channel closed while requeueing");
                }
            }
        }
    }

    /// Run one remote operation and classify its result
    async fn execute(inner: &ExecutorInner, record: &FileActionRecord) -> ExecutionOutcome {
        let pending = match inner
            .store
            .create_action(&record.path, record.kind.clone())
            .await
        {
            Ok(pending) => pending,
            Err(e) => return Self::classify(e),
        };

        debug!(
            op = %pending.descriptor().id,
            path = %record.path.display(),
            kind = %record.kind,
            attempt = record.attempts + 1,
            "starting remote operation"
        );

        match pending.start().await {
            Ok(RemoteOutcome::Applied) => ExecutionOutcome::Success,
            Ok(RemoteOutcome::Diverged) => ExecutionOutcome::Conflict,
            Err(e) => Self::classify(e),
        }
    }

    fn classify(error: StoreError) -> ExecutionOutcome {
        match error {
            StoreError::Unavailable(reason) => ExecutionOutcome::Retry(reason),
            StoreError::Fatal(reason) => ExecutionOutcome::Fatal(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, Origin};
    use crate::store::MemoryStore;
    use std::path::Path;
    use std::time::Duration;

    fn harness(max_attempts: u32) -> (MemoryStore, Arc<ActionRegistry>, ActionDispatcher) {
        let store = MemoryStore::new();
        let registry = Arc::new(ActionRegistry::new(max_attempts));
        let executor = ActionExecutor::new(
            Arc::new(store.clone()),
            registry.clone(),
            NotificationBus::new(),
            SessionGate::open(),
            &SyncConfig::default(),
        );
        let dispatcher = executor.dispatcher();
        executor.spawn();
        (store, registry, dispatcher)
    }

    #[tokio::test]
    async fn test_queued_record_executes_and_syncs() {
        let (store, registry, dispatcher) = harness(3);

        registry.record_event("a.txt".into(), ActionKind::Create, Origin::Local);
        dispatcher.wake("a.txt".into()).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.contains(Path::new("a.txt")));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_submit_rejects_in_flight_path() {
        let (store, registry, dispatcher) = harness(3);
        store.set_latency(Duration::from_millis(200));

        registry.record_event("a.txt".into(), ActionKind::Create, Origin::Local);
        let record = registry.get(Path::new("a.txt")).unwrap();
        dispatcher.submit(&record).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(registry.is_executing(Path::new("a.txt")));
        assert!(matches!(
            dispatcher.submit(&record),
            Err(SyncError::AlreadyExecuting(_))
        ));
    }

    #[tokio::test]
    async fn test_transient_failure_retries_to_success() {
        let (store, registry, dispatcher) = harness(3);
        store.fail_next(1);

        registry.record_event("a.txt".into(), ActionKind::Update, Origin::Local);
        dispatcher.wake("a.txt".into()).unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(store.contains(Path::new("a.txt")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_wake_after_shutdown_reports_closed_channel() {
        let registry = Arc::new(ActionRegistry::new(3));
        let (tx, rx) = flume::unbounded();
        drop(rx);

        let dispatcher = ActionDispatcher::new(tx, registry);
        assert!(matches!(
            dispatcher.wake("a.txt".into()),
            Err(SyncError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_unauthenticated_session_holds_work() {
        let store = MemoryStore::new();
        let registry = Arc::new(ActionRegistry::new(3));
        let session = SessionGate::new();
        let executor = ActionExecutor::new(
            Arc::new(store.clone()),
            registry.clone(),
            NotificationBus::new(),
            session.clone(),
            &SyncConfig::default(),
        );
        let dispatcher = executor.dispatcher();
        executor.spawn();

        registry.record_event("a.txt".into(), ActionKind::Create, Origin::Local);
        dispatcher.wake("a.txt".into()).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        // Queued, waiting, not dropped.
        assert!(!store.contains(Path::new("a.txt")));
        assert_eq!(registry.len(), 1);

        session.set_authenticated(true);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.contains(Path::new("a.txt")));
    }
}
