//! In-process loopback store
//!
//! Applies actions to an in-memory path map and pushes injected "peer"
//! changes back out through the remote-event subscription. Used by the
//! integration tests and for single-node operation while no networked
//! backend is attached.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::action::ActionKind;
use crate::aggregator::EventKind;
use crate::error::StoreError;

use super::{OperationDescriptor, PendingOperation, RemoteEvent, RemoteOutcome, RemoteStore};

#[derive(Debug, Default)]
struct Inner {
    /// Version counter per stored path.
    entries: Mutex<HashMap<PathBuf, u64>>,
    subscribers: Mutex<Vec<flume::Sender<RemoteEvent>>>,
    /// Paths whose next operation reports a divergent remote version.
    diverged: Mutex<HashSet<PathBuf>>,
    /// Remaining operations that fail with `Unavailable`.
    unavailable_budget: AtomicU32,
    /// Applied operations, oldest first.
    applied: Mutex<Vec<(PathBuf, ActionKind)>>,
    /// Simulated operation latency.
    latency: Mutex<Duration>,
    /// Per-path count of armed operations, for serialization probes.
    in_flight: Mutex<HashMap<PathBuf, u32>>,
    max_overlap: AtomicU32,
    connected: AtomicBool,
}

/// See module docs
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a concurrent change made by a peer
    ///
    /// Bumps the stored version and pushes the notification to every
    /// remote-event subscriber.
    pub fn inject_remote_change(&self, path: impl Into<PathBuf>, kind: EventKind) {
        let path = path.into();
        {
            let mut entries = self.inner.entries.lock();
            match &kind {
                EventKind::Deleted => {
                    entries.remove(&path);
                }
                EventKind::Moved { to } => {
                    let version = entries.remove(&path).unwrap_or(0);
                    entries.insert(to.clone(), version + 1);
                }
                _ => {
                    *entries.entry(path.clone()).or_insert(0) += 1;
                }
            }
        }
        self.notify(RemoteEvent::Changed { path, kind });
    }

    /// Simulate a peer sharing a folder with us
    pub fn inject_share(&self, path: impl Into<PathBuf>, peer: impl Into<String>) {
        self.notify(RemoteEvent::Shared {
            path: path.into(),
            peer: peer.into(),
        });
    }

    /// Make the next operation on `path` report a divergent remote version
    pub fn mark_diverged(&self, path: impl Into<PathBuf>) {
        self.inner.diverged.lock().insert(path.into());
    }

    /// Make the next `n` operations fail as unavailable
    pub fn fail_next(&self, n: u32) {
        self.inner.unavailable_budget.store(n, Ordering::SeqCst);
    }

    /// Add latency to every operation (widens overlap windows in tests)
    pub fn set_latency(&self, latency: Duration) {
        *self.inner.latency.lock() = latency;
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.inner.entries.lock().contains_key(path)
    }

    pub fn version(&self, path: &Path) -> Option<u64> {
        self.inner.entries.lock().get(path).copied()
    }

    /// Operations applied so far, oldest first
    pub fn applied(&self) -> Vec<(PathBuf, ActionKind)> {
        self.inner.applied.lock().clone()
    }

    /// Highest number of operations ever in flight for a single path
    pub fn max_overlap(&self) -> u32 {
        self.inner.max_overlap.load(Ordering::SeqCst)
    }

    fn notify(&self, event: RemoteEvent) {
        let mut subscribers = self.inner.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn apply(inner: &Inner, path: &Path, kind: &ActionKind) {
        let mut entries = inner.entries.lock();
        match kind {
            ActionKind::Create | ActionKind::Update => {
                *entries.entry(path.to_path_buf()).or_insert(0) += 1;
            }
            ActionKind::Delete => {
                entries.remove(path);
            }
            ActionKind::Move { to } => {
                let version = entries.remove(path).unwrap_or(0);
                entries.insert(to.clone(), version + 1);
            }
        }
        inner.applied.lock().push((path.to_path_buf(), kind.clone()));
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn connect_or_join(&self, bootstrap: Option<String>) -> Result<bool, StoreError> {
        self.inner.connected.store(true, Ordering::SeqCst);
        debug!(bootstrap = ?bootstrap, "loopback store connected");
        // Nothing to join in-process; we always form our own network.
        Ok(false)
    }

    async fn create_action(
        &self,
        path: &Path,
        kind: ActionKind,
    ) -> Result<PendingOperation, StoreError> {
        let descriptor = OperationDescriptor {
            id: Uuid::new_v4(),
            path: path.to_path_buf(),
            kind: kind.clone(),
        };
        let inner = self.inner.clone();
        let path = path.to_path_buf();

        let fut = Box::pin(async move {
            {
                let mut in_flight = inner.in_flight.lock();
                let count = in_flight.entry(path.clone()).or_insert(0);
                *count += 1;
                inner.max_overlap.fetch_max(*count, Ordering::SeqCst);
            }

            let latency = *inner.latency.lock();
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            let result = if inner
                .unavailable_budget
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                Err(StoreError::Unavailable("injected outage".to_string()))
            } else if inner.diverged.lock().remove(&path) {
                Ok(RemoteOutcome::Diverged)
            } else {
                Self::apply(&inner, &path, &kind);
                Ok(RemoteOutcome::Applied)
            };

            if let Some(count) = inner.in_flight.lock().get_mut(&path) {
                *count = count.saturating_sub(1);
            }

            result
        });

        Ok(PendingOperation::new(descriptor, fut))
    }

    fn subscribe_remote_events(&self, listener: flume::Sender<RemoteEvent>) {
        self.inner.subscribers.lock().push(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_applied_action_is_visible() {
        let store = MemoryStore::new();
        let op = store
            .create_action(Path::new("a.txt"), ActionKind::Create)
            .await
            .unwrap();
        assert_eq!(op.descriptor().path, PathBuf::from("a.txt"));

        let outcome = op.start().await.unwrap();
        assert_eq!(outcome, RemoteOutcome::Applied);
        assert!(store.contains(Path::new("a.txt")));
    }

    #[tokio::test]
    async fn test_diverged_path_reports_conflict_once() {
        let store = MemoryStore::new();
        store.mark_diverged("a.txt");

        let op = store
            .create_action(Path::new("a.txt"), ActionKind::Update)
            .await
            .unwrap();
        assert_eq!(op.start().await.unwrap(), RemoteOutcome::Diverged);

        let op = store
            .create_action(Path::new("a.txt"), ActionKind::Update)
            .await
            .unwrap();
        assert_eq!(op.start().await.unwrap(), RemoteOutcome::Applied);
    }

    #[tokio::test]
    async fn test_injected_outage_consumes_budget() {
        let store = MemoryStore::new();
        store.fail_next(1);

        let op = store
            .create_action(Path::new("a.txt"), ActionKind::Create)
            .await
            .unwrap();
        assert!(matches!(
            op.start().await,
            Err(StoreError::Unavailable(_))
        ));

        let op = store
            .create_action(Path::new("a.txt"), ActionKind::Create)
            .await
            .unwrap();
        assert!(op.start().await.is_ok());
    }

    #[tokio::test]
    async fn test_remote_change_reaches_subscriber() {
        let store = MemoryStore::new();
        let (tx, rx) = flume::unbounded();
        store.subscribe_remote_events(tx);

        store.inject_remote_change("b.txt", EventKind::Added);
        match rx.recv_async().await.unwrap() {
            RemoteEvent::Changed { path, kind } => {
                assert_eq!(path, PathBuf::from("b.txt"));
                assert_eq!(kind, EventKind::Added);
            }
            other => panic!("expected Changed, got {:?}", other),
        }
    }
}
