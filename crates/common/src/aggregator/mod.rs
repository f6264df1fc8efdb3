//! Event debouncer/aggregator
//!
//! Absorbs event storms (an editor save can trigger several OS
//! notifications) into one batch per fixed time window. The window opens on
//! the first event after a flush and fires once after the configured delay;
//! it is not restarted by later events. After a flush the next incoming
//! event opens a brand-new window.
//!
//! Per-window hand-off is copy-and-clear: producers append to the pending
//! list under its own lock and never block on a flush. The flush tallies
//! every raw observation into one [`AggregatedFileEventStatus`] (counts are
//! not netted per path) and pushes each observation into the action
//! registry, where per-path minimization happens.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::action::{ActionKind, ActionRegistry, Origin, UpsertEffect};
use crate::bus::{AggregatedFileEventStatus, NotificationBus};
use crate::config::SyncConfig;
use crate::executor::ActionDispatcher;

/// Raw change kind as observed by a watcher or pushed by the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Added,
    Modified,
    Deleted,
    Moved { to: PathBuf },
}

impl EventKind {
    fn into_action(self) -> ActionKind {
        match self {
            EventKind::Added => ActionKind::Create,
            EventKind::Modified => ActionKind::Update,
            EventKind::Deleted => ActionKind::Delete,
            EventKind::Moved { to } => ActionKind::Move { to },
        }
    }
}

/// One observed event, as appended by a producer
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub path: PathBuf,
    pub kind: EventKind,
    pub origin: Origin,
}

/// Immutable snapshot of one debounce window, produced at flush time
#[derive(Debug)]
pub struct AggregatedEventBatch {
    pub status: AggregatedFileEventStatus,
    pub events: Vec<RawEvent>,
}

impl AggregatedEventBatch {
    fn new(events: Vec<RawEvent>) -> Self {
        let mut status = AggregatedFileEventStatus::default();
        for event in &events {
            match event.kind {
                EventKind::Added => status.added += 1,
                EventKind::Modified => status.modified += 1,
                EventKind::Deleted => status.deleted += 1,
                EventKind::Moved { .. } => status.moved += 1,
            }
        }
        Self { status, events }
    }
}

struct AggregatorInner {
    window: Duration,
    pending: Mutex<Vec<RawEvent>>,
    flush_armed: AtomicBool,
    bus: NotificationBus,
    registry: Arc<ActionRegistry>,
    dispatcher: ActionDispatcher,
    runtime: tokio::runtime::Handle,
}

/// See module docs
///
/// Cheap to clone; producers (watcher callbacks, remote-event routing, the
/// control surface) each hold a clone and may append from any thread.
#[derive(Clone)]
pub struct EventAggregator {
    inner: Arc<AggregatorInner>,
}

impl EventAggregator {
    /// Must be called from within a tokio runtime; the flush timer task is
    /// spawned onto the current runtime even when events later arrive from
    /// non-runtime threads (watcher callbacks).
    pub fn new(
        config: &SyncConfig,
        bus: NotificationBus,
        registry: Arc<ActionRegistry>,
        dispatcher: ActionDispatcher,
    ) -> Self {
        Self {
            inner: Arc::new(AggregatorInner {
                window: config.debounce_window(),
                pending: Mutex::new(Vec::new()),
                flush_armed: AtomicBool::new(false),
                bus,
                registry,
                dispatcher,
                runtime: tokio::runtime::Handle::current(),
            }),
        }
    }

    /// Append one raw event to the current window
    ///
    /// The first event after a flush arms the single flush timer; concurrent
    /// calls during the pending window keep appending to the same batch.
    pub fn observe(&self, path: PathBuf, kind: EventKind, origin: Origin) {
        trace!(path = %path.display(), kind = ?kind, origin = ?origin, "observed event");
        self.inner.pending.lock().push(RawEvent { path, kind, origin });

        if !self.inner.flush_armed.swap(true, Ordering::SeqCst) {
            let inner = self.inner.clone();
            self.inner.runtime.spawn(async move {
                tokio::time::sleep(inner.window).await;
                Self::flush(&inner);
            });
        }
    }

    /// Flush whatever is pending without waiting for the timer
    ///
    /// Used at shutdown so the last window is not lost. The armed timer may
    /// still fire afterwards; it finds an empty batch and does nothing.
    pub fn flush_now(&self) {
        Self::flush(&self.inner);
    }

    fn flush(inner: &Arc<AggregatorInner>) {
        // Disarm before taking the snapshot: an event sneaking in between
        // the two steps either lands in this batch or arms a fresh window,
        // never neither.
        inner.flush_armed.store(false, Ordering::SeqCst);
        let events = std::mem::take(&mut *inner.pending.lock());
        if events.is_empty() {
            return;
        }

        let batch = AggregatedEventBatch::new(events);
        debug!(
            added = batch.status.added,
            modified = batch.status.modified,
            deleted = batch.status.deleted,
            moved = batch.status.moved,
            "window flushed"
        );
        inner.bus.publish(batch.status);

        for event in batch.events {
            let effect =
                inner
                    .registry
                    .record_event(event.path, event.kind.into_action(), event.origin);
            if let UpsertEffect::Enqueued(path) = effect {
                if let Err(e) = inner.dispatcher.wake(path) {
                    debug!("executor not accepting work: {}", e);
                }
            }
        }
    }
}
