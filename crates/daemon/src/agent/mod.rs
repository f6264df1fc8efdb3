//! Agent wiring
//!
//! Builds the synchronization core around a remote store, connects the
//! watcher and remote-event routing to the aggregator, and owns the spawned
//! tasks for the lifetime of the process.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use common::{
    ActionExecutor, ActionRegistry, EventAggregator, InformationMessage, NotificationBus, Origin,
    RemoteEvent, RemoteStore, SessionGate,
};

use crate::control::ControlHandle;
use crate::observers;
use crate::state::AppConfig;
use crate::watcher::FolderWatcher;

/// A running synchronization agent
///
/// Holds every component alive; [`Agent::shutdown`] flushes the last
/// debounce window and stops the workers.
pub struct Agent {
    bus: NotificationBus,
    aggregator: EventAggregator,
    registry: Arc<ActionRegistry>,
    session: SessionGate,
    tasks: Vec<tokio::task::JoinHandle<()>>,
    _watcher: Option<FolderWatcher>,
}

impl Agent {
    /// Build and start the agent against the given remote store
    ///
    /// Must run inside a tokio runtime. A failed connection leaves the
    /// session gate closed: queued records wait rather than fail.
    pub async fn start(config: &AppConfig, store: Arc<dyn RemoteStore>) -> Result<Agent> {
        let bus = NotificationBus::new();
        let session = SessionGate::new();
        let registry = Arc::new(ActionRegistry::new(config.sync.max_attempts));

        observers::register(&bus);

        let executor = ActionExecutor::new(
            store.clone(),
            registry.clone(),
            bus.clone(),
            session.clone(),
            &config.sync,
        );
        let dispatcher = executor.dispatcher();
        let aggregator =
            EventAggregator::new(&config.sync, bus.clone(), registry.clone(), dispatcher);
        let mut tasks = executor.spawn();

        // Remote change notifications feed the aggregator exactly like
        // local events, tagged with remote origin.
        let (remote_tx, remote_rx) = flume::unbounded::<RemoteEvent>();
        store.subscribe_remote_events(remote_tx);
        tasks.push(tokio::spawn(route_remote_events(
            remote_rx,
            aggregator.clone(),
            bus.clone(),
        )));

        match store.connect_or_join(config.bootstrap.clone()).await {
            Ok(joined) => {
                info!(joined, "connected to remote store");
                session.set_authenticated(true);
            }
            Err(e) => {
                // Not fatal: the watch keeps running, actions queue up
                // behind the session gate.
                warn!("remote store connection failed, actions will wait: {}", e);
            }
        }

        let watcher = match Self::start_watcher(&config.watch_dir, aggregator.clone()) {
            Ok(watcher) => watcher,
            Err(e) => {
                // Without a watcher there is no agent; stop the workers and
                // the router instead of leaving them detached.
                for task in &tasks {
                    task.abort();
                }
                return Err(e);
            }
        };

        Ok(Agent {
            bus,
            aggregator,
            registry,
            session,
            tasks,
            _watcher: Some(watcher),
        })
    }

    fn start_watcher(watch_dir: &Path, aggregator: EventAggregator) -> Result<FolderWatcher> {
        std::fs::create_dir_all(watch_dir)
            .with_context(|| format!("creating watch dir {}", watch_dir.display()))?;
        FolderWatcher::start(watch_dir, aggregator)
            .with_context(|| format!("watching {}", watch_dir.display()))
    }

    /// Entry point for synthetic, user-initiated actions
    pub fn control(&self) -> ControlHandle {
        ControlHandle::new(self.aggregator.clone(), self.bus.clone())
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    pub fn session(&self) -> &SessionGate {
        &self.session
    }

    /// Live (non-terminal) action records
    pub fn pending_actions(&self) -> usize {
        self.registry.len()
    }

    /// Flush the open debounce window and stop all background tasks
    ///
    /// Gives queued and in-flight actions a bounded chance to drain before
    /// the workers are stopped.
    pub async fn shutdown(mut self) {
        info!("agent shutting down");
        self._watcher = None;
        self.aggregator.flush_now();

        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
        while !self.registry.is_empty() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        for task in self.tasks {
            task.abort();
        }
    }
}

async fn route_remote_events(
    rx: flume::Receiver<RemoteEvent>,
    aggregator: EventAggregator,
    bus: NotificationBus,
) {
    while let Ok(event) = rx.recv_async().await {
        match event {
            RemoteEvent::Changed { path, kind } => {
                aggregator.observe(path, kind, Origin::Remote);
            }
            RemoteEvent::Shared { path, peer } => {
                bus.publish(InformationMessage {
                    title: "Folder shared".to_string(),
                    description: format!("{} shared {} with you", peer, path.display()),
                });
            }
        }
    }
}
