//! Synthetic-action entry point
//!
//! External command surfaces (context menu, local control endpoint) inject
//! user-initiated actions here. They travel through the aggregator like any
//! local event, so they inherit the same debouncing and per-path
//! serialization as watcher traffic.

use std::path::PathBuf;

use common::{EventAggregator, EventKind, InformationMessage, NotificationBus, Origin};

/// Cloneable handle for injecting user-initiated actions
#[derive(Clone)]
pub struct ControlHandle {
    aggregator: EventAggregator,
    bus: NotificationBus,
}

impl ControlHandle {
    pub fn new(aggregator: EventAggregator, bus: NotificationBus) -> Self {
        Self { aggregator, bus }
    }

    /// Remove a path from the remote store
    pub fn hard_delete(&self, path: PathBuf) {
        self.bus.publish(InformationMessage {
            title: "Delete requested".to_string(),
            description: format!("{} will be removed from the remote store", path.display()),
        });
        self.aggregator.observe(path, EventKind::Deleted, Origin::Local);
    }

    /// Push the current local content of a path, restoring a prior version
    pub fn recover_version(&self, path: PathBuf) {
        self.bus.publish(InformationMessage {
            title: "Recovery requested".to_string(),
            description: format!("{} will be restored from the local copy", path.display()),
        });
        self.aggregator.observe(path, EventKind::Modified, Origin::Local);
    }

    /// Share a folder with a peer
    ///
    /// The share itself is carried by the store layer; the folder is
    /// re-announced as a local change so its state is pushed first.
    pub fn share_folder(&self, path: PathBuf, peer: String) {
        self.bus.publish(InformationMessage {
            title: "Folder shared".to_string(),
            description: format!("{} shared with {}", path.display(), peer),
        });
        self.aggregator.observe(path, EventKind::Modified, Origin::Local);
    }
}
