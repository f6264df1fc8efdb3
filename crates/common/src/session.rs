//! Session gate for the executor
//!
//! Authentication itself is an upstream concern; the core only needs to know
//! whether a session is currently established. While it is not, queued
//! records wait behind the gate - they are never dropped.

use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable flag signalling whether an authenticated session exists
#[derive(Debug, Clone)]
pub struct SessionGate {
    tx: Arc<watch::Sender<bool>>,
}

impl SessionGate {
    /// Create a gate in the unauthenticated state
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Create a gate that is already open (tests, single-user setups)
    pub fn open() -> Self {
        let gate = Self::new();
        gate.set_authenticated(true);
        gate
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        // send_replace never fails: we hold the sender.
        self.tx.send_replace(authenticated);
    }

    pub fn is_authenticated(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until a session is established
    ///
    /// Returns immediately if the gate is already open.
    pub async fn wait_authenticated(&self) {
        let mut rx = self.tx.subscribe();
        while !*rx.borrow_and_update() {
            // The sender lives in self, so changed() cannot fail here.
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}
