//! Shared harness: the full chain (aggregator, registry, executor) wired
//! over the loopback store with an authenticated session.

#![allow(dead_code)]

use std::sync::Arc;

use ::common::{
    ActionDispatcher, ActionExecutor, ActionRegistry, EventAggregator, MemoryStore, Notification,
    NotificationBus, SessionGate, SyncConfig,
};

pub struct Pipeline {
    pub store: MemoryStore,
    pub registry: Arc<ActionRegistry>,
    pub bus: NotificationBus,
    pub session: SessionGate,
    pub aggregator: EventAggregator,
    pub dispatcher: ActionDispatcher,
}

pub fn pipeline(config: SyncConfig) -> Pipeline {
    let store = MemoryStore::new();
    let bus = NotificationBus::new();
    let session = SessionGate::open();
    let registry = Arc::new(ActionRegistry::new(config.max_attempts));

    let executor = ActionExecutor::new(
        Arc::new(store.clone()),
        registry.clone(),
        bus.clone(),
        session.clone(),
        &config,
    );
    let dispatcher = executor.dispatcher();
    executor.spawn();

    let aggregator = EventAggregator::new(&config, bus.clone(), registry.clone(), dispatcher.clone());

    Pipeline {
        store,
        registry,
        bus,
        session,
        aggregator,
        dispatcher,
    }
}

/// Default config with a test-sized debounce window
pub fn fast_config(window_ms: u64) -> SyncConfig {
    SyncConfig {
        debounce_window_ms: window_ms,
        ..SyncConfig::default()
    }
}

/// Collect every published message of one type into a channel
pub fn collect<M: Notification>(bus: &NotificationBus) -> flume::Receiver<M> {
    let (tx, rx) = flume::unbounded();
    bus.subscribe::<M, _>(move |msg: &M| {
        let _ = tx.send(msg.clone());
    });
    rx
}
