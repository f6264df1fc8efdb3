//! Full-agent tests over the loopback store: watch a real directory, write
//! files, and verify the actions land remotely.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use common::{EventKind, InformationMessage, MemoryStore, SyncConfig};
use skiff_daemon::{Agent, AppConfig};

fn test_config(watch_dir: &Path) -> AppConfig {
    AppConfig {
        watch_dir: watch_dir.to_path_buf(),
        bootstrap: None,
        log_dir: None,
        sync: SyncConfig {
            debounce_window_ms: 100,
            ..SyncConfig::default()
        },
    }
}

#[tokio::test]
async fn test_local_write_syncs_to_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let agent = Agent::start(&test_config(dir.path()), Arc::new(store.clone()))
        .await
        .unwrap();

    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"first draft").unwrap();

    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert!(store.contains(&path), "write never reached the store");
    assert_eq!(agent.pending_actions(), 0);

    agent.shutdown().await;
}

#[tokio::test]
async fn test_remote_change_flows_through_agent() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let agent = Agent::start(&test_config(dir.path()), Arc::new(store.clone()))
        .await
        .unwrap();

    store.inject_remote_change("shared/plan.md", EventKind::Added);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    // Routed through the same pipeline and acknowledged back to the store.
    assert!(store.contains(Path::new("shared/plan.md")));
    assert_eq!(agent.pending_actions(), 0);

    agent.shutdown().await;
}

#[tokio::test]
async fn test_share_notification_reaches_bus() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let agent = Agent::start(&test_config(dir.path()), Arc::new(store.clone()))
        .await
        .unwrap();

    let (tx, rx) = flume::unbounded();
    agent.bus().subscribe::<InformationMessage, _>(move |msg| {
        let _ = tx.send(msg.clone());
    });

    store.inject_share("photos", "alice");

    let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv_async())
        .await
        .expect("no share notification")
        .unwrap();
    assert_eq!(msg.title, "Folder shared");
    assert!(msg.description.contains("alice"));

    agent.shutdown().await;
}

/// User-initiated actions travel the same pipeline as watcher events.
#[tokio::test]
async fn test_control_delete_reaches_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let agent = Agent::start(&test_config(dir.path()), Arc::new(store.clone()))
        .await
        .unwrap();

    store.inject_remote_change("old.txt", EventKind::Added);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(store.contains(Path::new("old.txt")));

    agent.control().hard_delete("old.txt".into());
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!store.contains(Path::new("old.txt")));

    agent.shutdown().await;
}

/// A failed start must not leave workers or the remote-event router running
/// detached: nothing routed after the error may reach the store.
#[tokio::test]
async fn test_failed_start_leaves_no_background_work() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocked");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let store = MemoryStore::new();
    let mut config = test_config(&blocker.join("sync"));
    config.sync.debounce_window_ms = 50;

    let result = Agent::start(&config, Arc::new(store.clone())).await;
    assert!(result.is_err(), "watch dir under a file must fail");

    store.inject_remote_change("ghost.txt", EventKind::Added);
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(
        store.applied().is_empty(),
        "background tasks survived a failed start"
    );
}

#[tokio::test]
async fn test_shutdown_flushes_open_window() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let mut config = test_config(dir.path());
    // A window far longer than the test; only the shutdown flush drains it.
    config.sync.debounce_window_ms = 60_000;

    let agent = Agent::start(&config, Arc::new(store.clone())).await.unwrap();

    let path = dir.path().join("last-minute.txt");
    std::fs::write(&path, b"going down").unwrap();

    // Give the watcher time to observe, then shut down mid-window.
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(!store.contains(&path));

    agent.shutdown().await;
    assert!(store.contains(&path), "open window lost at shutdown");
}
