//! Filesystem watcher feeding the aggregator
//!
//! Raw OS notifications are translated into aggregator observations with
//! local origin. Watch errors are logged and the offending event dropped;
//! the watch itself keeps running regardless of individual failures.

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind as NotifyKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

use common::{EventAggregator, EventKind, Origin};

/// Recursive watch over the synchronized folder
///
/// Dropping the watcher stops the watch.
pub struct FolderWatcher {
    root: PathBuf,
    _watcher: RecommendedWatcher,
}

impl FolderWatcher {
    /// Start watching `root` recursively
    pub fn start(root: &Path, aggregator: EventAggregator) -> Result<Self, notify::Error> {
        let mut watcher =
            notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
                Ok(event) => route(event, &aggregator),
                Err(e) => {
                    // Best-effort: drop the event, keep watching.
                    warn!("watch error, dropping event: {}", e);
                }
            })?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        info!(root = %root.display(), "watching folder");
        Ok(Self {
            root: root.to_path_buf(),
            _watcher: watcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Translate one OS notification into aggregator observations
fn route(event: Event, aggregator: &EventAggregator) {
    // Renames carry both paths in one event.
    if let NotifyKind::Modify(ModifyKind::Name(RenameMode::Both)) = event.kind {
        if let [from, to] = event.paths.as_slice() {
            if !should_ignore(from) {
                aggregator.observe(
                    from.clone(),
                    EventKind::Moved { to: to.clone() },
                    Origin::Local,
                );
            }
            return;
        }
    }

    for path in &event.paths {
        if should_ignore(path) {
            continue;
        }
        let kind = match event.kind {
            NotifyKind::Create(_) => EventKind::Added,
            NotifyKind::Modify(_) => EventKind::Modified,
            NotifyKind::Remove(_) => EventKind::Deleted,
            _ => continue,
        };
        aggregator.observe(path.clone(), kind, Origin::Local);
    }
}

/// Editor droppings and hidden files never become sync actions
fn should_ignore(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return true;
    };
    name.starts_with('.')
        || name.ends_with('~')
        || name.ends_with(".tmp")
        || name.ends_with(".swp")
        || (name.starts_with('#') && name.ends_with('#'))
}
