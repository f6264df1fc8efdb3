//! Log observers for the notification bus
//!
//! The daemon's stand-in for tray and UI surfaces: every lifecycle message
//! lands in the structured log. Execution messages are handled inline for
//! ordering; informational fan-out goes through background dispatch.

use tracing::{debug, info, warn};

use common::{
    AggregatedFileEventStatus, ConflictRecord, FileExecutionFailed, FileExecutionStarted,
    FileExecutionSucceeded, InformationMessage, NotificationBus, WarningMessage,
};

pub fn register(bus: &NotificationBus) {
    bus.subscribe::<AggregatedFileEventStatus, _>(|status| {
        info!(
            added = status.added,
            modified = status.modified,
            deleted = status.deleted,
            moved = status.moved,
            "file events"
        );
    });

    bus.subscribe::<FileExecutionStarted, _>(|msg| {
        debug!(path = %msg.path.display(), kind = %msg.kind, "execution started");
    });

    bus.subscribe::<FileExecutionSucceeded, _>(|msg| {
        info!(path = %msg.path.display(), kind = %msg.kind, "execution succeeded");
    });

    bus.subscribe::<FileExecutionFailed, _>(|msg| {
        warn!(path = %msg.path.display(), reason = %msg.reason, "execution failed");
    });

    bus.subscribe::<ConflictRecord, _>(|record| {
        warn!(
            path = %record.local_path.display(),
            kept_as = %record.renamed_path.display(),
            "conflict resolved by rename"
        );
    });

    bus.subscribe_background::<InformationMessage, _>(|msg| {
        info!(title = %msg.title, "{}", msg.description);
    });

    bus.subscribe_background::<WarningMessage, _>(|msg| {
        warn!(title = %msg.title, "{}", msg.description);
    });
}
