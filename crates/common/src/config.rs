//! Core synchronization configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_debounce_window_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_workers() -> usize {
    4
}

/// Tunables for the synchronization core
///
/// Recognized options: the aggregation window length, the retry budget per
/// action, and the executor worker pool size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Length of the fixed debounce window, in milliseconds.
    ///
    /// The window opens on the first event after a flush and is not
    /// restarted by later events.
    #[serde(default = "default_debounce_window_ms")]
    pub debounce_window_ms: u64,

    /// Maximum execution attempts per action record before it goes
    /// terminal `Failed`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Number of executor worker tasks.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl SyncConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_window_ms: default_debounce_window_ms(),
            max_attempts: default_max_attempts(),
            workers: default_workers(),
        }
    }
}
