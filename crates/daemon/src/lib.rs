// Agent modules
pub mod agent;
pub mod cli;
pub mod control;
pub mod logging;
pub mod observers;
pub mod watcher;

// App state (configuration, paths)
pub mod state;

// Re-exports for consumers (tray, control surfaces)
pub use agent::Agent;
pub use control::ControlHandle;
pub use state::{AppConfig, AppState, StateError};
pub use watcher::FolderWatcher;
