//! Application configuration and on-disk state directory
//!
//! The state directory (default `~/.skiff`) holds `config.toml` and the log
//! directory. The watched folder itself lives wherever the user points it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use common::SyncConfig;

const CONFIG_FILE: &str = "config.toml";
const DEFAULT_DIR_NAME: &str = ".skiff";

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("could not determine a home directory")]
    MissingHome,
    #[error("already initialized at {}", .0.display())]
    AlreadyInitialized(PathBuf),
    #[error("not initialized at {} (run `skiff init` first)", .0.display())]
    NotInitialized(PathBuf),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Persisted agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// The folder kept consistent with the remote store.
    pub watch_dir: PathBuf,
    /// Bootstrap address for joining an existing network, if any.
    #[serde(default)]
    pub bootstrap: Option<String>,
    /// Where file logs go; defaults to `<state dir>/logs`.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Synchronization core tunables.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Loaded application state: the state directory plus its config
#[derive(Debug, Clone)]
pub struct AppState {
    pub state_dir: PathBuf,
    pub config: AppConfig,
}

impl AppState {
    /// Default state directory (`~/.skiff`)
    pub fn default_dir() -> Result<PathBuf, StateError> {
        dirs::home_dir()
            .map(|home| home.join(DEFAULT_DIR_NAME))
            .ok_or(StateError::MissingHome)
    }

    pub fn config_path(state_dir: &Path) -> PathBuf {
        state_dir.join(CONFIG_FILE)
    }

    /// Create the state directory and write the initial config
    ///
    /// Fails if a config already exists there.
    pub fn init(state_dir: &Path, config: AppConfig) -> Result<Self, StateError> {
        let config_path = Self::config_path(state_dir);
        if config_path.exists() {
            return Err(StateError::AlreadyInitialized(state_dir.to_path_buf()));
        }
        std::fs::create_dir_all(state_dir)?;
        std::fs::create_dir_all(&config.watch_dir)?;
        std::fs::write(&config_path, toml::to_string_pretty(&config)?)?;
        Ok(Self {
            state_dir: state_dir.to_path_buf(),
            config,
        })
    }

    /// Load an initialized state directory
    pub fn load(state_dir: &Path) -> Result<Self, StateError> {
        let config_path = Self::config_path(state_dir);
        if !config_path.exists() {
            return Err(StateError::NotInitialized(state_dir.to_path_buf()));
        }
        let config: AppConfig = toml::from_str(&std::fs::read_to_string(&config_path)?)?;
        Ok(Self {
            state_dir: state_dir.to_path_buf(),
            config,
        })
    }

    /// Effective log directory
    pub fn log_dir(&self) -> PathBuf {
        self.config
            .log_dir
            .clone()
            .unwrap_or_else(|| self.state_dir.join("logs"))
    }
}
