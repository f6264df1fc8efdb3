use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use common::SyncConfig;

use crate::cli::op::{Op, OpContext};
use crate::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Folder to keep in sync with the remote store
    #[arg(long)]
    pub watch_dir: PathBuf,

    /// Bootstrap address of an existing network to join
    #[arg(long)]
    pub bootstrap: Option<String>,

    /// Debounce window in milliseconds
    #[arg(long, default_value_t = SyncConfig::default().debounce_window_ms)]
    pub window_ms: u64,

    /// Maximum execution attempts per action
    #[arg(long, default_value_t = SyncConfig::default().max_attempts)]
    pub max_attempts: u32,

    /// Executor worker pool size
    #[arg(long, default_value_t = SyncConfig::default().workers)]
    pub workers: usize,
}

#[derive(Debug)]
pub struct InitOutput {
    pub state_dir: PathBuf,
    pub config_path: PathBuf,
    pub watch_dir: PathBuf,
}

impl fmt::Display for InitOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} skiff at {}",
            "Initialized".green().bold(),
            self.state_dir.display().to_string().bold()
        )?;
        writeln!(f, "  {} {}", "Config:".dimmed(), self.config_path.display())?;
        write!(f, "  {} {}", "Watching:".dimmed(), self.watch_dir.display())
    }
}

#[async_trait::async_trait]
impl Op for Init {
    type Error = StateError;
    type Output = InitOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            watch_dir: self.watch_dir.clone(),
            bootstrap: self.bootstrap.clone(),
            log_dir: None,
            sync: SyncConfig {
                debounce_window_ms: self.window_ms,
                max_attempts: self.max_attempts,
                workers: self.workers,
            },
        };
        let state = AppState::init(&ctx.state_dir, config)?;
        Ok(InitOutput {
            config_path: AppState::config_path(&state.state_dir),
            watch_dir: state.config.watch_dir,
            state_dir: state.state_dir,
        })
    }
}
