use std::sync::Arc;

use clap::Args;

use common::MemoryStore;

use crate::agent::Agent;
use crate::cli::op::{Op, OpContext};
use crate::state::{AppState, StateError};
use crate::logging;

/// Run the sync agent in the foreground until interrupted.
#[derive(Args, Debug, Clone)]
pub struct Run;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("agent failed: {0}")]
    Agent(String),
}

#[async_trait::async_trait]
impl Op for Run {
    type Error = RunError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(&ctx.state_dir)?;
        let log_dir = state.log_dir();
        let _guard = logging::init(Some(&log_dir));

        let store = Arc::new(MemoryStore::default());
        let agent = Agent::start(&state.config, store)
            .await
            .map_err(|e| RunError::Agent(format!("{e:#}")))?;

        tracing::info!(watch_dir = %state.config.watch_dir.display(), "skiff running, press ctrl-c to stop");
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| RunError::Agent(e.to_string()))?;

        tracing::info!("shutting down");
        agent.shutdown().await;
        Ok("stopped".to_string())
    }
}
