use std::path::PathBuf;

/// Shared context for CLI operations
#[derive(Debug, Clone)]
pub struct OpContext {
    /// State directory (`~/.skiff` unless overridden).
    pub state_dir: PathBuf,
}

/// A CLI operation: parsed arguments that execute into a displayable output
#[async_trait::async_trait]
pub trait Op {
    type Error: std::error::Error + Send + Sync + 'static;
    type Output: std::fmt::Display;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}
