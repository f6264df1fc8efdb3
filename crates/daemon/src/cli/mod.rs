use std::path::PathBuf;

use clap::Parser;

pub mod op;
pub mod ops;

use crate::state::{AppState, StateError};
pub use op::{Op, OpContext};

/// Generates a `Command` enum over a set of ops, with matching
/// `OpError`/`OpOutput` enums and an `Op` impl that dispatches to the
/// selected variant.
#[macro_export]
macro_rules! command_enum {
    ( $( ($variant:ident, $ty:ty) ),+ $(,)? ) => {
        #[derive(::clap::Subcommand, Debug, Clone)]
        pub enum Command {
            $( $variant($ty), )+
        }

        #[derive(Debug, ::thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$ty as $crate::cli::op::Op>::Error),
            )+
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $( $variant(<$ty as $crate::cli::op::Op>::Output), )+
        }

        impl ::std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $( OpOutput::$variant(output) => output.fmt(f), )+
                }
            }
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Error = OpError;
            type Output = OpOutput;

            async fn execute(
                &self,
                ctx: &$crate::cli::op::OpContext,
            ) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => op
                            .execute(ctx)
                            .await
                            .map(OpOutput::$variant)
                            .map_err(OpError::$variant),
                    )+
                }
            }
        }
    };
}

crate::command_enum! {
    (Init, ops::Init),
    (Run, ops::Run),
    (Version, ops::Version),
}

#[derive(Parser, Debug)]
#[command(name = "skiff", version, about = "Keeps a local folder in sync with a shared store")]
pub struct Cli {
    /// State directory (defaults to ~/.skiff)
    #[arg(long, env = "SKIFF_DIR", global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn context(&self) -> Result<OpContext, StateError> {
        let state_dir = match &self.dir {
            Some(dir) => dir.clone(),
            None => AppState::default_dir()?,
        };
        Ok(OpContext { state_dir })
    }
}
