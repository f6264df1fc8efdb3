use clap::Parser;

use skiff_daemon::cli::{Cli, Op};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let ctx = cli.context()?;
    let output = cli.command.execute(&ctx).await?;
    println!("{output}");
    Ok(())
}
