use anyhow::{Context, Result};
use clap::Parser;

fn main() -> Result<()> {
    let cli = punchlist::cli::Cli::parse();
    punchlist::logging::init_tracing(cli.log_filter.as_deref())?;
    let config = punchlist::config::from_cli(&cli)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    runtime.block_on(punchlist::commands::execute(&config, cli.command, &mut handle))
}
