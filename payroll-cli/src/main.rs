use clap::Parser;
use tracing::debug;

use payroll_cli::app;
use payroll_cli::cli::Cli;
use payroll_cli::config::AppConfig;
use payroll_cli::logging;

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::resolve(&cli)?;
    logging::init_logging(&config.logging.level, config.logging.file.as_deref())?;
    debug!(config = %cli.config.display(), "configuration loaded");

    let ledger = app::open_ledger(&config).await?;
    let output = app::execute(&ledger, cli.command).await?;
    println!("{output}");

    Ok(())
}
