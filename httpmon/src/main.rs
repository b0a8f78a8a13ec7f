use anyhow::Result;
use clap::Parser;

use httpmon::cli::Cli;
use httpmon::logging;
use httpmon::supervisor::Supervisor;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config().await?;

    if cli.validate {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
        println!("configuration is valid");
        return Ok(());
    }

    let _log_guard = logging::init_tracing(&config.general, !config.display.headless)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "httpmon starting");

    let mut supervisor = Supervisor::build_from_config(config)?;
    supervisor.run().await
}
