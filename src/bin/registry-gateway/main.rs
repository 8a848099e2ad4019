//! registry-gateway CLI entry point.

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use registry_gateway::GatewayBuilder;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }

    info!("registry-gateway v{}", env!("CARGO_PKG_VERSION"));

    let config = cli.to_config()?;
    let gateway = GatewayBuilder::new(config).build()?;

    let output = match &cli.command {
        Command::Check { vat } => serde_json::to_string_pretty(&gateway.check_vat(vat).await?)?,
        Command::Status { local_id } => {
            serde_json::to_string_pretty(&gateway.reliability_status(local_id).await?)?
        }
    };
    println!("{output}");

    Ok(())
}
