//! Command-line interface definition.

use clap::{Parser, Subcommand};
use registry_gateway::config::{default_config_path, GatewayConfig};
use std::path::PathBuf;

/// Verify business identities against external registries.
#[derive(Parser, Debug)]
#[command(name = "registry-gateway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Business (VAT) registry endpoint.
    #[arg(long, env = "REGISTRY_BUSINESS_ENDPOINT")]
    pub business_endpoint: Option<String>,

    /// Reliability registry endpoint.
    #[arg(long, env = "REGISTRY_RELIABILITY_ENDPOINT")]
    pub reliability_endpoint: Option<String>,

    /// Requester VAT identity sent with identity checks.
    #[arg(long, env = "REGISTRY_REQUESTER_VAT")]
    pub requester_vat: Option<String>,

    /// Budget for one registry call in milliseconds.
    #[arg(long, env = "REGISTRY_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Skip the reachability check when connecting.
    #[arg(long)]
    pub skip_reachability_check: bool,

    /// Log level.
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Emit logs as JSON.
    #[arg(long)]
    pub json_logs: bool,

    /// Path to configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// What to look up.
    #[command(subcommand)]
    pub command: Command,
}

/// Lookups the CLI can run.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Verify a VAT identity such as `CZ12345678`.
    Check {
        /// VAT identity.
        vat: String,
    },
    /// Fetch the reliability status of a local taxpayer identifier.
    Status {
        /// Local identifier (8-10 digits, optional `CZ` prefix).
        local_id: String,
    },
}

impl Cli {
    /// Merge the configuration file (if any) with CLI overrides.
    ///
    /// An explicit `--config` must exist; the default location is used only
    /// when a file is present there.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be loaded.
    pub fn to_config(&self) -> color_eyre::Result<GatewayConfig> {
        let path = self
            .config
            .clone()
            .or_else(|| default_config_path().filter(|path| path.exists()));

        let mut config = if let Some(ref path) = path {
            GatewayConfig::from_file(path)?
        } else {
            GatewayConfig::default()
        };

        if let Some(ref endpoint) = self.business_endpoint {
            config.business.endpoint = Some(endpoint.clone());
        }
        if let Some(ref endpoint) = self.reliability_endpoint {
            config.reliability.endpoint = Some(endpoint.clone());
        }
        if let Some(ref vat) = self.requester_vat {
            config.business.requester_vat = Some(vat.clone());
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.business.timeout_ms = timeout_ms;
            config.reliability.timeout_ms = timeout_ms;
        }
        if self.skip_reachability_check {
            config.http.check_reachability = false;
        }
        config.log_level.clone_from(&self.log_level);

        Ok(config)
    }
}
