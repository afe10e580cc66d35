pub mod config;
pub mod doctor;

use clap::{Parser, Subcommand};

/// webmcp-broker — a WebMCP discovery broker.
#[derive(Debug, Parser)]
#[command(name = "webmcp-broker", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the broker server (default when no subcommand is given).
    Serve,
    /// Run diagnostic checks against the current configuration.
    Doctor,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults, secrets redacted) as TOML.
    Show,
}

/// Load the configuration from the path named by `WMCP_CONFIG` (or
/// `config.toml` by default). Returns the parsed [`Config`] and the path
/// that was used. Shared by `serve`, `doctor`, and `config` so the
/// loading logic lives in one place.
pub fn load_config() -> anyhow::Result<(wmcp_domain::config::Config, String)> {
    let config_path = std::env::var("WMCP_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        wmcp_domain::config::Config::default()
    };

    Ok((config, config_path))
}
