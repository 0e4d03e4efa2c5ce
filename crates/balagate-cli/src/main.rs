//! balagate CLI - run and inspect the request gate.

mod commands;
mod ui;

use std::path::PathBuf;

use balagate_core::config::LogFormat;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "balagate")]
#[command(about = "balagate - access-control gate for the Birlik Bala web application")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.balagate/balagate.json)
    #[arg(short, long, global = true, env = "BALAGATE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Run {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address (local, public, or IP)
        #[arg(long)]
        bind: Option<String>,

        /// Upstream web application URL
        #[arg(long)]
        upstream: Option<String>,
    },

    /// Check whether a gateway is running
    Status {
        /// Port to probe
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the route table, or classify the given paths
    Routes {
        /// Paths to classify
        paths: Vec<String>,
    },

    /// Run the gate against the configured backend for one path
    Check {
        /// Request path
        path: String,

        /// Session token to present
        #[arg(long, env = "BALAGATE_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Validate the configuration file
    Validate,

    /// Print the config file location
    Path,

    /// Get a configuration value
    Get {
        /// Configuration key (e.g., backend.baseUrl)
        key: String,
    },

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli);

    let config_path = cli.config.clone();

    let result = dispatch(cli.command, config_path).await;
    if let Err(e) = &result {
        tracing::debug!(error = format!("{e:#}"), "Command failed");
    }
    result
}

async fn dispatch(command: Commands, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            port,
            bind,
            upstream,
        } => {
            let args = commands::run::RunArgs {
                config: config_path,
                port,
                bind,
                upstream,
            };
            commands::run_gateway(args).await?;
        }

        Commands::Status { port } => {
            let args = commands::status::StatusArgs {
                config: config_path,
                port,
            };
            commands::run_status(args).await?;
        }

        Commands::Routes { paths } => {
            commands::run_routes(&paths);
        }

        Commands::Check { path, token } => {
            let args = commands::check::CheckArgs {
                config: config_path,
                path,
                token,
            };
            commands::run_check(args).await?;
        }

        Commands::Config { action } => {
            let action = match action.unwrap_or(ConfigCommands::Show) {
                ConfigCommands::Show => commands::config::ConfigAction::Show,
                ConfigCommands::Validate => commands::config::ConfigAction::Validate,
                ConfigCommands::Path => commands::config::ConfigAction::Path,
                ConfigCommands::Get { key } => commands::config::ConfigAction::Get { key },
                ConfigCommands::Init { force } => commands::config::ConfigAction::Init { force },
            };
            let args = commands::config::ConfigArgs {
                config: config_path,
                action,
            };
            commands::run_config(&args)?;
        }
    }

    Ok(())
}

/// Set up tracing from `RUST_LOG`, `--verbose` and the config's log settings.
fn init_logging(cli: &Cli) {
    // Logging comes up before the config is fully validated, so a broken
    // file falls back to defaults here and is reported by the command.
    let loaded = commands::load_config(cli.config.as_deref());
    let settings = loaded
        .as_ref()
        .map(|c| c.settings.clone())
        .unwrap_or_default();

    let default_level = if cli.verbose || settings.debug {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    match settings.log_format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(false)).init(),
    }

    if let Err(e) = loaded {
        tracing::debug!(error = %e, "Using default log settings");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_get() {
        let cli = Cli::try_parse_from(["balagate", "config", "get", "backend.baseUrl"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: Some(ConfigCommands::Get { .. })
            }
        ));
    }

    #[tokio::test]
    async fn test_dispatch_reports_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");

        let result = dispatch(
            Commands::Config {
                action: Some(ConfigCommands::Show),
            },
            Some(missing),
        )
        .await;

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("missing.json"), "{message}");
    }
}
