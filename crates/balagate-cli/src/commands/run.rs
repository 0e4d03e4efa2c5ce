//! Run command - start the gateway server.

use std::path::PathBuf;

use anyhow::Result;
use balagate_core::Config;
use balagate_core::config::BindMode;

use crate::ui;

/// Run command arguments.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    /// Config file override.
    pub config: Option<PathBuf>,
    /// Port to listen on.
    pub port: Option<u16>,
    /// Bind address.
    pub bind: Option<String>,
    /// Upstream URL.
    pub upstream: Option<String>,
}

/// Start the gateway server.
pub async fn run_gateway(args: RunArgs) -> Result<()> {
    let mut config = super::load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    ui::header("Starting balagate");
    ui::kv(
        "Address",
        &format!("{}:{}", config.gateway.bind_address(), config.gateway.port),
    );
    ui::kv("Upstream", &config.gateway.upstream_url);
    ui::kv("Backend", &config.backend.base_url);
    println!();
    ui::info("Press Ctrl+C to stop");
    println!();

    balagate_gateway::start(config).await?;

    Ok(())
}

/// Apply command-line flags on top of the loaded config.
fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(port) = args.port {
        config.gateway.port = port;
    }

    if let Some(bind) = &args.bind {
        config.gateway.mode = parse_bind(bind);
    }

    if let Some(upstream) = &args.upstream {
        config.gateway.upstream_url.clone_from(upstream);
    }
}

fn parse_bind(bind: &str) -> BindMode {
    match bind {
        "local" | "loopback" => BindMode::Local,
        "public" | "lan" => BindMode::Public,
        addr => BindMode::Custom(addr.to_string()),
    }
}
