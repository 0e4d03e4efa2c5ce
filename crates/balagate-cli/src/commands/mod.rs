//! CLI command implementations.

pub mod check;
pub mod config;
pub mod routes;
pub mod run;
pub mod status;

pub use check::run_check;
pub use config::run_config;
pub use routes::run_routes;
pub use run::run_gateway;
pub use status::run_status;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use balagate_core::Config;

/// Config file in use: the explicit path, or the default location.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit.map_or_else(Config::default_path, Path::to_path_buf)
}

/// Load the effective configuration.
///
/// An explicit path must exist. The default location is optional and falls
/// back to built-in defaults. Environment overrides are applied last.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let config = match explicit {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_default().context("Failed to load default config")?,
    };

    Ok(config.with_env_overrides())
}
