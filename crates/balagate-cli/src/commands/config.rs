//! Config command - inspect and validate configuration.

use std::path::{Path, PathBuf};

use anyhow::Result;
use balagate_core::Config;

use crate::ui;

/// Config command arguments.
#[derive(Debug, Clone)]
pub struct ConfigArgs {
    /// Config file override.
    pub config: Option<PathBuf>,
    /// What to do.
    pub action: ConfigAction,
}

/// Config actions.
#[derive(Debug, Clone)]
pub enum ConfigAction {
    Show,
    Validate,
    Path,
    Get { key: String },
    Init { force: bool },
}

/// Run the config command.
pub fn run_config(args: &ConfigArgs) -> Result<()> {
    let path = super::config_path(args.config.as_deref());

    match &args.action {
        ConfigAction::Show => show_config(args.config.as_deref()),
        ConfigAction::Validate => {
            validate_config(&path);
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigAction::Get { key } => get_config_value(args.config.as_deref(), key),
        ConfigAction::Init { force } => init_config(&path, *force),
    }
}

/// Show the effective configuration, defaults and env overrides included.
fn show_config(explicit: Option<&Path>) -> Result<()> {
    let config = super::load_config(explicit)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Get a specific config value by dotted camelCase path.
fn get_config_value(explicit: Option<&Path>, key: &str) -> Result<()> {
    let config = super::load_config(explicit)?;
    let value = serde_json::to_value(&config)?;

    match lookup(&value, key) {
        Some(serde_json::Value::String(s)) => println!("{s}"),
        Some(other) => println!("{}", serde_json::to_string_pretty(other)?),
        None => ui::error(&format!("Key not found: {key}")),
    }

    Ok(())
}

fn lookup<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a serde_json::Value> {
    key.split('.').try_fold(value, |current, part| current.get(part))
}

/// Validate the configuration file.
fn validate_config(path: &Path) {
    ui::header("Validating Configuration");

    if !path.exists() {
        ui::info(&format!("No config file at {}", path.display()));
        ui::success("Built-in defaults are valid");
        return;
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            ui::error(&format!("Cannot read {}: {e}", path.display()));
            return;
        }
    };

    if let Err(e) = json5::from_str::<serde_json::Value>(&content) {
        ui::error(&format!("Syntax: {e}"));
        return;
    }
    ui::success("Syntax: Valid JSON5");

    match Config::load(path) {
        Ok(_) => ui::success("Values: Valid"),
        Err(e) => ui::error(&format!("Values: {e}")),
    }
}

/// Write the default configuration.
fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        ui::warning(&format!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        ));
        return Ok(());
    }

    Config::default().save(path)?;
    ui::success(&format!("Wrote {}", path.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup() {
        let value = json!({"backend": {"baseUrl": "http://api", "timeoutSecs": 5}});
        assert_eq!(lookup(&value, "backend.baseUrl"), Some(&json!("http://api")));
        assert_eq!(lookup(&value, "backend.timeoutSecs"), Some(&json!(5)));
        assert_eq!(lookup(&value, "backend.missing"), None);
        assert_eq!(lookup(&value, "backend.baseUrl.deeper"), None);
    }

    #[test]
    fn test_init_writes_loadable_config() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("balagate.json");

        init_config(&path, false).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.gateway.port, Config::default().gateway.port);

        std::fs::write(&path, "{ gateway: { port: 9 } }").unwrap();
        init_config(&path, false).unwrap();
        assert_eq!(Config::load(&path).unwrap().gateway.port, 9);
    }
}
