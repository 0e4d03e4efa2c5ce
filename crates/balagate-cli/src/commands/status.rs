//! Status command - probe a running gateway.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::ui::{self, HealthStatus};

/// Status command arguments.
#[derive(Debug, Clone, Default)]
pub struct StatusArgs {
    /// Config file override.
    pub config: Option<PathBuf>,
    /// Port override.
    pub port: Option<u16>,
}

/// Check gateway status.
pub async fn run_status(args: StatusArgs) -> Result<()> {
    ui::header("Gateway Status");

    let configured = super::load_config(args.config.as_deref())
        .map(|c| c.gateway.port)
        .unwrap_or_else(|e| {
            ui::warning(&format!("{e:#}"));
            balagate_core::config::GatewayConfig::default().port
        });
    let port = args.port.unwrap_or(configured);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    match client
        .get(format!("http://127.0.0.1:{port}/healthz"))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            ui::health_check("Gateway", HealthStatus::Ok, Some(&format!("port {port}")));
            if let Ok(body) = resp.json::<serde_json::Value>().await {
                if let Some(version) = body.get("version").and_then(|v| v.as_str()) {
                    ui::kv("Version", version);
                }
                if let Some(uptime) = body.get("uptimeSecs").and_then(serde_json::Value::as_u64) {
                    ui::kv("Uptime", &format!("{uptime}s"));
                }
            }
        }
        Ok(resp) => {
            ui::health_check(
                "Gateway",
                HealthStatus::Warning,
                Some(&format!("health check returned {}", resp.status())),
            );
        }
        Err(_) => {
            ui::health_check(
                "Gateway",
                HealthStatus::Error,
                Some(&format!("not running on port {port}")),
            );
            ui::info("Start with: balagate run");
        }
    }

    Ok(())
}
