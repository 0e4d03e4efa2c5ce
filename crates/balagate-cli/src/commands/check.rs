//! Check command - run the gate for one path against the real backend.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use balagate_core::SessionToken;
use balagate_gateway::auth::{Decision, Gate, GateAction, GateConfig, GateRequest, HttpBackend};
use reqwest::Method;

use crate::ui;

/// Check command arguments.
#[derive(Debug, Clone)]
pub struct CheckArgs {
    /// Config file override.
    pub config: Option<PathBuf>,
    /// Path to check.
    pub path: String,
    /// Session token, if any.
    pub token: Option<String>,
}

/// Print the decision the gate would make for a request.
pub async fn run_check(args: CheckArgs) -> Result<()> {
    let config = super::load_config(args.config.as_deref())?;

    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    let gate = Gate::new(GateConfig::from_config(&config), backend.clone(), backend);

    let token = args.token.as_deref().and_then(SessionToken::from_cookie_value);
    let classification = gate.routes().classify(&args.path);

    ui::header("Gate check");
    ui::kv("Path", &args.path);
    ui::kv("Tier", &classification.tier().to_string());
    ui::kv("Token", if token.is_some() { "present" } else { "none" });
    ui::kv("Backend", &config.backend.base_url);
    println!();

    let decision = gate
        .decide(GateRequest {
            path: &args.path,
            method: &Method::GET,
            token: token.as_ref(),
        })
        .await;

    for line in describe(&decision) {
        match &decision.action {
            GateAction::Proceed => ui::success(&line),
            GateAction::Redirect { .. } => ui::warning(&line),
        }
    }

    Ok(())
}

fn describe(decision: &Decision) -> Vec<String> {
    let mut lines = Vec::new();
    match &decision.action {
        GateAction::Proceed => lines.push("Proceed".to_string()),
        GateAction::Redirect { location, reason } => {
            lines.push(format!("Redirect to {location} ({reason})"));
            lines.push(format!("Message: {}", reason.message()));
        }
    }
    if decision.clear_session {
        lines.push("Session cookie would be cleared".to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use balagate_gateway::auth::DenyReason;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_describe() {
        assert_eq!(describe(&Decision::proceed()), vec!["Proceed".to_string()]);

        let decision = Decision::redirect("/auth", DenyReason::InvalidToken).clearing_session();
        assert_eq!(
            describe(&decision),
            vec![
                "Redirect to /auth (invalid_token)".to_string(),
                "Message: Please sign in".to_string(),
                "Session cookie would be cleared".to_string(),
            ]
        );
    }
}
