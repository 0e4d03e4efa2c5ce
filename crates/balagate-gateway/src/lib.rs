//! # balagate gateway
//!
//! Access-control gate in front of the Birlik Bala web application.
//!
//! Every request is classified by path, checked against the identity and
//! ownership services when its tier requires it, and then either forwarded
//! to the upstream application or redirected with a short-lived message
//! cookie.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authentication and authorization.
pub mod auth;
mod middleware;
/// Reverse proxy to the upstream application.
pub mod proxy;
/// Path classification.
pub mod routes;
mod server;

pub use auth::{
    BackendError, Decision, DenyReason, Gate, GateAction, GateConfig, GateRequest, HttpBackend,
    IdentityProvider, OwnershipProvider,
};
pub use proxy::{ProxyError, UpstreamProxy};
pub use routes::{Classification, RouteRule, RouteTable, Tier};
pub use server::{Gateway, GatewayBuilder, GatewayState, router};

use balagate_core::Config;

/// Start the gateway server.
///
/// # Errors
///
/// Returns error if server fails to start.
pub async fn start(config: Config) -> Result<(), GatewayError> {
    let gateway = Gateway::new(config)?;
    gateway.run().await
}

/// Gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Server error.
    #[error("Server error: {0}")]
    Server(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
