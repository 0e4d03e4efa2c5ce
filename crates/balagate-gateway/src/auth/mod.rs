//! Authentication and authorization for the gateway.
//!
//! This module provides:
//! - The identity and ownership provider seams, with an HTTP implementation
//! - The request gate that turns a path and a session token into a decision
//! - Axum middleware applying gate decisions as redirects and cookies

mod backend;
mod config;
mod gate;
mod middleware;

pub use backend::HttpBackend;
pub use config::{GateConfig, GateConfigBuilder};
pub use gate::{Decision, DenyReason, Gate, GateAction, GateRequest};
pub use middleware::{gate_middleware, session_token};
pub(crate) use middleware::{append_cookie, removal_cookie};

use std::time::Duration;

use async_trait::async_trait;
use balagate_core::{Principal, ResourceId, SessionToken};
use thiserror::Error;

/// Errors from the identity and ownership services.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The service rejected the token (HTTP 401).
    #[error("Token rejected")]
    Unauthorized,

    /// The service answered with an unexpected status.
    #[error("Backend error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// Transport failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// No answer within the call budget.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The body could not be understood.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl BackendError {
    /// Check if the service answered and said no, as opposed to not answering
    /// properly at all.
    #[must_use]
    pub const fn is_denial(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Api { .. })
    }
}

/// Resolves a session token to a principal.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Look up the principal behind `token`.
    ///
    /// # Errors
    ///
    /// `BackendError::Unauthorized` when the token is invalid or expired; any
    /// other variant when the service could not give an answer.
    async fn resolve(&self, token: &SessionToken) -> Result<Principal, BackendError>;
}

/// Decides whether the holder of a token may access a specific resource.
#[async_trait]
pub trait OwnershipProvider: Send + Sync {
    /// Check access to `resource`.
    ///
    /// # Errors
    ///
    /// A denial variant (`Unauthorized`, `Api`) when access is refused; any
    /// other variant when the check could not be made.
    async fn check_access(
        &self,
        token: &SessionToken,
        resource: &ResourceId,
    ) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denial_classification() {
        assert!(BackendError::Unauthorized.is_denial());
        assert!(
            BackendError::Api {
                status: 403,
                message: String::new()
            }
            .is_denial()
        );
        assert!(!BackendError::Timeout(Duration::from_secs(5)).is_denial());
        assert!(!BackendError::Malformed("eof".into()).is_denial());
    }
}
