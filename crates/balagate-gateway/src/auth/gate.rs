//! The request gate.
//!
//! A decision is made in explicit stages:
//!
//! 1. **Classify** the path against the route table (pure, no I/O).
//! 2. **Identity check**: resolve the session token, if the tier needs it.
//! 3. **Authorize**: apply the tier's rule to the resolved identity.
//! 4. **Ownership check**: for a named resource, ask the ownership service.
//!
//! Every stage fails closed. Nothing is kept between requests.

use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use balagate_core::{Principal, ResourceId, SessionToken};

use super::config::GateConfig;
use super::{BackendError, IdentityProvider, OwnershipProvider};
use crate::routes::{Classification, RouteTable};

/// Why a request was redirected.
///
/// The reason is advisory: it ends up in the flash cookie and the logs and
/// never influences control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenyReason {
    /// Protected path without a session cookie.
    NoToken,
    /// The identity service rejected the token.
    InvalidToken,
    /// The identity service could not be asked.
    IdentityServiceUnavailable,
    /// Signed in, but not an admin.
    InsufficientRole,
    /// The ownership service refused access to the resource.
    ResourceAccessDenied,
    /// The ownership service could not be asked.
    OwnershipServiceUnavailable,
    /// Visiting the sign-in page while already signed in.
    AlreadyAuthenticated,
}

impl DenyReason {
    /// Message shown to the user on the destination page.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoToken | Self::InvalidToken => "Please sign in",
            Self::IdentityServiceUnavailable => "Authorization error",
            Self::InsufficientRole => "No admin access",
            Self::ResourceAccessDenied => "No access to this resource",
            Self::OwnershipServiceUnavailable => "Access check failed",
            Self::AlreadyAuthenticated => "Already signed in",
        }
    }

    /// Stable identifier for logs.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NoToken => "no_token",
            Self::InvalidToken => "invalid_token",
            Self::IdentityServiceUnavailable => "identity_unavailable",
            Self::InsufficientRole => "insufficient_role",
            Self::ResourceAccessDenied => "resource_access_denied",
            Self::OwnershipServiceUnavailable => "ownership_unavailable",
            Self::AlreadyAuthenticated => "already_authenticated",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// What happens to the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateAction {
    /// Continue to the destination unchanged.
    Proceed,
    /// Short-circuit with a redirect.
    Redirect {
        /// Redirect target.
        location: String,
        /// Why.
        reason: DenyReason,
    },
}

/// Outcome of the gate for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Proceed or redirect.
    pub action: GateAction,
    /// Expire the session cookie on the response.
    ///
    /// Only set when the identity service rejected the token, so the browser
    /// stops resending it. Transient failures keep the cookie.
    pub clear_session: bool,
}

impl Decision {
    /// Let the request through.
    #[must_use]
    pub const fn proceed() -> Self {
        Self {
            action: GateAction::Proceed,
            clear_session: false,
        }
    }

    /// Redirect the request.
    #[must_use]
    pub fn redirect(location: impl Into<String>, reason: DenyReason) -> Self {
        Self {
            action: GateAction::Redirect {
                location: location.into(),
                reason,
            },
            clear_session: false,
        }
    }

    /// Mark the session cookie for removal.
    #[must_use]
    pub const fn clearing_session(mut self) -> Self {
        self.clear_session = true;
        self
    }

    /// Check if the request may continue.
    #[must_use]
    pub const fn is_proceed(&self) -> bool {
        matches!(self.action, GateAction::Proceed)
    }

    /// Redirect target, if any.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match &self.action {
            GateAction::Proceed => None,
            GateAction::Redirect { location, .. } => Some(location),
        }
    }

    /// Redirect reason, if any.
    #[must_use]
    pub const fn reason(&self) -> Option<DenyReason> {
        match &self.action {
            GateAction::Proceed => None,
            GateAction::Redirect { reason, .. } => Some(*reason),
        }
    }
}

/// Inputs the gate looks at.
#[derive(Debug, Clone, Copy)]
pub struct GateRequest<'a> {
    /// Request path.
    pub path: &'a str,
    /// Request method. Logged, never used for branching.
    pub method: &'a Method,
    /// Session token from the cookie, if present.
    pub token: Option<&'a SessionToken>,
}

/// Result of the identity stage.
#[derive(Debug)]
enum IdentityCheck {
    /// No token to check.
    Anonymous,
    /// The identity service said the token is dead.
    Rejected,
    /// The identity service could not answer.
    Unavailable,
    /// Valid session.
    Authenticated(Principal),
}

/// Result of the ownership stage.
#[derive(Debug)]
enum OwnershipCheck {
    Granted,
    Denied,
    Unavailable,
}

/// The request gate.
pub struct Gate {
    config: GateConfig,
    routes: RouteTable,
    identity: Arc<dyn IdentityProvider>,
    ownership: Arc<dyn OwnershipProvider>,
}

impl Gate {
    /// Create a gate over the default route table.
    #[must_use]
    pub fn new(
        config: GateConfig,
        identity: Arc<dyn IdentityProvider>,
        ownership: Arc<dyn OwnershipProvider>,
    ) -> Self {
        Self {
            config,
            routes: RouteTable::default(),
            identity,
            ownership,
        }
    }

    /// Use a different route table.
    #[must_use]
    pub const fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    /// Gate settings.
    #[must_use]
    pub const fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Route table in use.
    #[must_use]
    pub const fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Decide what happens to a request.
    pub async fn decide(&self, request: GateRequest<'_>) -> Decision {
        let classification = self.routes.classify(request.path);
        let decision = self.decide_classified(&classification, request.token).await;

        match &decision.action {
            GateAction::Proceed => tracing::debug!(
                method = %request.method,
                path = %request.path,
                tier = %classification.tier(),
                clear_session = decision.clear_session,
                "Gate: proceed"
            ),
            GateAction::Redirect { location, reason } => tracing::info!(
                method = %request.method,
                path = %request.path,
                tier = %classification.tier(),
                %location,
                %reason,
                clear_session = decision.clear_session,
                "Gate: redirect"
            ),
        }

        decision
    }

    async fn decide_classified(
        &self,
        classification: &Classification,
        token: Option<&SessionToken>,
    ) -> Decision {
        if *classification == Classification::Public {
            return Decision::proceed();
        }

        let identity = self.check_identity(token).await;

        if *classification == Classification::SignIn {
            return self.authorize_sign_in(&identity);
        }

        let principal = match identity {
            IdentityCheck::Anonymous => {
                return Decision::redirect(&self.config.sign_in, DenyReason::NoToken);
            }
            IdentityCheck::Rejected => {
                return Decision::redirect(&self.config.sign_in, DenyReason::InvalidToken)
                    .clearing_session();
            }
            IdentityCheck::Unavailable => {
                return Decision::redirect(
                    &self.config.sign_in,
                    DenyReason::IdentityServiceUnavailable,
                );
            }
            IdentityCheck::Authenticated(principal) => principal,
        };

        match classification {
            Classification::Admin if !principal.is_admin() => {
                Decision::redirect(&self.config.landing, DenyReason::InsufficientRole)
            }
            Classification::OwnedResource(resource) => {
                // Authenticated implies a token was present.
                let Some(token) = token else {
                    return Decision::redirect(&self.config.sign_in, DenyReason::NoToken);
                };
                match self.check_ownership(token, resource).await {
                    OwnershipCheck::Granted => Decision::proceed(),
                    OwnershipCheck::Denied => Decision::redirect(
                        &self.config.resource_list,
                        DenyReason::ResourceAccessDenied,
                    ),
                    OwnershipCheck::Unavailable => Decision::redirect(
                        &self.config.resource_list,
                        DenyReason::OwnershipServiceUnavailable,
                    ),
                }
            }
            _ => Decision::proceed(),
        }
    }

    /// The sign-in page is shown to anyone without a valid session.
    fn authorize_sign_in(&self, identity: &IdentityCheck) -> Decision {
        match identity {
            IdentityCheck::Authenticated(_) => {
                Decision::redirect(&self.config.landing, DenyReason::AlreadyAuthenticated)
            }
            IdentityCheck::Rejected => Decision::proceed().clearing_session(),
            IdentityCheck::Anonymous | IdentityCheck::Unavailable => Decision::proceed(),
        }
    }

    async fn check_identity(&self, token: Option<&SessionToken>) -> IdentityCheck {
        let Some(token) = token else {
            return IdentityCheck::Anonymous;
        };

        let timeout = self.config.backend_timeout;
        match tokio::time::timeout(timeout, self.identity.resolve(token)).await {
            Ok(Ok(principal)) => IdentityCheck::Authenticated(principal),
            Ok(Err(BackendError::Unauthorized)) => IdentityCheck::Rejected,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Identity check failed");
                IdentityCheck::Unavailable
            }
            Err(_) => {
                tracing::warn!(?timeout, "Identity check timed out");
                IdentityCheck::Unavailable
            }
        }
    }

    async fn check_ownership(&self, token: &SessionToken, resource: &ResourceId) -> OwnershipCheck {
        let timeout = self.config.backend_timeout;
        match tokio::time::timeout(timeout, self.ownership.check_access(token, resource)).await {
            Ok(Ok(())) => OwnershipCheck::Granted,
            Ok(Err(e)) if e.is_denial() => {
                tracing::debug!(%resource, error = %e, "Ownership denied");
                OwnershipCheck::Denied
            }
            Ok(Err(e)) => {
                tracing::warn!(%resource, error = %e, "Ownership check failed");
                OwnershipCheck::Unavailable
            }
            Err(_) => {
                tracing::warn!(%resource, ?timeout, "Ownership check timed out");
                OwnershipCheck::Unavailable
            }
        }
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate")
            .field("config", &self.config)
            .field("routes", &self.routes.rules().len())
            .finish_non_exhaustive()
    }
}
