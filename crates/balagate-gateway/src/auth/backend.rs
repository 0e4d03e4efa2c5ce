//! HTTP client for the identity, ownership, and logout endpoints.

use async_trait::async_trait;
use balagate_core::config::BackendConfig;
use balagate_core::secrets::redact_bearer;
use balagate_core::{Principal, ResourceId, SessionToken};
use reqwest::header::{AUTHORIZATION, COOKIE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use super::{BackendError, IdentityProvider, OwnershipProvider};

/// Body returned by the identity endpoint.
#[derive(Debug, Deserialize)]
struct IdentityResponse {
    user: Principal,
}

/// Backend API client.
///
/// One instance is shared by all requests; the underlying connection pool is
/// the only state it carries.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    identity_url: String,
    ownership_url: String,
    logout_url: String,
    timeout: Duration,
}

impl HttpBackend {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            identity_url: config.identity_url(),
            ownership_url: config.ownership_url(),
            logout_url: config.logout_url(),
            timeout: config.timeout(),
        })
    }

    /// URL of the ownership check for one resource.
    fn ownership_url_for(&self, resource: &ResourceId) -> String {
        format!(
            "{}/{}",
            self.ownership_url.trim_end_matches('/'),
            urlencoding::encode(resource.as_ref())
        )
    }

    /// End the backend session for the given cookies.
    ///
    /// # Errors
    ///
    /// `BackendError::Api` with the backend's status and body when it refuses,
    /// `Timeout` or `Network` when it cannot be reached.
    pub async fn logout(&self, cookie_header: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .delete(&self.logout_url)
            .header(COOKIE, cookie_header)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), body = %redact_bearer(&message), "Logout refused");
        Err(BackendError::Api {
            status: status.as_u16(),
            message,
        })
    }

    fn transport_error(&self, error: reqwest::Error) -> BackendError {
        if error.is_timeout() {
            BackendError::Timeout(self.timeout)
        } else {
            BackendError::Network(error)
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpBackend {
    async fn resolve(&self, token: &SessionToken) -> Result<Principal, BackendError> {
        let response = self
            .client
            .get(&self.identity_url)
            .header(AUTHORIZATION, token.bearer())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthorized);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let parsed: IdentityResponse = serde_json::from_slice(&body)
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        Ok(parsed.user)
    }
}

#[async_trait]
impl OwnershipProvider for HttpBackend {
    async fn check_access(
        &self,
        token: &SessionToken,
        resource: &ResourceId,
    ) -> Result<(), BackendError> {
        let response = self
            .client
            .get(self.ownership_url_for(resource))
            .header(AUTHORIZATION, token.bearer())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status == StatusCode::UNAUTHORIZED {
            Err(BackendError::Unauthorized)
        } else {
            Err(BackendError::Api {
                status: status.as_u16(),
                message: String::new(),
            })
        }
    }
}
