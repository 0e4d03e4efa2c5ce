//! Gate configuration.

use std::time::Duration;

use balagate_core::Config;

/// Default per-call timeout for the identity and ownership services.
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 5;
/// Default lifetime of the flash message cookie.
const DEFAULT_MESSAGE_MAX_AGE_SECS: u64 = 5;

/// Settings the gate needs at decision time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Cookie carrying the session token.
    pub cookie_name: String,
    /// Flash cookie carrying the redirect reason.
    pub message_cookie: String,
    /// Lifetime of the flash cookie.
    pub message_max_age: Duration,
    /// Sign-in page.
    pub sign_in: String,
    /// Landing page for authenticated users.
    pub landing: String,
    /// Resource list page for failed ownership checks.
    pub resource_list: String,
    /// Upper bound for each identity or ownership call.
    pub backend_timeout: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            cookie_name: "access_token".to_string(),
            message_cookie: "auth_message".to_string(),
            message_max_age: Duration::from_secs(DEFAULT_MESSAGE_MAX_AGE_SECS),
            sign_in: "/auth".to_string(),
            landing: "/courses".to_string(),
            resource_list: "/courses".to_string(),
            backend_timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
        }
    }
}

impl GateConfig {
    /// Create a new gate config builder.
    #[must_use]
    pub fn builder() -> GateConfigBuilder {
        GateConfigBuilder::default()
    }

    /// Derive the gate settings from the application config.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            cookie_name: config.session.cookie_name.clone(),
            message_cookie: config.session.message_cookie.clone(),
            message_max_age: Duration::from_secs(config.session.message_max_age_secs),
            sign_in: config.redirects.sign_in.clone(),
            landing: config.redirects.landing.clone(),
            resource_list: config.redirects.resource_list.clone(),
            backend_timeout: config.backend.timeout(),
        }
    }
}

/// Builder for `GateConfig`.
#[derive(Debug, Default)]
pub struct GateConfigBuilder {
    config: GateConfig,
}

impl GateConfigBuilder {
    /// Set the session cookie name.
    #[must_use]
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.config.cookie_name = name.into();
        self
    }

    /// Set the flash message cookie name.
    #[must_use]
    pub fn message_cookie(mut self, name: impl Into<String>) -> Self {
        self.config.message_cookie = name.into();
        self
    }

    /// Set the sign-in page.
    #[must_use]
    pub fn sign_in(mut self, path: impl Into<String>) -> Self {
        self.config.sign_in = path.into();
        self
    }

    /// Set the landing page.
    #[must_use]
    pub fn landing(mut self, path: impl Into<String>) -> Self {
        self.config.landing = path.into();
        self
    }

    /// Set the resource list page.
    #[must_use]
    pub fn resource_list(mut self, path: impl Into<String>) -> Self {
        self.config.resource_list = path.into();
        self
    }

    /// Set the per-call backend timeout.
    #[must_use]
    pub const fn backend_timeout(mut self, timeout: Duration) -> Self {
        self.config.backend_timeout = timeout;
        self
    }

    /// Build the config.
    #[must_use]
    pub fn build(self) -> GateConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_app_config() {
        assert_eq!(GateConfig::default(), GateConfig::from_config(&Config::default()));
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.redirects.landing = "/profile".to_string();
        config.backend.timeout_secs = 2;

        let gate = GateConfig::from_config(&config);
        assert_eq!(gate.landing, "/profile");
        assert_eq!(gate.backend_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_builder() {
        let config = GateConfig::builder()
            .sign_in("/login")
            .backend_timeout(Duration::from_millis(250))
            .build();

        assert_eq!(config.sign_in, "/login");
        assert_eq!(config.backend_timeout, Duration::from_millis(250));
        assert_eq!(config.cookie_name, "access_token");
    }
}
