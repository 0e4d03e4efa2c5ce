//! Configuration loading and validation.
//!
//! JSON5 format with camelCase keys. Every field has a default, so an empty
//! file (or no file at all) yields a working local setup.
//! Config location: `~/.balagate/balagate.json`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON5 parsing error.
    #[error("Parse error: {0}")]
    Parse(#[from] json5::Error),

    /// Config validation error.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Listener and upstream settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Identity and ownership service endpoints.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Cookie names and lifetimes.
    #[serde(default)]
    pub session: SessionConfig,

    /// Redirect destinations.
    #[serde(default)]
    pub redirects: RedirectConfig,

    /// Global settings.
    #[serde(default)]
    pub settings: GlobalSettings,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// # Errors
    ///
    /// Returns error if config cannot be loaded or parsed.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        tracing::debug!(path = %path.display(), "Loading config");
        let content = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a path.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        Self::state_dir().join("balagate.json")
    }

    /// Get the balagate state directory.
    ///
    /// Uses `BALAGATE_STATE_DIR` env var if set, otherwise `~/.balagate`.
    #[must_use]
    pub fn state_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("BALAGATE_STATE_DIR") {
            PathBuf::from(dir)
        } else if let Some(home) = dirs::home_dir() {
            home.join(".balagate")
        } else {
            PathBuf::from(".balagate")
        }
    }

    /// Apply environment variable overrides.
    ///
    /// `BACKEND_URL` is shared with the web application; the others are
    /// specific to the gate.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("BACKEND_URL") {
            if !url.trim().is_empty() {
                self.backend.base_url = url;
            }
        }

        if let Ok(url) = std::env::var("BALAGATE_UPSTREAM_URL") {
            if !url.trim().is_empty() {
                self.gateway.upstream_url = url;
            }
        }

        if let Some(port) = std::env::var("BALAGATE_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
        {
            self.gateway.port = port;
        }

        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.port == 0 {
            return Err(ConfigError::Validation(
                "Gateway port cannot be 0".to_string(),
            ));
        }

        check_http_url("gateway.upstreamUrl", &self.gateway.upstream_url)?;
        check_http_url("backend.baseUrl", &self.backend.base_url)?;

        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "backend.timeoutSecs must be greater than 0".to_string(),
            ));
        }
        if self.gateway.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "gateway.requestTimeoutSecs must be greater than 0".to_string(),
            ));
        }

        for (key, path) in [
            ("backend.identityPath", &self.backend.identity_path),
            ("backend.ownershipPath", &self.backend.ownership_path),
            ("backend.logoutPath", &self.backend.logout_path),
            ("redirects.signIn", &self.redirects.sign_in),
            ("redirects.landing", &self.redirects.landing),
            ("redirects.resourceList", &self.redirects.resource_list),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "{key} must start with '/': {path}"
                )));
            }
        }

        if self.session.cookie_name.is_empty() || self.session.message_cookie.is_empty() {
            return Err(ConfigError::Validation(
                "Cookie names cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_http_url(key: &str, url: &str) -> Result<(), ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "{key} must be an http(s) URL: {url}"
        )))
    }
}

/// Gateway listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address mode.
    #[serde(default)]
    pub mode: BindMode,

    /// Web application that receives requests the gate lets through.
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    /// Timeout for a proxied upstream request in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Largest request body forwarded upstream.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            mode: BindMode::default(),
            upstream_url: default_upstream_url(),
            request_timeout_secs: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl GatewayConfig {
    /// Address string the listener binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        match &self.mode {
            BindMode::Local => "127.0.0.1".to_string(),
            BindMode::Public => "0.0.0.0".to_string(),
            BindMode::Custom(addr) => addr.clone(),
        }
    }

    /// Upstream request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

const fn default_port() -> u16 {
    3001
}

fn default_upstream_url() -> String {
    "http://localhost:3000".to_string()
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

/// Gateway bind mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    /// Bind to localhost only.
    #[default]
    Local,
    /// Bind to all interfaces.
    Public,
    /// Custom bind address.
    Custom(String),
}

/// Backend service endpoints used by the gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Backend base URL.
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Identity check endpoint path.
    #[serde(default = "default_identity_path")]
    pub identity_path: String,

    /// Ownership check endpoint path; the resource id is appended as a segment.
    #[serde(default = "default_ownership_path")]
    pub ownership_path: String,

    /// Logout endpoint path.
    #[serde(default = "default_logout_path")]
    pub logout_path: String,

    /// Per-call timeout in seconds.
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            identity_path: default_identity_path(),
            ownership_path: default_ownership_path(),
            logout_path: default_logout_path(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

impl BackendConfig {
    /// Full identity endpoint URL.
    #[must_use]
    pub fn identity_url(&self) -> String {
        join_url(&self.base_url, &self.identity_path)
    }

    /// Ownership endpoint URL without the resource segment.
    #[must_use]
    pub fn ownership_url(&self) -> String {
        join_url(&self.base_url, &self.ownership_path)
    }

    /// Full logout endpoint URL.
    #[must_use]
    pub fn logout_url(&self) -> String {
        join_url(&self.base_url, &self.logout_path)
    }

    /// Per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

fn default_backend_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_identity_path() -> String {
    "/api/v1/auth/user-info".to_string()
}

fn default_ownership_path() -> String {
    "/api/v1/auth/course/get".to_string()
}

fn default_logout_path() -> String {
    "/api/v1/auth/logout".to_string()
}

const fn default_backend_timeout() -> u64 {
    5
}

/// Cookie settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Cookie carrying the session token.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Flash cookie carrying the redirect reason.
    #[serde(default = "default_message_cookie")]
    pub message_cookie: String,

    /// Lifetime of the flash cookie in seconds.
    #[serde(default = "default_message_max_age")]
    pub message_max_age_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            message_cookie: default_message_cookie(),
            message_max_age_secs: default_message_max_age(),
        }
    }
}

fn default_cookie_name() -> String {
    "access_token".to_string()
}

fn default_message_cookie() -> String {
    "auth_message".to_string()
}

const fn default_message_max_age() -> u64 {
    5
}

/// Where the gate sends denied requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectConfig {
    /// Sign-in page.
    #[serde(default = "default_sign_in")]
    pub sign_in: String,

    /// Landing page for authenticated users.
    #[serde(default = "default_landing")]
    pub landing: String,

    /// Course list page, used when an ownership check fails.
    #[serde(default = "default_landing")]
    pub resource_list: String,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            sign_in: default_sign_in(),
            landing: default_landing(),
            resource_list: default_landing(),
        }
    }
}

fn default_sign_in() -> String {
    "/auth".to_string()
}

fn default_landing() -> String {
    "/courses".to_string()
}

/// Global settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    /// Enable debug logging.
    #[serde(default)]
    pub debug: bool,

    /// Log format.
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format.
    #[default]
    Pretty,
    /// JSON format.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gateway.port, 3001);
        assert_eq!(config.session.cookie_name, "access_token");
        assert_eq!(config.session.message_cookie, "auth_message");
        assert_eq!(config.redirects.sign_in, "/auth");
        assert_eq!(config.redirects.landing, "/courses");
        assert_eq!(config.backend.timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backend_urls() {
        let backend = BackendConfig {
            base_url: "http://backend:8080/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            backend.identity_url(),
            "http://backend:8080/api/v1/auth/user-info"
        );
        assert_eq!(
            backend.ownership_url(),
            "http://backend:8080/api/v1/auth/course/get"
        );
        assert_eq!(backend.logout_url(), "http://backend:8080/api/v1/auth/logout");
    }

    #[test]
    fn test_config_roundtrip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("balagate.json");

        let mut config = Config::default();
        config.backend.base_url = "http://api.internal:9000".to_string();
        config.gateway.mode = BindMode::Public;

        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.backend.base_url, "http://api.internal:9000");
        assert_eq!(loaded.gateway.mode, BindMode::Public);
        assert_eq!(loaded.gateway.bind_address(), "0.0.0.0");
    }

    #[test]
    fn test_json5_parsing() {
        let json5_content = r#"{
            // backend lives next door
            backend: {
                baseUrl: "http://backend:8080",
                timeoutSecs: 2,
            },
            gateway: {
                mode: { custom: "10.0.0.5" },
            },
            settings: { logFormat: "json" },
        }"#;

        let config: Config = json5::from_str(json5_content).unwrap();
        assert_eq!(config.backend.timeout_secs, 2);
        assert_eq!(config.gateway.port, 3001);
        assert_eq!(config.gateway.bind_address(), "10.0.0.5");
        assert_eq!(config.settings.log_format, LogFormat::Json);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.gateway.port = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.backend.base_url = "backend:8080".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.backend.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.redirects.landing = "courses".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("redirects.landing"));
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("balagate.json");
        std::fs::write(&path, "{ gateway: { port: 0 } }").unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Validation(_))
        ));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }
}
