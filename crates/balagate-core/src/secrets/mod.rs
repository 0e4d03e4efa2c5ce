//! Session token handling.
//!
//! - `SessionToken`: wrapper that prevents the bearer token from being logged
//! - `redact_bearer`: strip bearer values out of diagnostic strings

use secrecy::{ExposeSecret, SecretBox};

/// Opaque session token read from the `access_token` cookie.
///
/// The gate never looks inside the token. It is forwarded verbatim to the
/// identity and ownership services and otherwise kept out of logs.
pub struct SessionToken(SecretBox<str>);

impl SessionToken {
    /// Wrap a raw token value.
    #[must_use]
    pub fn new(token: String) -> Self {
        Self(SecretBox::new(token.into_boxed_str()))
    }

    /// Build a token from a cookie value.
    ///
    /// Returns `None` for an empty or whitespace-only value, which is what a
    /// cleared cookie looks like when the browser still sends it.
    #[must_use]
    pub fn from_cookie_value(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(Self::new(value.to_string()))
        }
    }

    /// Expose the raw token for an outbound call.
    ///
    /// Use sparingly - only when building the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Value for an `Authorization` header.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.expose())
    }
}

impl Clone for SessionToken {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_string())
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionToken([REDACTED])")
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// Replace any `Bearer <value>` occurrence with a redacted marker.
#[must_use]
pub fn redact_bearer(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(idx) = rest.find("Bearer ") {
        let (head, tail) = rest.split_at(idx + "Bearer ".len());
        out.push_str(head);
        out.push_str("[REDACTED]");
        let end = tail
            .find(|c: char| c.is_whitespace() || c == '"' || c == ',')
            .unwrap_or(tail.len());
        rest = &tail[end..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_not_in_debug() {
        let token = SessionToken::new("eyJhbGciOi.secret".to_string());
        let debug = format!("{token:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("REDACTED"));
        assert_eq!(token.to_string(), "[REDACTED]");
    }

    #[test]
    fn test_expose_and_bearer() {
        let token = SessionToken::new("abc123".to_string());
        assert_eq!(token.expose(), "abc123");
        assert_eq!(token.bearer(), "Bearer abc123");
        assert_eq!(token.clone().expose(), "abc123");
    }

    #[test]
    fn test_empty_cookie_value_is_no_token() {
        assert!(SessionToken::from_cookie_value("").is_none());
        assert!(SessionToken::from_cookie_value("   ").is_none());
        assert_eq!(
            SessionToken::from_cookie_value(" tok ").map(|t| t.expose().to_string()),
            Some("tok".to_string())
        );
    }

    #[test]
    fn test_redact_bearer() {
        let text = r#"header "Authorization: Bearer abc.def" failed, Bearer xyz"#;
        let redacted = redact_bearer(text);
        assert!(!redacted.contains("abc.def"));
        assert!(!redacted.contains("xyz"));
        assert_eq!(redacted.matches("[REDACTED]").count(), 2);
        assert_eq!(redact_bearer("no secrets here"), "no secrets here");
    }
}
