//! Core types shared by the gate and its collaborators.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Role reported by the identity service.
///
/// Only `admin` is distinguished by the gate; every other value is kept as-is
/// for logging and for handlers further down the line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Content author with access to the admin dashboard.
    Admin,
    /// Regular customer account.
    User,
    /// Any other role string the backend returns.
    Other(String),
}

impl Role {
    /// Check if this role grants the admin tier.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Role name as sent by the backend.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.as_str() {
            "admin" => Self::Admin,
            "user" => Self::User,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated principal resolved from a session token.
///
/// Never persisted; re-derived on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Account identifier. The backend sends a number; strings are accepted too.
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,

    /// Account username, when present.
    #[serde(default)]
    pub username: Option<String>,

    /// Account role.
    pub role: Role,
}

impl Principal {
    /// Create a principal with only a role.
    #[must_use]
    pub const fn with_role(role: Role) -> Self {
        Self {
            id: None,
            username: None,
            role,
        }
    }

    /// Check if this principal may enter the admin tier.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Identifier of a protected resource (a course) taken from the request path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(String);

impl ResourceId {
    /// Create a resource ID from a path segment.
    ///
    /// Returns `None` for an empty segment.
    #[must_use]
    pub fn new(segment: impl Into<String>) -> Option<Self> {
        let segment = segment.into();
        if segment.is_empty() {
            None
        } else {
            Some(Self(segment))
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::from("admin"), Role::Admin);
        assert_eq!(Role::from("user"), Role::User);
        assert_eq!(Role::from("Admin"), Role::Other("Admin".to_string()));
        assert!(Role::Admin.is_admin());
        assert!(!Role::User.is_admin());
        assert_eq!(Role::Other("editor".into()).to_string(), "editor");
    }

    #[test]
    fn test_principal_from_backend_json() {
        let json = r#"{"id": 17, "username": "aru", "role": "admin", "password": ""}"#;
        let principal: Principal = serde_json::from_str(json).unwrap();
        assert_eq!(
            principal,
            Principal {
                id: Some("17".to_string()),
                username: Some("aru".to_string()),
                role: Role::Admin,
            }
        );
    }

    #[test]
    fn test_principal_minimal() {
        let principal: Principal = serde_json::from_str(r#"{"role": "user"}"#).unwrap();
        assert_eq!(principal, Principal::with_role(Role::User));
        assert!(!principal.is_admin());

        let principal: Principal =
            serde_json::from_str(r#"{"id": "u-1", "role": "user"}"#).unwrap();
        assert_eq!(principal.id.as_deref(), Some("u-1"));
    }

    #[test]
    fn test_principal_requires_role() {
        assert!(serde_json::from_str::<Principal>(r#"{"id": 1}"#).is_err());
    }

    #[test]
    fn test_resource_id() {
        assert!(ResourceId::new("").is_none());
        let id = ResourceId::new("42").unwrap();
        assert_eq!(id.as_ref(), "42");
        assert_eq!(id.to_string(), "42");
    }
}
