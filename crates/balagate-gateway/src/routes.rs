//! Route classification.
//!
//! The route table is an ordered, immutable list of rules compiled into the
//! binary. Classification is a pure function of the request path: method,
//! headers and body never influence it.

use std::fmt;

use balagate_core::types::ResourceId;

/// Access tier a route requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Anyone may pass.
    Public,
    /// The sign-in page. Public, but signed-in visitors are sent away.
    SignIn,
    /// Requires a valid session.
    Authenticated,
    /// Requires a valid session with the admin role.
    Admin,
    /// Requires a valid session and, when the path names a resource, access
    /// to that specific resource.
    OwnedResource,
}

impl Tier {
    /// Check if this tier needs a resolved identity.
    #[must_use]
    pub const fn requires_auth(self) -> bool {
        matches!(self, Self::Authenticated | Self::Admin | Self::OwnedResource)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::SignIn => write!(f, "sign-in"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Admin => write!(f, "admin"),
            Self::OwnedResource => write!(f, "owned-resource"),
        }
    }
}

/// One entry of the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRule {
    /// Path the rule applies to.
    pub pattern: &'static str,
    /// Match only the exact path instead of the path and everything below it.
    pub exact: bool,
    /// Tier the rule assigns.
    pub tier: Tier,
}

impl RouteRule {
    /// Rule matching `pattern` and every path below it.
    #[must_use]
    pub const fn prefix(pattern: &'static str, tier: Tier) -> Self {
        Self {
            pattern,
            exact: false,
            tier,
        }
    }

    /// Rule matching only `pattern` itself.
    #[must_use]
    pub const fn exact(pattern: &'static str, tier: Tier) -> Self {
        Self {
            pattern,
            exact: true,
            tier,
        }
    }

    /// Remainder of `path` after the pattern, or `None` if the rule does not
    /// apply. Prefixes only match on segment boundaries, so `/admin` covers
    /// `/admin/users` but not `/administrator`.
    fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.pattern)?;
        if rest.is_empty() {
            Some(rest)
        } else if !self.exact && rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}

/// Result of classifying a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No restriction.
    Public,
    /// The sign-in page.
    SignIn,
    /// Any valid session.
    Authenticated,
    /// Admin session.
    Admin,
    /// Valid session with access to the named resource.
    OwnedResource(ResourceId),
}

impl Classification {
    /// Tier this classification belongs to.
    #[must_use]
    pub const fn tier(&self) -> Tier {
        match self {
            Self::Public => Tier::Public,
            Self::SignIn => Tier::SignIn,
            Self::Authenticated => Tier::Authenticated,
            Self::Admin => Tier::Admin,
            Self::OwnedResource(_) => Tier::OwnedResource,
        }
    }
}

/// Ordered route table. The first matching rule wins.
#[derive(Debug, Clone, Copy)]
pub struct RouteTable {
    rules: &'static [RouteRule],
}

static DEFAULT_RULES: &[RouteRule] = &[
    RouteRule::prefix("/admin", Tier::Admin),
    RouteRule::prefix("/api/admin", Tier::Admin),
    RouteRule::prefix("/courses", Tier::OwnedResource),
    RouteRule::prefix("/api/courses", Tier::OwnedResource),
    RouteRule::prefix("/articles", Tier::Authenticated),
    RouteRule::prefix("/api/articles", Tier::Authenticated),
    RouteRule::prefix("/profile", Tier::Authenticated),
    RouteRule::exact("/auth", Tier::SignIn),
];

/// The storefront's route table.
pub static DEFAULT_ROUTES: RouteTable = RouteTable::new(DEFAULT_RULES);

impl RouteTable {
    /// Create a table from an ordered rule list.
    #[must_use]
    pub const fn new(rules: &'static [RouteRule]) -> Self {
        Self { rules }
    }

    /// Rules in match order.
    #[must_use]
    pub const fn rules(&self) -> &'static [RouteRule] {
        self.rules
    }

    /// Classify a request path.
    ///
    /// The path is normalized first (percent-decoding, duplicate slashes,
    /// dot segments, trailing slash) so that spellings such as
    /// `//admin` or `/courses/../admin` land in the same tier the upstream
    /// application would route them to.
    #[must_use]
    pub fn classify(&self, path: &str) -> Classification {
        let path = normalize_path(path);

        for rule in self.rules {
            let Some(rest) = rule.strip(&path) else {
                continue;
            };

            return match rule.tier {
                Tier::Public => Classification::Public,
                Tier::SignIn => Classification::SignIn,
                Tier::Authenticated => Classification::Authenticated,
                Tier::Admin => Classification::Admin,
                Tier::OwnedResource => rest
                    .split('/')
                    .find(|s| !s.is_empty())
                    .and_then(|segment| ResourceId::new(segment))
                    .map_or(Classification::Authenticated, Classification::OwnedResource),
            };
        }

        Classification::Public
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        DEFAULT_ROUTES
    }
}

/// Normalize a request path for classification.
///
/// Escapes are decoded byte-wise and invalid UTF-8 becomes U+FFFD, so a stray
/// `%FF` cannot leave the rest of the path undecoded.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let bytes = urlencoding::decode_binary(path.as_bytes());
    let decoded = String::from_utf8_lossy(&bytes);

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    format!("/{}", segments.join("/"))
}
