//! Counter key composition.

use std::borrow::Cow;
use std::fmt;

/// The namespace a counter key belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Whole-traffic limit shared by every route
    Global,
    /// Limit attached to a single route path
    Route(String),
    /// Caller-composed key outside the built-in namespaces
    Custom,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Route(path) => write!(f, "route:{}", path),
            Scope::Custom => write!(f, "custom"),
        }
    }
}

/// A key that uniquely identifies one counter.
///
/// Global keys render as `global:<identity>` and route keys as
/// `route:<path>:<identity>`, so the two namespaces never collide. Inside
/// a route key the path is escaped (`%` as `%25`, `:` as `%3A`), so the
/// first `:` after the namespace always ends the path even when the
/// identity is an IPv6 address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LimitKey {
    scope: Scope,
    key: String,
}

impl LimitKey {
    pub fn global(identity: &str) -> Self {
        Self {
            scope: Scope::Global,
            key: format!("global:{}", identity),
        }
    }

    pub fn route(path: &str, identity: &str) -> Self {
        Self {
            scope: Scope::Route(path.to_string()),
            key: format!("route:{}:{}", escape_path(path), identity),
        }
    }

    /// Use `key` verbatim. Keeping it distinct from the built-in namespaces
    /// is the caller's job.
    pub fn custom(key: impl Into<String>) -> Self {
        Self {
            scope: Scope::Custom,
            key: key.into(),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

fn escape_path(path: &str) -> Cow<'_, str> {
    if !path.contains([':', '%']) {
        return Cow::Borrowed(path);
    }
    Cow::Owned(path.replace('%', "%25").replace(':', "%3A"))
}

impl fmt::Display for LimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_key() {
        let key = LimitKey::global("10.0.0.1");
        assert_eq!(key.as_str(), "global:10.0.0.1");
        assert_eq!(key.scope(), &Scope::Global);
    }

    #[test]
    fn test_route_key() {
        let key = LimitKey::route("/login", "10.0.0.1");
        assert_eq!(key.as_str(), "route:/login:10.0.0.1");
        assert_eq!(key.scope(), &Scope::Route("/login".to_string()));
        assert_eq!(key.scope().to_string(), "route:/login");
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let global = LimitKey::global("10.0.0.1");
        let login = LimitKey::route("/login", "10.0.0.1");
        let custom = LimitKey::route("/custom", "10.0.0.1");

        assert_ne!(global, login);
        assert_ne!(login, custom);
    }

    #[test]
    fn test_route_key_with_colon_path_and_ipv6_caller() {
        let a = LimitKey::route("/u/x:2001", "db8::1");
        let b = LimitKey::route("/u/x", "2001:db8::1");

        assert_ne!(a, b);
        assert_eq!(a.as_str(), "route:/u/x%3A2001:db8::1");
        assert_eq!(b.as_str(), "route:/u/x:2001:db8::1");
        // The scope keeps the path as requested.
        assert_eq!(a.scope(), &Scope::Route("/u/x:2001".to_string()));
    }

    #[test]
    fn test_route_key_escapes_percent() {
        let literal = LimitKey::route("/a%3A", "1.2.3.4");
        let colon = LimitKey::route("/a:", "1.2.3.4");
        assert_ne!(literal, colon);
    }

    #[test]
    fn test_custom_key_is_verbatim() {
        let key = LimitKey::custom("k");
        assert_eq!(key.to_string(), "k");
        assert_eq!(key.scope(), &Scope::Custom);
    }
}
