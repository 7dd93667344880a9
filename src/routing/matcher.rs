//! Route matching logic.
//!
//! # Responsibilities
//! - Parse a configured prefix pattern (`/users/*`)
//! - Match request paths against it (case-sensitive)
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching
//! - `/users/*` also matches the bare `/users` segment, never `/usersfoo`

use crate::routing::RouteError;

/// Matches the request path against a literal prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    /// Prefix including the trailing slash of the wildcard segment, e.g. "/users/".
    prefix: String,
    /// The pattern as configured, for logs.
    pattern: String,
}

impl PathPrefixMatcher {
    /// Parse a prefix pattern.
    ///
    /// Accepted forms are `/users/*`, `/users/` and `/users`; all three
    /// select `/users` and everything beneath it. `/*` and `/` match every path.
    pub fn parse(pattern: &str) -> Result<Self, RouteError> {
        let invalid = |reason: &str| RouteError::InvalidPrefix {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if pattern.is_empty() {
            return Err(invalid("prefix must not be empty"));
        }
        if !pattern.starts_with('/') {
            return Err(invalid("prefix must start with '/'"));
        }

        let literal = pattern.strip_suffix('*').unwrap_or(pattern);
        if literal.contains('*') {
            return Err(invalid("'*' is only allowed as the final segment"));
        }
        if literal.contains('?') || literal.contains('#') {
            return Err(invalid("prefix must not carry a query or fragment"));
        }

        let prefix = if literal.ends_with('/') {
            literal.to_string()
        } else {
            format!("{}/", literal)
        };

        Ok(Self {
            prefix,
            pattern: pattern.to_string(),
        })
    }

    /// Returns true if the path falls under this prefix.
    pub fn matches(&self, path: &str) -> bool {
        if path.starts_with(&self.prefix) {
            return true;
        }
        // "/users/" also owns the bare "/users"
        path.len() + 1 == self.prefix.len() && self.prefix.starts_with(path)
    }

    /// The pattern as it was configured.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}
