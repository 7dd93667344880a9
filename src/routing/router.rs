//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Look up the matching route for a request path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) path prefix scan (acceptable for typical route counts)
//! - First registered match wins; overlaps are not reordered
//! - Explicit NoMatch rather than silent default

use std::fmt;

use axum::http::uri::{Authority, Scheme};

use crate::config::RouteConfig;
use crate::routing::matcher::PathPrefixMatcher;
use crate::routing::RouteError;

/// A backend base URL reduced to what forwarding needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    scheme: Scheme,
    authority: Authority,
}

impl Upstream {
    /// Parse a backend base URL such as `http://user-service:8001`.
    ///
    /// The URL must be absolute `http` with a host, and carry no path,
    /// query, fragment or credentials.
    pub fn parse(target: &str) -> Result<Self, RouteError> {
        let invalid = |reason: &str| RouteError::InvalidTarget {
            target: target.to_string(),
            reason: reason.to_string(),
        };

        let url = url::Url::parse(target).map_err(|e| invalid(&e.to_string()))?;

        if url.scheme() != "http" {
            return Err(invalid("only http targets are supported"));
        }
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        if url.path() != "/" && !url.path().is_empty() {
            return Err(invalid("target must not have a path"));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("target must not have a query or fragment"));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(invalid("target must not carry credentials"));
        }

        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority = Authority::try_from(authority.as_str())
            .map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            scheme: Scheme::HTTP,
            authority,
        })
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// `host[:port]`, used both as URI authority and `Host` header.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    pub matcher: PathPrefixMatcher,
    pub upstream: Upstream,
}

/// The gateway's static, ordered route table.
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Compile the route table from configuration.
    ///
    /// Fails on the first malformed prefix or target; a partial table is
    /// never produced.
    pub fn from_config(routes: &[RouteConfig]) -> Result<Self, RouteError> {
        let routes = routes
            .iter()
            .map(|rc| {
                let matcher = PathPrefixMatcher::parse(&rc.path_prefix)?;
                let upstream = Upstream::parse(&rc.target)?;
                let name = if rc.name.is_empty() {
                    rc.path_prefix.clone()
                } else {
                    rc.name.clone()
                };
                Ok(Route {
                    name,
                    matcher,
                    upstream,
                })
            })
            .collect::<Result<Vec<_>, RouteError>>()?;

        for route in &routes {
            tracing::debug!(
                route = %route.name,
                prefix = %route.matcher.pattern(),
                upstream = %route.upstream,
                "Route compiled"
            );
        }

        Ok(Self { routes })
    }

    /// Find the first route whose prefix matches `path`.
    pub fn match_path(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.matcher.matches(path))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
