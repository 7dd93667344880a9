//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (ordered route scan)
//!     → matcher.rs (prefix test)
//!     → Return: matched Route (with Upstream) or NoMatch
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Parse prefixes and target URLs
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Routes are static configuration, never looked up in the registry
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod matcher;
pub mod router;

use thiserror::Error;

pub use matcher::PathPrefixMatcher;
pub use router::{Route, Router, Upstream};

/// Errors raised while compiling the route table.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid path prefix '{pattern}': {reason}")]
    InvalidPrefix { pattern: String, reason: String },

    #[error("invalid target URL '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },
}
