//! Gateway HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → routing layer picks the Route (or 404)
//!     → request.rs (rewrite authority + Host, drop hop-by-hop headers)
//!     → forward.rs (pooled client, per-call timeout)
//!     → response.rs (relay streamed response, or 502/504 JSON error)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::Forwarder;
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::ProxyError;
pub use server::Gateway;
