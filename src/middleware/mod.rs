//! HTTP middleware components.
//!
//! Middleware run before route handlers. The only one here is the identity
//! collaborator: it authenticates requests and injects the opaque user ID
//! the core operates on.

/// Bearer token authentication middleware
pub mod auth;
