//! HTTP request handlers (route handlers).
//!
//! Each handler is a thin async function: it extracts request data, calls
//! the matching service operation with the authenticated user, and returns
//! JSON. No ledger or QR rules live here.

/// Service health endpoint
pub mod health;
/// Points ledger endpoints
pub mod points;
/// QR transaction endpoints
pub mod qr;
