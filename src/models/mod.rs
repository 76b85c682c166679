//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the API request/response types built around them.

/// API token authentication model
pub mod api_token;
/// Points ledger entry model and balance computation
pub mod point;
/// QR transaction model and state-machine guards
pub mod qr;
