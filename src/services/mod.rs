//! Business logic services.
//!
//! Services contain the core rules separated from HTTP handlers: the
//! append-only points ledger and the QR transaction coordinator. They own
//! all database transaction management.

pub mod ledger_service;
pub mod qr_service;
