//! API token model for authentication.
//!
//! Tokens are issued by the external identity service and stored here as
//! SHA-256 hashes. Each token resolves to one opaque user profile ID, which
//! is the only identity fact the core consumes.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Represents an API token record from the database.
///
/// Maps to the `api_tokens` table. When a request arrives with
/// `Bearer abc123`, the middleware hashes `abc123` with SHA-256 and looks the
/// hash up here; if found and active, the request runs as `user_id`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiToken {
    /// Unique identifier for this token record
    pub id: Uuid,

    /// SHA-256 hash of the actual token (64 hex characters)
    pub token_hash: String,

    /// User profile this token authenticates as
    pub user_id: Uuid,

    /// Whether this token is currently active
    ///
    /// Inactive tokens are rejected during authentication, which allows
    /// revocation without deleting the record.
    pub is_active: bool,

    /// Timestamp when this token was created
    pub created_at: DateTime<Utc>,
}
