//! Bearer token authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the API token from the Authorization header
//! 2. Hash it and verify it exists in the database
//! 3. Inject the authenticated user's identity into the request
//! 4. Reject unauthorized requests with HTTP 401
//!
//! The core trusts the resulting user ID and does no re-authentication;
//! token issuance itself belongs to the external identity service.

use crate::{AppState, error::AppError, models::api_token::ApiToken};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Authentication context attached to authenticated requests.
///
/// Inserted into the request's extension map; route handlers extract it to
/// know which user made the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Opaque identifier of the authenticated user profile
    pub user_id: Uuid,
}

/// Bearer token authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <token>` header from the request
/// 2. Hash the `<token>` using SHA-256
/// 3. Query the database for a matching active hash
/// 4. If found: inject `AuthContext`, call the next handler
/// 5. If not found: fail with `InvalidToken` (HTTP 401)
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidToken)?;

    // Expected format: "Bearer <token>"
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::InvalidToken)?;

    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let token_hash = hex::encode(hasher.finalize());

    let record = sqlx::query_as::<_, ApiToken>(
        "SELECT id, token_hash, user_id, is_active, created_at
         FROM api_tokens
         WHERE token_hash = $1 AND is_active = true",
    )
    .bind(&token_hash)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::InvalidToken)?;

    request.extensions_mut().insert(AuthContext {
        user_id: record.user_id,
    });

    Ok(next.run(request).await)
}
