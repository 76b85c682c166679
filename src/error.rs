//! Error types and HTTP error response handling.
//!
//! All core errors form a closed taxonomy so callers can branch on the error
//! kind rather than parsing message text. The transport mapping lives here
//! too: each variant converts to a status code and a JSON body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// Every fallible core operation returns one of these variants unchanged to
/// the caller; there is no silent recovery. The only internal retry surface
/// is the transaction abort-and-rollback in the services, which is invisible
/// here.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Underlying persistence failure, not further classified by the core.
    ///
    /// Wraps any sqlx::Error via `#[from]`. Details are hidden from clients.
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Bearer token is missing, unknown, or revoked.
    ///
    /// Produced by the identity middleware, not by the core itself.
    #[error("Invalid API token")]
    InvalidToken,

    /// Point amount is zero or negative.
    ///
    /// Upstream validation should already reject these, but amount
    /// positivity is safety-critical so the core re-checks it.
    #[error("Point amount must be a positive integer")]
    InvalidAmount,

    /// Deduction or redemption exceeds the live balance.
    #[error("Insufficient points balance")]
    InsufficientBalance,

    /// No QR transaction exists for the given code.
    #[error("Invalid QR code")]
    NotFound,

    /// QR code has already left the pending state.
    #[error("QR code has already been used")]
    AlreadyUsed,

    /// QR code is past its expiry deadline.
    #[error("QR code has expired")]
    Expired,

    /// Cancellation attempted on a non-pending QR transaction.
    #[error("Transaction cannot be cancelled")]
    InvalidState,
}

/// Convert AppError into an HTTP response.
///
/// Allows handlers to return `Result<T, AppError>` and have errors
/// automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_kind",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `InvalidToken` → 401 Unauthorized
/// - `InvalidAmount` → 400 Bad Request
/// - `InsufficientBalance` → 422 Unprocessable Entity
/// - `NotFound` → 404 Not Found
/// - `AlreadyUsed`, `InvalidState` → 409 Conflict
/// - `Expired` → 410 Gone
/// - `Store` → 500 Internal Server Error (details hidden from the client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", self.to_string()),
            AppError::InvalidAmount => {
                (StatusCode::BAD_REQUEST, "invalid_amount", self.to_string())
            }
            AppError::InsufficientBalance => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_balance",
                self.to_string(),
            ),
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::AlreadyUsed => (StatusCode::CONFLICT, "already_used", self.to_string()),
            AppError::Expired => (StatusCode::GONE, "expired", self.to_string()),
            AppError::InvalidState => (StatusCode::CONFLICT, "invalid_state", self.to_string()),
            AppError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
