//! QR transaction HTTP handlers.
//!
//! This module implements the QR-related API endpoints:
//! - POST /api/v1/qr/generate - Issue a single-use QR transaction
//! - POST /api/v1/qr/process/:code - Redeem a code at a business terminal
//! - POST /api/v1/qr/cancel/:code - Cancel a pending code
//! - GET /api/v1/qr/status/:code - Look up a transaction by code
//! - GET /api/v1/qr/history - Authenticated user's QR history

use crate::{
    AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::qr::{GenerateQrRequest, ProcessQrRequest, ProcessedQr, QrTransaction},
    services::qr_service,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Duration;

/// Issue a new QR transaction for the authenticated user.
///
/// # Request Body
///
/// ```json
/// {
///   "kind": "redeem",
///   "points": 100
/// }
/// ```
///
/// The returned transaction is pending and expires `QR_TTL_MINUTES` from
/// now. Nothing is applied to the ledger until a business processes the
/// code.
pub async fn generate_qr(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<GenerateQrRequest>,
) -> Result<Json<QrTransaction>, AppError> {
    let transaction = qr_service::issue(
        &state.pool,
        auth.user_id,
        request.kind,
        request.points,
        Duration::minutes(state.config.qr_ttl_minutes),
    )
    .await?;

    Ok(Json(transaction))
}

/// Process a QR code on behalf of a business terminal.
///
/// Applies the code's intended earn or redeem to the ledger and marks the
/// code completed, all in one atomic unit. The caller is the terminal
/// operator, not necessarily the code's owner.
///
/// # Errors
///
/// - 404 `not_found`: unknown code
/// - 409 `already_used`: code already completed or cancelled
/// - 410 `expired`: code past its deadline
/// - 422 `insufficient_balance`: redeem exceeds the live balance
///   (the code stays pending)
pub async fn process_qr(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<ProcessQrRequest>,
) -> Result<Json<ProcessedQr>, AppError> {
    let processed = qr_service::process(
        &state.pool,
        &code,
        request.business_id,
        state.config.point_expiry_months,
    )
    .await?;

    Ok(Json(processed))
}

/// Cancel a pending QR transaction.
///
/// No ledger effect; a cancelled code can never be processed afterwards.
pub async fn cancel_qr(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<QrTransaction>, AppError> {
    let transaction = qr_service::cancel(&state.pool, &code).await?;

    Ok(Json(transaction))
}

/// Look up a QR transaction by code.
pub async fn get_status(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<QrTransaction>, AppError> {
    let transaction = qr_service::get_status(&state.pool, &code).await?;

    Ok(Json(transaction))
}

/// Get the authenticated user's QR transaction history, newest first.
pub async fn get_history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<QrTransaction>>, AppError> {
    let transactions = qr_service::get_history(&state.pool, auth.user_id).await?;

    Ok(Json(transactions))
}
