//! Points ledger HTTP handlers.
//!
//! This module implements the points-related API endpoints:
//! - POST /api/v1/points/add - Credit points to the authenticated user
//! - POST /api/v1/points/deduct - Spend points
//! - GET /api/v1/points/balance/:business_id - Live balance at a business
//! - GET /api/v1/points/history - Ledger history with optional filters
//! - GET /api/v1/points/expiring - Points expiring within a window

use crate::{
    AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::point::{
        AddPointsRequest, BalanceResponse, DeductPointsRequest, ExpiringQuery, HistoryQuery,
        PointEntry,
    },
    services::ledger_service,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;

/// Credit points to the authenticated user at a business.
///
/// # Request Body
///
/// ```json
/// {
///   "business_id": "550e8400-...",
///   "amount": 150,
///   "description": "Haircut booking",
///   "service_id": "660e8400-..."
/// }
/// ```
///
/// The created entry expires `POINT_EXPIRY_MONTHS` calendar months from now.
/// Whether `business_id` names a real business is the upstream validation
/// layer's concern; the ledger records it as given.
pub async fn add_points(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<AddPointsRequest>,
) -> Result<Json<PointEntry>, AppError> {
    let entry = ledger_service::add_points(
        &state.pool,
        auth.user_id,
        request.business_id,
        request.amount,
        request.source.as_deref().unwrap_or("service_booking"),
        request.description,
        request.service_id,
        state.config.point_expiry_months,
    )
    .await?;

    Ok(Json(entry))
}

/// Spend points from the authenticated user's balance at a business.
///
/// Fails with 422 `insufficient_balance` when the live balance is below the
/// requested amount; the balance is left unchanged in that case.
pub async fn deduct_points(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<DeductPointsRequest>,
) -> Result<Json<PointEntry>, AppError> {
    let entry = ledger_service::deduct_points(
        &state.pool,
        auth.user_id,
        request.business_id,
        request.amount,
        request.source.as_deref().unwrap_or("reward_redemption"),
        request.description,
    )
    .await?;

    Ok(Json(entry))
}

/// Get the authenticated user's live balance at a business.
///
/// Returns 0 for a business the user has never interacted with.
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(business_id): Path<Uuid>,
) -> Result<Json<BalanceResponse>, AppError> {
    let balance = ledger_service::get_balance(&state.pool, auth.user_id, business_id).await?;

    Ok(Json(BalanceResponse {
        business_id,
        balance,
    }))
}

/// Get the authenticated user's ledger history, newest first.
///
/// Supports optional `business_id` and `kind` (earned/spent) query filters.
/// Expired entries are included; history is the audit trail, not the
/// balance.
pub async fn get_history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<PointEntry>>, AppError> {
    let entries =
        ledger_service::get_history(&state.pool, auth.user_id, query.business_id, query.kind)
            .await?;

    Ok(Json(entries))
}

/// Get entries whose points expire within the next `days` days (default 30).
pub async fn get_expiring(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ExpiringQuery>,
) -> Result<Json<Vec<PointEntry>>, AppError> {
    let entries = ledger_service::get_expiring(&state.pool, auth.user_id, query.days).await?;

    Ok(Json(entries))
}
