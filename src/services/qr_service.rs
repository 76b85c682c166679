//! QR transaction coordinator - issuance and exactly-once redemption.
//!
//! Issues time-boxed, single-use codes representing an intended earn or
//! redeem action, and applies the corresponding ledger operation when a
//! business terminal submits the code. Issuance never touches the ledger;
//! the ledger effect happens only inside `process`, in the same database
//! transaction that retires the code.
//!
//! # Exactly-Once Guarantee
//!
//! `process` locks the row with `FOR UPDATE` before checking its status and
//! flips `pending -> completed` with a compare-and-set in the same
//! transaction. If two requests race on one code, the second blocks on the
//! row lock, then observes the committed non-pending status and fails with
//! `AlreadyUsed`. A code is therefore the basis of at most one ledger
//! mutation.

use crate::{
    db::DbPool,
    error::AppError,
    models::point::PointEntry,
    models::qr::{ProcessedQr, QrKind, QrTransaction},
    services::ledger_service,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

/// Provenance tag recorded on ledger entries created through a QR code.
const QR_SOURCE: &str = "qr_code";

/// Issue a new QR transaction for a user.
///
/// Generates a unique unguessable code and stores a pending row expiring
/// `ttl` from now. No ledger effect. Fails with `InvalidAmount` when
/// `points` is not positive.
pub async fn issue(
    pool: &DbPool,
    user_id: Uuid,
    kind: QrKind,
    points: i64,
    ttl: Duration,
) -> Result<QrTransaction, AppError> {
    if points <= 0 {
        return Err(AppError::InvalidAmount);
    }

    let code = generate_code();
    let expiry_date = Utc::now() + ttl;

    let transaction = sqlx::query_as::<_, QrTransaction>(
        r#"
        INSERT INTO qr_transactions (user_id, code, kind, points, status, expiry_date)
        VALUES ($1, $2, $3, $4, 'pending', $5)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&code)
    .bind(kind)
    .bind(points)
    .bind(expiry_date)
    .fetch_one(pool)
    .await?;

    Ok(transaction)
}

/// Process a QR code submitted by a business terminal.
///
/// # Process
///
/// All steps run inside one database transaction:
///
/// 1. Look up and row-lock the transaction by code (`NotFound` if absent)
/// 2. Reject non-pending (`AlreadyUsed`) and past-deadline (`Expired`) rows
/// 3. Dispatch to the ledger: earn -> credit, redeem -> debit
///    (`InsufficientBalance` propagates unchanged and aborts the unit,
///    leaving the row pending rather than silently consuming it)
/// 4. Flip the status to completed
/// 5. Commit
///
/// Returns the completed transaction together with the ledger entry it
/// produced.
pub async fn process(
    pool: &DbPool,
    code: &str,
    business_id: Uuid,
    expiry_months: u32,
) -> Result<ProcessedQr, AppError> {
    let mut tx = pool.begin().await?;

    // Row lock: a concurrent submission of the same code waits here and then
    // observes whatever status this transaction commits.
    let qr = sqlx::query_as::<_, QrTransaction>(
        "SELECT * FROM qr_transactions WHERE code = $1 FOR UPDATE",
    )
    .bind(code)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound)?;

    qr.ensure_processable(Utc::now())?;

    let entry = apply_ledger_effect(&mut tx, &qr, business_id, expiry_months).await?;

    // Compare-and-set on the status; the row lock above makes this the only
    // writer, and the guard keeps the flip one-way regardless.
    let completed = sqlx::query_as::<_, QrTransaction>(
        r#"
        UPDATE qr_transactions
        SET status = 'completed'
        WHERE id = $1 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(qr.id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::AlreadyUsed)?;

    tx.commit().await?;

    tracing::info!(
        code = %completed.code,
        kind = ?completed.kind,
        points = completed.points,
        "QR transaction completed"
    );

    Ok(ProcessedQr {
        transaction: completed,
        entry,
    })
}

/// Cancel a pending QR transaction.
///
/// Fails with `NotFound` for an unknown code, `InvalidState` when the row
/// already left pending, and `Expired` past the deadline. No ledger effect.
pub async fn cancel(pool: &DbPool, code: &str) -> Result<QrTransaction, AppError> {
    let mut tx = pool.begin().await?;

    let qr = sqlx::query_as::<_, QrTransaction>(
        "SELECT * FROM qr_transactions WHERE code = $1 FOR UPDATE",
    )
    .bind(code)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound)?;

    qr.ensure_cancellable(Utc::now())?;

    let cancelled = sqlx::query_as::<_, QrTransaction>(
        r#"
        UPDATE qr_transactions
        SET status = 'cancelled'
        WHERE id = $1 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(qr.id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::InvalidState)?;

    tx.commit().await?;

    Ok(cancelled)
}

/// Look up a QR transaction by code.
pub async fn get_status(pool: &DbPool, code: &str) -> Result<QrTransaction, AppError> {
    sqlx::query_as::<_, QrTransaction>("SELECT * FROM qr_transactions WHERE code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)
}

/// Get a user's QR transaction history, newest first.
pub async fn get_history(pool: &DbPool, user_id: Uuid) -> Result<Vec<QrTransaction>, AppError> {
    let transactions = sqlx::query_as::<_, QrTransaction>(
        "SELECT * FROM qr_transactions WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(transactions)
}

/// Dispatch the transaction's intended effect to the ledger engine.
///
/// Runs on the caller's transaction connection so the entry commits or
/// aborts together with the status flip. The coordinator never writes
/// `point_entries` itself.
async fn apply_ledger_effect(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    qr: &QrTransaction,
    business_id: Uuid,
    expiry_months: u32,
) -> Result<PointEntry, AppError> {
    match qr.kind {
        QrKind::Earn => {
            ledger_service::credit_entry(
                &mut *tx,
                qr.user_id,
                business_id,
                None,
                qr.points,
                QR_SOURCE,
                Some(format!("Points earned via QR code: {}", qr.code)),
                expiry_months,
            )
            .await
        }
        QrKind::Redeem => {
            ledger_service::debit_entry(
                &mut *tx,
                qr.user_id,
                business_id,
                qr.points,
                QR_SOURCE,
                Some(format!("Points redeemed via QR code: {}", qr.code)),
            )
            .await
        }
    }
}

/// Generate a unique, unguessable QR code string.
///
/// Millisecond timestamp in hex plus 16 cryptographically random bytes:
/// the time component makes collisions practically impossible, the random
/// component makes enumeration infeasible. Uniqueness is still enforced by
/// the database's unique index on `code`.
fn generate_code() -> String {
    let random: [u8; 16] = rand::random();
    format!("{:x}-{}", Utc::now().timestamp_millis(), hex::encode(random))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_codes_are_unique() {
        let codes: HashSet<String> = (0..1000).map(|_| generate_code()).collect();
        assert_eq!(codes.len(), 1000);
    }

    #[test]
    fn generated_code_has_timestamp_and_random_parts() {
        let code = generate_code();
        let (timestamp, random) = code.split_once('-').expect("code has two parts");

        assert!(!timestamp.is_empty());
        assert!(timestamp.chars().all(|c| c.is_ascii_hexdigit()));
        // 16 random bytes hex-encode to 32 characters.
        assert_eq!(random.len(), 32);
        assert!(random.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
