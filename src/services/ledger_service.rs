//! Ledger engine - core rules for the append-only points ledger.
//!
//! This service handles:
//! - Creating earned and spent ledger entries
//! - Computing the derived balance (never stored, always recomputed)
//! - History and expiring-points queries
//!
//! # Atomicity Guarantees
//!
//! A deduction is a check-then-act sequence (read balance, then insert a
//! negative entry), so two concurrent deductions could both observe a
//! pre-deduction balance and both succeed when only one should. To prevent
//! that, the balance check and the insert run inside one PostgreSQL
//! transaction holding a per-(user, business) advisory lock.
//!
//! The entry-level primitives (`credit_entry`, `debit_entry`) operate on a
//! `PgConnection` so the QR coordinator can invoke them inside its own
//! transaction. Only this module writes `point_entries`.

use crate::{
    db::DbPool,
    error::AppError,
    models::point::{PointEntry, PointKind, live_balance},
};
use chrono::{DateTime, Months, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgConnection;
use uuid::Uuid;

/// Add points to a user's balance at a business.
///
/// Creates one `earned` entry with an expiry `expiry_months` calendar months
/// from now. Fails with `InvalidAmount` for a non-positive amount; otherwise
/// the only error path is the store itself.
pub async fn add_points(
    pool: &DbPool,
    user_id: Uuid,
    business_id: Uuid,
    amount: i64,
    source: &str,
    description: Option<String>,
    service_id: Option<Uuid>,
    expiry_months: u32,
) -> Result<PointEntry, AppError> {
    let mut conn = pool.acquire().await?;
    credit_entry(
        &mut conn,
        user_id,
        business_id,
        service_id,
        amount,
        source,
        description,
        expiry_months,
    )
    .await
}

/// Deduct points from a user's balance at a business.
///
/// # Process
///
/// 1. Start a database transaction
/// 2. Acquire the advisory lock for this (user, business) pair
/// 3. Recompute the live balance; fail `InsufficientBalance` if short
/// 4. Insert one `spent` entry with the amount negated and no expiry
/// 5. Commit (a failed check aborts the transaction, creating no row)
pub async fn deduct_points(
    pool: &DbPool,
    user_id: Uuid,
    business_id: Uuid,
    amount: i64,
    source: &str,
    description: Option<String>,
) -> Result<PointEntry, AppError> {
    let mut tx = pool.begin().await?;

    let entry = debit_entry(&mut tx, user_id, business_id, amount, source, description).await?;

    tx.commit().await?;

    Ok(entry)
}

/// Get the live points balance for a user at a business.
///
/// Pure read: sum of unexpired entries. Returns 0 when no entries exist, so
/// an unknown business is never an error.
pub async fn get_balance(
    pool: &DbPool,
    user_id: Uuid,
    business_id: Uuid,
) -> Result<i64, AppError> {
    let mut conn = pool.acquire().await?;
    balance_on(&mut conn, user_id, business_id).await
}

/// Get a user's ledger history, newest first.
///
/// Expired entries remain visible here; only the balance excludes them.
/// An empty result is a success, not an error.
pub async fn get_history(
    pool: &DbPool,
    user_id: Uuid,
    business_id: Option<Uuid>,
    kind: Option<PointKind>,
) -> Result<Vec<PointEntry>, AppError> {
    let entries = sqlx::query_as::<_, PointEntry>(
        r#"
        SELECT * FROM point_entries
        WHERE user_id = $1
          AND ($2::uuid IS NULL OR business_id = $2)
          AND ($3::point_kind IS NULL OR kind = $3)
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(business_id)
    .bind(kind)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Get earned entries expiring within the next `days_threshold` days.
///
/// The window is strictly (now, now + days]: already-expired entries are
/// excluded. Ordered by expiry date ascending so the soonest loss comes
/// first.
pub async fn get_expiring(
    pool: &DbPool,
    user_id: Uuid,
    days_threshold: i32,
) -> Result<Vec<PointEntry>, AppError> {
    let entries = sqlx::query_as::<_, PointEntry>(
        r#"
        SELECT * FROM point_entries
        WHERE user_id = $1
          AND kind = 'earned'
          AND expiry_date > NOW()
          AND expiry_date <= NOW() + make_interval(days => $2)
        ORDER BY expiry_date ASC
        "#,
    )
    .bind(user_id)
    .bind(days_threshold)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Insert one earned entry on an existing connection.
///
/// Callers running inside a transaction (the QR coordinator) pass their
/// transaction's connection so the insert commits or aborts with the rest of
/// their unit of work.
pub(crate) async fn credit_entry(
    conn: &mut PgConnection,
    user_id: Uuid,
    business_id: Uuid,
    service_id: Option<Uuid>,
    amount: i64,
    source: &str,
    description: Option<String>,
    expiry_months: u32,
) -> Result<PointEntry, AppError> {
    if amount <= 0 {
        return Err(AppError::InvalidAmount);
    }

    let expiry_date = expiry_from(Utc::now(), expiry_months);

    let entry = sqlx::query_as::<_, PointEntry>(
        r#"
        INSERT INTO point_entries (
            user_id,
            business_id,
            service_id,
            amount,
            kind,
            source,
            description,
            expiry_date
        )
        VALUES ($1, $2, $3, $4, 'earned', $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(business_id)
    .bind(service_id)
    .bind(amount)
    .bind(source)
    .bind(description)
    .bind(expiry_date)
    .fetch_one(&mut *conn)
    .await?;

    Ok(entry)
}

/// Check the balance and insert one spent entry on an existing connection.
///
/// Must run inside a transaction: the advisory lock taken here is released
/// at transaction end and is what serializes concurrent deductions for the
/// same (user, business) pair. On `InsufficientBalance` no row is created
/// and the caller's transaction aborts via error propagation.
pub(crate) async fn debit_entry(
    conn: &mut PgConnection,
    user_id: Uuid,
    business_id: Uuid,
    amount: i64,
    source: &str,
    description: Option<String>,
) -> Result<PointEntry, AppError> {
    if amount <= 0 {
        return Err(AppError::InvalidAmount);
    }

    // Serialize the read-balance-then-insert sequence per (user, business).
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(pair_lock_key(user_id, business_id))
        .execute(&mut *conn)
        .await?;

    let balance = balance_on(&mut *conn, user_id, business_id).await?;
    if balance < amount {
        return Err(AppError::InsufficientBalance);
    }

    let entry = sqlx::query_as::<_, PointEntry>(
        r#"
        INSERT INTO point_entries (
            user_id,
            business_id,
            amount,
            kind,
            source,
            description
        )
        VALUES ($1, $2, $3, 'spent', $4, $5)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(business_id)
    .bind(-amount)
    .bind(source)
    .bind(description)
    .fetch_one(&mut *conn)
    .await?;

    Ok(entry)
}

/// Recompute the live balance on an existing connection.
///
/// Fetches the pair's entries and sums the unexpired ones. The scan is O(n)
/// in per-user, per-business activity; keeping the balance derived rather
/// than cached is what makes the ledger the single source of truth.
pub(crate) async fn balance_on(
    conn: &mut PgConnection,
    user_id: Uuid,
    business_id: Uuid,
) -> Result<i64, AppError> {
    let entries = sqlx::query_as::<_, PointEntry>(
        "SELECT * FROM point_entries WHERE user_id = $1 AND business_id = $2",
    )
    .bind(user_id)
    .bind(business_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(live_balance(&entries, Utc::now()))
}

/// Compute an expiry date `months` calendar months after `now`.
///
/// Calendar-month arithmetic, not fixed-day: the day of month is preserved
/// where possible and clamped to the end of the target month otherwise
/// (Jan 31 + 1 month = Feb 28, or Feb 29 in a leap year).
fn expiry_from(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    now.checked_add_months(Months::new(months))
        .expect("expiry date within chrono's representable range")
}

/// Derive the advisory-lock key for a (user, business) pair.
///
/// First 8 bytes of SHA-256 over both UUIDs, interpreted as i64. The same
/// pair always maps to the same key; the hash keeps unrelated pairs from
/// contending.
fn pair_lock_key(user_id: Uuid, business_id: Uuid) -> i64 {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(business_id.as_bytes());
    let digest = hasher.finalize();

    i64::from_be_bytes(digest[..8].try_into().expect("digest has at least 8 bytes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn expiry_adds_calendar_months() {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap();
        let expiry = expiry_from(now, 12);
        assert_eq!(expiry, Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn expiry_clamps_to_end_of_shorter_month() {
        let jan_31 = Utc.with_ymd_and_hms(2025, 1, 31, 9, 30, 0).unwrap();
        let expiry = expiry_from(jan_31, 1);
        assert_eq!(expiry, Utc.with_ymd_and_hms(2025, 2, 28, 9, 30, 0).unwrap());
    }

    #[test]
    fn expiry_clamps_to_leap_day_in_leap_year() {
        let jan_31 = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let expiry = expiry_from(jan_31, 1);
        assert_eq!(expiry, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
    }

    #[test]
    fn lock_key_is_deterministic_per_pair() {
        let user = Uuid::new_v4();
        let business = Uuid::new_v4();
        assert_eq!(
            pair_lock_key(user, business),
            pair_lock_key(user, business)
        );
    }

    #[test]
    fn lock_key_distinguishes_pair_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_ne!(pair_lock_key(a, b), pair_lock_key(b, a));
    }
}
