//! Points ledger data models and API request/response types.
//!
//! This module defines:
//! - `PointEntry`: an immutable ledger record (the only stored points fact)
//! - `PointKind`: whether an entry earned or spent points
//! - `live_balance`: the derived balance over a set of entries
//! - Request/response types for the points endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a ledger entry.
///
/// Maps to the `point_kind` Postgres enum. Earned entries carry a positive
/// amount and an expiry date; spent entries carry a negative amount and
/// never expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "point_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    Earned,
    Spent,
}

/// Represents one immutable ledger record from the database.
///
/// # Database Table
///
/// Maps to the `point_entries` table. The ledger is append-only: rows are
/// never updated or deleted. A deduction is a *new* negative-amount row, not
/// a mutation of prior rows, which gives a trivially correct audit trail.
///
/// # Balance
///
/// No stored balance field exists anywhere. The balance for a
/// (user, business) pair is always recomputed from these rows, which
/// eliminates cached-balance drift.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PointEntry {
    /// Unique identifier for this entry
    pub id: Uuid,

    /// User the points belong to (opaque, supplied by the identity layer)
    pub user_id: Uuid,

    /// Business the points are scoped to
    ///
    /// Balances are per-business; points earned at one business cannot be
    /// spent at another.
    pub business_id: Uuid,

    /// Optional service this entry relates to (e.g. a booked appointment)
    pub service_id: Option<Uuid>,

    /// Signed point amount: positive = earned, negative = spent
    pub amount: i64,

    /// Whether this entry earned or spent points
    pub kind: PointKind,

    /// Free-form provenance tag (e.g. "service_booking", "qr_code")
    pub source: String,

    /// Human-readable description
    pub description: Option<String>,

    /// When these points stop counting toward the balance
    ///
    /// Set only on earned entries. Spent entries have no expiry; they reduce
    /// the balance immediately and permanently.
    pub expiry_date: Option<DateTime<Utc>>,

    /// When this entry was created
    pub created_at: DateTime<Utc>,
}

impl PointEntry {
    /// Whether this entry still counts toward the live balance at `now`.
    ///
    /// Entries without an expiry date always count; expired earned entries
    /// are excluded from the balance but stay visible in history.
    pub fn counts_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date.is_none_or(|expiry| expiry > now)
    }
}

/// Compute the live balance over a set of ledger entries.
///
/// Sum of `amount` over every entry whose expiry is unset or strictly in the
/// future. An empty slice yields 0, so an unknown business is simply a zero
/// balance, never an error.
pub fn live_balance(entries: &[PointEntry], now: DateTime<Utc>) -> i64 {
    entries
        .iter()
        .filter(|entry| entry.counts_at(now))
        .map(|entry| entry.amount)
        .sum()
}

/// Request body for `POST /api/v1/points/add`.
///
/// ```json
/// {
///   "business_id": "550e8400-e29b-41d4-a716-446655440000",
///   "amount": 150,
///   "description": "Haircut booking",
///   "service_id": "660e8400-e29b-41d4-a716-446655440001"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct AddPointsRequest {
    /// Business crediting the points
    pub business_id: Uuid,

    /// Points to add (must be positive)
    pub amount: i64,

    /// Optional description
    pub description: Option<String>,

    /// Optional service the points relate to
    pub service_id: Option<Uuid>,

    /// Provenance tag, defaults to "service_booking"
    pub source: Option<String>,
}

/// Request body for `POST /api/v1/points/deduct`.
#[derive(Debug, Deserialize)]
pub struct DeductPointsRequest {
    /// Business the points are spent at
    pub business_id: Uuid,

    /// Points to deduct (must be positive; stored negated)
    pub amount: i64,

    /// Optional description
    pub description: Option<String>,

    /// Provenance tag, defaults to "reward_redemption"
    pub source: Option<String>,
}

/// Query parameters for `GET /api/v1/points/history`.
///
/// Both filters are optional; an empty result is a success, not an error.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub business_id: Option<Uuid>,
    pub kind: Option<PointKind>,
}

/// Query parameters for `GET /api/v1/points/expiring`.
#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    /// Window in days; entries expiring within (now, now + days] are returned
    #[serde(default = "default_expiring_days")]
    pub days: i32,
}

fn default_expiring_days() -> i32 {
    30
}

/// Response body for `GET /api/v1/points/balance/{business_id}`.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub business_id: Uuid,
    pub balance: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(amount: i64, kind: PointKind, expiry_date: Option<DateTime<Utc>>) -> PointEntry {
        PointEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            service_id: None,
            amount,
            kind,
            source: "test".to_string(),
            description: None,
            expiry_date,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn balance_of_empty_ledger_is_zero() {
        assert_eq!(live_balance(&[], Utc::now()), 0);
    }

    #[test]
    fn balance_sums_earned_and_spent_entries() {
        let now = Utc::now();
        let entries = vec![
            entry(150, PointKind::Earned, Some(now + Duration::days(365))),
            entry(-50, PointKind::Spent, None),
        ];
        assert_eq!(live_balance(&entries, now), 100);
    }

    #[test]
    fn balance_matches_sum_over_many_movements() {
        let now = Utc::now();
        let future = Some(now + Duration::days(30));
        let entries = vec![
            entry(100, PointKind::Earned, future),
            entry(200, PointKind::Earned, future),
            entry(-75, PointKind::Spent, None),
            entry(50, PointKind::Earned, future),
            entry(-25, PointKind::Spent, None),
        ];
        assert_eq!(live_balance(&entries, now), 250);
    }

    #[test]
    fn expired_earned_entry_is_excluded_from_balance() {
        let now = Utc::now();
        let entries = vec![
            entry(100, PointKind::Earned, Some(now - Duration::days(1))),
            entry(40, PointKind::Earned, Some(now + Duration::days(1))),
        ];
        assert_eq!(live_balance(&entries, now), 40);
    }

    #[test]
    fn entry_expiring_exactly_now_no_longer_counts() {
        let now = Utc::now();
        let e = entry(100, PointKind::Earned, Some(now));
        assert!(!e.counts_at(now));
    }

    #[test]
    fn spent_entries_always_count() {
        let now = Utc::now();
        let e = entry(-30, PointKind::Spent, None);
        assert!(e.counts_at(now));
        assert!(e.counts_at(now + Duration::days(10_000)));
    }
}
