//! QR transaction data models and state-machine guards.
//!
//! A QR transaction is a single-use, time-boxed intent token: it represents
//! an earn or redeem action that has been announced but not yet applied to
//! the ledger. The guards here encode the full state machine:
//!
//! ```text
//! pending --process(success)--> completed
//! pending --cancel-----------> cancelled
//! ```
//!
//! A pending row past its expiry date is terminal for all practical purposes
//! even though no background job flips the stored status; expiry is checked
//! lazily at use-time. Stale pending rows linger in storage but are inert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::point::PointEntry;

/// Intended ledger effect of a QR transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "qr_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QrKind {
    Earn,
    Redeem,
}

/// Lifecycle state of a QR transaction.
///
/// Transitions out of `Pending` are one-way; a row reaches exactly one of
/// `Completed` or `Cancelled`, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "qr_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QrStatus {
    Pending,
    Completed,
    Cancelled,
}

/// Represents a QR transaction record from the database.
///
/// Maps to the `qr_transactions` table. Rows are never physically deleted;
/// completed and cancelled transactions are retained for history.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct QrTransaction {
    /// Unique identifier for this transaction
    pub id: Uuid,

    /// User who requested the QR code
    pub user_id: Uuid,

    /// Globally unique, unguessable code embedded in the QR image
    ///
    /// Derived from a millisecond timestamp plus 16 cryptographically random
    /// bytes, preventing both collision and enumeration.
    pub code: String,

    /// Intended ledger effect when a business terminal processes the code
    pub kind: QrKind,

    /// Points to earn or redeem (always positive)
    pub points: i64,

    /// Current lifecycle state
    pub status: QrStatus,

    /// Deadline after which the code can no longer be processed or cancelled
    pub expiry_date: DateTime<Utc>,

    /// When the code was issued
    pub created_at: DateTime<Utc>,
}

impl QrTransaction {
    /// Check that this transaction may be processed at `now`.
    ///
    /// A non-pending row fails with `AlreadyUsed` regardless of expiry, so
    /// the caller of a consumed code learns it was used rather than that it
    /// is old. A pending row at or past its deadline fails with `Expired`.
    pub fn ensure_processable(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.status != QrStatus::Pending {
            return Err(AppError::AlreadyUsed);
        }
        if now >= self.expiry_date {
            return Err(AppError::Expired);
        }
        Ok(())
    }

    /// Check that this transaction may be cancelled at `now`.
    ///
    /// Cancellation is only valid on a live pending row. Both checks fail
    /// without side effects.
    pub fn ensure_cancellable(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.status != QrStatus::Pending {
            return Err(AppError::InvalidState);
        }
        if now >= self.expiry_date {
            return Err(AppError::Expired);
        }
        Ok(())
    }
}

/// Request body for `POST /api/v1/qr/generate`.
///
/// ```json
/// {
///   "kind": "earn",
///   "points": 100
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct GenerateQrRequest {
    /// Whether processing this code earns or redeems points
    pub kind: QrKind,

    /// Points the code is worth (must be positive)
    pub points: i64,
}

/// Request body for `POST /api/v1/qr/process/{code}`.
///
/// Submitted by the business terminal scanning the code.
#[derive(Debug, Deserialize)]
pub struct ProcessQrRequest {
    /// Business processing the transaction
    pub business_id: Uuid,
}

/// Response for a successfully processed QR transaction.
///
/// Carries both the completed transaction and the ledger entry it produced.
#[derive(Debug, Serialize)]
pub struct ProcessedQr {
    pub transaction: QrTransaction,
    pub entry: PointEntry,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn transaction(status: QrStatus, expiry_date: DateTime<Utc>) -> QrTransaction {
        QrTransaction {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            code: "18c2a-deadbeef".to_string(),
            kind: QrKind::Earn,
            points: 100,
            status,
            expiry_date,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn pending_unexpired_transaction_is_processable() {
        let now = Utc::now();
        let tx = transaction(QrStatus::Pending, now + Duration::minutes(15));
        assert!(tx.ensure_processable(now).is_ok());
        assert!(tx.ensure_cancellable(now).is_ok());
    }

    #[test]
    fn completed_transaction_fails_as_already_used() {
        let now = Utc::now();
        let tx = transaction(QrStatus::Completed, now + Duration::minutes(15));
        assert!(matches!(
            tx.ensure_processable(now),
            Err(AppError::AlreadyUsed)
        ));
    }

    #[test]
    fn cancelled_transaction_fails_as_already_used() {
        let now = Utc::now();
        let tx = transaction(QrStatus::Cancelled, now + Duration::minutes(15));
        assert!(matches!(
            tx.ensure_processable(now),
            Err(AppError::AlreadyUsed)
        ));
    }

    #[test]
    fn expired_pending_transaction_fails_as_expired() {
        let now = Utc::now();
        let tx = transaction(QrStatus::Pending, now - Duration::seconds(1));
        assert!(matches!(tx.ensure_processable(now), Err(AppError::Expired)));
    }

    #[test]
    fn transaction_expiring_exactly_now_is_expired() {
        let now = Utc::now();
        let tx = transaction(QrStatus::Pending, now);
        assert!(matches!(tx.ensure_processable(now), Err(AppError::Expired)));
    }

    #[test]
    fn used_status_wins_over_expiry() {
        // A completed row past its deadline reports AlreadyUsed, not Expired.
        let now = Utc::now();
        let tx = transaction(QrStatus::Completed, now - Duration::minutes(5));
        assert!(matches!(
            tx.ensure_processable(now),
            Err(AppError::AlreadyUsed)
        ));
    }

    #[test]
    fn cancel_on_non_pending_fails_as_invalid_state() {
        let now = Utc::now();
        let completed = transaction(QrStatus::Completed, now + Duration::minutes(15));
        assert!(matches!(
            completed.ensure_cancellable(now),
            Err(AppError::InvalidState)
        ));

        let cancelled = transaction(QrStatus::Cancelled, now + Duration::minutes(15));
        assert!(matches!(
            cancelled.ensure_cancellable(now),
            Err(AppError::InvalidState)
        ));
    }

    #[test]
    fn cancel_on_expired_pending_fails_as_expired() {
        let now = Utc::now();
        let tx = transaction(QrStatus::Pending, now - Duration::minutes(1));
        assert!(matches!(tx.ensure_cancellable(now), Err(AppError::Expired)));
    }
}
