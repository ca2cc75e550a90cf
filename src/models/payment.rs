// src/models/payment.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use validator::Validate;

/// Represents the 'payment_transactions' table in the database.
/// This is the ledger/audit record; `module_purchases` is the
/// access-authority record.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub payment_id: i64,
    pub user_id: i64,
    pub uid: String,
    pub payment_purpose: String,
    pub payment_method: String,
    pub amount_paid: Decimal,
    pub payment_status: String,
    pub receipt_path: Option<String>,
    pub module_id: Option<i64>,
    pub transaction_date: Option<chrono::DateTime<chrono::Utc>>,
}

/// Payment lifecycle. Only the approval cascade moves a payment out of
/// Pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl FromStr for PaymentStatus {
    type Err = ();

    /// Accepts the canonical names plus the legacy wire aliases
    /// ('completed' for approved, 'failed' for rejected).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "approved" | "completed" => Ok(PaymentStatus::Approved),
            "rejected" | "failed" => Ok(PaymentStatus::Rejected),
            _ => Err(()),
        }
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
        }
    }
}

/// DTO for initiating a paid module purchase. The receipt arrives as a
/// base64 data URL captured by the client.
#[derive(Debug, Deserialize, Validate)]
pub struct InitiatePurchaseRequest {
    pub module_id: i64,
    #[validate(length(min = 1, max = 20))]
    pub payment_method: String,
    pub amount: Decimal,
    #[validate(length(min = 1))]
    pub receipt_image: String,
}

/// DTO for the approval decision on a payment.
#[derive(Debug, Deserialize)]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: String,
}

/// Ledger entry returned to the paying user (receipt exposed as a path,
/// not the blob itself).
#[derive(Debug, Serialize, FromRow)]
pub struct PaymentHistoryEntry {
    pub payment_id: i64,
    pub payment_purpose: String,
    pub amount_paid: Decimal,
    pub payment_method: String,
    pub payment_status: String,
    pub transaction_date: Option<chrono::DateTime<chrono::Utc>>,
    pub receipt_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_status_accepts_legacy_aliases() {
        assert_eq!("completed".parse::<PaymentStatus>(), Ok(PaymentStatus::Approved));
        assert_eq!("failed".parse::<PaymentStatus>(), Ok(PaymentStatus::Rejected));
        assert_eq!("PENDING".parse::<PaymentStatus>(), Ok(PaymentStatus::Pending));
    }

    #[test]
    fn payment_status_rejects_unknown() {
        assert!("refunded".parse::<PaymentStatus>().is_err());
    }
}
