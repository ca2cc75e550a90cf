// src/models/purchase.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'module_purchases' table in the database.
/// The access-granting record, paired 1:1 with a payment at creation.
/// At most one row per (user, module) has is_active = TRUE; the partial
/// unique index enforces this under concurrent enrollment.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ModulePurchase {
    pub purchase_id: i64,
    pub user_id: i64,
    pub module_id: i64,
    pub payment_id: i64,
    pub status: String,
    pub is_active: bool,

    /// 0-100, never decreased; a quiz pass force-sets 100.
    pub completion_percentage: i32,

    pub purchase_date: Option<chrono::DateTime<chrono::Utc>>,
}

/// The resolved permission level a user holds for a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleAccess {
    /// Zero-priced module, no purchase needed.
    Free,
    /// No active purchase row exists.
    NotPurchased,
    /// Purchase exists but its payment has not been decided.
    PaymentPending,
    /// Purchase exists and its payment was rejected.
    PaymentRejected,
    /// Payment approved and purchase active.
    Active,
    /// Purchase in some other state (suspended, expired, ...).
    Other(String),
}

impl ModuleAccess {
    pub fn has_access(&self) -> bool {
        matches!(self, ModuleAccess::Free | ModuleAccess::Active)
    }

    /// Machine-readable reason code used by the access endpoint.
    pub fn reason(&self) -> String {
        match self {
            ModuleAccess::Free => "free_module".to_string(),
            ModuleAccess::NotPurchased => "not_purchased".to_string(),
            ModuleAccess::PaymentPending => "payment_pending".to_string(),
            ModuleAccess::PaymentRejected => "payment_rejected".to_string(),
            ModuleAccess::Active => "purchased".to_string(),
            ModuleAccess::Other(status) => format!("access_{}", status),
        }
    }
}

/// DTO for the monotonic progress update endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgressRequest {
    pub module_id: i64,
    pub progress: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_match_the_wire_contract() {
        assert_eq!(ModuleAccess::Free.reason(), "free_module");
        assert_eq!(ModuleAccess::NotPurchased.reason(), "not_purchased");
        assert_eq!(ModuleAccess::PaymentPending.reason(), "payment_pending");
        assert_eq!(ModuleAccess::PaymentRejected.reason(), "payment_rejected");
        assert_eq!(ModuleAccess::Active.reason(), "purchased");
        assert_eq!(
            ModuleAccess::Other("suspended".to_string()).reason(),
            "access_suspended"
        );
    }

    #[test]
    fn only_free_and_active_grant_access() {
        assert!(ModuleAccess::Free.has_access());
        assert!(ModuleAccess::Active.has_access());
        assert!(!ModuleAccess::NotPurchased.has_access());
        assert!(!ModuleAccess::PaymentPending.has_access());
        assert!(!ModuleAccess::PaymentRejected.has_access());
        assert!(!ModuleAccess::Other("expired".to_string()).has_access());
    }
}
