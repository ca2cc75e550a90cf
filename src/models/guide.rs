// src/models/guide.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'park_guides' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ParkGuide {
    pub guide_id: i64,
    pub user_id: i64,

    /// 'not certified', 'pending', 'certified' or 'rejected'.
    pub certification_status: String,

    pub license_expiry_date: Option<NaiveDate>,
    pub assigned_park: Option<i64>,

    /// Set while a licensing request awaits review; cleared by the decision.
    pub requested_park_id: Option<i64>,
}

/// Represents the 'guide_training_progress' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TrainingProgress {
    pub progress_id: i64,
    pub guide_id: i64,
    pub module_id: i64,
    pub status: String,
    pub start_date: NaiveDate,
    pub completion_date: Option<NaiveDate>,
}

/// DTO for the licensing decision on a guide.
#[derive(Debug, Deserialize)]
pub struct GuideDecisionRequest {
    /// 'certified' approves the request, 'rejected' declines it.
    pub certification_status: String,
}

/// DTO for a guide requesting license review and a park assignment.
#[derive(Debug, Deserialize)]
pub struct LicenseApprovalRequest {
    pub requested_park_id: i64,
}

/// Pending licensing request as listed for administrators.
#[derive(Debug, Serialize, FromRow)]
pub struct PendingGuideEntry {
    pub guide_id: i64,
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub certification_status: String,
    pub requested_park_id: Option<i64>,
}
