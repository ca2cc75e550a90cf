// src/handlers/guide.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        certification::expiry_after_one_year,
        guide::{GuideDecisionRequest, LicenseApprovalRequest, ParkGuide, PendingGuideEntry},
        user::Role,
    },
    utils::{identity::resolve_identity, jwt::Claims, notify::Notifier},
};

const GUIDE_COLUMNS: &str = r#"
    guide_id, user_id, certification_status, license_expiry_date,
    assigned_park, requested_park_id
"#;

/// PUT /api/park-guides/{id}
///
/// Licensing decision for a guide, admin only. Approval stamps a one-year
/// license, assigns the requested park and clears the request marker;
/// rejection clears the marker and records the refusal. Both run as one
/// transaction, with the notification spawned after commit.
pub async fn update_guide_status(
    State(pool): State<PgPool>,
    State(notifier): State<Arc<dyn Notifier>>,
    Path(guide_id): Path<i64>,
    Json(payload): Json<GuideDecisionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let approved = match payload.certification_status.as_str() {
        "certified" => true,
        "rejected" => false,
        _ => {
            return Err(AppError::BadRequest(
                "certification_status must be 'certified' or 'rejected'".to_string(),
            ));
        }
    };

    let guide = fetch_guide(&pool, guide_id).await?;

    let mut tx = pool.begin().await?;

    if approved {
        let expiry = expiry_after_one_year(Utc::now().date_naive());
        sqlx::query(
            r#"
            UPDATE park_guides
            SET certification_status = 'certified',
                license_expiry_date = $1,
                assigned_park = requested_park_id,
                requested_park_id = NULL
            WHERE guide_id = $2
            "#,
        )
        .bind(expiry)
        .bind(guide_id)
        .execute(&mut *tx)
        .await?;
    } else {
        sqlx::query(
            r#"
            UPDATE park_guides
            SET certification_status = 'rejected',
                requested_park_id = NULL
            WHERE guide_id = $1
            "#,
        )
        .bind(guide_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    notify_license_decision(&pool, notifier, guide.user_id, approved).await;

    Ok(Json(serde_json::json!({
        "message": "Guide certification status updated successfully",
        "guideId": guide_id,
        "certificationStatus": if approved { "certified" } else { "rejected" },
    })))
}

/// POST /api/park-guides/license-approval-request
///
/// A guide asks for licensing review and names the park they want.
pub async fn request_license_approval(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<LicenseApprovalRequest>,
) -> Result<impl IntoResponse, AppError> {
    let identity = resolve_identity(&pool, &claims, &[Role::Guide]).await?;

    let guide_id = identity
        .guide_id
        .ok_or(AppError::NotFound("Park guide record not found".to_string()))?;

    sqlx::query(
        r#"
        UPDATE park_guides
        SET certification_status = 'pending', requested_park_id = $1
        WHERE guide_id = $2
        "#,
    )
    .bind(payload.requested_park_id)
    .bind(guide_id)
    .execute(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "message": "License approval request submitted successfully",
    })))
}

/// GET /api/park-guides/pending-certifications
///
/// Admin work queue: guides awaiting a licensing decision.
pub async fn pending_certifications(
    State(pool): State<PgPool>,
) -> Result<impl IntoResponse, AppError> {
    let guides = sqlx::query_as::<_, PendingGuideEntry>(
        r#"
        SELECT pg.guide_id, pg.user_id, u.username, u.email,
               pg.certification_status, pg.requested_park_id
        FROM park_guides pg
        JOIN users u ON u.user_id = pg.user_id
        WHERE pg.certification_status = 'pending'
          AND pg.requested_park_id IS NOT NULL
        ORDER BY pg.guide_id
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(guides))
}

/// GET /api/park-guides/{id}: single guide record.
pub async fn get_guide(
    State(pool): State<PgPool>,
    Path(guide_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let guide = fetch_guide(&pool, guide_id).await?;
    Ok(Json(guide))
}

async fn fetch_guide(pool: &PgPool, guide_id: i64) -> Result<ParkGuide, AppError> {
    sqlx::query_as::<_, ParkGuide>(&format!(
        "SELECT {GUIDE_COLUMNS} FROM park_guides WHERE guide_id = $1"
    ))
    .bind(guide_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Park guide not found".to_string()))
}

/// Looks up the guide's email and spawns the decision notification.
async fn notify_license_decision(
    pool: &PgPool,
    notifier: Arc<dyn Notifier>,
    user_id: i64,
    approved: bool,
) {
    let email: Option<String> =
        match sqlx::query_scalar("SELECT email FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
        {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!("Could not load guide email for notification: {:?}", e);
                None
            }
        };

    let Some(email) = email else { return };

    tokio::spawn(async move {
        notifier.license_decision(&email, approved).await;
    });
}
