// src/handlers/progress.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{purchase::UpdateProgressRequest, user::Role},
    utils::{identity::resolve_identity, jwt::Claims},
};

/// POST /api/training-modules/progress
///
/// Advances the completion percentage of the caller's active purchase.
/// Monotonic: a value at or below the stored one is a polite no-op, never
/// an error. The quiz pass path bypasses this check and writes 100
/// directly.
pub async fn update_progress(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    let identity = resolve_identity(&pool, &claims, &[Role::Guide]).await?;

    if !(0..=100).contains(&payload.progress) {
        return Err(AppError::BadRequest(
            "Progress must be between 0 and 100".to_string(),
        ));
    }

    #[derive(sqlx::FromRow)]
    struct PurchaseProgress {
        purchase_id: i64,
        completion_percentage: i32,
    }

    let purchase = sqlx::query_as::<_, PurchaseProgress>(
        r#"
        SELECT purchase_id, completion_percentage
        FROM module_purchases
        WHERE user_id = $1 AND module_id = $2 AND status = 'active' AND is_active = TRUE
        "#,
    )
    .bind(identity.user_id)
    .bind(payload.module_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::Forbidden(
        "User does not have access to this module".to_string(),
    ))?;

    if payload.progress <= purchase.completion_percentage {
        return Ok(Json(serde_json::json!({
            "message": "Progress not updated as new progress is not higher than current progress",
            "currentProgress": purchase.completion_percentage,
        })));
    }

    // Guard against lost updates: only move forward from the value we read.
    let updated = sqlx::query(
        r#"
        UPDATE module_purchases
        SET completion_percentage = $1
        WHERE purchase_id = $2 AND completion_percentage < $1
        "#,
    )
    .bind(payload.progress)
    .bind(purchase.purchase_id)
    .execute(&pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Ok(Json(serde_json::json!({
            "message": "Progress not updated as new progress is not higher than current progress",
            "currentProgress": purchase.completion_percentage,
        })));
    }

    Ok(Json(serde_json::json!({
        "message": "Module progress updated successfully",
        "moduleId": payload.module_id,
        "progress": payload.progress,
    })))
}
