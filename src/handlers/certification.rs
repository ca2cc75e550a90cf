// src/handlers/certification.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::certification::CertificationEntry,
    utils::{identity::resolve_identity, jwt::Claims},
};

/// GET /api/certifications/user
///
/// The caller's certifications with validity computed against today.
pub async fn list_user_certifications(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let identity = resolve_identity(&pool, &claims, &[]).await?;

    let guide_id = identity
        .guide_id
        .ok_or(AppError::NotFound("Park guide record not found".to_string()))?;

    let certifications = sqlx::query_as::<_, CertificationEntry>(
        r#"
        SELECT c.cert_id, c.module_id, tm.module_name, c.issued_date, c.expiry_date,
               (c.expiry_date < CURRENT_DATE) AS expired
        FROM certifications c
        JOIN training_modules tm ON tm.module_id = c.module_id
        WHERE c.guide_id = $1
        ORDER BY c.issued_date DESC
        "#,
    )
    .bind(guide_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(certifications))
}
