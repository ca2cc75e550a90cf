// src/handlers/module.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{error::AppError, models::module::TrainingModule};

/// Lists the module catalogue.
pub async fn list_modules(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let modules = sqlx::query_as::<_, TrainingModule>(
        r#"
        SELECT module_id, module_name, description, price, is_compulsory, created_at
        FROM training_modules
        ORDER BY module_id
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(modules))
}

/// Retrieves a single training module by ID.
pub async fn get_module(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let module = fetch_module(&pool, id).await?;
    Ok(Json(module))
}

/// Shared existence check: module by id or 404.
pub async fn fetch_module(pool: &PgPool, module_id: i64) -> Result<TrainingModule, AppError> {
    sqlx::query_as::<_, TrainingModule>(
        r#"
        SELECT module_id, module_name, description, price, is_compulsory, created_at
        FROM training_modules
        WHERE module_id = $1
        "#,
    )
    .bind(module_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Module not found".to_string()))
}
