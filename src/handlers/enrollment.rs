// src/handlers/enrollment.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    handlers::module::fetch_module,
    models::{payment::InitiatePurchaseRequest, user::Role},
    utils::{
        identity::{Identity, resolve_identity},
        jwt::Claims,
        receipt::{parse_receipt, store_receipt},
    },
};

/// POST /api/training-modules/{id}/enroll
///
/// Direct enrollment for free modules. Creates the zero-amount payment
/// and the active purchase as one unit; repeating the call is a no-op.
pub async fn enroll_free(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(module_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let identity = resolve_identity(&pool, &claims, &[Role::Guide, Role::Admin]).await?;

    let module = fetch_module(&pool, module_id).await?;
    if !module.is_free() {
        return Err(AppError::BadRequest(
            "This is a premium module and requires payment".to_string(),
        ));
    }

    if has_active_purchase(&pool, identity.user_id, module_id).await? {
        return Ok(Json(serde_json::json!({
            "message": "You are already enrolled in this module",
            "moduleId": module_id,
            "status": "active",
        })));
    }

    let mut tx = pool.begin().await?;

    let payment_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO payment_transactions
            (user_id, uid, payment_purpose, payment_method, amount_paid, payment_status, module_id)
        VALUES ($1, $2, $3, 'debit', 0, 'approved', $4)
        RETURNING payment_id
        "#,
    )
    .bind(identity.user_id)
    .bind(&identity.uid)
    .bind(format!("Free Module: {}", module.module_name))
    .bind(module_id)
    .fetch_one(&mut *tx)
    .await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO module_purchases (user_id, module_id, payment_id, status, is_active)
        VALUES ($1, $2, $3, 'active', TRUE)
        ON CONFLICT (user_id, module_id) WHERE is_active DO NOTHING
        "#,
    )
    .bind(identity.user_id)
    .bind(module_id)
    .bind(payment_id)
    .execute(&mut *tx)
    .await?;

    if inserted.rows_affected() == 0 {
        // A concurrent enrollment won the unique index; ours is redundant.
        tx.rollback().await?;
        return Ok(Json(serde_json::json!({
            "message": "You are already enrolled in this module",
            "moduleId": module_id,
            "status": "active",
        })));
    }

    tx.commit().await?;

    // Best-effort progress marker; enrollment stands even if this fails.
    if let Some(guide_id) = identity.guide_id {
        if let Err(e) = seed_training_progress(&pool, guide_id, module_id).await {
            tracing::warn!("Failed to seed training progress record: {:?}", e);
        }
    }

    Ok(Json(serde_json::json!({
        "message": "Successfully enrolled in free module",
        "moduleId": module_id,
        "status": "active",
    })))
}

/// POST /api/payment-transactions
///
/// Initiates a paid purchase: validates and stores the receipt, then
/// writes the pending payment + purchase pair atomically. If an earlier
/// initiation left a payment without its purchase row, the gap is closed
/// here instead of creating a second payment.
pub async fn initiate_purchase(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<InitiatePurchaseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let identity = resolve_identity(&pool, &claims, &[Role::Guide, Role::Admin]).await?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    if payload.amount <= Decimal::ZERO {
        return Err(AppError::BadRequest(
            "Payment amount must be positive".to_string(),
        ));
    }
    if !matches!(payload.payment_method.as_str(), "debit" | "credit" | "ewallet") {
        return Err(AppError::BadRequest(
            "Unsupported payment method".to_string(),
        ));
    }

    let module = fetch_module(&pool, payload.module_id).await?;
    if module.is_free() {
        return Err(AppError::BadRequest(
            "This module is free; use the enrollment endpoint".to_string(),
        ));
    }

    // Validate before any write: bad receipts never reach the ledger.
    let receipt = parse_receipt(&payload.receipt_image)?;

    if has_active_purchase(&pool, identity.user_id, module.module_id).await? {
        return Ok(Json(serde_json::json!({
            "message": "A purchase for this module already exists",
            "moduleId": module.module_id,
        }))
        .into_response());
    }

    // Reconcile an orphaned pending payment rather than duplicating it.
    if let Some(payment_id) = orphaned_pending_payment(&pool, &identity, module.module_id).await? {
        let mut tx = pool.begin().await?;
        ensure_purchase_row(&mut tx, identity.user_id, module.module_id, payment_id, "pending")
            .await?;
        tx.commit().await?;

        return Ok(Json(serde_json::json!({
            "message": "Payment already submitted; awaiting approval",
            "paymentId": payment_id,
            "moduleId": module.module_id,
        }))
        .into_response());
    }

    let receipt_path = store_receipt(&config.receipt_dir, identity.user_id, &receipt).await?;

    let mut tx = pool.begin().await?;

    let payment_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO payment_transactions
            (user_id, uid, payment_purpose, payment_method, amount_paid,
             payment_status, receipt_path, module_id)
        VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7)
        RETURNING payment_id
        "#,
    )
    .bind(identity.user_id)
    .bind(&identity.uid)
    .bind(format!("Module Purchase: {}", module.module_name))
    .bind(&payload.payment_method)
    .bind(payload.amount)
    .bind(&receipt_path)
    .bind(module.module_id)
    .fetch_one(&mut *tx)
    .await?;

    let created = sqlx::query(
        r#"
        INSERT INTO module_purchases (user_id, module_id, payment_id, status, is_active)
        VALUES ($1, $2, $3, 'pending', TRUE)
        ON CONFLICT (user_id, module_id) WHERE is_active DO NOTHING
        "#,
    )
    .bind(identity.user_id)
    .bind(module.module_id)
    .bind(payment_id)
    .execute(&mut *tx)
    .await?;

    if created.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(Json(serde_json::json!({
            "message": "A purchase for this module already exists",
            "moduleId": module.module_id,
        }))
        .into_response());
    }

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Payment submitted for approval",
            "paymentId": payment_id,
            "moduleId": module.module_id,
            "status": "pending",
        })),
    )
        .into_response())
}

/// True when (user, module) already holds the single active purchase row.
pub async fn has_active_purchase(
    pool: &PgPool,
    user_id: i64,
    module_id: i64,
) -> Result<bool, AppError> {
    let existing: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT purchase_id FROM module_purchases
        WHERE user_id = $1 AND module_id = $2 AND is_active = TRUE
        "#,
    )
    .bind(user_id)
    .bind(module_id)
    .fetch_optional(pool)
    .await?;

    Ok(existing.is_some())
}

/// Finds a pending module payment of the caller that never got its
/// purchase row (legacy gap from interrupted initiations).
async fn orphaned_pending_payment(
    pool: &PgPool,
    identity: &Identity,
    module_id: i64,
) -> Result<Option<i64>, AppError> {
    let payment_id: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT pt.payment_id
        FROM payment_transactions pt
        LEFT JOIN module_purchases mp ON mp.payment_id = pt.payment_id
        WHERE pt.user_id = $1 AND pt.module_id = $2
          AND pt.payment_status = 'pending'
          AND mp.purchase_id IS NULL
        ORDER BY pt.transaction_date DESC
        LIMIT 1
        "#,
    )
    .bind(identity.user_id)
    .bind(module_id)
    .fetch_optional(pool)
    .await?;

    Ok(payment_id)
}

/// Creates the purchase row for a payment when it is missing. Returns
/// whether a row was written. Shared with the approval cascade, which
/// closes the same gap on approval.
pub async fn ensure_purchase_row(
    conn: &mut PgConnection,
    user_id: i64,
    module_id: i64,
    payment_id: i64,
    status: &str,
) -> Result<bool, AppError> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT purchase_id FROM module_purchases WHERE payment_id = $1")
            .bind(payment_id)
            .fetch_optional(&mut *conn)
            .await?;

    if existing.is_some() {
        return Ok(false);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO module_purchases (user_id, module_id, payment_id, status, is_active)
        VALUES ($1, $2, $3, $4, TRUE)
        ON CONFLICT (user_id, module_id) WHERE is_active DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(module_id)
    .bind(payment_id)
    .bind(status)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Inserts the 'in progress' training marker, ignoring duplicates.
async fn seed_training_progress(
    pool: &PgPool,
    guide_id: i64,
    module_id: i64,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO guide_training_progress (guide_id, module_id, status)
        VALUES ($1, $2, 'in progress')
        ON CONFLICT (guide_id, module_id) DO NOTHING
        "#,
    )
    .bind(guide_id)
    .bind(module_id)
    .execute(pool)
    .await?;

    Ok(())
}
