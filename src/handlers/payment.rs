// src/handlers/payment.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    handlers::enrollment::ensure_purchase_row,
    models::{
        payment::{
            PaymentHistoryEntry, PaymentStatus, PaymentTransaction, UpdatePaymentStatusRequest,
        },
        user::Role,
    },
    utils::{identity::resolve_identity, jwt::Claims, notify::Notifier},
};

const PAYMENT_COLUMNS: &str = r#"
    payment_id, user_id, uid, payment_purpose, payment_method, amount_paid,
    payment_status, receipt_path, module_id, transaction_date
"#;

/// PUT /api/payment-transactions/{id}
///
/// The approval cascade. One transaction updates the ledger row and, on
/// approval, activates the linked purchase, creating it first if an
/// interrupted initiation left the payment without one. Rejection leaves
/// the purchase untouched so the resolver reports payment_rejected.
/// The notification goes out only after the commit.
pub async fn update_payment_status(
    State(pool): State<PgPool>,
    State(notifier): State<Arc<dyn Notifier>>,
    Path(payment_id): Path<i64>,
    Json(payload): Json<UpdatePaymentStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status: PaymentStatus = payload
        .payment_status
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid payment status".to_string()))?;

    let payment = fetch_payment(&pool, payment_id).await?;

    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE payment_transactions SET payment_status = $1 WHERE payment_id = $2")
        .bind(status.as_str())
        .bind(payment_id)
        .execute(&mut *tx)
        .await?;

    if status == PaymentStatus::Approved {
        if let Some(module_id) = payment.module_id {
            ensure_purchase_row(&mut tx, payment.user_id, module_id, payment_id, "pending")
                .await?;
        }

        sqlx::query(
            r#"
            UPDATE module_purchases
            SET status = 'active', is_active = TRUE
            WHERE payment_id = $1
            "#,
        )
        .bind(payment_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    if status != PaymentStatus::Pending {
        notify_payment_decision(&pool, notifier, &payment, status == PaymentStatus::Approved)
            .await;
    }

    Ok(Json(serde_json::json!({
        "message": format!("Payment transaction with ID {} updated successfully", payment_id),
        "paymentStatus": status.as_str(),
    })))
}

/// Spawns the decision email outside any transaction. Failures are logged,
/// never surfaced.
async fn notify_payment_decision(
    pool: &PgPool,
    notifier: Arc<dyn Notifier>,
    payment: &PaymentTransaction,
    approved: bool,
) {
    let email: Option<String> =
        match sqlx::query_scalar("SELECT email FROM users WHERE user_id = $1")
            .bind(payment.user_id)
            .fetch_optional(pool)
            .await
        {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!("Could not load payer email for notification: {:?}", e);
                None
            }
        };

    let Some(email) = email else { return };
    let purpose = payment.payment_purpose.clone();

    tokio::spawn(async move {
        notifier.payment_decision(&email, &purpose, approved).await;
    });
}

/// GET /api/payment-transactions: full ledger, admin only.
pub async fn list_payments(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    resolve_identity(&pool, &claims, &[Role::Admin]).await?;

    let payments = sqlx::query_as::<_, PaymentTransaction>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payment_transactions ORDER BY transaction_date DESC"
    ))
    .fetch_all(&pool)
    .await?;

    Ok(Json(payments))
}

/// GET /api/payment-transactions/{id}: single ledger row, admin only.
pub async fn get_payment(
    State(pool): State<PgPool>,
    Path(payment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let payment = fetch_payment(&pool, payment_id).await?;
    Ok(Json(payment))
}

/// GET /api/payment-transactions/user-history
///
/// The caller's own ledger, newest first.
pub async fn user_history(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let identity = resolve_identity(&pool, &claims, &[]).await?;

    let entries = sqlx::query_as::<_, PaymentHistoryEntry>(
        r#"
        SELECT payment_id, payment_purpose, amount_paid, payment_method,
               payment_status, transaction_date, receipt_path
        FROM payment_transactions
        WHERE user_id = $1
        ORDER BY transaction_date DESC
        "#,
    )
    .bind(identity.user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(entries))
}

async fn fetch_payment(pool: &PgPool, payment_id: i64) -> Result<PaymentTransaction, AppError> {
    sqlx::query_as::<_, PaymentTransaction>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payment_transactions WHERE payment_id = $1"
    ))
    .bind(payment_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound(
        "Payment transaction not found".to_string(),
    ))
}
