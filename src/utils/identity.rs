// src/utils/identity.rs

use sqlx::PgPool;

use crate::{error::AppError, models::user::Role, utils::jwt::Claims};

/// The caller's identity after the bearer credential has been resolved
/// against the users table.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: i64,
    pub uid: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    /// Present when the user has a park guide record.
    pub guide_id: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct IdentityRow {
    user_id: i64,
    uid: String,
    username: String,
    email: String,
    role: String,
    status: String,
    guide_id: Option<i64>,
}

/// Resolves verified claims to the internal user row and enforces account
/// approval. Every mutating endpoint goes through here before touching
/// workflow state.
///
/// * Unknown subject -> 404.
/// * Account not approved -> 403.
/// * `allowed_roles` non-empty and the role is not among them -> 403.
pub async fn resolve_identity(
    pool: &PgPool,
    claims: &Claims,
    allowed_roles: &[Role],
) -> Result<Identity, AppError> {
    let row = sqlx::query_as::<_, IdentityRow>(
        r#"
        SELECT u.user_id, u.uid, u.username, u.email, u.role, u.status, pg.guide_id
        FROM users u
        LEFT JOIN park_guides pg ON pg.user_id = u.user_id
        WHERE u.uid = $1
        "#,
    )
    .bind(&claims.sub)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    if row.status != "approved" {
        return Err(AppError::Forbidden("Account not approved".to_string()));
    }

    let role = row
        .role
        .parse::<Role>()
        .map_err(|_| AppError::AuthError(format!("Unknown role '{}'", row.role)))?;

    if !allowed_roles.is_empty() && !allowed_roles.contains(&role) {
        return Err(AppError::Forbidden(
            "Insufficient role permissions".to_string(),
        ));
    }

    Ok(Identity {
        user_id: row.user_id,
        uid: row.uid,
        username: row.username,
        email: row.email,
        role,
        guide_id: row.guide_id,
    })
}
