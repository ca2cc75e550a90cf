// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use validator::Validate;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,

    /// Subject identifier handed out by the credential provider.
    pub uid: String,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub email: String,

    /// User role: 'park_guide' or 'admin'.
    pub role: String,

    /// Account approval status: 'pending', 'approved' or 'rejected'.
    pub status: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Role resolved once at the authentication boundary.
///
/// Stored values vary in casing and separators ("park_guide", "Park Guide"),
/// so parsing normalizes before matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Guide,
    Admin,
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect();
        match normalized.as_str() {
            "parkguide" | "guide" => Ok(Role::Guide),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guide => "park_guide",
            Role::Admin => "admin",
        }
    }
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_ignores_case_and_separators() {
        assert_eq!("park_guide".parse::<Role>(), Ok(Role::Guide));
        assert_eq!("Park Guide".parse::<Role>(), Ok(Role::Guide));
        assert_eq!("PARK-GUIDE".parse::<Role>(), Ok(Role::Guide));
        assert_eq!("Admin".parse::<Role>(), Ok(Role::Admin));
    }

    #[test]
    fn role_parsing_rejects_unknown() {
        assert!("visitor".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }
}
