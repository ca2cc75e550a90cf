// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'quiz_attempts' table in the database.
/// Rows are append-only; only the two-phase open-then-finalize flow ever
/// updates one, and then exactly once.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub attempt_id: i64,
    pub quiz_id: i64,
    pub user_id: i64,
    pub guide_id: Option<i64>,
    pub module_id: i64,
    pub score: Option<i32>,
    pub total_questions: Option<i32>,
    pub passed: Option<bool>,
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,

    /// 1-based, strictly increasing per (user, module); guarded by a unique
    /// constraint so concurrent submissions cannot share a number.
    pub attempt_number: i32,
}

/// Represents the 'quiz_responses' table: one row per answered question,
/// owned by its attempt and immutable once written.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizResponse {
    pub response_id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_option_id: Option<i64>,
    pub is_correct: bool,
    pub time_taken: i32,
    pub answer_sequence: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Attempt history entry with the module name joined in.
#[derive(Debug, Serialize, FromRow)]
pub struct AttemptHistoryEntry {
    pub quiz_id: i64,
    pub module_id: i64,
    pub module_name: String,
    pub score: Option<i32>,
    pub total_questions: Option<i32>,
    pub passed: Option<bool>,
    pub attempt_number: i32,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
}
