// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub quiz_id: i64,
    pub module_id: i64,
    pub title: String,
    pub description: Option<String>,

    /// Per-quiz passing threshold; the configured default applies when NULL.
    pub pass_percentage: Option<f64>,
}

/// Represents the 'quiz_questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question_id: i64,
    pub quiz_id: i64,
    pub question_text: String,

    /// 'multiple_choice' or 'true_false'.
    pub question_type: String,

    pub points: i32,
    pub sequence_number: i32,
}

/// Represents the 'quiz_answer_options' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AnswerOption {
    pub option_id: i64,
    pub question_id: i64,
    pub option_text: String,
    pub is_correct: bool,
    pub sequence_number: i32,
}

/// DTO for an option as shown to the quiz taker. Correctness stays server-side.
#[derive(Debug, Serialize, FromRow)]
pub struct PublicOption {
    pub option_id: i64,
    pub option_text: String,
}

/// DTO for a question with its sanitized options.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub question_id: i64,
    pub question_type: String,
    pub question_text: String,
    pub points: i32,
    pub options: Vec<PublicOption>,
}

/// A single submitted answer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: i64,
    pub selected_option_id: i64,

    /// Seconds the taker spent on this question, when the client reports it.
    #[serde(default)]
    pub time_taken: Option<i32>,
}

/// DTO for submitting quiz answers against a module's quiz.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizRequest {
    pub answers: Vec<SubmittedAnswer>,

    /// Present when the attempt was opened ahead of answering; the score is
    /// then finalized onto that row instead of inserting a new attempt.
    #[serde(default)]
    pub attempt_id: Option<i64>,
}

/// DTO for the standalone completion endpoint (count-based scoring).
#[derive(Debug, Deserialize)]
pub struct QuizCompletionRequest {
    pub module_id: i64,
    pub quiz_id: i64,
    pub answers: Vec<SubmittedAnswer>,
}
