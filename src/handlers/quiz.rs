// src/handlers/quiz.rs

use std::collections::{HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    handlers::access::resolve_module_access,
    handlers::module::fetch_module,
    models::{
        attempt::AttemptHistoryEntry,
        certification::expiry_after_one_year,
        quiz::{
            PublicOption, PublicQuestion, Quiz, QuizCompletionRequest, QuizQuestion,
            SubmitQuizRequest, SubmittedAnswer,
        },
        user::Role,
    },
    utils::{
        identity::{Identity, resolve_identity},
        jwt::Claims,
    },
};

/// Concurrent submissions race on the attempt-number unique constraint;
/// the loser re-reads the max and tries again this many times.
const ATTEMPT_NUMBER_RETRIES: u32 = 3;

/// The authoritative answer key and point weights for one quiz.
struct QuizKey {
    /// question -> the single correct option.
    correct: HashMap<i64, i64>,
    /// question -> point weight.
    points: HashMap<i64, i32>,
}

/// Helper struct for fetching answer keys from the database.
#[derive(sqlx::FromRow)]
struct AnswerKeyRow {
    question_id: i64,
    option_id: i64,
}

#[derive(sqlx::FromRow)]
struct QuestionWeightRow {
    question_id: i64,
    points: i32,
}

/// Result of scoring one submitted answer set.
#[derive(Debug, PartialEq)]
struct ScoreOutcome {
    earned_points: i32,
    total_points: i32,
    correct_count: i32,
    total_questions: i32,
    percentage: i32,
    passed: bool,
}

/// Scores submitted answers against the key. Binary per question: the
/// selected option either is the correct one or it is not, no partial
/// credit. Duplicate answers for a question count once (first wins), so
/// replaying the same set always lands on the same score.
fn score_answers(answers: &[SubmittedAnswer], key: &QuizKey, threshold: f64) -> ScoreOutcome {
    let total_points: i32 = key.points.values().sum();
    let total_questions = key.points.len() as i32;

    let mut earned_points = 0;
    let mut correct_count = 0;
    let mut seen = HashSet::new();

    for answer in answers {
        if !seen.insert(answer.question_id) {
            continue;
        }
        if key.correct.get(&answer.question_id) == Some(&answer.selected_option_id) {
            earned_points += key.points.get(&answer.question_id).copied().unwrap_or(0);
            correct_count += 1;
        }
    }

    let percentage = if total_points > 0 {
        ((earned_points as f64 / total_points as f64) * 100.0).round() as i32
    } else {
        0
    };

    ScoreOutcome {
        earned_points,
        total_points,
        correct_count,
        total_questions,
        percentage,
        passed: total_points > 0 && percentage as f64 >= threshold,
    }
}

/// Loads the answer key and weights for every question of a quiz.
async fn load_quiz_key(pool: &PgPool, quiz_id: i64) -> Result<QuizKey, AppError> {
    let weights = sqlx::query_as::<_, QuestionWeightRow>(
        "SELECT question_id, points FROM quiz_questions WHERE quiz_id = $1",
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    let keys = sqlx::query_as::<_, AnswerKeyRow>(
        r#"
        SELECT o.question_id, o.option_id
        FROM quiz_answer_options o
        JOIN quiz_questions q ON q.question_id = o.question_id
        WHERE q.quiz_id = $1 AND o.is_correct = TRUE
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    Ok(QuizKey {
        correct: keys.into_iter().map(|k| (k.question_id, k.option_id)).collect(),
        points: weights.into_iter().map(|w| (w.question_id, w.points)).collect(),
    })
}

/// Every answered question must belong to the quiz being scored.
fn validate_answers(answers: &[SubmittedAnswer], key: &QuizKey) -> Result<(), AppError> {
    if answers.is_empty() {
        return Err(AppError::BadRequest("No answers submitted".to_string()));
    }
    for answer in answers {
        if !key.points.contains_key(&answer.question_id) {
            return Err(AppError::BadRequest(format!(
                "Question {} does not belong to this quiz",
                answer.question_id
            )));
        }
    }
    Ok(())
}

async fn fetch_quiz_for_module(pool: &PgPool, module_id: i64) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>(
        r#"
        SELECT quiz_id, module_id, title, description, pass_percentage
        FROM quizzes
        WHERE module_id = $1
        LIMIT 1
        "#,
    )
    .bind(module_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound(
        "No quiz available for this module".to_string(),
    ))
}

/// GET /api/training-modules/{id}/quiz
///
/// Quiz assembly: questions with sanitized options, plus how many attempts
/// the caller has used and which number the next one gets. Gated by the
/// access resolver; there is no attempt ceiling.
pub async fn get_module_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(module_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let identity = resolve_identity(&pool, &claims, &[Role::Guide, Role::Admin]).await?;

    let access = resolve_module_access(&pool, identity.user_id, module_id).await?;
    if !access.has_access() {
        return Err(AppError::Forbidden(
            "Access denied. You must purchase this module first.".to_string(),
        ));
    }

    let quiz = fetch_quiz_for_module(&pool, module_id).await?;

    let (attempts_used, last_attempt): (i64, i32) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COALESCE(MAX(attempt_number), 0)::INT4
        FROM quiz_attempts
        WHERE user_id = $1 AND module_id = $2
        "#,
    )
    .bind(identity.user_id)
    .bind(module_id)
    .fetch_one(&pool)
    .await?;

    let questions = sqlx::query_as::<_, QuizQuestion>(
        r#"
        SELECT question_id, quiz_id, question_text, question_type, points, sequence_number
        FROM quiz_questions
        WHERE quiz_id = $1
        ORDER BY sequence_number
        "#,
    )
    .bind(quiz.quiz_id)
    .fetch_all(&pool)
    .await?;

    #[derive(sqlx::FromRow)]
    struct OptionRow {
        question_id: i64,
        option_id: i64,
        option_text: String,
    }

    // One round trip for all options; correctness stays behind.
    let option_rows = sqlx::query_as::<_, OptionRow>(
        r#"
        SELECT o.question_id, o.option_id, o.option_text
        FROM quiz_answer_options o
        JOIN quiz_questions q ON q.question_id = o.question_id
        WHERE q.quiz_id = $1
        ORDER BY o.question_id, o.sequence_number
        "#,
    )
    .bind(quiz.quiz_id)
    .fetch_all(&pool)
    .await?;

    let mut options_by_question: HashMap<i64, Vec<PublicOption>> = HashMap::new();
    for row in option_rows {
        options_by_question
            .entry(row.question_id)
            .or_default()
            .push(PublicOption {
                option_id: row.option_id,
                option_text: row.option_text,
            });
    }

    let questions: Vec<PublicQuestion> = questions
        .into_iter()
        .map(|q| PublicQuestion {
            options: options_by_question.remove(&q.question_id).unwrap_or_default(),
            question_id: q.question_id,
            question_type: q.question_type,
            question_text: q.question_text,
            points: q.points,
        })
        .collect();

    Ok(Json(serde_json::json!({
        "quiz": {
            "id": quiz.quiz_id,
            "title": quiz.title,
            "description": quiz.description,
            "attemptsUsed": attempts_used,
            "nextAttemptNumber": last_attempt + 1,
        },
        "questions": questions,
    })))
}

/// One response row waiting to be written under an attempt.
struct ResponseInsert {
    question_id: i64,
    selected_option_id: i64,
    is_correct: bool,
    time_taken: i32,
}

fn build_responses(answers: &[SubmittedAnswer], key: &QuizKey) -> Vec<ResponseInsert> {
    let mut seen = HashSet::new();
    answers
        .iter()
        .filter(|a| seen.insert(a.question_id))
        .map(|a| ResponseInsert {
            question_id: a.question_id,
            selected_option_id: a.selected_option_id,
            is_correct: key.correct.get(&a.question_id) == Some(&a.selected_option_id),
            time_taken: a.time_taken.unwrap_or(0),
        })
        .collect()
}

/// Writes the per-answer response rows, 1-based sequence.
async fn insert_responses(
    tx: &mut Transaction<'_, Postgres>,
    attempt_id: i64,
    responses: &[ResponseInsert],
) -> Result<(), sqlx::Error> {
    for (index, response) in responses.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO quiz_responses
                (attempt_id, question_id, selected_option_id, is_correct, time_taken, answer_sequence)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(attempt_id)
        .bind(response.question_id)
        .bind(response.selected_option_id)
        .bind(response.is_correct)
        .bind(response.time_taken)
        .bind((index + 1) as i32)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Pass always completes the module: purchase percentage force-set to 100
/// and the training-progress row upserted to completed.
async fn complete_module_progress(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    guide_id: Option<i64>,
    module_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE module_purchases
        SET completion_percentage = 100
        WHERE user_id = $1 AND module_id = $2 AND is_active = TRUE
        "#,
    )
    .bind(user_id)
    .bind(module_id)
    .execute(&mut **tx)
    .await?;

    if let Some(guide_id) = guide_id {
        sqlx::query(
            r#"
            INSERT INTO guide_training_progress (guide_id, module_id, status, completion_date)
            VALUES ($1, $2, 'completed', CURRENT_DATE)
            ON CONFLICT (guide_id, module_id)
            DO UPDATE SET status = 'completed', completion_date = CURRENT_DATE
            "#,
        )
        .bind(guide_id)
        .bind(module_id)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

struct AttemptInsert<'a> {
    quiz_id: i64,
    module_id: i64,
    identity: &'a Identity,
    score: i32,
    total_questions: i32,
    passed: bool,
    responses: &'a [ResponseInsert],
}

/// One transactional shot at recording an attempt: claims the next
/// attempt_number, writes the attempt and its responses, and applies the
/// completion side of a pass. The caller retries when the number was lost
/// to a concurrent submission.
async fn record_attempt(pool: &PgPool, insert: &AttemptInsert<'_>) -> Result<(i64, i32), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let attempt_number: i32 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(MAX(attempt_number), 0) + 1
        FROM quiz_attempts
        WHERE user_id = $1 AND module_id = $2
        "#,
    )
    .bind(insert.identity.user_id)
    .bind(insert.module_id)
    .fetch_one(&mut *tx)
    .await?;

    let attempt_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quiz_attempts
            (quiz_id, user_id, guide_id, module_id, score, total_questions,
             passed, start_time, end_time, attempt_number)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW(), $8)
        RETURNING attempt_id
        "#,
    )
    .bind(insert.quiz_id)
    .bind(insert.identity.user_id)
    .bind(insert.identity.guide_id)
    .bind(insert.module_id)
    .bind(insert.score)
    .bind(insert.total_questions)
    .bind(insert.passed)
    .bind(attempt_number)
    .fetch_one(&mut *tx)
    .await?;

    insert_responses(&mut tx, attempt_id, insert.responses).await?;

    if insert.passed {
        complete_module_progress(
            &mut tx,
            insert.identity.user_id,
            insert.identity.guide_id,
            insert.module_id,
        )
        .await?;
    }

    tx.commit().await?;
    Ok((attempt_id, attempt_number))
}

/// Records an attempt, retrying when a concurrent submission claimed the
/// same attempt_number first.
async fn record_attempt_with_retry(
    pool: &PgPool,
    insert: &AttemptInsert<'_>,
) -> Result<(i64, i32), AppError> {
    let mut last_err = None;
    for _ in 0..ATTEMPT_NUMBER_RETRIES {
        match record_attempt(pool, insert).await {
            Ok(result) => return Ok(result),
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!("attempt_number conflict, retrying");
                last_err = Some(e);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::InternalServerError(format!(
        "Could not allocate attempt number: {:?}",
        last_err
    )))
}

/// Finalizes an attempt opened ahead of answering. The row must belong to
/// the caller and module and must not have been scored yet.
async fn finalize_attempt(
    pool: &PgPool,
    attempt_id: i64,
    insert: &AttemptInsert<'_>,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        r#"
        UPDATE quiz_attempts
        SET score = $1, total_questions = $2, passed = $3, end_time = NOW()
        WHERE attempt_id = $4 AND user_id = $5 AND module_id = $6 AND end_time IS NULL
        "#,
    )
    .bind(insert.score)
    .bind(insert.total_questions)
    .bind(insert.passed)
    .bind(attempt_id)
    .bind(insert.identity.user_id)
    .bind(insert.module_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        tx.rollback().await?;
        // Distinguish "not yours" from "already scored" for the caller.
        let owned: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT attempt_id FROM quiz_attempts
            WHERE attempt_id = $1 AND user_id = $2 AND module_id = $3
            "#,
        )
        .bind(attempt_id)
        .bind(insert.identity.user_id)
        .bind(insert.module_id)
        .fetch_optional(pool)
        .await?;

        return match owned {
            Some(_) => Err(AppError::Conflict(
                "This attempt has already been scored".to_string(),
            )),
            None => Err(AppError::Forbidden("Invalid quiz attempt".to_string())),
        };
    }

    insert_responses(&mut tx, attempt_id, insert.responses).await?;

    if insert.passed {
        complete_module_progress(
            &mut tx,
            insert.identity.user_id,
            insert.identity.guide_id,
            insert.module_id,
        )
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Issues the certification for a passing attempt, once per (guide,
/// module). Runs after the attempt transaction has committed: a failure
/// here is logged and never takes the recorded attempt down with it.
pub async fn issue_certification(pool: &PgPool, guide_id: i64, module_id: i64) {
    let issued = Utc::now().date_naive();
    let expiry = expiry_after_one_year(issued);

    let result = sqlx::query(
        r#"
        INSERT INTO certifications (guide_id, module_id, issued_date, expiry_date)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (guide_id, module_id) DO NOTHING
        "#,
    )
    .bind(guide_id)
    .bind(module_id)
    .bind(issued)
    .bind(expiry)
    .execute(pool)
    .await;

    match result {
        Ok(done) if done.rows_affected() > 0 => {
            tracing::info!(guide_id, module_id, "certification issued");
        }
        Ok(_) => {
            tracing::debug!(guide_id, module_id, "certification already exists, skipping");
        }
        Err(e) => {
            tracing::error!("Failed to create certification: {:?}", e);
        }
    }
}

/// POST /api/training-modules/{id}/quiz
///
/// Scores a submission against the module's quiz using point weights.
/// Without an attemptId a fresh attempt row is created; with one, the
/// pre-opened attempt is finalized instead.
pub async fn submit_module_quiz(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(module_id): Path<i64>,
    Json(payload): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let identity = resolve_identity(&pool, &claims, &[Role::Guide, Role::Admin]).await?;

    fetch_module(&pool, module_id).await?;

    let access = resolve_module_access(&pool, identity.user_id, module_id).await?;
    if !access.has_access() {
        return Err(AppError::Forbidden(
            "Access denied. You must purchase this module first.".to_string(),
        ));
    }

    let quiz = fetch_quiz_for_module(&pool, module_id).await?;
    let key = load_quiz_key(&pool, quiz.quiz_id).await?;
    validate_answers(&payload.answers, &key)?;

    let threshold = quiz.pass_percentage.unwrap_or(config.pass_threshold);
    let outcome = score_answers(&payload.answers, &key, threshold);
    let responses = build_responses(&payload.answers, &key);

    let insert = AttemptInsert {
        quiz_id: quiz.quiz_id,
        module_id,
        identity: &identity,
        score: outcome.percentage,
        total_questions: outcome.total_questions,
        passed: outcome.passed,
        responses: &responses,
    };

    match payload.attempt_id {
        Some(attempt_id) => finalize_attempt(&pool, attempt_id, &insert).await?,
        None => {
            record_attempt_with_retry(&pool, &insert).await?;
        }
    }

    if outcome.passed {
        if let Some(guide_id) = identity.guide_id {
            issue_certification(&pool, guide_id, module_id).await;
        }
    }

    Ok(Json(serde_json::json!({
        "score": outcome.percentage,
        "totalPoints": outcome.total_points,
        "earnedPoints": outcome.earned_points,
        "passed": outcome.passed,
        "passingThreshold": threshold,
        "message": if outcome.passed {
            "Congratulations! You passed the quiz."
        } else {
            "You did not pass. Please review the material and try again."
        },
    })))
}

/// POST /api/quiz-completions
///
/// Count-based scoring variant: every question weighs the same and the
/// score is the number answered correctly. Requires a guide record.
pub async fn submit_completion(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<QuizCompletionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let identity = resolve_identity(&pool, &claims, &[Role::Guide, Role::Admin]).await?;

    let guide_id = identity
        .guide_id
        .ok_or(AppError::NotFound("No guide record found for this user".to_string()))?;

    fetch_module(&pool, payload.module_id).await?;

    let access = resolve_module_access(&pool, identity.user_id, payload.module_id).await?;
    if !access.has_access() {
        return Err(AppError::Forbidden(
            "Access denied. You must purchase this module first.".to_string(),
        ));
    }

    let quiz = fetch_quiz_for_module(&pool, payload.module_id).await?;
    if quiz.quiz_id != payload.quiz_id {
        return Err(AppError::BadRequest(
            "Quiz does not belong to this module".to_string(),
        ));
    }

    let mut key = load_quiz_key(&pool, quiz.quiz_id).await?;
    validate_answers(&payload.answers, &key)?;

    // Flat weights: the completion endpoint counts questions, not points.
    for weight in key.points.values_mut() {
        *weight = 1;
    }

    let threshold = quiz.pass_percentage.unwrap_or(config.pass_threshold);
    let outcome = score_answers(&payload.answers, &key, threshold);
    let responses = build_responses(&payload.answers, &key);

    let insert = AttemptInsert {
        quiz_id: quiz.quiz_id,
        module_id: payload.module_id,
        identity: &identity,
        score: outcome.correct_count,
        total_questions: outcome.total_questions,
        passed: outcome.passed,
        responses: &responses,
    };

    let (_, attempt_number) = record_attempt_with_retry(&pool, &insert).await?;

    if outcome.passed {
        issue_certification(&pool, guide_id, payload.module_id).await;
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "passed": outcome.passed,
        "message": if outcome.passed {
            "Congratulations! You passed the quiz and earned a certificate."
        } else {
            "You did not pass the quiz. Please try again."
        },
        "score": outcome.correct_count,
        "totalQuestions": outcome.total_questions,
        "passPercentage": outcome.percentage,
        "attemptNumber": attempt_number,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionHistoryParams {
    pub module_id: Option<i64>,
}

/// GET /api/quiz-completions
///
/// The caller's attempt history, newest first, optionally per module.
pub async fn list_completions(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<CompletionHistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let identity = resolve_identity(&pool, &claims, &[]).await?;

    let entries = sqlx::query_as::<_, AttemptHistoryEntry>(
        r#"
        SELECT qa.quiz_id, qa.module_id, tm.module_name, qa.score,
               qa.total_questions, qa.passed, qa.attempt_number, qa.end_time
        FROM quiz_attempts qa
        JOIN training_modules tm ON tm.module_id = qa.module_id
        WHERE qa.user_id = $1
          AND ($2::BIGINT IS NULL OR qa.module_id = $2)
        ORDER BY qa.end_time DESC NULLS LAST
        "#,
    )
    .bind(identity.user_id)
    .bind(params.module_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(question_id: i64, selected_option_id: i64) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id,
            selected_option_id,
            time_taken: None,
        }
    }

    /// Four questions, one point each; correct option id = question id * 10.
    fn flat_key(question_count: i64) -> QuizKey {
        let mut correct = HashMap::new();
        let mut points = HashMap::new();
        for q in 1..=question_count {
            correct.insert(q, q * 10);
            points.insert(q, 1);
        }
        QuizKey { correct, points }
    }

    #[test]
    fn three_of_four_at_seventy_percent_threshold_passes() {
        let key = flat_key(4);
        let answers = vec![answer(1, 10), answer(2, 20), answer(3, 30), answer(4, 999)];

        let outcome = score_answers(&answers, &key, 70.0);
        assert_eq!(outcome.correct_count, 3);
        assert_eq!(outcome.total_questions, 4);
        assert_eq!(outcome.percentage, 75);
        assert!(outcome.passed);
    }

    #[test]
    fn three_of_four_at_seventy_six_percent_threshold_fails() {
        let key = flat_key(4);
        let answers = vec![answer(1, 10), answer(2, 20), answer(3, 30), answer(4, 999)];

        let outcome = score_answers(&answers, &key, 76.0);
        assert!(!outcome.passed);
    }

    #[test]
    fn point_weights_drive_the_percentage() {
        let mut key = flat_key(2);
        key.points.insert(1, 3);
        key.points.insert(2, 1);

        // Only the heavy question answered correctly: 3 of 4 points.
        let answers = vec![answer(1, 10), answer(2, 999)];
        let outcome = score_answers(&answers, &key, 75.0);
        assert_eq!(outcome.earned_points, 3);
        assert_eq!(outcome.total_points, 4);
        assert_eq!(outcome.percentage, 75);
        assert!(outcome.passed);
    }

    #[test]
    fn unanswered_questions_count_against_the_score() {
        let key = flat_key(4);
        let answers = vec![answer(1, 10)];

        let outcome = score_answers(&answers, &key, 70.0);
        assert_eq!(outcome.correct_count, 1);
        assert_eq!(outcome.total_questions, 4);
        assert_eq!(outcome.percentage, 25);
        assert!(!outcome.passed);
    }

    #[test]
    fn duplicate_answers_for_one_question_count_once() {
        let key = flat_key(2);
        let answers = vec![answer(1, 10), answer(1, 10), answer(1, 10)];

        let outcome = score_answers(&answers, &key, 50.0);
        assert_eq!(outcome.correct_count, 1);
        assert_eq!(outcome.earned_points, 1);
    }

    #[test]
    fn scoring_is_deterministic_across_replays() {
        let key = flat_key(4);
        let answers = vec![answer(1, 10), answer(2, 999), answer(3, 30), answer(4, 40)];

        let first = score_answers(&answers, &key, 75.0);
        let second = score_answers(&answers, &key, 75.0);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_quiz_never_passes() {
        let key = QuizKey {
            correct: HashMap::new(),
            points: HashMap::new(),
        };
        let outcome = score_answers(&[], &key, 70.0);
        assert_eq!(outcome.percentage, 0);
        assert!(!outcome.passed);
    }

    #[test]
    fn answers_outside_the_quiz_are_rejected() {
        let key = flat_key(2);
        let answers = vec![answer(1, 10), answer(42, 420)];
        assert!(validate_answers(&answers, &key).is_err());
    }

    #[test]
    fn empty_answer_set_is_rejected() {
        let key = flat_key(2);
        assert!(validate_answers(&[], &key).is_err());
    }

    #[test]
    fn responses_carry_per_answer_correctness_and_timing() {
        let key = flat_key(2);
        let mut answers = vec![answer(1, 10), answer(2, 999)];
        answers[0].time_taken = Some(12);

        let responses = build_responses(&answers, &key);
        assert_eq!(responses.len(), 2);
        assert!(responses[0].is_correct);
        assert_eq!(responses[0].time_taken, 12);
        assert!(!responses[1].is_correct);
        assert_eq!(responses[1].time_taken, 0);
    }
}
