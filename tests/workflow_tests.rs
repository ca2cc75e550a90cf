// tests/workflow_tests.rs
//
// End-to-end workflow tests against a live PostgreSQL instance. Each test
// is skipped when DATABASE_URL is not set, so the suite is safe to run in
// environments without a database.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use parkguide_backend::{config::Config, routes, state::AppState, utils::notify::LogNotifier};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Spawns the app on a random port. Returns the base URL and a pool for
/// seeding, or None when no database is configured.
async fn spawn_app() -> Option<(String, PgPool)> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping integration test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        pass_threshold: 75.0,
        receipt_dir: std::env::temp_dir()
            .join("parkguide-test-receipts")
            .to_string_lossy()
            .into_owned(),
        admin_username: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
        notifier: Arc::new(LogNotifier),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some((address, pool))
}

/// Registers a fresh approved guide and returns their bearer token.
async fn approved_guide(address: &str, pool: &PgPool) -> String {
    let client = reqwest::Client::new();
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123",
            "email": format!("{}@example.com", username),
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);

    sqlx::query("UPDATE users SET status = 'approved' WHERE username = $1")
        .bind(&username)
        .execute(pool)
        .await
        .unwrap();

    login(address, &username).await
}

/// Registers a fresh approved admin and returns their bearer token.
async fn approved_admin(address: &str, pool: &PgPool) -> String {
    let client = reqwest::Client::new();
    let username = format!("a_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123",
            "email": format!("{}@example.com", username),
        }))
        .send()
        .await
        .expect("Register failed");

    sqlx::query("UPDATE users SET status = 'approved', role = 'admin' WHERE username = $1")
        .bind(&username)
        .execute(pool)
        .await
        .unwrap();

    login(address, &username).await
}

async fn login(address: &str, username: &str) -> String {
    let client = reqwest::Client::new();
    let body: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123",
        }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    body["token"].as_str().expect("Token not found").to_string()
}

async fn seed_module(pool: &PgPool, price: &str) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO training_modules (module_name, description, price)
        VALUES ($1, 'seeded module', $2::NUMERIC)
        RETURNING module_id
        "#,
    )
    .bind(format!("Module {}", &uuid::Uuid::new_v4().to_string()[..8]))
    .bind(price)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Seeds a quiz with four single-point questions; the first option of
/// each question is the correct one. Returns (quiz_id, question/option ids).
async fn seed_quiz(pool: &PgPool, module_id: i64) -> (i64, Vec<(i64, i64, i64)>) {
    let quiz_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quizzes (module_id, title, description, pass_percentage)
        VALUES ($1, 'Safety Quiz', 'seeded quiz', 70.0)
        RETURNING quiz_id
        "#,
    )
    .bind(module_id)
    .fetch_one(pool)
    .await
    .unwrap();

    let mut questions = Vec::new();
    for sequence in 1..=4 {
        let question_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO quiz_questions (quiz_id, question_text, question_type, points, sequence_number)
            VALUES ($1, $2, 'multiple_choice', 1, $3)
            RETURNING question_id
            "#,
        )
        .bind(quiz_id)
        .bind(format!("Question {}", sequence))
        .bind(sequence)
        .fetch_one(pool)
        .await
        .unwrap();

        let mut option_ids = Vec::new();
        for (option_sequence, correct) in [(1, true), (2, false)] {
            let option_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO quiz_answer_options (question_id, option_text, is_correct, sequence_number)
                VALUES ($1, $2, $3, $4)
                RETURNING option_id
                "#,
            )
            .bind(question_id)
            .bind(format!("Option {}", option_sequence))
            .bind(correct)
            .bind(option_sequence)
            .fetch_one(pool)
            .await
            .unwrap();
            option_ids.push(option_id);
        }

        questions.push((question_id, option_ids[0], option_ids[1]));
    }

    (quiz_id, questions)
}

fn png_receipt_data_url() -> String {
    let png_bytes: [u8; 12] = [
        0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
    ];
    format!("data:image/png;base64,{}", BASE64.encode(png_bytes))
}

#[tokio::test]
async fn unknown_route_is_404() {
    let Some((address, _pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn workflow_endpoints_require_a_token() {
    let Some((address, _pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/training-modules/1/access", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn free_module_grants_access_without_purchase() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let token = approved_guide(&address, &pool).await;
    let module_id = seed_module(&pool, "0.00").await;

    let body: serde_json::Value = client
        .get(format!("{}/api/training-modules/{}/access", address, module_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["hasAccess"], true);
    assert_eq!(body["reason"], "free_module");
}

#[tokio::test]
async fn priced_module_without_purchase_is_not_purchased() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let token = approved_guide(&address, &pool).await;
    let module_id = seed_module(&pool, "25.00").await;

    let body: serde_json::Value = client
        .get(format!("{}/api/training-modules/{}/access", address, module_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["hasAccess"], false);
    assert_eq!(body["reason"], "not_purchased");
}

#[tokio::test]
async fn access_check_on_missing_module_is_404() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let token = approved_guide(&address, &pool).await;

    let response = client
        .get(format!("{}/api/training-modules/999999999/access", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn free_enrollment_is_idempotent_and_keeps_one_active_purchase() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let token = approved_guide(&address, &pool).await;
    let module_id = seed_module(&pool, "0.00").await;

    for _ in 0..2 {
        let response = client
            .post(format!("{}/api/training-modules/{}/enroll", address, module_id))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    let active_rows: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM module_purchases mp
        JOIN users u ON u.user_id = mp.user_id
        WHERE mp.module_id = $1 AND mp.is_active = TRUE
        "#,
    )
    .bind(module_id)
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_eq!(active_rows, 1);
}

#[tokio::test]
async fn enrolling_in_priced_module_via_free_path_is_rejected() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let token = approved_guide(&address, &pool).await;
    let module_id = seed_module(&pool, "25.00").await;

    let response = client
        .post(format!("{}/api/training-modules/{}/enroll", address, module_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn payment_approval_activates_the_purchase() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let guide_token = approved_guide(&address, &pool).await;
    let admin_token = approved_admin(&address, &pool).await;
    let module_id = seed_module(&pool, "25.00").await;

    // Initiate the purchase with a receipt.
    let body: serde_json::Value = client
        .post(format!("{}/api/payment-transactions", address))
        .bearer_auth(&guide_token)
        .json(&serde_json::json!({
            "module_id": module_id,
            "payment_method": "debit",
            "amount": "25.00",
            "receipt_image": png_receipt_data_url(),
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let payment_id = body["paymentId"].as_i64().expect("paymentId missing");

    // Access is gated while the payment is pending.
    let access: serde_json::Value = client
        .get(format!("{}/api/training-modules/{}/access", address, module_id))
        .bearer_auth(&guide_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(access["hasAccess"], false);
    assert_eq!(access["reason"], "payment_pending");

    // Admin approves; the cascade activates the purchase.
    let response = client
        .put(format!("{}/api/payment-transactions/{}", address, payment_id))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "payment_status": "completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let access: serde_json::Value = client
        .get(format!("{}/api/training-modules/{}/access", address, module_id))
        .bearer_auth(&guide_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(access["hasAccess"], true);
    assert_eq!(access["reason"], "purchased");
}

#[tokio::test]
async fn payment_rejection_is_surfaced_by_the_resolver() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let guide_token = approved_guide(&address, &pool).await;
    let admin_token = approved_admin(&address, &pool).await;
    let module_id = seed_module(&pool, "25.00").await;

    let body: serde_json::Value = client
        .post(format!("{}/api/payment-transactions", address))
        .bearer_auth(&guide_token)
        .json(&serde_json::json!({
            "module_id": module_id,
            "payment_method": "credit",
            "amount": "25.00",
            "receipt_image": png_receipt_data_url(),
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let payment_id = body["paymentId"].as_i64().unwrap();

    client
        .put(format!("{}/api/payment-transactions/{}", address, payment_id))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "payment_status": "failed" }))
        .send()
        .await
        .unwrap();

    let access: serde_json::Value = client
        .get(format!("{}/api/training-modules/{}/access", address, module_id))
        .bearer_auth(&guide_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(access["hasAccess"], false);
    assert_eq!(access["reason"], "payment_rejected");
}

#[tokio::test]
async fn approving_payments_requires_the_admin_role() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let guide_token = approved_guide(&address, &pool).await;

    let response = client
        .put(format!("{}/api/payment-transactions/1", address))
        .bearer_auth(&guide_token)
        .json(&serde_json::json!({ "payment_status": "completed" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn quiz_flow_scores_certifies_once_and_numbers_attempts() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let token = approved_guide(&address, &pool).await;
    let module_id = seed_module(&pool, "0.00").await;
    let (_quiz_id, questions) = seed_quiz(&pool, module_id).await;

    client
        .post(format!("{}/api/training-modules/{}/enroll", address, module_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    // Assembly: options must not reveal correctness, attempt counter at zero.
    let quiz_body: serde_json::Value = client
        .get(format!("{}/api/training-modules/{}/quiz", address, module_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(quiz_body["quiz"]["attemptsUsed"], 0);
    assert_eq!(quiz_body["quiz"]["nextAttemptNumber"], 1);
    let rendered = quiz_body["questions"].to_string();
    assert!(!rendered.contains("is_correct"));
    assert_eq!(quiz_body["questions"].as_array().unwrap().len(), 4);

    // Three of four correct at threshold 70 -> 75%, passed.
    let answers: Vec<serde_json::Value> = questions
        .iter()
        .enumerate()
        .map(|(i, (question_id, correct, wrong))| {
            let selected = if i < 3 { correct } else { wrong };
            serde_json::json!({ "questionId": question_id, "selectedOptionId": selected })
        })
        .collect();

    let result: serde_json::Value = client
        .post(format!("{}/api/training-modules/{}/quiz", address, module_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "answers": answers }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(result["score"], 75);
    assert_eq!(result["totalPoints"], 4);
    assert_eq!(result["earnedPoints"], 3);
    assert_eq!(result["passed"], true);

    let cert_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM certifications WHERE module_id = $1",
    )
    .bind(module_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(cert_count, 1);

    let validity: Option<bool> = sqlx::query_scalar(
        "SELECT expiry_date = issued_date + INTERVAL '1 year' FROM certifications WHERE module_id = $1",
    )
    .bind(module_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(validity, Some(true));

    // Second pass: attempt_number increments, certification is not duplicated.
    let result: serde_json::Value = client
        .post(format!("{}/api/training-modules/{}/quiz", address, module_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "answers": answers }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["passed"], true);

    let attempt_numbers: Vec<i32> = sqlx::query_scalar(
        "SELECT attempt_number FROM quiz_attempts WHERE module_id = $1 ORDER BY attempt_number",
    )
    .bind(module_id)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(attempt_numbers, vec![1, 2]);

    let cert_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM certifications WHERE module_id = $1",
    )
    .bind(module_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(cert_count, 1);

    // Pass force-completes the module.
    let completion: i32 = sqlx::query_scalar(
        r#"
        SELECT completion_percentage FROM module_purchases
        WHERE module_id = $1 AND is_active = TRUE
        "#,
    )
    .bind(module_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(completion, 100);
}

#[tokio::test]
async fn quiz_is_forbidden_without_access() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let token = approved_guide(&address, &pool).await;
    let module_id = seed_module(&pool, "25.00").await;
    seed_quiz(&pool, module_id).await;

    let response = client
        .get(format!("{}/api/training-modules/{}/quiz", address, module_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn progress_is_monotonic() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let token = approved_guide(&address, &pool).await;
    let module_id = seed_module(&pool, "0.00").await;

    client
        .post(format!("{}/api/training-modules/{}/enroll", address, module_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    let body: serde_json::Value = client
        .post(format!("{}/api/training-modules/progress", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "moduleId": module_id, "progress": 50 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["progress"], 50);

    // Lower value: polite no-op, stored progress unchanged.
    let body: serde_json::Value = client
        .post(format!("{}/api/training-modules/progress", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "moduleId": module_id, "progress": 30 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["currentProgress"], 50);

    let stored: i32 = sqlx::query_scalar(
        r#"
        SELECT completion_percentage FROM module_purchases
        WHERE module_id = $1 AND is_active = TRUE
        "#,
    )
    .bind(module_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(stored, 50);
}

#[tokio::test]
async fn guide_license_approval_stamps_a_one_year_license() {
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let guide_token = approved_guide(&address, &pool).await;
    let admin_token = approved_admin(&address, &pool).await;

    let response = client
        .post(format!("{}/api/park-guides/license-approval-request", address))
        .bearer_auth(&guide_token)
        .json(&serde_json::json!({ "requested_park_id": 7 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // The request shows up in the admin work queue.
    let pending: serde_json::Value = client
        .get(format!("{}/api/park-guides/pending-certifications", address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entry = pending
        .as_array()
        .unwrap()
        .iter()
        .find(|g| g["requested_park_id"] == 7)
        .expect("pending request not listed");
    let guide_id = entry["guide_id"].as_i64().unwrap();

    let response = client
        .put(format!("{}/api/park-guides/{}", address, guide_id))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "certification_status": "certified" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let guide: serde_json::Value = client
        .get(format!("{}/api/park-guides/{}", address, guide_id))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(guide["certification_status"], "certified");
    assert_eq!(guide["assigned_park"], 7);
    assert!(guide["requested_park_id"].is_null());
    assert!(guide["license_expiry_date"].is_string());
}
