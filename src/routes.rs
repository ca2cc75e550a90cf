// src/routes.rs

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{access, auth, certification, enrollment, guide, module, payment, progress, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, modules, payments, guides, ...).
/// * Applies global middleware (Trace, permissive CORS incl. preflight).
/// * Injects global state (pool, config, notifier).
pub fn create_router(state: AppState) -> Router {
    // Clients span web and mobile origins; preflight is answered for all
    // routes with a wildcard.
    let cors = CorsLayer::permissive();

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let module_routes = Router::new()
        .route("/", get(module::list_modules))
        .route("/{id}", get(module::get_module))
        .route("/{id}/access", get(access::check_access))
        .route("/{id}/purchase-status", get(access::purchase_status))
        .route("/{id}/enroll", post(enrollment::enroll_free))
        .route(
            "/{id}/quiz",
            get(quiz::get_module_quiz).post(quiz::submit_module_quiz),
        )
        .route("/progress", post(progress::update_progress))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let payment_routes = Router::new()
        // POST initiates a purchase; GET is the full ledger and checks the
        // admin role itself since the path is shared.
        .route(
            "/",
            post(enrollment::initiate_purchase).get(payment::list_payments),
        )
        .route("/user-history", get(payment::user_history))
        // The approval cascade is admin-only.
        .merge(
            Router::new()
                .route(
                    "/{id}",
                    get(payment::get_payment).put(payment::update_payment_status),
                )
                .layer(middleware::from_fn(admin_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let guide_routes = Router::new()
        .route(
            "/license-approval-request",
            post(guide::request_license_approval),
        )
        .merge(
            Router::new()
                .route(
                    "/pending-certifications",
                    get(guide::pending_certifications),
                )
                .route(
                    "/{id}",
                    get(guide::get_guide).put(guide::update_guide_status),
                )
                .layer(middleware::from_fn(admin_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let certification_routes = Router::new()
        .route("/user", get(certification::list_user_certifications))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let completion_routes = Router::new()
        .route(
            "/",
            get(quiz::list_completions).post(quiz::submit_completion),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/training-modules", module_routes)
        .nest("/api/payment-transactions", payment_routes)
        .nest("/api/park-guides", guide_routes)
        .nest("/api/certifications", certification_routes)
        .nest("/api/quiz-completions", completion_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
