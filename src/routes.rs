// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{answers, applications, exams, students},
    state::AppState,
};

/// Room for multipart boundaries and text fields on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

/// Assembles the main application router.
///
/// * Upload routes get a body limit of `MAX_UPLOAD_MB`.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (database pool and config).
pub fn create_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.upload_limit() + MULTIPART_OVERHEAD_BYTES);
    let cors = cors_layer(&state.config.cors_origins);

    let exam_routes = Router::new()
        .route(
            "/import-answer-key",
            post(exams::import_answer_key).layer(upload_limit.clone()),
        )
        .route("/{id}/questions", get(exams::list_questions))
        .route("/{id}/statistics", get(exams::exam_statistics));

    let application_routes = Router::new()
        .route(
            "/import-student-answers",
            post(applications::import_student_answers).layer(upload_limit.clone()),
        )
        .route("/{id}/results", get(applications::application_results))
        .route("/{id}/students", get(applications::application_students))
        .route("/{id}/change-status", post(applications::change_status));

    let student_routes = Router::new()
        .route(
            "/bulk-import",
            post(students::bulk_import).layer(upload_limit),
        )
        .route("/{id}/profile", get(students::student_profile))
        .route("/{id}/toggle-descriptor", post(students::toggle_descriptor));

    let answer_routes = Router::new().route("/bulk-create", post(answers::bulk_create));

    Router::new()
        .nest("/api/exams", exam_routes)
        .nest("/api/exam-applications", application_routes)
        .nest("/api/students", student_routes)
        .nest("/api/student-answers", answer_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
