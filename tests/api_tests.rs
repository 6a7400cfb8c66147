// tests/api_tests.rs

use reqwest::multipart::{Form, Part};
use school_backend::{config::Config, routes, state::AppState};
use sqlx::postgres::PgPoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
///
/// The pool connects lazily, so requests rejected before the database is
/// touched work without a running Postgres.
async fn spawn_app() -> String {
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/school_test".to_string());

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect_lazy(&database_url)
        .expect("Invalid DATABASE_URL");

    let config = Config::for_database(&database_url);
    let app = routes::create_router(AppState::new(pool, config));

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn file_form(filename: &str, contents: &str) -> Form {
    Form::new().part(
        "file",
        Part::bytes(contents.as_bytes().to_vec()).file_name(filename.to_string()),
    )
}

async fn error_message(response: reqwest::Response) -> String {
    let body: serde_json::Value = response.json().await.expect("JSON error body");
    body["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn health_check_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn import_without_file_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let form = Form::new().text("school_id", "1");
    let response = client
        .post(format!("{}/api/exams/import-answer-key", address))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(error_message(response).await, "No file provided");
}

#[tokio::test]
async fn import_with_unsupported_extension_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/exam-applications/import-student-answers", address))
        .multipart(file_form("answers.txt", "exam_code,class_id\nX,1\n"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
    assert!(error_message(response).await.contains("Unsupported file format"));
}

#[tokio::test]
async fn import_of_header_only_file_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/exams/import-answer-key", address))
        .multipart(file_form(
            "key.csv",
            "exam_code,exam_name,question_number,correct_answer\n",
        ))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(error_message(response).await, "The file has no data rows");
}

#[tokio::test]
async fn roster_import_rejects_non_numeric_school() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let form = file_form("roster.csv", "student_name,student_serial,class\nAna,1,5A\n")
        .text("school_id", "abc");
    let response = client
        .post(format!("{}/api/students/bulk-import", address))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(error_message(response).await, "Invalid school ID");
}

#[tokio::test]
async fn bulk_create_fails_validation() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act: Send an empty answer list
    let response = client
        .post(format!("{}/api/student-answers/bulk-create", address))
        .json(&serde_json::json!({
            "id_student": 1,
            "id_exam_application": 1,
            "answers": []
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn change_status_rejects_unknown_state() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/exam-applications/1/change-status", address))
        .json(&serde_json::json!({ "status": "finished" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
    assert!(error_message(response).await.starts_with("Invalid status"));
}

#[tokio::test]
async fn toggle_descriptor_requires_descriptor_id() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/students/1/toggle-descriptor", address))
        .json(&serde_json::json!({}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(error_message(response).await, "descriptor_id is required");
}
