// src/handlers/applications.rs

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    handlers::upload::read_upload,
    import,
    models::application::{
        ApplicationResultRow, ApplicationStatus, ApplicationStudentRow, ChangeStatusRequest,
        ExamApplication,
    },
    store::PgStore,
};

/// Imports student responses in wide format (multipart `file`).
pub async fn import_student_answers(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let upload = read_upload(multipart, config.max_upload_bytes).await?;
    let rows = import::read_upload(&upload.filename, &upload.bytes)?;
    let today = chrono::Local::now().date_naive();

    let mut store = PgStore::begin(&pool).await?;
    let report = import::import_student_answers(&mut store, rows, today).await?;
    store.commit().await?;

    Ok((StatusCode::CREATED, Json(report)))
}

async fn ensure_application_exists(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM exam_applications WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await?;
    if !exists {
        return Err(AppError::NotFound(format!("Exam application {} not found", id)));
    }
    Ok(())
}

/// Results of one application, best score first.
pub async fn application_results(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ensure_application_exists(&pool, id).await?;

    let rows: Vec<ApplicationResultRow> = sqlx::query_as(
        r#"
        SELECT s.id AS student_id, s.student_serial, s.student_name,
               r.total_score, r.max_score, r.correct_answers, r.wrong_answers, r.blank_answers
        FROM exam_results r
        JOIN students s ON s.id = r.student_id
        WHERE r.application_id = $1
        ORDER BY r.total_score DESC, s.student_name
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch results of application {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(rows))
}

/// Students of the application's class, flagged when they already have a result.
pub async fn application_students(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ensure_application_exists(&pool, id).await?;

    let rows: Vec<ApplicationStudentRow> = sqlx::query_as(
        r#"
        SELECT s.id, s.student_serial, s.student_name, s.status,
               EXISTS(
                   SELECT 1 FROM exam_results r
                   WHERE r.student_id = s.id AND r.application_id = a.id
               ) AS has_result
        FROM exam_applications a
        JOIN students s ON s.class_id = a.class_id
        WHERE a.id = $1
        ORDER BY s.student_name
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch students of application {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(rows))
}

/// Moves an application to one of the `ApplicationStatus` states.
pub async fn change_status(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status = req
        .status
        .as_deref()
        .and_then(ApplicationStatus::from_token)
        .ok_or_else(|| {
            AppError::BadRequest(
                "Invalid status (use scheduled, in_progress, completed or cancelled)".to_string(),
            )
        })?;

    let application: Option<ExamApplication> = sqlx::query_as(
        r#"
        UPDATE exam_applications SET status = $2
        WHERE id = $1
        RETURNING id, exam_id, class_id, application_date, fiscal_year, status
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(&pool)
    .await?;

    let application = application
        .ok_or_else(|| AppError::NotFound(format!("Exam application {} not found", id)))?;
    tracing::info!("Exam application {} is now {}", id, status.as_str());

    Ok(Json(application))
}
