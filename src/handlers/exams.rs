// src/handlers/exams.rs

use std::collections::HashMap;

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
    models::exam::{Alternative, ExamStatistics, Question, QuestionDetail},
    store::PgStore,
};

/// Imports an answer key file (multipart `file`).
///
/// The file is decoded and validated before the database is touched; the
/// import itself runs in one transaction.
pub async fn import_answer_key(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let upload = read_upload(multipart, config.max_upload_bytes).await?;
    let rows = import::read_upload(&upload.filename, &upload.bytes)?;

    let mut store = PgStore::begin(&pool).await?;
    let report = import::import_answer_key(&mut store, rows).await?;
    store.commit().await?;

    Ok((StatusCode::CREATED, Json(report)))
}

async fn ensure_exam_exists(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM exams WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(AppError::NotFound(format!("Exam {} not found", id)));
    }
    Ok(())
}

/// Lists the questions of an exam, each with its alternatives.
pub async fn list_questions(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ensure_exam_exists(&pool, id).await?;

    let questions: Vec<Question> = sqlx::query_as(
        r#"
        SELECT id, exam_id, question_number, question_text, correct_answer,
               difficulty_level, points, descriptor_id
        FROM questions
        WHERE exam_id = $1
        ORDER BY question_number
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch questions of exam {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    let question_ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
    let alternatives: Vec<Alternative> = sqlx::query_as(
        r#"
        SELECT id, question_id, alternative_order, alternative_text, is_correct
        FROM alternatives
        WHERE question_id = ANY($1)
        ORDER BY question_id, alternative_order
        "#,
    )
    .bind(&question_ids)
    .fetch_all(&pool)
    .await?;

    let mut by_question: HashMap<i64, Vec<Alternative>> = HashMap::new();
    for alternative in alternatives {
        by_question
            .entry(alternative.question_id)
            .or_default()
            .push(alternative);
    }

    let details: Vec<QuestionDetail> = questions
        .into_iter()
        .map(|question| QuestionDetail {
            alternatives: by_question.remove(&question.id).unwrap_or_default(),
            question,
        })
        .collect();

    Ok(Json(details))
}

/// Aggregated results of an exam over all of its applications.
pub async fn exam_statistics(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ensure_exam_exists(&pool, id).await?;

    let stats: ExamStatistics = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM exam_applications WHERE exam_id = $1) AS total_applications,
            COUNT(r.id) AS total_students,
            COALESCE(ROUND(AVG(r.total_score), 2), 0) AS average_score,
            COALESCE(MAX(r.total_score), 0) AS highest_score,
            COALESCE(MIN(r.total_score), 0) AS lowest_score,
            (SELECT COUNT(*) FROM questions WHERE exam_id = $1) AS total_questions
        FROM exam_results r
        JOIN exam_applications a ON a.id = r.application_id
        WHERE a.exam_id = $1
        "#,
    )
    .bind(id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(stats))
}
