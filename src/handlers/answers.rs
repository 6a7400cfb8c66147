// src/handlers/answers.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError, grading::submit_answers, models::application::BulkAnswerRequest,
    store::PgStore,
};

/// Records a student's answers for one application and grades them.
pub async fn bulk_create(
    State(pool): State<PgPool>,
    Json(req): Json<BulkAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let mut store = PgStore::begin(&pool).await?;
    let report = submit_answers(&mut store, &req).await?;
    store.commit().await?;

    Ok((StatusCode::CREATED, Json(report)))
}
