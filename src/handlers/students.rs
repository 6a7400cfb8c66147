// src/handlers/students.rs

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
    models::profile::{
        AchievedDescriptor, CatalogDescriptor, DescriptorSummary, ExamResultEntry,
        ProfileHeader, RECENT_EXAMS_LIMIT, RecentExam, StudentProfile, ToggleDescriptorRequest,
        ToggleDescriptorResponse,
    },
    store::PgStore,
};

/// Upserts students from a roster file (multipart `file`, optional `school_id`).
///
/// Responds 201 when at least one student was created, 200 otherwise.
pub async fn bulk_import(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let upload = read_upload(multipart, config.max_upload_bytes).await?;

    let school_id = match upload.field("school_id") {
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| AppError::BadRequest("Invalid school ID".to_string()))?,
        ),
        None => None,
    };

    let rows = import::read_upload(&upload.filename, &upload.bytes)?;
    let today = chrono::Local::now().date_naive();

    let mut store = PgStore::begin(&pool).await?;
    let report = import::import_roster(&mut store, rows, school_id, today).await?;
    store.commit().await?;

    let status = if report.created > 0 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(report)))
}

/// Student details, achieved descriptors against the whole catalog, and the
/// latest exam results.
pub async fn student_profile(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student: ProfileHeader = sqlx::query_as(
        r#"
        SELECT s.id, s.student_serial, s.student_name, s.status, s.enrollment_date,
               c.class_name, sc.name AS school_name, c.grade, c.shift
        FROM students s
        JOIN classes c ON c.id = s.class_id
        JOIN schools sc ON sc.id = c.school_id
        WHERE s.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Student {} not found", id)))?;

    let achieved: Vec<AchievedDescriptor> = sqlx::query_as(
        r#"
        SELECT d.id, d.descriptor_code, d.descriptor_name, d.subject,
               a.achieved_at, a.application_id, e.exam_name
        FROM student_descriptor_achievements a
        JOIN descriptors d ON d.id = a.descriptor_id
        LEFT JOIN exam_applications ap ON ap.id = a.application_id
        LEFT JOIN exams e ON e.id = ap.exam_id
        WHERE a.student_id = $1
        ORDER BY a.achieved_at, d.descriptor_code
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    let catalog: Vec<CatalogDescriptor> = sqlx::query_as(
        "SELECT id, descriptor_code, descriptor_name, subject FROM descriptors ORDER BY descriptor_code",
    )
    .fetch_all(&pool)
    .await?;

    let recent: Vec<ExamResultEntry> = sqlx::query_as(
        r#"
        SELECT r.application_id, e.exam_name, r.total_score, r.max_score,
               r.correct_answers, r.wrong_answers, ap.application_date
        FROM exam_results r
        JOIN exam_applications ap ON ap.id = r.application_id
        JOIN exams e ON e.id = ap.exam_id
        WHERE r.student_id = $1
        ORDER BY r.created_at DESC, r.id DESC
        LIMIT $2
        "#,
    )
    .bind(id)
    .bind(RECENT_EXAMS_LIMIT)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch results of student {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(StudentProfile {
        student,
        descriptors: DescriptorSummary::build(&catalog, achieved),
        recent_exams: recent.into_iter().map(RecentExam::from).collect(),
    }))
}

/// Assigns a descriptor to a student by hand, or removes it when already achieved.
///
/// Manual assignments carry no application. Removing works the same for
/// achievements earned through an exam.
pub async fn toggle_descriptor(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(req): Json<ToggleDescriptorRequest>,
) -> Result<impl IntoResponse, AppError> {
    let descriptor_id = req
        .descriptor_id
        .ok_or_else(|| AppError::BadRequest("descriptor_id is required".to_string()))?;

    let mut tx = pool.begin().await?;

    let student_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM students WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
    if !student_exists {
        return Err(AppError::NotFound(format!("Student {} not found", id)));
    }
    let descriptor_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM descriptors WHERE id = $1)")
            .bind(descriptor_id)
            .fetch_one(&mut *tx)
            .await?;
    if !descriptor_exists {
        return Err(AppError::NotFound(format!(
            "Descriptor {} not found",
            descriptor_id
        )));
    }

    let removed: Option<i64> = sqlx::query_scalar(
        "DELETE FROM student_descriptor_achievements WHERE student_id = $1 AND descriptor_id = $2 RETURNING id",
    )
    .bind(id)
    .bind(descriptor_id)
    .fetch_optional(&mut *tx)
    .await?;

    if removed.is_none() {
        sqlx::query(
            r#"
            INSERT INTO student_descriptor_achievements (student_id, descriptor_id, application_id)
            VALUES ($1, $2, NULL)
            ON CONFLICT (student_id, descriptor_id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(descriptor_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to toggle descriptor {} of student {}: {:?}", descriptor_id, id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    let achieved = removed.is_none();
    tracing::info!(
        "Descriptor {} {} student {}",
        descriptor_id,
        if achieved { "assigned to" } else { "removed from" },
        id
    );

    let (status, message) = if achieved {
        (StatusCode::CREATED, "Descriptor assigned")
    } else {
        (StatusCode::OK, "Descriptor removed")
    };
    Ok((
        status,
        Json(ToggleDescriptorResponse {
            message: message.to_string(),
            achieved,
            descriptor_id,
        }),
    ))
}
