// src/grading/calculator.rs

use rust_decimal::Decimal;

use crate::{
    models::application::{ExamResult, GradedAnswer},
    store::{SchoolStore, StoreResult},
};

/// Aggregates of one student's answers in one application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSummary {
    pub total_score: Decimal,
    /// Sum of the points of the answered questions only; unanswered questions of the
    /// exam are not counted.
    pub max_score: Decimal,
    pub correct_answers: i32,
    pub wrong_answers: i32,
    pub blank_answers: i32,
}

/// Outcome of recording a student's result.
#[derive(Debug, Clone)]
pub struct Grading {
    pub result: ExamResult,
    pub achievements_created: usize,
}

/// Helper function to calculate the result of a set of answers.
/// Correctness is the flag stored on each answer.
pub fn summarize(answers: &[GradedAnswer]) -> ResultSummary {
    let mut summary = ResultSummary::default();

    for answer in answers {
        summary.max_score += answer.points;
        if answer.is_correct {
            summary.total_score += answer.points;
            summary.correct_answers += 1;
        } else if answer.is_blank() {
            summary.blank_answers += 1;
        } else {
            summary.wrong_answers += 1;
        }
    }

    summary.total_score = summary.total_score.round_dp(2);
    summary.max_score = summary.max_score.round_dp(2);
    summary
}

/// Recomputes and upserts the result of `student_id` in `application_id`.
///
/// With `with_achievements`, every correct answer on a question linked to a
/// descriptor gets or creates the student's achievement for it. An existing
/// achievement is never touched, so the first application that earned it stays
/// recorded.
pub async fn record_result<S: SchoolStore + ?Sized>(
    store: &mut S,
    student_id: i64,
    application_id: i64,
    with_achievements: bool,
) -> StoreResult<Grading> {
    let answers = store.graded_answers(student_id, application_id).await?;
    let summary = summarize(&answers);
    let result = store
        .upsert_result(student_id, application_id, &summary)
        .await?;

    let mut achievements_created = 0;
    if with_achievements {
        for answer in answers.iter().filter(|a| a.is_correct) {
            let Some(descriptor_id) = answer.descriptor_id else {
                continue;
            };
            let (_, created) = store
                .get_or_create_achievement(student_id, descriptor_id, application_id)
                .await?;
            if created {
                achievements_created += 1;
            }
        }
    }

    tracing::debug!(
        "Result for student {} in application {}: {}/{} ({} correct, {} wrong, {} blank)",
        student_id,
        application_id,
        summary.total_score,
        summary.max_score,
        summary.correct_answers,
        summary.wrong_answers,
        summary.blank_answers
    );

    Ok(Grading {
        result,
        achievements_created,
    })
}
