// src/grading/submission.rs

use std::collections::HashSet;

use serde::Serialize;

use crate::{
    error::AppError,
    models::application::{BulkAnswerRequest, NewStudentAnswer},
    store::{SchoolStore, StoreResult},
};

use super::calculator::record_result;

#[derive(Debug, Serialize)]
pub struct SubmissionReport {
    pub message: String,
    pub total_answers: usize,
    pub errors: Option<Vec<String>>,
}

/// Records the answers of one student for one application and grades them.
///
/// Student and application must exist and the student must not have answered the
/// application before; otherwise nothing is written. Individual answers that do
/// not fit (unknown question, question of another exam, alternative of another
/// question, repeated question) are reported and skipped. Correctness is the
/// selected alternative's current `is_correct` flag.
pub async fn submit_answers<S: SchoolStore + ?Sized>(
    store: &mut S,
    req: &BulkAnswerRequest,
) -> StoreResult<SubmissionReport> {
    let student = store
        .find_student(req.id_student)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Student {} not found", req.id_student)))?;
    let application = store
        .find_application(req.id_exam_application)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "Exam application {} not found",
                req.id_exam_application
            ))
        })?;

    if store.has_answers(student.id, application.id).await? {
        return Err(AppError::BadRequest(
            "This student has already taken this exam".to_string(),
        ));
    }

    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    let mut total_answers = 0;

    for answer in &req.answers {
        if !seen.insert(answer.id_question) {
            errors.push(format!(
                "Question {} was submitted more than once",
                answer.id_question
            ));
            continue;
        }

        let Some(question) = store.find_question(answer.id_question).await? else {
            errors.push(format!("Question {} not found", answer.id_question));
            continue;
        };
        if question.exam_id != application.exam_id {
            errors.push(format!(
                "Question {} does not belong to the exam of this application",
                question.id
            ));
            continue;
        }

        let is_correct = match answer.id_selected_alternative {
            Some(alternative_id) => {
                let alternatives = store.list_alternatives(question.id).await?;
                match alternatives.iter().find(|a| a.id == alternative_id) {
                    Some(selected) => selected.is_correct,
                    None => {
                        errors.push(format!(
                            "Alternative {} does not belong to question {}",
                            alternative_id, question.id
                        ));
                        continue;
                    }
                }
            }
            None => false,
        };

        store
            .insert_answer(&NewStudentAnswer {
                student_id: student.id,
                application_id: application.id,
                question_id: question.id,
                selected_alternative_id: answer.id_selected_alternative,
                answer_text: answer
                    .answer_text
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string),
                is_correct,
            })
            .await?;
        total_answers += 1;
    }

    if total_answers > 0 {
        record_result(store, student.id, application.id, false).await?;
    }

    tracing::info!(
        "Student {} submitted {} answers for application {} ({} rejected)",
        student.id,
        total_answers,
        application.id,
        errors.len()
    );

    Ok(SubmissionReport {
        message: "Answers recorded successfully".to_string(),
        total_answers,
        errors: if errors.is_empty() { None } else { Some(errors) },
    })
}
