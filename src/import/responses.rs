// src/import/responses.rs

//! Student-response import in wide format: exam code, class id, student serial,
//! then one `q<N>` column per question holding a letter or nothing.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    grading::calculator::record_result,
    models::{
        application::NewStudentAnswer,
        exam::{Alternative, AnswerLetter, Exam, Question},
        school::{SchoolClass, Student},
    },
    store::{SchoolStore, StoreResult},
};

use super::{
    columns::answer_columns,
    errors_or_null,
    normalize::{Row, field},
    parse_integer, row_error,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreatedApplication {
    pub exam: String,
    pub class: String,
}

#[derive(Debug, Serialize)]
pub struct ResponseImportReport {
    pub success: bool,
    pub message: String,
    pub processed_students: usize,
    pub created_applications: Vec<CreatedApplication>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub students_not_found: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exams_not_found: Option<Vec<String>>,
}

/// A row whose exam, class and student all resolved.
struct StudentSheet {
    line: usize,
    student: Student,
    answers: BTreeMap<i32, Option<AnswerLetter>>,
}

/// Rows sharing one (exam, class) pair, i.e. one application.
struct ApplicationGroup {
    exam: Exam,
    class: SchoolClass,
    sheets: Vec<StudentSheet>,
}

#[derive(Default)]
struct Lookups {
    exams: HashMap<String, Option<Exam>>,
    classes: HashMap<i64, Option<SchoolClass>>,
    exams_not_found: BTreeSet<String>,
    students_not_found: BTreeSet<i64>,
}

/// Imports student responses. `today` dates the applications created on demand.
pub async fn import_student_answers<S: SchoolStore + ?Sized>(
    store: &mut S,
    rows: Vec<Row>,
    today: NaiveDate,
) -> StoreResult<ResponseImportReport> {
    tracing::info!("Importing student responses with {} rows", rows.len());

    let mut errors = Vec::new();
    let mut lookups = Lookups::default();
    let mut order: Vec<(i64, i64)> = Vec::new();
    let mut groups: HashMap<(i64, i64), ApplicationGroup> = HashMap::new();

    for row in &rows {
        match resolve_row(store, row, &mut lookups, &mut errors).await? {
            Some((exam, class, sheet)) => {
                let key = (exam.id, class.id);
                groups
                    .entry(key)
                    .or_insert_with(|| {
                        order.push(key);
                        ApplicationGroup {
                            exam,
                            class,
                            sheets: Vec::new(),
                        }
                    })
                    .sheets
                    .push(sheet);
            }
            None => tracing::debug!("Skipping response row {}", row.line),
        }
    }

    let mut processed_students = 0;
    let mut created_applications = Vec::new();

    for key in order {
        let Some(group) = groups.remove(&key) else {
            continue;
        };
        let (application, created) = store
            .get_or_create_application(group.exam.id, group.class.id, today)
            .await?;
        if created {
            created_applications.push(CreatedApplication {
                exam: group.exam.exam_name.clone(),
                class: group.class.class_name.clone(),
            });
        }

        let questions: HashMap<i32, Question> = store
            .list_questions(group.exam.id)
            .await?
            .into_iter()
            .map(|q| (q.question_number, q))
            .collect();
        let mut alternatives: HashMap<i64, Vec<Alternative>> = HashMap::new();

        for sheet in group.sheets {
            let student = &sheet.student;
            if store.has_answers(student.id, application.id).await? {
                errors.push(format!(
                    "Student {} (serial {}) already has answers for exam '{}'",
                    student.student_name, student.student_serial, group.exam.exam_code
                ));
                continue;
            }

            let mut written = 0;
            for (&number, &letter) in &sheet.answers {
                let Some(question) = questions.get(&number) else {
                    errors.push(row_error(
                        sheet.line,
                        format!(
                            "Question {} does not exist in exam '{}'",
                            number, group.exam.exam_code
                        ),
                    ));
                    continue;
                };

                if !alternatives.contains_key(&question.id) {
                    let listed = store.list_alternatives(question.id).await?;
                    alternatives.insert(question.id, listed);
                }
                let selected = letter.and_then(|letter| {
                    alternatives
                        .get(&question.id)
                        .and_then(|alts| alts.iter().find(|a| a.alternative_order == letter.ordinal()))
                });

                store
                    .insert_answer(&NewStudentAnswer {
                        student_id: student.id,
                        application_id: application.id,
                        question_id: question.id,
                        selected_alternative_id: selected.map(|a| a.id),
                        answer_text: letter.map(|l| l.to_string()),
                        is_correct: selected.is_some_and(|a| a.is_correct),
                    })
                    .await?;
                written += 1;
            }

            if written > 0 {
                let grading = record_result(store, student.id, application.id, true).await?;
                tracing::debug!(
                    "Graded student {}: {} achievements created",
                    student.student_serial,
                    grading.achievements_created
                );
                processed_students += 1;
            }
        }
    }

    tracing::info!(
        "Response import finished: {} students processed, {} applications created, {} errors",
        processed_students,
        created_applications.len(),
        errors.len()
    );

    Ok(ResponseImportReport {
        success: true,
        message: format!("Answers of {} student(s) imported", processed_students),
        processed_students,
        created_applications,
        errors: errors_or_null(errors),
        students_not_found: non_empty(lookups.students_not_found),
        exams_not_found: non_empty(lookups.exams_not_found),
    })
}

fn non_empty<T>(set: BTreeSet<T>) -> Option<Vec<T>> {
    if set.is_empty() {
        None
    } else {
        Some(set.into_iter().collect())
    }
}

/// Validates one row and resolves exam, class and student in that order.
/// Problems are pushed to `errors` and yield `Ok(None)`.
async fn resolve_row<S: SchoolStore + ?Sized>(
    store: &mut S,
    row: &Row,
    lookups: &mut Lookups,
    errors: &mut Vec<String>,
) -> StoreResult<Option<(Exam, SchoolClass, StudentSheet)>> {
    let line = row.line;
    let Some(exam_code) = row.text(field::EXAM_CODE) else {
        errors.push(row_error(line, "exam_code is required"));
        return Ok(None);
    };
    let Some(raw_class) = row.text(field::CLASS_ID) else {
        errors.push(row_error(line, "class_id is required"));
        return Ok(None);
    };
    let Some(raw_serial) = row.text(field::STUDENT_SERIAL) else {
        errors.push(row_error(line, "student_serial is required"));
        return Ok(None);
    };
    let (Some(class_id), Some(serial)) = (parse_integer(raw_class), parse_integer(raw_serial))
    else {
        errors.push(row_error(line, "class_id and student_serial must be numbers"));
        return Ok(None);
    };

    if !lookups.exams.contains_key(exam_code) {
        let exam = store.find_exam_by_code(exam_code).await?;
        lookups.exams.insert(exam_code.to_string(), exam);
    }
    let Some(exam) = lookups.exams.get(exam_code).cloned().flatten() else {
        lookups.exams_not_found.insert(exam_code.to_string());
        errors.push(row_error(line, format!("Exam '{}' not found", exam_code)));
        return Ok(None);
    };

    if !lookups.classes.contains_key(&class_id) {
        let class = store.find_class(class_id).await?;
        lookups.classes.insert(class_id, class);
    }
    let Some(class) = lookups.classes.get(&class_id).cloned().flatten() else {
        errors.push(row_error(line, format!("Class ID {} not found", class_id)));
        return Ok(None);
    };

    let Some(student) = store.find_student_in_class(serial, class.id).await? else {
        lookups.students_not_found.insert(serial);
        errors.push(row_error(
            line,
            format!("Student with serial {} not found in class", serial),
        ));
        return Ok(None);
    };

    let columns = answer_columns(row);
    errors.extend(columns.errors.iter().map(|msg| row_error(line, msg)));
    if columns.answers.is_empty() {
        errors.push(row_error(line, "No answers found (columns q1, q2, q3...)"));
        return Ok(None);
    }

    Ok(Some((
        exam,
        class,
        StudentSheet {
            line,
            student,
            answers: columns.answers,
        },
    )))
}
