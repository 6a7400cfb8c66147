// src/import/answer_key.rs

//! Answer-key import: one row per (exam, question) with the correct letter.
//!
//! Rows are grouped by exam code. An exam that already exists has its metadata
//! updated and all of its questions replaced; nothing is merged.

use std::collections::{BTreeSet, HashMap, HashSet};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    models::exam::{
        AnswerLetter, DIFFICULTY_MAX_LEN, EXAM_CODE_MAX_LEN, EXAM_NAME_MAX_LEN, NewAlternative,
        NewExam, NewQuestion, SUBJECT_MAX_LEN, max_points,
    },
    store::{SchoolStore, StoreResult},
    utils::html::clean_imported_text,
};

use super::{
    check_length, errors_or_null,
    normalize::{Row, field, normalize_difficulty},
    parse_integer, row_error,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImportedExam {
    pub code: String,
    pub name: String,
    pub question_count: usize,
    pub created: bool,
}

#[derive(Debug, Serialize)]
pub struct AnswerKeyReport {
    pub success: bool,
    pub message: String,
    pub exams: Vec<ImportedExam>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptors_not_found: Option<Vec<String>>,
}

/// A validated answer-key row.
#[derive(Debug, Clone, PartialEq)]
struct KeyRow {
    line: usize,
    exam_code: String,
    exam_name: String,
    subject: Option<String>,
    grade: Option<i32>,
    question_number: i32,
    correct_answer: AnswerLetter,
    descriptor_code: Option<String>,
    points: Decimal,
    difficulty: String,
    question_text: Option<String>,
}

/// Rows of one exam, in file order.
struct ExamGroup {
    first: KeyRow,
    questions: Vec<(KeyRow, Option<i64>)>,
}

fn parse_key_row(row: &Row) -> Result<KeyRow, String> {
    let exam_code = row
        .text(field::EXAM_CODE)
        .ok_or("exam_code is required")?
        .to_string();
    let exam_name = row
        .text(field::EXAM_NAME)
        .ok_or("exam_name is required")?
        .to_string();
    check_length("exam_code", &exam_code, EXAM_CODE_MAX_LEN)?;
    check_length("exam_name", &exam_name, EXAM_NAME_MAX_LEN)?;

    let subject = row.text(field::SUBJECT).map(str::to_string);
    if let Some(subject) = &subject {
        check_length("subject", subject, SUBJECT_MAX_LEN)?;
    }

    let raw_number = row
        .text(field::QUESTION_NUMBER)
        .ok_or("question_number is required")?;
    let question_number = parse_integer(raw_number)
        .and_then(|n| i32::try_from(n).ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| format!("question_number '{}' must be a positive integer", raw_number))?;

    let correct_answer = row
        .text(field::CORRECT_ANSWER)
        .and_then(AnswerLetter::parse)
        .ok_or("correct_answer must be A, B, C, D or E")?;

    let points = match row.text(field::POINTS) {
        Some(raw) => parse_points(raw)?,
        None => Decimal::ONE,
    };

    let grade = match row.text(field::GRADE) {
        Some(raw) => Some(parse_grade(raw).ok_or_else(|| format!("Invalid grade '{}'", raw))?),
        None => None,
    };

    let difficulty = normalize_difficulty(row.text(field::DIFFICULTY).unwrap_or(""));
    check_length("difficulty", &difficulty, DIFFICULTY_MAX_LEN)?;

    Ok(KeyRow {
        line: row.line,
        exam_code,
        exam_name,
        subject,
        grade,
        question_number,
        correct_answer,
        descriptor_code: row.text(field::DESCRIPTOR_CODE).map(str::to_string),
        points,
        difficulty,
        question_text: row
            .text(field::QUESTION_TEXT)
            .map(clean_imported_text)
            .filter(|t| !t.is_empty()),
    })
}

/// Points between 0 and 999.99 with two decimals; a decimal comma is accepted.
fn parse_points(raw: &str) -> Result<Decimal, String> {
    let points: Decimal = raw
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| format!("points '{}' is not a number", raw))?;
    if points.is_sign_negative() {
        return Err(format!("points '{}' cannot be negative", raw));
    }
    let points = points.round_dp(2);
    if points > max_points() {
        return Err(format!("points '{}' cannot exceed {}", raw, max_points()));
    }
    Ok(points)
}

/// Leading integer of a grade label: "5", "5º ano", "5° Ano".
fn parse_grade(raw: &str) -> Option<i32> {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Imports an answer key. Row problems end up in `errors`, unknown descriptor codes
/// in `descriptors_not_found`; only store failures return `Err`.
pub async fn import_answer_key<S: SchoolStore + ?Sized>(
    store: &mut S,
    rows: Vec<Row>,
) -> StoreResult<AnswerKeyReport> {
    tracing::info!("Importing answer key with {} rows", rows.len());

    let mut errors = Vec::new();
    let mut descriptor_cache: HashMap<String, Option<i64>> = HashMap::new();
    let mut descriptors_not_found = BTreeSet::new();

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, ExamGroup> = HashMap::new();
    let mut seen_numbers: HashSet<(String, i32)> = HashSet::new();

    for row in &rows {
        let key = match parse_key_row(row) {
            Ok(key) => key,
            Err(msg) => {
                tracing::debug!("Skipping answer-key row {}: {}", row.line, msg);
                errors.push(row_error(row.line, msg));
                continue;
            }
        };

        if !seen_numbers.insert((key.exam_code.clone(), key.question_number)) {
            errors.push(row_error(
                key.line,
                format!(
                    "Question {} appears more than once for exam '{}'",
                    key.question_number, key.exam_code
                ),
            ));
            continue;
        }

        let descriptor_id = match &key.descriptor_code {
            Some(code) => {
                if !descriptor_cache.contains_key(code) {
                    let found = store.find_descriptor_by_code(code).await?;
                    descriptor_cache.insert(code.clone(), found.map(|d| d.id));
                }
                let id = descriptor_cache.get(code).copied().flatten();
                if id.is_none() {
                    descriptors_not_found.insert(code.clone());
                }
                id
            }
            None => None,
        };

        match groups.get_mut(&key.exam_code) {
            Some(group) => group.questions.push((key, descriptor_id)),
            None => {
                order.push(key.exam_code.clone());
                groups.insert(
                    key.exam_code.clone(),
                    ExamGroup {
                        first: key.clone(),
                        questions: vec![(key, descriptor_id)],
                    },
                );
            }
        }
    }

    let mut exams = Vec::new();
    for code in order {
        let Some(group) = groups.remove(&code) else {
            continue;
        };
        if let Some(imported) = write_exam(store, group, &mut errors).await? {
            exams.push(imported);
        }
    }

    tracing::info!(
        "Answer key import finished: {} exams, {} errors",
        exams.len(),
        errors.len()
    );

    let (warning, descriptors_not_found) = if descriptors_not_found.is_empty() {
        (None, None)
    } else {
        (
            Some("Some descriptors were not found".to_string()),
            Some(descriptors_not_found.into_iter().collect()),
        )
    };

    Ok(AnswerKeyReport {
        success: true,
        message: format!("{} exam(s) imported", exams.len()),
        exams,
        errors: errors_or_null(errors),
        warning,
        descriptors_not_found,
    })
}

/// Upserts one exam and replaces its questions. Returns `None` when the exam was
/// skipped because students already answered it.
async fn write_exam<S: SchoolStore + ?Sized>(
    store: &mut S,
    group: ExamGroup,
    errors: &mut Vec<String>,
) -> StoreResult<Option<ImportedExam>> {
    let first = &group.first;
    let new_exam = NewExam {
        exam_code: first.exam_code.clone(),
        exam_name: first.exam_name.clone(),
        subject: first.subject.clone(),
        school_year: first.grade,
        total_questions: group.questions.len() as i32,
    };

    let (exam, created) = match store.find_exam_by_code(&new_exam.exam_code).await? {
        Some(existing) => {
            let answered = store.count_answers_for_exam(existing.id).await?;
            if answered > 0 {
                errors.push(row_error(
                    first.line,
                    format!(
                        "Exam '{}' already has {} recorded student answers; its questions were not replaced",
                        existing.exam_code, answered
                    ),
                ));
                return Ok(None);
            }
            let exam = store.update_exam(existing.id, &new_exam).await?;
            let removed = store.delete_questions(exam.id).await?;
            tracing::warn!(
                "Replacing answer key of exam '{}': deleted {} questions and their alternatives",
                exam.exam_code,
                removed
            );
            (exam, false)
        }
        None => (store.insert_exam(&new_exam).await?, true),
    };

    for (key, descriptor_id) in &group.questions {
        let question = store
            .insert_question(&NewQuestion {
                exam_id: exam.id,
                question_number: key.question_number,
                question_text: key
                    .question_text
                    .clone()
                    .unwrap_or_else(|| format!("Question {}", key.question_number)),
                correct_answer: key.correct_answer,
                difficulty_level: key.difficulty.clone(),
                points: key.points,
                descriptor_id: *descriptor_id,
            })
            .await?;

        for letter in AnswerLetter::ALL {
            store
                .insert_alternative(&NewAlternative {
                    question_id: question.id,
                    alternative_order: letter.ordinal(),
                    alternative_text: format!("Alternative {}", letter),
                    is_correct: letter == key.correct_answer,
                })
                .await?;
        }
    }

    Ok(Some(ImportedExam {
        code: exam.exam_code,
        name: exam.exam_name,
        question_count: group.questions.len(),
        created,
    }))
}
