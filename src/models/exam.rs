// src/models/exam.rs

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Column widths of the exams and questions tables.
pub const EXAM_CODE_MAX_LEN: usize = 50;
pub const EXAM_NAME_MAX_LEN: usize = 255;
pub const SUBJECT_MAX_LEN: usize = 100;
pub const DIFFICULTY_MAX_LEN: usize = 50;

/// Largest value a `NUMERIC(5, 2)` points column holds.
pub fn max_points() -> Decimal {
    Decimal::new(99999, 2)
}

/// Represents the 'exams' table in the database.
/// `exam_code` is unique and is the idempotency key of the answer-key import.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub exam_code: String,
    pub exam_name: String,
    pub subject: Option<String>,
    pub school_year: Option<i32>,
    pub total_questions: Option<i32>,
}

/// Exam metadata written by the answer-key import (insert or update by code).
#[derive(Debug, Clone, PartialEq)]
pub struct NewExam {
    pub exam_code: String,
    pub exam_name: String,
    pub subject: Option<String>,
    pub school_year: Option<i32>,
    pub total_questions: i32,
}

/// Represents the 'questions' table in the database.
/// Unique per (exam_id, question_number).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub exam_id: i64,
    pub question_number: i32,
    pub question_text: String,

    /// Letter of the correct alternative as imported ("A".."E").
    pub correct_answer: Option<String>,

    pub difficulty_level: Option<String>,
    pub points: Decimal,
    pub descriptor_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub exam_id: i64,
    pub question_number: i32,
    pub question_text: String,
    pub correct_answer: AnswerLetter,
    pub difficulty_level: String,
    pub points: Decimal,
    pub descriptor_id: Option<i64>,
}

/// Represents the 'alternatives' table in the database.
/// `alternative_order` 1..N maps to the letters A..Z.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Alternative {
    pub id: i64,
    pub question_id: i64,
    pub alternative_order: i32,
    pub alternative_text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone)]
pub struct NewAlternative {
    pub question_id: i64,
    pub alternative_order: i32,
    pub alternative_text: String,
    pub is_correct: bool,
}

/// Represents the 'descriptors' catalog table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Descriptor {
    pub id: i64,
    pub descriptor_code: String,
    pub descriptor_name: String,
}

/// One of the five answer letters of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnswerLetter {
    A,
    B,
    C,
    D,
    E,
}

impl AnswerLetter {
    pub const ALL: [AnswerLetter; 5] = [
        AnswerLetter::A,
        AnswerLetter::B,
        AnswerLetter::C,
        AnswerLetter::D,
        AnswerLetter::E,
    ];

    /// Parses a cell value, ignoring surrounding whitespace and case.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "A" => Some(AnswerLetter::A),
            "B" => Some(AnswerLetter::B),
            "C" => Some(AnswerLetter::C),
            "D" => Some(AnswerLetter::D),
            "E" => Some(AnswerLetter::E),
            _ => None,
        }
    }

    /// Position of the alternative this letter selects (A = 1).
    pub fn ordinal(&self) -> i32 {
        match self {
            AnswerLetter::A => 1,
            AnswerLetter::B => 2,
            AnswerLetter::C => 3,
            AnswerLetter::D => 4,
            AnswerLetter::E => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerLetter::A => "A",
            AnswerLetter::B => "B",
            AnswerLetter::C => "C",
            AnswerLetter::D => "D",
            AnswerLetter::E => "E",
        }
    }
}

impl fmt::Display for AnswerLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DTO for listing a question together with its alternatives.
#[derive(Debug, Serialize)]
pub struct QuestionDetail {
    #[serde(flatten)]
    pub question: Question,
    pub alternatives: Vec<Alternative>,
}

/// Aggregated numbers for one exam across all of its applications.
#[derive(Debug, Serialize, FromRow)]
pub struct ExamStatistics {
    pub total_applications: i64,
    pub total_students: i64,
    pub average_score: Decimal,
    pub highest_score: Decimal,
    pub lowest_score: Decimal,
    pub total_questions: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_letter_parse_is_lenient_on_case_and_space() {
        assert_eq!(AnswerLetter::parse(" b "), Some(AnswerLetter::B));
        assert_eq!(AnswerLetter::parse("E"), Some(AnswerLetter::E));
        assert_eq!(AnswerLetter::parse("F"), None);
        assert_eq!(AnswerLetter::parse(""), None);
        assert_eq!(AnswerLetter::parse("AB"), None);
    }

    #[test]
    fn test_answer_letter_ordinal() {
        let ordinals: Vec<i32> = AnswerLetter::ALL.iter().map(|l| l.ordinal()).collect();
        assert_eq!(ordinals, vec![1, 2, 3, 4, 5]);
    }
}
