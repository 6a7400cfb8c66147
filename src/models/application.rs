// src/models/application.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Status given to applications created on demand by the response import.
pub const IMPORTED_APPLICATION_STATUS: &str = "completed";

/// Represents the 'exam_applications' table.
/// One administration of an exam to one class.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamApplication {
    pub id: i64,
    pub exam_id: i64,
    pub class_id: i64,
    pub application_date: chrono::NaiveDate,
    pub fiscal_year: Option<i32>,
    pub status: String,
}

/// Lifecycle states an application can be moved between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Scheduled => "scheduled",
            ApplicationStatus::InProgress => "in_progress",
            ApplicationStatus::Completed => "completed",
            ApplicationStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "scheduled" => Some(ApplicationStatus::Scheduled),
            "in_progress" => Some(ApplicationStatus::InProgress),
            "completed" => Some(ApplicationStatus::Completed),
            "cancelled" => Some(ApplicationStatus::Cancelled),
            _ => None,
        }
    }
}

/// Body of `POST /api/exam-applications/{id}/change-status`.
/// Kept as a raw string so an unknown value answers 400 with our message.
#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: Option<String>,
}

/// A student of the application's class and whether they already have a result.
#[derive(Debug, Serialize, FromRow)]
pub struct ApplicationStudentRow {
    pub id: i64,
    pub student_serial: i64,
    pub student_name: String,
    pub status: String,
    pub has_result: bool,
}

/// Represents the 'student_answers' table.
/// Unique per (student_id, application_id, question_id).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StudentAnswer {
    pub id: i64,
    pub student_id: i64,
    pub application_id: i64,
    pub question_id: i64,
    pub selected_alternative_id: Option<i64>,
    pub answer_text: Option<String>,

    /// Snapshot of the selected alternative's flag at write time.
    pub is_correct: bool,
}

#[derive(Debug, Clone)]
pub struct NewStudentAnswer {
    pub student_id: i64,
    pub application_id: i64,
    pub question_id: i64,
    pub selected_alternative_id: Option<i64>,
    pub answer_text: Option<String>,
    pub is_correct: bool,
}

/// A stored answer joined with the grading-relevant columns of its question.
#[derive(Debug, Clone, FromRow)]
pub struct GradedAnswer {
    pub answer_id: i64,
    pub question_id: i64,
    pub is_correct: bool,
    pub selected_alternative_id: Option<i64>,
    pub answer_text: Option<String>,
    pub points: Decimal,
    pub descriptor_id: Option<i64>,
}

impl GradedAnswer {
    /// Nothing selected and nothing written.
    pub fn is_blank(&self) -> bool {
        self.selected_alternative_id.is_none()
            && self
                .answer_text
                .as_deref()
                .is_none_or(|text| text.trim().is_empty())
    }
}

/// Represents the 'exam_results' table.
/// Unique per (student_id, application_id); rewritten whenever answers change.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: i64,
    pub student_id: i64,
    pub application_id: i64,
    pub total_score: Decimal,
    pub max_score: Decimal,
    pub correct_answers: i32,
    pub wrong_answers: i32,
    pub blank_answers: i32,
}

/// Represents the 'student_descriptor_achievements' table.
/// Unique per (student_id, descriptor_id); the first achievement is kept.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DescriptorAchievement {
    pub id: i64,
    pub student_id: i64,
    pub descriptor_id: i64,
    pub application_id: Option<i64>,
}

/// Result row of one application, joined with the student.
#[derive(Debug, Serialize, FromRow)]
pub struct ApplicationResultRow {
    pub student_id: i64,
    pub student_serial: i64,
    pub student_name: String,
    pub total_score: Decimal,
    pub max_score: Decimal,
    pub correct_answers: i32,
    pub wrong_answers: i32,
    pub blank_answers: i32,
}

/// DTO for the interactive bulk answer submission.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct BulkAnswerRequest {
    pub id_student: i64,
    pub id_exam_application: i64,
    #[validate(
        length(min = 1, max = 500, message = "Between 1 and 500 answers must be submitted."),
        nested
    )]
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SubmittedAnswer {
    pub id_question: i64,
    pub id_selected_alternative: Option<i64>,
    #[validate(length(max = 2000))]
    pub answer_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(count: usize) -> BulkAnswerRequest {
        BulkAnswerRequest {
            id_student: 1,
            id_exam_application: 1,
            answers: (0..count as i64)
                .map(|id| SubmittedAnswer {
                    id_question: id,
                    id_selected_alternative: None,
                    answer_text: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_answer_count_bounds() {
        assert!(request(0).validate().is_err());
        assert!(request(1).validate().is_ok());
        assert!(request(500).validate().is_ok());
        assert!(request(501).validate().is_err());
    }

    #[test]
    fn test_nested_answer_text_is_validated() {
        let mut req = request(1);
        req.answers[0].answer_text = Some("x".repeat(2001));
        assert!(req.validate().is_err());

        req.answers[0].answer_text = Some("x".repeat(2000));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_application_status_tokens() {
        for token in ["scheduled", "in_progress", "completed", "cancelled"] {
            let status = ApplicationStatus::from_token(token).unwrap();
            assert_eq!(status.as_str(), token);
        }
        assert_eq!(ApplicationStatus::from_token("finished"), None);
        assert_eq!(ApplicationStatus::from_token("Completed"), None);
        assert_eq!(
            ApplicationStatus::from_token(IMPORTED_APPLICATION_STATUS),
            Some(ApplicationStatus::Completed)
        );
    }

    #[test]
    fn test_request_serializes() {
        let json = serde_json::to_value(request(1)).unwrap();
        assert_eq!(json["answers"][0]["id_question"], 0);
        assert!(json["answers"][0]["answer_text"].is_null());
    }
}
