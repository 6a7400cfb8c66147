// src/models/profile.rs

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Subject bucket for catalog descriptors without a subject.
pub const NO_SUBJECT: &str = "Other";

/// Number of results listed under `recent_exams`.
pub const RECENT_EXAMS_LIMIT: i64 = 5;

/// Student joined with its class and school.
#[derive(Debug, Serialize, FromRow)]
pub struct ProfileHeader {
    pub id: i64,
    pub student_serial: i64,
    pub student_name: String,
    pub status: String,
    pub enrollment_date: Option<chrono::NaiveDate>,
    pub class_name: String,
    pub school_name: String,
    pub grade: Option<String>,
    pub shift: Option<String>,
}

/// An achievement joined with its descriptor and, when it came from an exam,
/// the exam name. Manual assignments have no application.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AchievedDescriptor {
    pub id: i64,
    pub descriptor_code: String,
    pub descriptor_name: String,
    pub subject: Option<String>,
    pub achieved_at: chrono::DateTime<chrono::Utc>,
    pub application_id: Option<i64>,
    pub exam_name: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CatalogDescriptor {
    pub id: i64,
    pub descriptor_code: String,
    pub descriptor_name: String,
    pub subject: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubjectDescriptor {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub achieved: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct SubjectBreakdown {
    pub total: usize,
    pub achieved: usize,
    pub descriptors: Vec<SubjectDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct DescriptorSummary {
    pub achieved: Vec<AchievedDescriptor>,
    pub total_count: usize,
    pub achieved_count: usize,
    pub percentage: Decimal,
    pub by_subject: BTreeMap<String, SubjectBreakdown>,
}

impl DescriptorSummary {
    /// Buckets the whole catalog by subject and marks what the student achieved.
    pub fn build(catalog: &[CatalogDescriptor], achieved: Vec<AchievedDescriptor>) -> Self {
        let mut by_subject: BTreeMap<String, SubjectBreakdown> = BTreeMap::new();

        for descriptor in catalog {
            let is_achieved = achieved.iter().any(|a| a.id == descriptor.id);
            let subject = descriptor
                .subject
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(NO_SUBJECT);

            let bucket = by_subject.entry(subject.to_string()).or_default();
            bucket.total += 1;
            if is_achieved {
                bucket.achieved += 1;
            }
            bucket.descriptors.push(SubjectDescriptor {
                id: descriptor.id,
                code: descriptor.descriptor_code.clone(),
                name: descriptor.descriptor_name.clone(),
                achieved: is_achieved,
            });
        }

        let total_count = catalog.len();
        let achieved_count = achieved.len();
        DescriptorSummary {
            percentage: percentage(
                Decimal::from(achieved_count as u64),
                Decimal::from(total_count as u64),
            ),
            achieved,
            total_count,
            achieved_count,
            by_subject,
        }
    }
}

/// A result row of the student joined with its exam and application.
#[derive(Debug, FromRow)]
pub struct ExamResultEntry {
    pub application_id: i64,
    pub exam_name: String,
    pub total_score: Decimal,
    pub max_score: Decimal,
    pub correct_answers: i32,
    pub wrong_answers: i32,
    pub application_date: chrono::NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct RecentExam {
    pub application_id: i64,
    pub exam_name: String,
    pub total_score: Decimal,
    pub max_score: Decimal,
    pub percentage: Decimal,
    pub correct_answers: i32,
    pub wrong_answers: i32,
    pub application_date: chrono::NaiveDate,
}

impl From<ExamResultEntry> for RecentExam {
    fn from(entry: ExamResultEntry) -> Self {
        RecentExam {
            percentage: percentage(entry.total_score, entry.max_score),
            application_id: entry.application_id,
            exam_name: entry.exam_name,
            total_score: entry.total_score,
            max_score: entry.max_score,
            correct_answers: entry.correct_answers,
            wrong_answers: entry.wrong_answers,
            application_date: entry.application_date,
        }
    }
}

/// Response of `GET /api/students/{id}/profile`.
#[derive(Debug, Serialize)]
pub struct StudentProfile {
    #[serde(flatten)]
    pub student: ProfileHeader,
    pub descriptors: DescriptorSummary,
    pub recent_exams: Vec<RecentExam>,
}

/// `part / whole * 100`, two decimal places. Zero when `whole` is zero.
pub fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    (part * Decimal::ONE_HUNDRED / whole).round_dp(2)
}

#[derive(Debug, Deserialize)]
pub struct ToggleDescriptorRequest {
    pub descriptor_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ToggleDescriptorResponse {
    pub message: String,
    pub achieved: bool,
    pub descriptor_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(id: i64, code: &str, subject: Option<&str>) -> CatalogDescriptor {
        CatalogDescriptor {
            id,
            descriptor_code: code.to_string(),
            descriptor_name: format!("Descriptor {}", code),
            subject: subject.map(str::to_string),
        }
    }

    fn achieved(id: i64, code: &str, application_id: Option<i64>) -> AchievedDescriptor {
        AchievedDescriptor {
            id,
            descriptor_code: code.to_string(),
            descriptor_name: format!("Descriptor {}", code),
            subject: None,
            achieved_at: chrono::Utc::now(),
            application_id,
            exam_name: application_id.map(|_| "Prova 1".to_string()),
        }
    }

    #[test]
    fn test_percentage() {
        let ten = Decimal::new(10, 0);
        assert_eq!(percentage(Decimal::new(6, 0), ten), Decimal::new(6000, 2));
        assert_eq!(percentage(Decimal::ONE, Decimal::new(3, 0)), Decimal::new(3333, 2));
        assert_eq!(percentage(Decimal::new(5, 0), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_summary_groups_catalog_by_subject() {
        let catalog = vec![
            catalog(1, "D1", Some("Matemática")),
            catalog(2, "D2", Some("Matemática")),
            catalog(3, "D3", Some("Português")),
            catalog(4, "D4", None),
        ];
        let summary = DescriptorSummary::build(
            &catalog,
            vec![achieved(2, "D2", Some(7)), achieved(4, "D4", None)],
        );

        assert_eq!(summary.total_count, 4);
        assert_eq!(summary.achieved_count, 2);
        assert_eq!(summary.percentage, Decimal::new(5000, 2));

        let math = &summary.by_subject["Matemática"];
        assert_eq!((math.total, math.achieved), (2, 1));
        assert!(!math.descriptors[0].achieved);
        assert!(math.descriptors[1].achieved);

        let other = &summary.by_subject[NO_SUBJECT];
        assert_eq!((other.total, other.achieved), (1, 1));
        assert_eq!(summary.by_subject["Português"].achieved, 0);
    }

    #[test]
    fn test_empty_catalog_has_zero_percentage() {
        let summary = DescriptorSummary::build(&[], Vec::new());
        assert_eq!(summary.percentage, Decimal::ZERO);
        assert!(summary.by_subject.is_empty());
    }

    #[test]
    fn test_recent_exam_percentage() {
        let exam = RecentExam::from(ExamResultEntry {
            application_id: 1,
            exam_name: "Prova 1".to_string(),
            total_score: Decimal::new(6, 0),
            max_score: Decimal::new(8, 0),
            correct_answers: 3,
            wrong_answers: 1,
            application_date: chrono::NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        });
        assert_eq!(exam.percentage, Decimal::new(7500, 2));
    }
}
