// src/models/school.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'schools' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct School {
    pub id: i64,
    pub name: String,
}

/// Represents the 'classes' table in the database.
/// A class belongs to one school and enrolls students.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SchoolClass {
    pub id: i64,
    pub school_id: i64,
    pub class_name: String,

    /// Free-form grade label, e.g. "5º Ano".
    pub grade: Option<String>,

    pub school_year: i32,
}

/// Represents the 'students' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,

    /// Globally unique enrollment number.
    pub student_serial: i64,

    pub student_name: String,
    pub class_id: i64,
    pub enrollment_date: Option<chrono::NaiveDate>,

    /// One of the `StudentStatus` tokens.
    pub status: String,
}

/// Canonical enrollment states accepted by the roster import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    #[default]
    Enrolled,
    Transferred,
    Graduated,
    Dropped,
    Active,
    Inactive,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Enrolled => "enrolled",
            StudentStatus::Transferred => "transferred",
            StudentStatus::Graduated => "graduated",
            StudentStatus::Dropped => "dropped",
            StudentStatus::Active => "active",
            StudentStatus::Inactive => "inactive",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "enrolled" => Some(StudentStatus::Enrolled),
            "transferred" => Some(StudentStatus::Transferred),
            "graduated" => Some(StudentStatus::Graduated),
            "dropped" => Some(StudentStatus::Dropped),
            "active" => Some(StudentStatus::Active),
            "inactive" => Some(StudentStatus::Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Width of `students.student_name`.
pub const STUDENT_NAME_MAX_LEN: usize = 255;

/// Roster row ready to be upserted by serial number.
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub student_serial: i64,
    pub student_name: String,
    pub class_id: i64,
    pub enrollment_date: chrono::NaiveDate,
    pub status: StudentStatus,
}

/// Entry of the `available_classes` hint returned when roster classes are missing.
#[derive(Debug, Clone, Serialize)]
pub struct ClassHint {
    pub id: i64,
    pub name: String,
    pub grade: Option<String>,
}

impl From<&SchoolClass> for ClassHint {
    fn from(class: &SchoolClass) -> Self {
        ClassHint {
            id: class.id,
            name: class.class_name.clone(),
            grade: class.grade.clone(),
        }
    }
}
