// src/store/mod.rs

//! Persistence seam of the import and grading pipelines.
//!
//! Every pipeline writes through one `SchoolStore` value. The production
//! implementation wraps a single database transaction, so a pipeline either
//! commits as a whole or, on any `Err`, leaves nothing behind.

pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    error::AppError,
    grading::calculator::ResultSummary,
    models::{
        application::{
            DescriptorAchievement, ExamApplication, ExamResult, GradedAnswer, NewStudentAnswer,
            StudentAnswer,
        },
        exam::{Alternative, Descriptor, Exam, NewAlternative, NewExam, NewQuestion, Question},
        school::{NewStudent, School, SchoolClass, Student},
    },
};

pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, AppError>;

#[async_trait]
pub trait SchoolStore: Send {
    // Schools, classes, students
    async fn find_school(&mut self, id: i64) -> StoreResult<Option<School>>;

    /// Classes ordered by id, optionally restricted to one school.
    async fn list_classes(&mut self, school_id: Option<i64>) -> StoreResult<Vec<SchoolClass>>;

    async fn find_class(&mut self, id: i64) -> StoreResult<Option<SchoolClass>>;
    async fn find_student(&mut self, id: i64) -> StoreResult<Option<Student>>;
    async fn find_student_in_class(
        &mut self,
        serial: i64,
        class_id: i64,
    ) -> StoreResult<Option<Student>>;

    /// Inserts or updates by serial. The flag is `true` when the row was created.
    async fn upsert_student(&mut self, student: &NewStudent) -> StoreResult<(Student, bool)>;

    // Exams and answer keys
    async fn find_descriptor_by_code(&mut self, code: &str) -> StoreResult<Option<Descriptor>>;
    async fn find_exam_by_code(&mut self, code: &str) -> StoreResult<Option<Exam>>;
    async fn insert_exam(&mut self, exam: &NewExam) -> StoreResult<Exam>;
    async fn update_exam(&mut self, id: i64, exam: &NewExam) -> StoreResult<Exam>;
    async fn count_answers_for_exam(&mut self, exam_id: i64) -> StoreResult<i64>;

    /// Deletes every question of the exam together with its alternatives.
    async fn delete_questions(&mut self, exam_id: i64) -> StoreResult<u64>;

    async fn insert_question(&mut self, question: &NewQuestion) -> StoreResult<Question>;
    async fn insert_alternative(&mut self, alternative: &NewAlternative)
    -> StoreResult<Alternative>;

    /// Questions of an exam ordered by question number.
    async fn list_questions(&mut self, exam_id: i64) -> StoreResult<Vec<Question>>;

    async fn find_question(&mut self, id: i64) -> StoreResult<Option<Question>>;

    /// Alternatives of a question ordered by position.
    async fn list_alternatives(&mut self, question_id: i64) -> StoreResult<Vec<Alternative>>;

    // Applications, answers, results
    async fn find_application(&mut self, id: i64) -> StoreResult<Option<ExamApplication>>;

    /// Reuses the first application of (exam, class) or creates a completed one dated `today`.
    async fn get_or_create_application(
        &mut self,
        exam_id: i64,
        class_id: i64,
        today: NaiveDate,
    ) -> StoreResult<(ExamApplication, bool)>;

    async fn has_answers(&mut self, student_id: i64, application_id: i64) -> StoreResult<bool>;
    async fn insert_answer(&mut self, answer: &NewStudentAnswer) -> StoreResult<StudentAnswer>;

    /// Answers of one student in one application, in insertion order.
    async fn graded_answers(
        &mut self,
        student_id: i64,
        application_id: i64,
    ) -> StoreResult<Vec<GradedAnswer>>;

    async fn upsert_result(
        &mut self,
        student_id: i64,
        application_id: i64,
        summary: &ResultSummary,
    ) -> StoreResult<ExamResult>;

    /// Keeps an existing (student, descriptor) row untouched. The flag is `true` when created.
    async fn get_or_create_achievement(
        &mut self,
        student_id: i64,
        descriptor_id: i64,
        application_id: i64,
    ) -> StoreResult<(DescriptorAchievement, bool)>;
}
