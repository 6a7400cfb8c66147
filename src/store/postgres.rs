// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    grading::calculator::ResultSummary,
    models::{
        application::{
            DescriptorAchievement, ExamApplication, ExamResult, GradedAnswer, IMPORTED_APPLICATION_STATUS,
            NewStudentAnswer, StudentAnswer,
        },
        exam::{Alternative, Descriptor, Exam, NewAlternative, NewExam, NewQuestion, Question},
        school::{NewStudent, School, SchoolClass, Student},
    },
};

use super::{SchoolStore, StoreResult};

const EXAM_COLUMNS: &str = "id, exam_code, exam_name, subject, school_year, total_questions";
const QUESTION_COLUMNS: &str = "id, exam_id, question_number, question_text, correct_answer, \
     difficulty_level, points, descriptor_id";
const CLASS_COLUMNS: &str = "id, school_id, class_name, grade, school_year";
const STUDENT_COLUMNS: &str =
    "id, student_serial, student_name, class_id, enrollment_date, status";
const APPLICATION_COLUMNS: &str =
    "id, exam_id, class_id, application_date, fiscal_year, status";

/// `SchoolStore` backed by one open Postgres transaction.
pub struct PgStore {
    tx: Transaction<'static, Postgres>,
}

impl PgStore {
    pub async fn begin(pool: &PgPool) -> StoreResult<Self> {
        let tx = pool.begin().await.map_err(|e| {
            tracing::error!("Failed to open transaction: {:?}", e);
            e
        })?;
        Ok(Self { tx })
    }

    pub async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl SchoolStore for PgStore {
    async fn find_school(&mut self, id: i64) -> StoreResult<Option<School>> {
        let school = sqlx::query_as::<_, School>("SELECT id, name FROM schools WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(school)
    }

    async fn list_classes(&mut self, school_id: Option<i64>) -> StoreResult<Vec<SchoolClass>> {
        let sql = format!(
            "SELECT {CLASS_COLUMNS} FROM classes \
             WHERE ($1::BIGINT IS NULL OR school_id = $1) \
             ORDER BY id"
        );
        let classes = sqlx::query_as::<_, SchoolClass>(&sql)
            .bind(school_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(classes)
    }

    async fn find_class(&mut self, id: i64) -> StoreResult<Option<SchoolClass>> {
        let sql = format!("SELECT {CLASS_COLUMNS} FROM classes WHERE id = $1");
        let class = sqlx::query_as::<_, SchoolClass>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(class)
    }

    async fn find_student(&mut self, id: i64) -> StoreResult<Option<Student>> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1");
        let student = sqlx::query_as::<_, Student>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(student)
    }

    async fn find_student_in_class(
        &mut self,
        serial: i64,
        class_id: i64,
    ) -> StoreResult<Option<Student>> {
        let sql = format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE student_serial = $1 AND class_id = $2"
        );
        let student = sqlx::query_as::<_, Student>(&sql)
            .bind(serial)
            .bind(class_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(student)
    }

    async fn upsert_student(&mut self, student: &NewStudent) -> StoreResult<(Student, bool)> {
        // xmax is zero only for a freshly inserted tuple.
        let sql = format!(
            "INSERT INTO students (student_serial, student_name, class_id, enrollment_date, status) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (student_serial) DO UPDATE SET \
                 student_name = EXCLUDED.student_name, \
                 class_id = EXCLUDED.class_id, \
                 enrollment_date = EXCLUDED.enrollment_date, \
                 status = EXCLUDED.status \
             RETURNING {STUDENT_COLUMNS}, (xmax = 0) AS inserted"
        );

        #[derive(sqlx::FromRow)]
        struct Upserted {
            #[sqlx(flatten)]
            student: Student,
            inserted: bool,
        }

        let row = sqlx::query_as::<_, Upserted>(&sql)
            .bind(student.student_serial)
            .bind(&student.student_name)
            .bind(student.class_id)
            .bind(student.enrollment_date)
            .bind(student.status.as_str())
            .fetch_one(&mut *self.tx)
            .await?;
        Ok((row.student, row.inserted))
    }

    async fn find_descriptor_by_code(&mut self, code: &str) -> StoreResult<Option<Descriptor>> {
        let descriptor = sqlx::query_as::<_, Descriptor>(
            "SELECT id, descriptor_code, descriptor_name FROM descriptors WHERE descriptor_code = $1",
        )
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(descriptor)
    }

    async fn find_exam_by_code(&mut self, code: &str) -> StoreResult<Option<Exam>> {
        let sql = format!("SELECT {EXAM_COLUMNS} FROM exams WHERE exam_code = $1");
        let exam = sqlx::query_as::<_, Exam>(&sql)
            .bind(code)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(exam)
    }

    async fn insert_exam(&mut self, exam: &NewExam) -> StoreResult<Exam> {
        let sql = format!(
            "INSERT INTO exams (exam_code, exam_name, subject, school_year, total_questions) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {EXAM_COLUMNS}"
        );
        let exam = sqlx::query_as::<_, Exam>(&sql)
            .bind(&exam.exam_code)
            .bind(&exam.exam_name)
            .bind(&exam.subject)
            .bind(exam.school_year)
            .bind(exam.total_questions)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exam)
    }

    async fn update_exam(&mut self, id: i64, exam: &NewExam) -> StoreResult<Exam> {
        let sql = format!(
            "UPDATE exams SET exam_name = $1, subject = $2, school_year = $3, total_questions = $4 \
             WHERE id = $5 \
             RETURNING {EXAM_COLUMNS}"
        );
        let exam = sqlx::query_as::<_, Exam>(&sql)
            .bind(&exam.exam_name)
            .bind(&exam.subject)
            .bind(exam.school_year)
            .bind(exam.total_questions)
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exam)
    }

    async fn count_answers_for_exam(&mut self, exam_id: i64) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM student_answers sa \
             JOIN questions q ON q.id = sa.question_id \
             WHERE q.exam_id = $1",
        )
        .bind(exam_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn delete_questions(&mut self, exam_id: i64) -> StoreResult<u64> {
        // Alternatives go with their question (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM questions WHERE exam_id = $1")
            .bind(exam_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_question(&mut self, question: &NewQuestion) -> StoreResult<Question> {
        let sql = format!(
            "INSERT INTO questions \
             (exam_id, question_number, question_text, question_type, correct_answer, \
              difficulty_level, points, descriptor_id) \
             VALUES ($1, $2, $3, 'multiple_choice', $4, $5, $6, $7) \
             RETURNING {QUESTION_COLUMNS}"
        );
        let question = sqlx::query_as::<_, Question>(&sql)
            .bind(question.exam_id)
            .bind(question.question_number)
            .bind(&question.question_text)
            .bind(question.correct_answer.as_str())
            .bind(&question.difficulty_level)
            .bind(question.points)
            .bind(question.descriptor_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(question)
    }

    async fn insert_alternative(
        &mut self,
        alternative: &NewAlternative,
    ) -> StoreResult<Alternative> {
        let alternative = sqlx::query_as::<_, Alternative>(
            "INSERT INTO alternatives (question_id, alternative_order, alternative_text, is_correct) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, question_id, alternative_order, alternative_text, is_correct",
        )
        .bind(alternative.question_id)
        .bind(alternative.alternative_order)
        .bind(&alternative.alternative_text)
        .bind(alternative.is_correct)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(alternative)
    }

    async fn list_questions(&mut self, exam_id: i64) -> StoreResult<Vec<Question>> {
        let sql = format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY question_number"
        );
        let questions = sqlx::query_as::<_, Question>(&sql)
            .bind(exam_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(questions)
    }

    async fn find_question(&mut self, id: i64) -> StoreResult<Option<Question>> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1");
        let question = sqlx::query_as::<_, Question>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(question)
    }

    async fn list_alternatives(&mut self, question_id: i64) -> StoreResult<Vec<Alternative>> {
        let alternatives = sqlx::query_as::<_, Alternative>(
            "SELECT id, question_id, alternative_order, alternative_text, is_correct \
             FROM alternatives WHERE question_id = $1 ORDER BY alternative_order",
        )
        .bind(question_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(alternatives)
    }

    async fn find_application(&mut self, id: i64) -> StoreResult<Option<ExamApplication>> {
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM exam_applications WHERE id = $1");
        let application = sqlx::query_as::<_, ExamApplication>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(application)
    }

    async fn get_or_create_application(
        &mut self,
        exam_id: i64,
        class_id: i64,
        today: NaiveDate,
    ) -> StoreResult<(ExamApplication, bool)> {
        let select = format!(
            "SELECT {APPLICATION_COLUMNS} FROM exam_applications \
             WHERE exam_id = $1 AND class_id = $2 ORDER BY id LIMIT 1"
        );
        let existing = sqlx::query_as::<_, ExamApplication>(&select)
            .bind(exam_id)
            .bind(class_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        if let Some(application) = existing {
            return Ok((application, false));
        }

        let insert = format!(
            "INSERT INTO exam_applications (exam_id, class_id, application_date, fiscal_year, status) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {APPLICATION_COLUMNS}"
        );
        let application = sqlx::query_as::<_, ExamApplication>(&insert)
            .bind(exam_id)
            .bind(class_id)
            .bind(today)
            .bind(today.year())
            .bind(IMPORTED_APPLICATION_STATUS)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok((application, true))
    }

    async fn has_answers(&mut self, student_id: i64, application_id: i64) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM student_answers WHERE student_id = $1 AND application_id = $2)",
        )
        .bind(student_id)
        .bind(application_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn insert_answer(&mut self, answer: &NewStudentAnswer) -> StoreResult<StudentAnswer> {
        let answer = sqlx::query_as::<_, StudentAnswer>(
            "INSERT INTO student_answers \
             (student_id, application_id, question_id, selected_alternative_id, answer_text, is_correct) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, student_id, application_id, question_id, selected_alternative_id, \
                       answer_text, is_correct",
        )
        .bind(answer.student_id)
        .bind(answer.application_id)
        .bind(answer.question_id)
        .bind(answer.selected_alternative_id)
        .bind(&answer.answer_text)
        .bind(answer.is_correct)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(answer)
    }

    async fn graded_answers(
        &mut self,
        student_id: i64,
        application_id: i64,
    ) -> StoreResult<Vec<GradedAnswer>> {
        let answers = sqlx::query_as::<_, GradedAnswer>(
            "SELECT sa.id AS answer_id, sa.question_id, sa.is_correct, \
                    sa.selected_alternative_id, sa.answer_text, q.points, q.descriptor_id \
             FROM student_answers sa \
             JOIN questions q ON q.id = sa.question_id \
             WHERE sa.student_id = $1 AND sa.application_id = $2 \
             ORDER BY sa.id",
        )
        .bind(student_id)
        .bind(application_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(answers)
    }

    async fn upsert_result(
        &mut self,
        student_id: i64,
        application_id: i64,
        summary: &ResultSummary,
    ) -> StoreResult<ExamResult> {
        let result = sqlx::query_as::<_, ExamResult>(
            "INSERT INTO exam_results \
             (student_id, application_id, total_score, max_score, \
              correct_answers, wrong_answers, blank_answers) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (student_id, application_id) DO UPDATE SET \
                 total_score = EXCLUDED.total_score, \
                 max_score = EXCLUDED.max_score, \
                 correct_answers = EXCLUDED.correct_answers, \
                 wrong_answers = EXCLUDED.wrong_answers, \
                 blank_answers = EXCLUDED.blank_answers, \
                 updated_at = CURRENT_TIMESTAMP \
             RETURNING id, student_id, application_id, total_score, max_score, \
                       correct_answers, wrong_answers, blank_answers",
        )
        .bind(student_id)
        .bind(application_id)
        .bind(summary.total_score)
        .bind(summary.max_score)
        .bind(summary.correct_answers)
        .bind(summary.wrong_answers)
        .bind(summary.blank_answers)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(result)
    }

    async fn get_or_create_achievement(
        &mut self,
        student_id: i64,
        descriptor_id: i64,
        application_id: i64,
    ) -> StoreResult<(DescriptorAchievement, bool)> {
        let inserted = sqlx::query_as::<_, DescriptorAchievement>(
            "INSERT INTO student_descriptor_achievements (student_id, descriptor_id, application_id) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (student_id, descriptor_id) DO NOTHING \
             RETURNING id, student_id, descriptor_id, application_id",
        )
        .bind(student_id)
        .bind(descriptor_id)
        .bind(application_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(achievement) = inserted {
            return Ok((achievement, true));
        }

        let existing = sqlx::query_as::<_, DescriptorAchievement>(
            "SELECT id, student_id, descriptor_id, application_id \
             FROM student_descriptor_achievements \
             WHERE student_id = $1 AND descriptor_id = $2",
        )
        .bind(student_id)
        .bind(descriptor_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok((existing, false))
    }
}
