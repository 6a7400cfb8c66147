// tests/common/mod.rs

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use school_backend::{
    grading::ResultSummary,
    import::{Row, decoder::RawRow},
    models::{
        application::{
            DescriptorAchievement, ExamApplication, ExamResult, GradedAnswer,
            IMPORTED_APPLICATION_STATUS, NewStudentAnswer, StudentAnswer,
        },
        exam::{Alternative, Descriptor, Exam, NewAlternative, NewExam, NewQuestion, Question},
        school::{NewStudent, School, SchoolClass, Student},
    },
    store::{SchoolStore, StoreResult},
};

/// In-memory `SchoolStore` mirroring the unique keys of the SQL schema.
#[derive(Default)]
pub struct MemoryStore {
    next_id: i64,
    pub schools: Vec<School>,
    pub classes: Vec<SchoolClass>,
    pub students: Vec<Student>,
    pub descriptors: Vec<Descriptor>,
    pub exams: Vec<Exam>,
    pub questions: Vec<Question>,
    pub alternatives: Vec<Alternative>,
    pub applications: Vec<ExamApplication>,
    pub answers: Vec<StudentAnswer>,
    pub results: Vec<ExamResult>,
    pub achievements: Vec<DescriptorAchievement>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_school(&mut self, name: &str) -> i64 {
        let id = self.id();
        self.schools.push(School {
            id,
            name: name.to_string(),
        });
        id
    }

    pub fn add_class(&mut self, school_id: i64, name: &str, grade: Option<&str>) -> i64 {
        let id = self.id();
        self.classes.push(SchoolClass {
            id,
            school_id,
            class_name: name.to_string(),
            grade: grade.map(str::to_string),
            school_year: 2024,
        });
        id
    }

    pub fn add_student(&mut self, serial: i64, name: &str, class_id: i64) -> i64 {
        let id = self.id();
        self.students.push(Student {
            id,
            student_serial: serial,
            student_name: name.to_string(),
            class_id,
            enrollment_date: None,
            status: "enrolled".to_string(),
        });
        id
    }

    pub fn add_descriptor(&mut self, code: &str) -> i64 {
        let id = self.id();
        self.descriptors.push(Descriptor {
            id,
            descriptor_code: code.to_string(),
            descriptor_name: format!("Descriptor {}", code),
        });
        id
    }

    pub fn add_application(&mut self, exam_id: i64, class_id: i64) -> i64 {
        let id = self.id();
        self.applications.push(ExamApplication {
            id,
            exam_id,
            class_id,
            application_date: test_date(),
            fiscal_year: Some(2024),
            status: "scheduled".to_string(),
        });
        id
    }

    pub fn exam(&self, code: &str) -> &Exam {
        self.exams
            .iter()
            .find(|e| e.exam_code == code)
            .expect("exam exists")
    }

    pub fn questions_of(&self, exam_id: i64) -> Vec<&Question> {
        let mut questions: Vec<&Question> =
            self.questions.iter().filter(|q| q.exam_id == exam_id).collect();
        questions.sort_by_key(|q| q.question_number);
        questions
    }

    pub fn question(&self, exam_id: i64, number: i32) -> &Question {
        self.questions
            .iter()
            .find(|q| q.exam_id == exam_id && q.question_number == number)
            .expect("question exists")
    }

    pub fn alternatives_of(&self, question_id: i64) -> Vec<&Alternative> {
        let mut alternatives: Vec<&Alternative> = self
            .alternatives
            .iter()
            .filter(|a| a.question_id == question_id)
            .collect();
        alternatives.sort_by_key(|a| a.alternative_order);
        alternatives
    }

    pub fn answers_of(&self, student_id: i64, application_id: i64) -> Vec<&StudentAnswer> {
        self.answers
            .iter()
            .filter(|a| a.student_id == student_id && a.application_id == application_id)
            .collect()
    }

    pub fn result_of(&self, student_id: i64, application_id: i64) -> Option<&ExamResult> {
        self.results
            .iter()
            .find(|r| r.student_id == student_id && r.application_id == application_id)
    }
}

pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")
}

/// Normalized rows from a header line and data lines, as if read from a CSV file.
pub fn rows(header: &[&str], data: &[&[&str]]) -> Vec<Row> {
    data.iter()
        .enumerate()
        .map(|(idx, values)| {
            let raw = header
                .iter()
                .zip(values.iter())
                .fold(RawRow::new(idx + 2), |raw, (h, v)| raw.with(h, v));
            Row::from(raw)
        })
        .collect()
}

#[async_trait]
impl SchoolStore for MemoryStore {
    async fn find_school(&mut self, id: i64) -> StoreResult<Option<School>> {
        Ok(self.schools.iter().find(|s| s.id == id).cloned())
    }

    async fn list_classes(&mut self, school_id: Option<i64>) -> StoreResult<Vec<SchoolClass>> {
        let mut classes: Vec<SchoolClass> = self
            .classes
            .iter()
            .filter(|c| school_id.is_none_or(|id| c.school_id == id))
            .cloned()
            .collect();
        classes.sort_by_key(|c| c.id);
        Ok(classes)
    }

    async fn find_class(&mut self, id: i64) -> StoreResult<Option<SchoolClass>> {
        Ok(self.classes.iter().find(|c| c.id == id).cloned())
    }

    async fn find_student(&mut self, id: i64) -> StoreResult<Option<Student>> {
        Ok(self.students.iter().find(|s| s.id == id).cloned())
    }

    async fn find_student_in_class(
        &mut self,
        serial: i64,
        class_id: i64,
    ) -> StoreResult<Option<Student>> {
        Ok(self
            .students
            .iter()
            .find(|s| s.student_serial == serial && s.class_id == class_id)
            .cloned())
    }

    async fn upsert_student(&mut self, student: &NewStudent) -> StoreResult<(Student, bool)> {
        if let Some(existing) = self
            .students
            .iter_mut()
            .find(|s| s.student_serial == student.student_serial)
        {
            existing.student_name = student.student_name.clone();
            existing.class_id = student.class_id;
            existing.enrollment_date = Some(student.enrollment_date);
            existing.status = student.status.to_string();
            return Ok((existing.clone(), false));
        }
        let row = Student {
            id: self.id(),
            student_serial: student.student_serial,
            student_name: student.student_name.clone(),
            class_id: student.class_id,
            enrollment_date: Some(student.enrollment_date),
            status: student.status.to_string(),
        };
        self.students.push(row.clone());
        Ok((row, true))
    }

    async fn find_descriptor_by_code(&mut self, code: &str) -> StoreResult<Option<Descriptor>> {
        Ok(self
            .descriptors
            .iter()
            .find(|d| d.descriptor_code == code)
            .cloned())
    }

    async fn find_exam_by_code(&mut self, code: &str) -> StoreResult<Option<Exam>> {
        Ok(self.exams.iter().find(|e| e.exam_code == code).cloned())
    }

    async fn insert_exam(&mut self, exam: &NewExam) -> StoreResult<Exam> {
        assert!(
            self.exams.iter().all(|e| e.exam_code != exam.exam_code),
            "duplicate exam_code"
        );
        let row = Exam {
            id: self.id(),
            exam_code: exam.exam_code.clone(),
            exam_name: exam.exam_name.clone(),
            subject: exam.subject.clone(),
            school_year: exam.school_year,
            total_questions: Some(exam.total_questions),
        };
        self.exams.push(row.clone());
        Ok(row)
    }

    async fn update_exam(&mut self, id: i64, exam: &NewExam) -> StoreResult<Exam> {
        let row = self
            .exams
            .iter_mut()
            .find(|e| e.id == id)
            .expect("exam to update exists");
        row.exam_name = exam.exam_name.clone();
        row.subject = exam.subject.clone();
        row.school_year = exam.school_year;
        row.total_questions = Some(exam.total_questions);
        Ok(row.clone())
    }

    async fn count_answers_for_exam(&mut self, exam_id: i64) -> StoreResult<i64> {
        let question_ids: Vec<i64> = self
            .questions
            .iter()
            .filter(|q| q.exam_id == exam_id)
            .map(|q| q.id)
            .collect();
        Ok(self
            .answers
            .iter()
            .filter(|a| question_ids.contains(&a.question_id))
            .count() as i64)
    }

    async fn delete_questions(&mut self, exam_id: i64) -> StoreResult<u64> {
        let removed: Vec<i64> = self
            .questions
            .iter()
            .filter(|q| q.exam_id == exam_id)
            .map(|q| q.id)
            .collect();
        self.alternatives
            .retain(|a| !removed.contains(&a.question_id));
        self.questions.retain(|q| q.exam_id != exam_id);
        Ok(removed.len() as u64)
    }

    async fn insert_question(&mut self, question: &NewQuestion) -> StoreResult<Question> {
        assert!(
            self.questions.iter().all(|q| q.exam_id != question.exam_id
                || q.question_number != question.question_number),
            "duplicate (exam_id, question_number)"
        );
        let row = Question {
            id: self.id(),
            exam_id: question.exam_id,
            question_number: question.question_number,
            question_text: question.question_text.clone(),
            correct_answer: Some(question.correct_answer.to_string()),
            difficulty_level: Some(question.difficulty_level.clone()),
            points: question.points,
            descriptor_id: question.descriptor_id,
        };
        self.questions.push(row.clone());
        Ok(row)
    }

    async fn insert_alternative(
        &mut self,
        alternative: &NewAlternative,
    ) -> StoreResult<Alternative> {
        let row = Alternative {
            id: self.id(),
            question_id: alternative.question_id,
            alternative_order: alternative.alternative_order,
            alternative_text: alternative.alternative_text.clone(),
            is_correct: alternative.is_correct,
        };
        self.alternatives.push(row.clone());
        Ok(row)
    }

    async fn list_questions(&mut self, exam_id: i64) -> StoreResult<Vec<Question>> {
        Ok(self.questions_of(exam_id).into_iter().cloned().collect())
    }

    async fn find_question(&mut self, id: i64) -> StoreResult<Option<Question>> {
        Ok(self.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn list_alternatives(&mut self, question_id: i64) -> StoreResult<Vec<Alternative>> {
        Ok(self
            .alternatives_of(question_id)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn find_application(&mut self, id: i64) -> StoreResult<Option<ExamApplication>> {
        Ok(self.applications.iter().find(|a| a.id == id).cloned())
    }

    async fn get_or_create_application(
        &mut self,
        exam_id: i64,
        class_id: i64,
        today: NaiveDate,
    ) -> StoreResult<(ExamApplication, bool)> {
        if let Some(existing) = self
            .applications
            .iter()
            .find(|a| a.exam_id == exam_id && a.class_id == class_id)
        {
            return Ok((existing.clone(), false));
        }
        let row = ExamApplication {
            id: self.id(),
            exam_id,
            class_id,
            application_date: today,
            fiscal_year: Some(today.year()),
            status: IMPORTED_APPLICATION_STATUS.to_string(),
        };
        self.applications.push(row.clone());
        Ok((row, true))
    }

    async fn has_answers(&mut self, student_id: i64, application_id: i64) -> StoreResult<bool> {
        Ok(!self.answers_of(student_id, application_id).is_empty())
    }

    async fn insert_answer(&mut self, answer: &NewStudentAnswer) -> StoreResult<StudentAnswer> {
        assert!(
            self.answers.iter().all(|a| a.student_id != answer.student_id
                || a.application_id != answer.application_id
                || a.question_id != answer.question_id),
            "duplicate (student_id, application_id, question_id)"
        );
        let row = StudentAnswer {
            id: self.id(),
            student_id: answer.student_id,
            application_id: answer.application_id,
            question_id: answer.question_id,
            selected_alternative_id: answer.selected_alternative_id,
            answer_text: answer.answer_text.clone(),
            is_correct: answer.is_correct,
        };
        self.answers.push(row.clone());
        Ok(row)
    }

    async fn graded_answers(
        &mut self,
        student_id: i64,
        application_id: i64,
    ) -> StoreResult<Vec<GradedAnswer>> {
        Ok(self
            .answers_of(student_id, application_id)
            .into_iter()
            .map(|a| {
                let question = self
                    .questions
                    .iter()
                    .find(|q| q.id == a.question_id)
                    .expect("answer references a question");
                GradedAnswer {
                    answer_id: a.id,
                    question_id: a.question_id,
                    is_correct: a.is_correct,
                    selected_alternative_id: a.selected_alternative_id,
                    answer_text: a.answer_text.clone(),
                    points: question.points,
                    descriptor_id: question.descriptor_id,
                }
            })
            .collect())
    }

    async fn upsert_result(
        &mut self,
        student_id: i64,
        application_id: i64,
        summary: &ResultSummary,
    ) -> StoreResult<ExamResult> {
        if let Some(existing) = self
            .results
            .iter_mut()
            .find(|r| r.student_id == student_id && r.application_id == application_id)
        {
            existing.total_score = summary.total_score;
            existing.max_score = summary.max_score;
            existing.correct_answers = summary.correct_answers;
            existing.wrong_answers = summary.wrong_answers;
            existing.blank_answers = summary.blank_answers;
            return Ok(existing.clone());
        }
        let row = ExamResult {
            id: self.id(),
            student_id,
            application_id,
            total_score: summary.total_score,
            max_score: summary.max_score,
            correct_answers: summary.correct_answers,
            wrong_answers: summary.wrong_answers,
            blank_answers: summary.blank_answers,
        };
        self.results.push(row.clone());
        Ok(row)
    }

    async fn get_or_create_achievement(
        &mut self,
        student_id: i64,
        descriptor_id: i64,
        application_id: i64,
    ) -> StoreResult<(DescriptorAchievement, bool)> {
        if let Some(existing) = self
            .achievements
            .iter()
            .find(|a| a.student_id == student_id && a.descriptor_id == descriptor_id)
        {
            return Ok((existing.clone(), false));
        }
        let row = DescriptorAchievement {
            id: self.id(),
            student_id,
            descriptor_id,
            application_id: Some(application_id),
        };
        self.achievements.push(row.clone());
        Ok((row, true))
    }
}

pub fn points(value: &str) -> Decimal {
    value.parse().expect("valid decimal")
}
