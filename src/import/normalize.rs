// src/import/normalize.rs

//! Header and value normalization for human-edited upload files.
//!
//! Lookups are exact after trimming and lowercasing. Unknown headers pass
//! through in that trimmed, lowercased form and are ignored by the row parsers.

use std::collections::HashMap;

use crate::models::school::StudentStatus;

use super::decoder::RawRow;

/// Canonical field names shared by all imports.
pub mod field {
    pub const EXAM_CODE: &str = "exam_code";
    pub const EXAM_NAME: &str = "exam_name";
    pub const SUBJECT: &str = "subject";
    pub const GRADE: &str = "grade";
    pub const QUESTION_NUMBER: &str = "question_number";
    pub const CORRECT_ANSWER: &str = "correct_answer";
    pub const DESCRIPTOR_CODE: &str = "descriptor_code";
    pub const POINTS: &str = "points";
    pub const DIFFICULTY: &str = "difficulty";
    pub const QUESTION_TEXT: &str = "question_text";

    pub const CLASS_ID: &str = "class_id";
    pub const STUDENT_SERIAL: &str = "student_serial";

    pub const STUDENT_NAME: &str = "student_name";
    pub const CLASS: &str = "class";
    pub const ENROLLMENT_DATE: &str = "enrollment_date";
    pub const STATUS: &str = "status";
}

/// Maps a header to its canonical field name, if it is a known synonym.
pub fn canonical_header(header: &str) -> Option<&'static str> {
    let canonical = match header {
        "exam_code" | "codigo_prova" | "código_prova" | "codigo da prova" | "código da prova" => {
            field::EXAM_CODE
        }
        "exam_name" | "nome_prova" | "nome da prova" => field::EXAM_NAME,
        "subject" | "disciplina" => field::SUBJECT,
        "grade" | "ano_escolar" | "ano escolar" | "serie" | "série" => field::GRADE,
        "question_number" | "numero_questao" | "número_questão" | "numero_questão" => {
            field::QUESTION_NUMBER
        }
        "correct_answer" | "resposta_correta" | "resposta correta" | "gabarito" => {
            field::CORRECT_ANSWER
        }
        "descriptor_code" | "codigo_descritor" | "código_descritor" | "descritor" => {
            field::DESCRIPTOR_CODE
        }
        "points" | "pontos" | "pontuacao" | "pontuação" => field::POINTS,
        "difficulty" | "dificuldade" => field::DIFFICULTY,
        "question_text" | "enunciado" => field::QUESTION_TEXT,

        "class_id" | "id_turma" => field::CLASS_ID,
        "student_serial" | "matricula_aluno" | "matrícula_aluno" | "matrícula" | "matricula" => {
            field::STUDENT_SERIAL
        }

        "student_name" | "nome do aluno" | "nome" | "aluno" => field::STUDENT_NAME,
        "class" | "id_class" | "turma" | "classe" => field::CLASS,
        "enrollment_date" | "data de matrícula" | "data de matricula" | "data" => {
            field::ENROLLMENT_DATE
        }
        "status" | "situação" | "situacao" => field::STATUS,
        _ => return None,
    };
    Some(canonical)
}

/// Trimmed, lowercased header with synonyms replaced by their canonical name.
pub fn normalize_header(header: &str) -> String {
    let key = header.trim().to_lowercase();
    match canonical_header(&key) {
        Some(canonical) => canonical.to_string(),
        None => key,
    }
}

/// Outcome of mapping a status cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusValue {
    Known(StudentStatus),
    Unknown(String),
}

/// Maps Portuguese or English status words; an empty cell means `enrolled`.
pub fn normalize_status(raw: &str) -> StatusValue {
    let token = raw.trim().to_lowercase();
    if token.is_empty() {
        return StatusValue::Known(StudentStatus::default());
    }
    let status = match token.as_str() {
        "matriculado" | "matriculada" => Some(StudentStatus::Enrolled),
        "transferido" | "transferida" => Some(StudentStatus::Transferred),
        "formado" | "formada" => Some(StudentStatus::Graduated),
        "desistente" => Some(StudentStatus::Dropped),
        "ativo" | "ativa" => Some(StudentStatus::Active),
        "inativo" | "inativa" => Some(StudentStatus::Inactive),
        other => StudentStatus::from_token(other),
    };
    match status {
        Some(status) => StatusValue::Known(status),
        None => StatusValue::Unknown(token),
    }
}

/// Lowercased difficulty with Portuguese words mapped; defaults to `medium`.
pub fn normalize_difficulty(raw: &str) -> String {
    let token = raw.trim().to_lowercase();
    match token.as_str() {
        "" => "medium".to_string(),
        "fácil" | "facil" => "easy".to_string(),
        "médio" | "medio" | "média" | "media" => "medium".to_string(),
        "difícil" | "dificil" => "hard".to_string(),
        _ => token,
    }
}

/// A decoded row whose headers have been normalized.
#[derive(Debug, Clone, Default)]
pub struct Row {
    pub line: usize,
    pub cells: HashMap<String, String>,
}

impl Row {
    /// Trimmed cell value, `None` when absent or blank.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.cells
            .get(field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// When two columns normalize to the same field, the leftmost one is kept.
impl From<RawRow> for Row {
    fn from(raw: RawRow) -> Self {
        let mut cells = HashMap::new();
        for (header, value) in raw.cells {
            let key = normalize_header(&header);
            if key.is_empty() {
                continue;
            }
            if cells.contains_key(&key) {
                tracing::debug!(
                    "Row {}: column '{}' repeats field '{}', keeping the first one",
                    raw.line,
                    header,
                    key
                );
                continue;
            }
            cells.insert(key, value);
        }
        Row {
            line: raw.line,
            cells,
        }
    }
}

pub fn normalize_rows(rows: Vec<RawRow>) -> Vec<Row> {
    rows.into_iter().map(Row::from).collect()
}
