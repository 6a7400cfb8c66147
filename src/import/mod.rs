// src/import/mod.rs

//! Tabular imports: answer keys, student responses and class rosters.
//!
//! Every import runs the same stages. The uploaded file is decoded into raw rows,
//! headers are normalized, then each row is validated on its own. A row that fails
//! validation is recorded as a `Row N: ...` message and skipped; it never aborts
//! the import. Only store errors abort, and they roll the whole import back.

pub mod answer_key;
pub mod class_resolver;
pub mod columns;
pub mod decoder;
pub mod normalize;
pub mod responses;
pub mod roster;

pub use answer_key::{AnswerKeyReport, import_answer_key};
pub use decoder::{FileError, decode_file};
pub use normalize::{Row, normalize_rows};
pub use responses::{ResponseImportReport, import_student_answers};
pub use roster::{RosterReport, import_roster};

/// Decodes an upload and normalizes its headers.
pub fn read_upload(filename: &str, bytes: &[u8]) -> Result<Vec<Row>, FileError> {
    let rows = decode_file(filename, bytes)?;
    Ok(normalize_rows(rows))
}

pub(crate) fn row_error(line: usize, message: impl std::fmt::Display) -> String {
    format!("Row {}: {}", line, message)
}

/// Rejects values wider than their `VARCHAR(max)` column.
pub(crate) fn check_length(field: &str, value: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!("{} is longer than {} characters", field, max));
    }
    Ok(())
}

/// Integer cell value. Spreadsheet cells may carry a `.0` suffix.
pub(crate) fn parse_integer(value: &str) -> Option<i64> {
    let value = value.trim();
    let digits = value.strip_suffix(".0").unwrap_or(value);
    digits.parse().ok()
}

/// `None` for an empty list so the field serializes as `null`.
pub(crate) fn errors_or_null(errors: Vec<String>) -> Option<Vec<String>> {
    if errors.is_empty() { None } else { Some(errors) }
}
