// src/import/columns.rs

//! Wide-format answer columns: one `q<N>` column per question.

use std::collections::BTreeMap;

use crate::models::exam::AnswerLetter;

use super::normalize::Row;

/// Answer cells of one row, keyed by question number.
#[derive(Debug, Default, PartialEq)]
pub struct AnswerColumns {
    /// `None` marks a blank cell.
    pub answers: BTreeMap<i32, Option<AnswerLetter>>,

    /// Cells holding something other than A-E or blank.
    pub errors: Vec<String>,
}

/// Question number of a `q<N>` header, case-insensitive. `N` must be positive.
pub fn question_number(header: &str) -> Option<i32> {
    let digits = header
        .strip_prefix('q')
        .or_else(|| header.strip_prefix('Q'))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i32>().ok().filter(|n| *n > 0)
}

/// Collects every question column of a row.
pub fn answer_columns(row: &Row) -> AnswerColumns {
    let mut columns = AnswerColumns::default();

    for (header, value) in &row.cells {
        let Some(number) = question_number(header.trim()) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            columns.answers.insert(number, None);
            continue;
        }
        match AnswerLetter::parse(value) {
            Some(letter) => {
                columns.answers.insert(number, Some(letter));
            }
            None => columns.errors.push(format!(
                "Invalid answer '{}' for question {}. Use A, B, C, D or E",
                value, number
            )),
        }
    }
    columns.errors.sort();
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::decoder::RawRow;

    fn row(cells: &[(&str, &str)]) -> Row {
        let raw = cells
            .iter()
            .fold(RawRow::new(2), |raw, (h, v)| raw.with(h, v));
        Row::from(raw)
    }

    #[test]
    fn test_question_header_detection() {
        assert_eq!(question_number("q1"), Some(1));
        assert_eq!(question_number("Q12"), Some(12));
        assert_eq!(question_number("q"), None);
        assert_eq!(question_number("q0"), None);
        assert_eq!(question_number("q1a"), None);
        assert_eq!(question_number("question_number"), None);
    }

    #[test]
    fn test_answers_are_ordered_by_question_number() {
        let cols = answer_columns(&row(&[
            ("exam_code", "MAT5"),
            ("q10", "c"),
            ("q2", "A"),
            ("q1", " "),
        ]));
        let numbers: Vec<i32> = cols.answers.keys().copied().collect();
        assert_eq!(numbers, vec![1, 2, 10]);
        assert_eq!(cols.answers[&1], None);
        assert_eq!(cols.answers[&10], Some(AnswerLetter::C));
        assert!(cols.errors.is_empty());
    }

    #[test]
    fn test_invalid_cell_only_affects_that_question() {
        let cols = answer_columns(&row(&[("q1", "B"), ("q2", "X")]));
        assert_eq!(cols.answers.len(), 1);
        assert_eq!(cols.answers[&1], Some(AnswerLetter::B));
        assert_eq!(cols.errors.len(), 1);
        assert!(cols.errors[0].contains("question 2"));
    }
}
