// src/import/roster.rs

//! Class roster import: students upserted by serial number.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    error::AppError,
    models::school::{ClassHint, NewStudent, STUDENT_NAME_MAX_LEN},
    store::{SchoolStore, StoreResult},
};

use super::{
    check_length,
    class_resolver::resolve_class,
    errors_or_null,
    normalize::{Row, StatusValue, field, normalize_status},
    parse_integer, row_error,
};

#[derive(Debug, Serialize)]
pub struct RosterReport {
    pub success: bool,
    pub message: String,
    pub created: usize,
    pub updated: usize,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_classes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_classes: Option<Vec<ClassHint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Imports a roster. With `school_id`, classes are only looked up in that school,
/// which must exist.
pub async fn import_roster<S: SchoolStore + ?Sized>(
    store: &mut S,
    rows: Vec<Row>,
    school_id: Option<i64>,
    today: NaiveDate,
) -> StoreResult<RosterReport> {
    if let Some(id) = school_id
        && store.find_school(id).await?.is_none()
    {
        return Err(AppError::BadRequest(format!("School with ID {} not found", id)));
    }

    tracing::info!(
        "Importing roster with {} rows (school filter: {:?})",
        rows.len(),
        school_id
    );

    let classes = store.list_classes(school_id).await?;
    let scoped = school_id.is_some();

    let mut created = 0;
    let mut updated = 0;
    let mut errors = Vec::new();
    let mut missing_classes = BTreeSet::new();

    for row in &rows {
        let line = row.line;
        let Some(name) = row.text(field::STUDENT_NAME) else {
            errors.push(row_error(line, "Student name is required"));
            continue;
        };
        let Some(raw_serial) = row.text(field::STUDENT_SERIAL) else {
            errors.push(row_error(line, "Serial number is required"));
            continue;
        };
        let Some(class_value) = row.text(field::CLASS) else {
            errors.push(row_error(line, "Class is required"));
            continue;
        };
        let Some(serial) = parse_integer(raw_serial) else {
            errors.push(row_error(line, "Serial number must be a number"));
            continue;
        };
        if let Err(msg) = check_length("Student name", name, STUDENT_NAME_MAX_LEN) {
            errors.push(row_error(line, msg));
            continue;
        }

        let class = match resolve_class(&classes, class_value, scoped) {
            Ok(class) => class,
            Err(e) => {
                errors.push(format!("Row {} ({}): {}", line, name, e));
                missing_classes.insert(class_value.to_string());
                continue;
            }
        };

        let enrollment_date = match row.text(field::ENROLLMENT_DATE) {
            Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => date,
                Err(_) => {
                    errors.push(row_error(line, "Invalid enrollment date (use YYYY-MM-DD)"));
                    continue;
                }
            },
            None => today,
        };

        let status = match normalize_status(row.text(field::STATUS).unwrap_or("")) {
            StatusValue::Known(status) => status,
            StatusValue::Unknown(token) => {
                errors.push(row_error(line, format!("Unknown status '{}'", token)));
                continue;
            }
        };

        let (student, was_created) = store
            .upsert_student(&NewStudent {
                student_serial: serial,
                student_name: name.to_string(),
                class_id: class.id,
                enrollment_date,
                status,
            })
            .await?;
        tracing::debug!(
            "Roster row {}: student {} {}",
            line,
            student.student_serial,
            if was_created { "created" } else { "updated" }
        );
        if was_created {
            created += 1;
        } else {
            updated += 1;
        }
    }

    tracing::info!(
        "Roster import finished: {} created, {} updated, {} errors",
        created,
        updated,
        errors.len()
    );

    let mut report = RosterReport {
        success: true,
        message: format!("{} students created, {} students updated", created, updated),
        created,
        updated,
        errors: errors_or_null(errors),
        missing_classes: None,
        available_classes: None,
        suggestion: None,
    };

    if !missing_classes.is_empty() {
        let scope = if scoped { " in the selected school" } else { "" };
        report.missing_classes = Some(missing_classes.into_iter().collect());
        report.available_classes = Some(classes.iter().map(ClassHint::from).collect());
        report.suggestion = Some(format!(
            "Some classes were not found{}. Check that the classes exist before importing students.",
            scope
        ));
    }

    Ok(report)
}
