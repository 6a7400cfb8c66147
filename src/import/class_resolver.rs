// src/import/class_resolver.rs

//! Resolves a free-form class reference ("12", "5º Ano A", "ano a") to one class.
//!
//! Tiers run in order and a later tier is only tried when the earlier ones
//! found nothing: numeric id, exact name, unique name fragment, grade numeral.
//! Matching is case-insensitive. Candidates keep the order of the slice, which
//! the store returns sorted by id.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::school::SchoolClass;

/// Candidate names listed in an ambiguity message.
const MAX_LISTED_CANDIDATES: usize = 3;

static GRADE_NUMERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)[º°]?\s*(?:ano)?").expect("valid grade regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassLookupError {
    Blank,
    Ambiguous {
        value: String,
        candidates: Vec<String>,
    },
    NotFound {
        value: String,
        school_scoped: bool,
    },
}

impl fmt::Display for ClassLookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLookupError::Blank => write!(f, "Class value not provided"),
            ClassLookupError::Ambiguous { value, candidates } => write!(
                f,
                "Multiple classes found for '{}': {}",
                value,
                candidates.join(", ")
            ),
            ClassLookupError::NotFound {
                value,
                school_scoped,
            } => {
                let scope = if *school_scoped {
                    " in the selected school"
                } else {
                    ""
                };
                write!(f, "Class '{}' not found{}", value, scope)
            }
        }
    }
}

/// Picks exactly one class from `classes`, which are already scoped to a school when
/// `school_scoped` is set.
pub fn resolve_class<'a>(
    classes: &'a [SchoolClass],
    raw: &str,
    school_scoped: bool,
) -> Result<&'a SchoolClass, ClassLookupError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ClassLookupError::Blank);
    }
    let needle = value.to_lowercase();

    if let Ok(id) = value.parse::<i64>()
        && let Some(class) = classes.iter().find(|c| c.id == id)
    {
        return Ok(class);
    }

    let exact: Vec<&SchoolClass> = classes
        .iter()
        .filter(|c| c.class_name.to_lowercase() == needle)
        .collect();
    if let Some(found) = single(value, exact)? {
        return Ok(found);
    }

    let partial: Vec<&SchoolClass> = classes
        .iter()
        .filter(|c| name_contains(c, &needle))
        .collect();
    if let Some(found) = single(value, partial)? {
        return Ok(found);
    }

    if let Some(caps) = GRADE_NUMERAL.captures(&needle) {
        let numeral = &caps[1];
        let ordinal = format!("{}º", numeral);
        let degree = format!("{}°", numeral);
        let by_grade: Vec<&SchoolClass> = classes
            .iter()
            .filter(|c| {
                let grade = c.grade.as_deref().unwrap_or("").to_lowercase();
                grade.contains(&ordinal) || grade.contains(&degree) || name_contains(c, &needle)
            })
            .collect();
        if let Some(found) = single(value, by_grade)? {
            return Ok(found);
        }
    }

    Err(ClassLookupError::NotFound {
        value: value.to_string(),
        school_scoped,
    })
}

fn name_contains(class: &SchoolClass, needle: &str) -> bool {
    class.class_name.to_lowercase().contains(needle)
}

/// `Ok(None)` for no match, the class for one, an ambiguity error for more.
fn single<'a>(
    value: &str,
    matches: Vec<&'a SchoolClass>,
) -> Result<Option<&'a SchoolClass>, ClassLookupError> {
    match matches.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(only)),
        many => Err(ClassLookupError::Ambiguous {
            value: value.to_string(),
            candidates: many
                .iter()
                .take(MAX_LISTED_CANDIDATES)
                .map(|c| c.class_name.clone())
                .collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(id: i64, name: &str, grade: Option<&str>) -> SchoolClass {
        SchoolClass {
            id,
            school_id: 1,
            class_name: name.to_string(),
            grade: grade.map(str::to_string),
            school_year: 2024,
        }
    }

    fn fixture() -> Vec<SchoolClass> {
        vec![
            class(1, "5º Ano A", Some("5º Ano")),
            class(2, "5º Ano A Integral", Some("5º Ano")),
            class(3, "6º Ano B", Some("6º Ano")),
            class(4, "Turma Azul", Some("7° ano")),
        ]
    }

    #[test]
    fn test_numeric_id_wins() {
        let classes = fixture();
        assert_eq!(resolve_class(&classes, " 3 ", false).unwrap().id, 3);
    }

    #[test]
    fn test_unknown_numeric_id_falls_through_to_names() {
        let classes = vec![class(10, "Turma 99", None)];
        assert_eq!(resolve_class(&classes, "99", false).unwrap().id, 10);
    }

    #[test]
    fn test_exact_name_beats_substring() {
        let classes = fixture();
        // "5º ano a" is also a substring of "5º Ano A Integral"
        assert_eq!(resolve_class(&classes, "5º ano a", false).unwrap().id, 1);
    }

    #[test]
    fn test_unique_substring_resolves() {
        let classes = fixture();
        assert_eq!(resolve_class(&classes, "integral", false).unwrap().id, 2);
    }

    #[test]
    fn test_two_substring_matches_are_ambiguous() {
        let classes = fixture();
        let err = resolve_class(&classes, "5º ano", false).unwrap_err();
        assert_eq!(
            err,
            ClassLookupError::Ambiguous {
                value: "5º ano".to_string(),
                candidates: vec!["5º Ano A".to_string(), "5º Ano A Integral".to_string()],
            }
        );
        assert!(err.to_string().contains("5º Ano A, 5º Ano A Integral"));
    }

    #[test]
    fn test_ambiguity_lists_at_most_three_names() {
        let classes: Vec<SchoolClass> = (1..=5)
            .map(|i| class(i, &format!("Sala {}", i), None))
            .collect();
        match resolve_class(&classes, "sala", false).unwrap_err() {
            ClassLookupError::Ambiguous { candidates, .. } => {
                assert_eq!(candidates, vec!["Sala 1", "Sala 2", "Sala 3"]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_grade_numeral_matches_grade_label() {
        let classes = fixture();
        // Only "Turma Azul" has a 7th grade label, written with a degree sign.
        assert_eq!(resolve_class(&classes, "7 ano", false).unwrap().id, 4);
        assert_eq!(resolve_class(&classes, "6º", false).unwrap().id, 3);
    }

    #[test]
    fn test_not_found_mentions_school_scope() {
        let classes = fixture();
        let err = resolve_class(&classes, "9º Ano", true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Class '9º Ano' not found in the selected school"
        );
        assert_eq!(
            resolve_class(&[], "x", false).unwrap_err().to_string(),
            "Class 'x' not found"
        );
    }

    #[test]
    fn test_blank_value() {
        assert_eq!(
            resolve_class(&fixture(), "  ", false).unwrap_err(),
            ClassLookupError::Blank
        );
    }
}
