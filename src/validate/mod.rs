//! Structural validation of untrusted import documents.
//!
//! [`validate`] walks a parsed JSON value and collects every structural
//! problem it finds rather than stopping at the first one, so the user sees
//! the complete list. It never fails: a malformed shape is reported, not
//! raised.
//!
//! [`parse_document`] is the typed entry point used by import. It validates,
//! then decodes into the strict [`ExportDocument`] schema, yielding either a
//! trusted document or an [`ImportError`] describing why not.

use crate::dates::DateKey;
use crate::errors::ImportError;
use crate::model::ExportDocument;
use serde_json::{Map, Value};

/// Outcome of a structural check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// True iff `errors` is empty
    pub valid: bool,
    /// Every violation found, in document order
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        ValidationReport {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Checks that `candidate` has the shape of an export document.
///
/// # Examples
///
/// ```
/// use daylog::validate::validate;
/// use serde_json::json;
///
/// let report = validate(&json!({
///     "version": "1.0.0",
///     "exportDate": "2024-01-01T00:00:00Z",
///     "todos": {},
///     "journal": {}
/// }));
/// assert!(report.valid);
///
/// let report = validate(&json!(null));
/// assert_eq!(report.errors, vec!["No data provided"]);
/// ```
pub fn validate(candidate: &Value) -> ValidationReport {
    if candidate.is_null() {
        return ValidationReport::from_errors(vec!["No data provided".to_string()]);
    }

    let mut errors = Vec::new();

    check_header(candidate.get("version"), "version field", &mut errors);
    check_header(candidate.get("exportDate"), "export date", &mut errors);

    if let Some(todos) = present(candidate.get("todos")) {
        check_buckets(todos, "todos", is_valid_todo, "todo", &mut errors);
    }
    if let Some(journal) = present(candidate.get("journal")) {
        check_buckets(
            journal,
            "journal",
            is_valid_journal_entry,
            "journal entry",
            &mut errors,
        );
    }

    ValidationReport::from_errors(errors)
}

/// Validates `candidate` and decodes it into a trusted document.
///
/// # Errors
///
/// - `ImportError::Validation` with every violation if the structure is wrong
/// - `ImportError::Decode` if a structurally valid document still does not fit
///   the schema, such as a timestamp that is not RFC 3339
pub fn parse_document(candidate: Value) -> Result<ExportDocument, ImportError> {
    let report = validate(&candidate);
    if !report.valid {
        return Err(ImportError::Validation(report.errors));
    }
    serde_json::from_value(candidate).map_err(ImportError::Decode)
}

fn check_buckets(
    collection: &Value,
    name: &str,
    item_is_valid: fn(&Map<String, Value>) -> bool,
    item_label: &str,
    errors: &mut Vec<String>,
) {
    let Some(buckets) = collection.as_object() else {
        errors.push(format!(
            "Invalid {} structure: expected an object keyed by date",
            name
        ));
        return;
    };

    for (date, items) in buckets {
        if date.parse::<DateKey>().is_err() {
            errors.push(format!("Invalid date key {} in {}", date, name));
            continue;
        }

        let Some(items) = items.as_array() else {
            errors.push(format!("Invalid {} structure for date {}", name, date));
            continue;
        };

        for item in items {
            let ok = item.as_object().map(item_is_valid).unwrap_or(false);
            if !ok {
                errors.push(format!("Invalid {} structure in date {}", item_label, date));
            }
        }
    }
}

fn is_valid_todo(item: &Map<String, Value>) -> bool {
    is_non_empty_str(item.get("id"))
        && is_non_empty_str(item.get("text"))
        && item.get("completed").map(Value::is_boolean).unwrap_or(false)
}

/// Header fields must be non-empty strings; a value of another type is
/// reported as invalid rather than missing.
fn check_header(value: Option<&Value>, label: &str, errors: &mut Vec<String>) {
    if is_non_empty_str(value) {
        return;
    }
    match present(value) {
        None => errors.push(format!("Missing {}", label)),
        Some(_) => errors.push(format!("Invalid {}", label)),
    }
}

fn is_valid_journal_entry(item: &Map<String, Value>) -> bool {
    is_non_empty_str(item.get("id"))
        && is_non_empty_str(item.get("text"))
        && present(item.get("createdAt")).is_some()
}

fn is_non_empty_str(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if !s.is_empty())
}

/// A field counts as present unless it is missing, `null` or an empty string.
fn present(value: Option<&Value>) -> Option<&Value> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(v) => Some(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header() -> Value {
        json!({
            "version": "1.0.0",
            "exportDate": "2024-01-01T00:00:00Z",
        })
    }

    fn with(mut doc: Value, field: &str, value: Value) -> Value {
        doc[field] = value;
        doc
    }

    #[test]
    fn test_null_short_circuits() {
        let report = validate(&Value::Null);
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["No data provided".to_string()]);
    }

    #[test]
    fn test_minimal_document_is_valid() {
        let doc = json!({
            "version": "1.0.0",
            "exportDate": "2024-01-01T00:00:00Z",
            "todos": {},
            "journal": {}
        });
        let report = validate(&doc);
        assert!(report.valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_collections_are_optional() {
        assert!(validate(&header()).valid);
        assert!(validate(&with(header(), "todos", Value::Null)).valid);
    }

    #[test]
    fn test_missing_header_fields_are_all_reported() {
        let report = validate(&json!({}));
        assert!(!report.valid);
        assert_eq!(
            report.errors,
            vec![
                "Missing version field".to_string(),
                "Missing export date".to_string()
            ]
        );

        let report = validate(&json!({ "version": "", "exportDate": null }));
        assert_eq!(
            report.errors,
            vec![
                "Missing version field".to_string(),
                "Missing export date".to_string()
            ]
        );
    }

    #[test]
    fn test_wrongly_typed_header_fields_are_invalid_not_missing() {
        let report = validate(&json!({ "version": 1, "exportDate": 5 }));
        assert!(!report.valid);
        assert_eq!(
            report.errors,
            vec![
                "Invalid version field".to_string(),
                "Invalid export date".to_string()
            ]
        );

        let report = validate(&json!({ "version": "1.0.0", "exportDate": ["2024-01-01"] }));
        assert_eq!(report.errors, vec!["Invalid export date".to_string()]);
    }

    #[test]
    fn test_non_object_candidate() {
        let report = validate(&json!([1, 2, 3]));
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn test_todo_without_completed_flag_names_its_date() {
        let doc = with(
            header(),
            "todos",
            json!({ "2024-01-01": [ { "id": "1", "text": "x" } ] }),
        );
        let report = validate(&doc);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("2024-01-01"));
        assert!(report.errors[0].contains("todo"));
    }

    #[test]
    fn test_completed_must_be_strictly_boolean() {
        let doc = with(
            header(),
            "todos",
            json!({ "2024-01-01": [ { "id": "1", "text": "x", "completed": "false" } ] }),
        );
        assert!(!validate(&doc).valid);
    }

    #[test]
    fn test_one_error_per_malformed_item() {
        let doc = with(
            header(),
            "todos",
            json!({
                "2024-01-01": [
                    { "id": "", "text": "x", "completed": false },
                    { "id": "2", "text": "", "completed": false },
                    { "id": "3", "text": "ok", "completed": true },
                    "not an object"
                ],
                "2024-01-02": "not a list"
            }),
        );
        let report = validate(&doc);
        assert_eq!(
            report.errors,
            vec![
                "Invalid todo structure in date 2024-01-01".to_string(),
                "Invalid todo structure in date 2024-01-01".to_string(),
                "Invalid todo structure in date 2024-01-01".to_string(),
                "Invalid todos structure for date 2024-01-02".to_string(),
            ]
        );
    }

    #[test]
    fn test_journal_rules() {
        let doc = with(
            header(),
            "journal",
            json!({
                "2024-01-01": [
                    { "id": "j1", "text": "fine", "createdAt": "2024-01-01T08:00:00Z" },
                    { "id": "j2", "text": "no timestamp" },
                    { "id": "j3", "text": "type unchecked", "createdAt": 12345 }
                ],
                "2024-01-02": {}
            }),
        );
        let report = validate(&doc);
        assert_eq!(
            report.errors,
            vec![
                "Invalid journal entry structure in date 2024-01-01".to_string(),
                "Invalid journal structure for date 2024-01-02".to_string(),
            ]
        );
    }

    #[test]
    fn test_malformed_date_keys_are_rejected() {
        let doc = with(header(), "journal", json!({ "Jan 1": [] }));
        let report = validate(&doc);
        assert_eq!(
            report.errors,
            vec!["Invalid date key Jan 1 in journal".to_string()]
        );
    }

    #[test]
    fn test_collection_must_be_an_object() {
        let doc = with(header(), "todos", json!([]));
        let report = validate(&doc);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("expected an object keyed by date"));
    }

    #[test]
    fn test_errors_accumulate_across_sections() {
        let doc = json!({
            "todos": { "2024-01-01": [ {} ] },
            "journal": { "2024-01-01": [ {} ] }
        });
        assert_eq!(validate(&doc).errors.len(), 4);
    }

    #[test]
    fn test_parse_document_success() {
        let doc = with(
            header(),
            "todos",
            json!({ "2024-01-01": [
                { "id": "1", "text": "x", "completed": false, "createdAt": "2024-01-01T08:00:00.000Z" }
            ] }),
        );
        let parsed = parse_document(doc).unwrap();
        assert_eq!(parsed.version, "1.0.0");
        assert_eq!(parsed.todos.len(), 1);
        assert!(parsed.journal.is_empty());
    }

    #[test]
    fn test_parse_document_validation_failure() {
        match parse_document(json!({})) {
            Err(ImportError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_document_bad_timestamp_is_decode_error() {
        let doc = with(
            header(),
            "journal",
            json!({ "2024-01-01": [ { "id": "j", "text": "t", "createdAt": 12345 } ] }),
        );
        assert!(matches!(parse_document(doc), Err(ImportError::Decode(_))));
    }
}
