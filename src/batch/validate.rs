//! Per-record validation against the batch schema.

use std::fmt;

use serde::Serialize;

use super::record::{BatchRecord, OperationKind, RESERVED_COLUMNS};

/// One problem with one field of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Outcome of validating one record; no errors means valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub line: usize,
    pub errors: Vec<FieldError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// All errors on one line, for tables and failed-record files.
    pub fn message(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Required fields for create and update records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSchema {
    /// Accepted names for the container id, canonical name first.
    pub container_keys: &'static [&'static str],
    /// Accepted names for the title, canonical name first.
    pub title_keys: &'static [&'static str],
    /// Name of the record id used by updates.
    pub id_key: &'static str,
}

impl Default for BatchSchema {
    fn default() -> Self {
        Self {
            container_keys: &["project", "project_id", "container"],
            title_keys: &["title", "summary"],
            id_key: "id",
        }
    }
}

impl BatchSchema {
    /// The container id a create record targets.
    pub fn container<'r>(&self, record: &'r BatchRecord) -> Option<&'r str> {
        record.first_of(self.container_keys)
    }

    pub fn is_container_key(&self, key: &str) -> bool {
        self.container_keys.contains(&key)
    }

    /// Canonical title key when `key` is one of its aliases.
    pub fn canonical_key<'k>(&self, key: &'k str) -> &'k str {
        if self.title_keys.contains(&key) {
            self.title_keys[0]
        } else {
            key
        }
    }

    /// Check a record without touching the network.
    pub fn validate(&self, record: &BatchRecord) -> ValidationResult {
        let mut errors = Vec::new();

        match record.operation {
            OperationKind::Create => {
                if self.container(record).is_none() {
                    errors.push(FieldError::new(
                        self.container_keys[0],
                        format!(
                            "required (also accepted: {})",
                            self.container_keys[1..].join(", ")
                        ),
                    ));
                }
                if record.first_of(self.title_keys).is_none() {
                    errors.push(FieldError::new(
                        self.title_keys[0],
                        format!("required (also accepted: {})", self.title_keys[1..].join(", ")),
                    ));
                }
            }
            OperationKind::Update => {
                if record.get(self.id_key).is_none() {
                    errors.push(FieldError::new(self.id_key, "required"));
                }
                let has_change = record
                    .non_empty_fields()
                    .any(|(key, _)| key != self.id_key && !RESERVED_COLUMNS.contains(&key));
                if !has_change {
                    errors.push(FieldError::new(
                        "fields",
                        format!("update needs at least one field besides {}", self.id_key),
                    ));
                }
            }
        }

        ValidationResult {
            line: record.line,
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(fields: &[(&str, &str)]) -> BatchRecord {
        BatchRecord::new(2, OperationKind::Create, fields.iter().copied())
    }

    fn update(fields: &[(&str, &str)]) -> BatchRecord {
        BatchRecord::new(2, OperationKind::Update, fields.iter().copied())
    }

    #[test]
    fn test_valid_create() {
        let schema = BatchSchema::default();
        let result = schema.validate(&create(&[("project", "CORE"), ("title", "Crash")]));
        assert!(result.is_valid());
        assert_eq!(result.line, 2);
    }

    #[test]
    fn test_create_aliases_accepted() {
        let schema = BatchSchema::default();
        let record = create(&[("project_id", "CORE"), ("summary", "Crash")]);
        assert!(schema.validate(&record).is_valid());
        assert_eq!(schema.container(&record), Some("CORE"));

        let record = create(&[("container", "WEB"), ("title", "x")]);
        assert_eq!(schema.container(&record), Some("WEB"));
    }

    #[test]
    fn test_create_missing_container_and_title() {
        let schema = BatchSchema::default();
        let result = schema.validate(&create(&[("project", "  "), ("priority", "high")]));

        assert!(!result.is_valid());
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["project", "title"]);
        assert!(result.message().contains("project: required"));
    }

    #[test]
    fn test_update_requires_id_and_a_change() {
        let schema = BatchSchema::default();

        assert!(schema
            .validate(&update(&[("id", "ISS-1"), ("status", "closed")]))
            .is_valid());

        let missing_id = schema.validate(&update(&[("status", "closed")]));
        assert_eq!(missing_id.errors, vec![FieldError::new("id", "required")]);

        let nothing_to_apply = schema.validate(&update(&[("id", "ISS-1"), ("status", "")]));
        assert_eq!(nothing_to_apply.errors.len(), 1);
        assert_eq!(nothing_to_apply.errors[0].field, "fields");
    }

    #[test]
    fn test_canonical_title_key() {
        let schema = BatchSchema::default();
        assert_eq!(schema.canonical_key("summary"), "title");
        assert_eq!(schema.canonical_key("priority"), "priority");
    }
}
