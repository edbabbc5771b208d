//! Where batch mutations are sent and what they carry.

use serde_json::{Map, Value};

use super::record::BatchRecord;
use super::validate::BatchSchema;

/// Collections a batch mutates.
///
/// Creates go to `<container_collection>/<container>/<collection>`, updates
/// and deletes to `<collection>/<id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationTarget {
    pub collection: String,
    pub container_collection: String,
}

impl Default for MutationTarget {
    fn default() -> Self {
        Self::new("issues", "projects")
    }
}

impl MutationTarget {
    pub fn new(collection: impl Into<String>, container_collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into().trim_matches('/').to_string(),
            container_collection: container_collection.into().trim_matches('/').to_string(),
        }
    }

    pub fn create_path(&self, container: &str) -> String {
        format!(
            "{}/{}/{}",
            self.container_collection,
            urlencoding::encode(container),
            self.collection
        )
    }

    /// Path of an existing resource (update and delete).
    pub fn item_path(&self, id: &str) -> String {
        format!("{}/{}", self.collection, urlencoding::encode(id))
    }

    /// Body for a create: every non-blank field except the container id,
    /// with title aliases renamed to the canonical key.
    pub fn create_body(&self, record: &BatchRecord, schema: &BatchSchema) -> Value {
        let mut body = Map::new();
        for (key, value) in record.non_empty_fields() {
            if schema.is_container_key(key) {
                continue;
            }
            // An explicit canonical key beats any alias.
            let canonical = schema.canonical_key(key);
            if canonical == key || !body.contains_key(canonical) {
                body.insert(canonical.to_string(), Value::String(value.to_string()));
            }
        }
        Value::Object(body)
    }

    /// Body for an update: every non-blank field except the record id.
    pub fn update_body(&self, record: &BatchRecord, schema: &BatchSchema) -> Value {
        let body: Map<String, Value> = record
            .non_empty_fields()
            .filter(|(key, _)| *key != schema.id_key)
            .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
            .collect();
        Value::Object(body)
    }
}

/// Id of a created resource: `id` as a string or number, at the top level or under `data`.
pub fn extract_id(body: &Value) -> Option<String> {
    let id = body
        .get("id")
        .or_else(|| body.get("data").and_then(|data| data.get("id")))?;

    match id {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::record::OperationKind;
    use serde_json::json;

    #[test]
    fn test_paths_are_percent_encoded() {
        let target = MutationTarget::default();
        assert_eq!(target.create_path("CORE"), "projects/CORE/issues");
        assert_eq!(target.create_path("my team/x"), "projects/my%20team%2Fx/issues");
        assert_eq!(target.item_path("ISS-1"), "issues/ISS-1");
        assert_eq!(target.item_path("a/b"), "issues/a%2Fb");
    }

    #[test]
    fn test_custom_target_trims_slashes() {
        let target = MutationTarget::new("/tasks/", "boards/");
        assert_eq!(target.create_path("B1"), "boards/B1/tasks");
        assert_eq!(target.item_path("7"), "tasks/7");
    }

    #[test]
    fn test_create_body_drops_container_and_blanks() {
        let record = BatchRecord::new(
            2,
            OperationKind::Create,
            [
                ("project", "CORE"),
                ("summary", "Crash on save"),
                ("priority", "high"),
                ("assignee", " "),
            ],
        );
        let body = MutationTarget::default().create_body(&record, &BatchSchema::default());
        assert_eq!(body, json!({"title": "Crash on save", "priority": "high"}));
    }

    #[test]
    fn test_update_body_drops_id() {
        let record = BatchRecord::new(
            3,
            OperationKind::Update,
            [("id", "ISS-9"), ("status", "closed"), ("priority", "")],
        );
        let body = MutationTarget::default().update_body(&record, &BatchSchema::default());
        assert_eq!(body, json!({"status": "closed"}));
    }

    #[test]
    fn test_extract_id() {
        assert_eq!(extract_id(&json!({"id": "ISS-1"})), Some("ISS-1".to_string()));
        assert_eq!(extract_id(&json!({"id": 42})), Some("42".to_string()));
        assert_eq!(extract_id(&json!({"data": {"id": "X"}})), Some("X".to_string()));
        assert_eq!(extract_id(&json!({"id": ""})), None);
        assert_eq!(extract_id(&json!({"ok": true})), None);
        assert_eq!(extract_id(&Value::Null), None);
    }
}
