//! Types shared by the backend seam and the retrying store.

use serde::Deserialize;
use serde_json::{Map, Value};

/// A document body: field name to JSON value.
pub type Document = Map<String, Value>;

/// Field carrying the document identifier.
pub const ID_FIELD: &str = "_id";

/// Field carrying the document revision marker.
pub const REV_FIELD: &str = "_rev";

/// Fields injected by the store that are never exposed as domain data.
pub const RESERVED_FIELDS: &[&str] = &[ID_FIELD, REV_FIELD];

/// Prefix of design document ids, which hold views and indexes.
pub const DESIGN_DOC_PREFIX: &str = "_design/";

/// Workspace holding user credentials.
pub const AUTH_WORKSPACE: &str = "$auth$";

/// Document in [`AUTH_WORKSPACE`] keyed by username.
pub const AUTH_USERS_DOCUMENT: &str = "users";

/// Whether `field` is one of [`RESERVED_FIELDS`].
pub fn is_reserved(field: &str) -> bool {
    RESERVED_FIELDS.contains(&field)
}

/// Remove the reserved fields from a document in place.
pub fn strip_reserved(doc: &mut Document) {
    for field in RESERVED_FIELDS {
        doc.remove(*field);
    }
}

/// Identifier stored in the document's `_id` field, if any.
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// Revision stored in the document's `_rev` field, if any.
pub fn document_rev(doc: &Document) -> Option<&str> {
    doc.get(REV_FIELD).and_then(Value::as_str)
}

/// Revision info returned by the service after a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentRevision {
    pub id: String,
    pub rev: String,
}

/// Greeting returned by the service root endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    /// Always "Welcome" on CouchDB and Cloudant
    pub couchdb: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Result of [`RetryingStore::get`](crate::RetryingStore::get).
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// Every document of the workspace, keyed by identifier.
    All(std::collections::HashMap<String, Document>),
    /// A single document's fields.
    One(Document),
}

/// Local edit applied to a fetched document before it is saved back.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Set or replace the field's value.
    Set(Value),
    /// Remove the field.
    Remove,
}

impl FieldUpdate {
    /// Apply this edit to `doc` under `field`.
    pub fn apply(&self, doc: &mut Document, field: &str) {
        match self {
            Self::Set(value) => {
                doc.insert(field.to_string(), value.clone());
            }
            Self::Remove => {
                doc.remove(field);
            }
        }
    }
}

impl From<Option<Value>> for FieldUpdate {
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(Value::Null) | None => Self::Remove,
            Some(v) => Self::Set(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_strip_reserved_removes_id_and_rev() {
        let mut d = doc(json!({"_id": "t-1", "_rev": "1-abc", "state": "running"}));
        strip_reserved(&mut d);
        assert_eq!(d, doc(json!({"state": "running"})));
    }

    #[test]
    fn test_is_reserved() {
        assert!(is_reserved("_id"));
        assert!(is_reserved("_rev"));
        assert!(!is_reserved("id"));
        assert!(!is_reserved("_deleted"));
    }

    #[test]
    fn test_id_and_rev_accessors() {
        let d = doc(json!({"_id": "t-1", "_rev": "2-def"}));
        assert_eq!(document_id(&d), Some("t-1"));
        assert_eq!(document_rev(&d), Some("2-def"));

        let d = doc(json!({"_id": 7}));
        assert_eq!(document_id(&d), None);
        assert_eq!(document_rev(&d), None);
    }

    #[test]
    fn test_field_update_apply() {
        let mut d = doc(json!({"a": 1}));
        FieldUpdate::Set(json!("x")).apply(&mut d, "b");
        assert_eq!(d, doc(json!({"a": 1, "b": "x"})));

        FieldUpdate::Remove.apply(&mut d, "a");
        assert_eq!(d, doc(json!({"b": "x"})));

        // Removing an absent field is a no-op
        FieldUpdate::Remove.apply(&mut d, "zzz");
        assert_eq!(d, doc(json!({"b": "x"})));
    }

    #[test]
    fn test_null_value_means_remove() {
        assert_eq!(FieldUpdate::from(None), FieldUpdate::Remove);
        assert_eq!(FieldUpdate::from(Some(Value::Null)), FieldUpdate::Remove);
        assert_eq!(
            FieldUpdate::from(Some(json!(3))),
            FieldUpdate::Set(json!(3))
        );
    }

    #[test]
    fn test_revision_deserializes_from_write_response() {
        let rev: DocumentRevision =
            serde_json::from_value(json!({"ok": true, "id": "t-1", "rev": "1-abc"})).unwrap();
        assert_eq!(rev.id, "t-1");
        assert_eq!(rev.rev, "1-abc");
    }
}
