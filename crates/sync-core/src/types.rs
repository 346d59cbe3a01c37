//! Row change events and the documents derived from them.

use crate::schema::TableSchema;
use crate::values::RowValue;
use serde::{Deserialize, Serialize};

/// Kind of row-level change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowAction {
    Insert,
    Update,
    Delete,
    /// An action the source could not classify; carried through so the
    /// router can log it without stopping the stream.
    Other(String),
}

impl RowAction {
    pub fn as_str(&self) -> &str {
        match self {
            RowAction::Insert => "insert",
            RowAction::Update => "update",
            RowAction::Delete => "delete",
            RowAction::Other(s) => s,
        }
    }
}

impl std::fmt::Display for RowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single row change, self-describing through its schema.
///
/// Update carries both `before` and `after`; Insert carries only `after`
/// and Delete only `before`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowChangeEvent {
    pub schema: TableSchema,
    pub action: RowAction,
    pub before: Option<Vec<RowValue>>,
    pub after: Option<Vec<RowValue>>,
}

impl RowChangeEvent {
    pub fn insert(schema: TableSchema, after: Vec<RowValue>) -> Self {
        Self {
            schema,
            action: RowAction::Insert,
            before: None,
            after: Some(after),
        }
    }

    pub fn update(schema: TableSchema, before: Vec<RowValue>, after: Vec<RowValue>) -> Self {
        Self {
            schema,
            action: RowAction::Update,
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn delete(schema: TableSchema, before: Vec<RowValue>) -> Self {
        Self {
            schema,
            action: RowAction::Delete,
            before: Some(before),
            after: None,
        }
    }

    pub fn db(&self) -> &str {
        &self.schema.db
    }

    pub fn table(&self) -> &str {
        &self.schema.table
    }
}

/// A search-index document built from one row.
///
/// Documents are ephemeral: constructed, sent to a sink, discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Target index
    pub index: String,

    /// Column name to JSON value
    pub fields: serde_json::Map<String, serde_json::Value>,

    /// Value of the primary key column, if the row carried one
    pub primary_key_value: Option<serde_json::Value>,
}

impl Document {
    /// Build a document by zipping column names with row values positionally.
    ///
    /// Extra names or extra values are ignored.
    pub fn from_row(
        index: impl Into<String>,
        primary_key: &str,
        columns: &[String],
        values: &[RowValue],
    ) -> Self {
        let fields: serde_json::Map<String, serde_json::Value> = columns
            .iter()
            .zip(values)
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        let primary_key_value = fields.get(primary_key).cloned();

        Self {
            index: index.into(),
            fields,
            primary_key_value,
        }
    }

    /// The document body as sent to the index.
    pub fn body(&self) -> serde_json::Value {
        serde_json::Value::Object(self.fields.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_from_row() {
        let columns = vec!["id".to_string(), "name".to_string(), "avatar".to_string()];
        let values = vec![
            RowValue::Int(1),
            RowValue::from("alice"),
            RowValue::Bytes(b"a.png".to_vec()),
        ];

        let doc = Document::from_row("users", "id", &columns, &values);

        assert_eq!(doc.index, "users");
        assert_eq!(doc.primary_key_value, Some(json!(1)));
        assert_eq!(doc.body(), json!({"id": 1, "name": "alice", "avatar": "a.png"}));
    }

    #[test]
    fn test_document_without_primary_key_column() {
        let columns = vec!["name".to_string()];
        let doc = Document::from_row("users", "id", &columns, &[RowValue::from("bob")]);
        assert_eq!(doc.primary_key_value, None);
    }

    #[test]
    fn test_row_action_display() {
        assert_eq!(RowAction::Insert.to_string(), "insert");
        assert_eq!(RowAction::Other("truncate".into()).to_string(), "truncate");
    }
}
