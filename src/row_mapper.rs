//! Translation of one row change into at most one index operation.
//!
//! Mapping is pure: it reads the rule and the event's own schema and never
//! calls the sink.

use sync_core::{Document, RowAction, RowChangeEvent, RowValue, SyncError, SyncRule};
use tracing::{error, warn};

/// An index write derived from a row change.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOperation {
    /// Add documents to the index.
    Create {
        index: String,
        documents: Vec<Document>,
        primary_key: String,
    },
    /// Replace one document, keyed by `primary_key`.
    Upsert {
        index: String,
        primary_key: String,
        document: Document,
    },
    /// Remove the document with this identifier.
    Delete { index: String, identifier: String },
}

impl IndexOperation {
    pub fn index(&self) -> &str {
        match self {
            Self::Create { index, .. } | Self::Upsert { index, .. } | Self::Delete { index, .. } => {
                index
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create documents",
            Self::Upsert { .. } => "update document",
            Self::Delete { .. } => "delete document",
        }
    }
}

/// Zip column names with row values into a document.
///
/// Shared by streaming and backfill so both produce identical documents.
pub fn row_to_document(
    index: &str,
    primary_key: &str,
    columns: &[String],
    values: &[RowValue],
) -> Document {
    Document::from_row(index, primary_key, columns, values)
}

/// Map a row change matched by `rule` to an index operation.
///
/// Returns `Ok(None)` for actions that have no index counterpart.
pub fn map_row(
    rule: &SyncRule,
    event: &RowChangeEvent,
) -> Result<Option<IndexOperation>, SyncError> {
    match &event.action {
        RowAction::Delete => {
            let before = row_image(event, event.before.as_deref(), "before")?;
            let identifier = event
                .schema
                .column_index(&rule.primary_key_column)
                .and_then(|i| before.get(i))
                .and_then(RowValue::as_identifier)
                .ok_or_else(|| SyncError::MissingIdentifier {
                    db: event.db().to_string(),
                    table: event.table().to_string(),
                    column: rule.primary_key_column.clone(),
                })?;

            Ok(Some(IndexOperation::Delete {
                index: rule.target_index.clone(),
                identifier,
            }))
        }
        RowAction::Update => {
            let after = row_image(event, event.after.as_deref(), "after")?;
            if after.len() != event.schema.len() {
                warn!(
                    "Update on {}.{} has {} values for {} columns; unmatched columns are dropped",
                    event.db(),
                    event.table(),
                    after.len(),
                    event.schema.len()
                );
            }
            let document = row_to_document(
                &rule.target_index,
                &rule.primary_key_column,
                &event.schema.columns,
                after,
            );

            Ok(Some(IndexOperation::Upsert {
                index: rule.target_index.clone(),
                primary_key: rule.primary_key_column.clone(),
                document,
            }))
        }
        RowAction::Insert => {
            let after = row_image(event, event.after.as_deref(), "after")?;
            if after.len() != event.schema.len() {
                return Err(SyncError::SchemaMismatch {
                    db: event.db().to_string(),
                    table: event.table().to_string(),
                    expected: event.schema.len(),
                    actual: after.len(),
                });
            }
            let document = row_to_document(
                &rule.target_index,
                &rule.primary_key_column,
                &event.schema.columns,
                after,
            );

            Ok(Some(IndexOperation::Create {
                index: rule.target_index.clone(),
                documents: vec![document],
                primary_key: rule.primary_key_column.clone(),
            }))
        }
        RowAction::Other(action) => {
            error!(
                "Unknown row action '{}' on {}.{}, event skipped",
                action,
                event.db(),
                event.table()
            );
            Ok(None)
        }
    }
}

fn row_image<'a>(
    event: &RowChangeEvent,
    image: Option<&'a [RowValue]>,
    name: &'static str,
) -> Result<&'a [RowValue], SyncError> {
    image.ok_or_else(|| SyncError::MissingRowImage {
        db: event.db().to_string(),
        table: event.table().to_string(),
        action: event.action.to_string(),
        image: name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sync_core::TableSchema;

    fn users_rule() -> SyncRule {
        SyncRule::new("shop", "users", "users_idx", "id", ["name"])
    }

    fn users_schema() -> TableSchema {
        TableSchema::new("shop", "users", ["id", "name"])
    }

    #[test]
    fn test_insert_populates_every_column() {
        let event = RowChangeEvent::insert(
            users_schema(),
            vec![RowValue::Int(7), RowValue::from("alice")],
        );

        let op = map_row(&users_rule(), &event).unwrap().unwrap();
        let IndexOperation::Create {
            index,
            documents,
            primary_key,
        } = op
        else {
            panic!("expected create");
        };
        assert_eq!(index, "users_idx");
        assert_eq!(primary_key, "id");
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].body(), json!({"id": 7, "name": "alice"}));
        assert_eq!(documents[0].primary_key_value, Some(json!(7)));
    }

    #[test]
    fn test_insert_arity_mismatch_is_schema_mismatch() {
        let event = RowChangeEvent::insert(users_schema(), vec![RowValue::Int(7)]);

        let err = map_row(&users_rule(), &event).unwrap_err();
        assert!(matches!(
            err,
            SyncError::SchemaMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_update_builds_full_document() {
        let event = RowChangeEvent::update(
            users_schema(),
            vec![RowValue::Int(7), RowValue::from("alice")],
            vec![RowValue::Int(7), RowValue::Bytes(b"alicia".to_vec())],
        );

        let op = map_row(&users_rule(), &event).unwrap().unwrap();
        let IndexOperation::Upsert {
            primary_key,
            document,
            ..
        } = op
        else {
            panic!("expected upsert");
        };
        assert_eq!(primary_key, "id");
        assert_eq!(document.body(), json!({"id": 7, "name": "alicia"}));
    }

    #[test]
    fn test_update_arity_mismatch_is_tolerated() {
        let event = RowChangeEvent::update(
            users_schema(),
            vec![RowValue::Int(7), RowValue::from("alice")],
            vec![RowValue::Int(7), RowValue::from("alice"), RowValue::from("extra")],
        );

        let op = map_row(&users_rule(), &event).unwrap().unwrap();
        let IndexOperation::Upsert { document, .. } = op else {
            panic!("expected upsert");
        };
        assert_eq!(document.body(), json!({"id": 7, "name": "alice"}));
    }

    #[test]
    fn test_delete_uses_primary_key_of_before_image() {
        let event = RowChangeEvent::delete(
            users_schema(),
            vec![RowValue::from("42"), RowValue::from("bob")],
        );

        let op = map_row(&users_rule(), &event).unwrap();
        assert_eq!(
            op,
            Some(IndexOperation::Delete {
                index: "users_idx".to_string(),
                identifier: "42".to_string(),
            })
        );
    }

    #[test]
    fn test_delete_accepts_integer_and_utf8_bytes_identifiers() {
        for (value, expected) in [
            (RowValue::Int(42), "42"),
            (RowValue::UInt(42), "42"),
            (RowValue::Bytes(b"sku-1".to_vec()), "sku-1"),
        ] {
            let event =
                RowChangeEvent::delete(users_schema(), vec![value, RowValue::from("bob")]);
            let op = map_row(&users_rule(), &event).unwrap();
            assert_eq!(
                op,
                Some(IndexOperation::Delete {
                    index: "users_idx".to_string(),
                    identifier: expected.to_string(),
                })
            );
        }
    }

    #[test]
    fn test_delete_without_usable_identifier() {
        for value in [
            RowValue::Null,
            RowValue::from(""),
            RowValue::Float(4.2),
            RowValue::Bytes(vec![0xff, 0xfe]),
        ] {
            let event =
                RowChangeEvent::delete(users_schema(), vec![value, RowValue::from("bob")]);
            let err = map_row(&users_rule(), &event).unwrap_err();
            assert!(
                matches!(err, SyncError::MissingIdentifier { ref column, .. } if column == "id"),
                "{err}"
            );
        }
    }

    #[test]
    fn test_delete_when_primary_key_column_is_absent() {
        let schema = TableSchema::new("shop", "users", ["user_id", "name"]);
        let event = RowChangeEvent::delete(schema, vec![RowValue::Int(1), RowValue::from("bob")]);

        let err = map_row(&users_rule(), &event).unwrap_err();
        assert!(matches!(err, SyncError::MissingIdentifier { .. }));
    }

    #[test]
    fn test_missing_row_image() {
        let event = RowChangeEvent {
            schema: users_schema(),
            action: RowAction::Delete,
            before: None,
            after: None,
        };

        let err = map_row(&users_rule(), &event).unwrap_err();
        assert!(matches!(
            err,
            SyncError::MissingRowImage {
                image: "before",
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_action_is_skipped() {
        let event = RowChangeEvent {
            schema: users_schema(),
            action: RowAction::Other("truncate".to_string()),
            before: None,
            after: None,
        };

        assert_eq!(map_row(&users_rule(), &event).unwrap(), None);
    }
}
