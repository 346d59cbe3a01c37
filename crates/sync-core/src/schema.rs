//! Per-event table schema.

use serde::{Deserialize, Serialize};

/// Table schema as delivered alongside a row event.
///
/// Row value tuples align to `columns` positionally. A schema describes one
/// event only; a DDL statement may change the column list between two
/// consecutive events, so callers must not reuse it for later rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Source database name
    pub db: String,

    /// Source table name
    pub table: String,

    /// Column names in ordinal order
    pub columns: Vec<String>,
}

impl TableSchema {
    /// Create a new table schema.
    pub fn new(
        db: impl Into<String>,
        table: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            db: db.into(),
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Position of a column in the row tuple.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_index() {
        let schema = TableSchema::new("shop", "users", ["id", "name", "email"]);
        assert_eq!(schema.column_index("id"), Some(0));
        assert_eq!(schema.column_index("email"), Some(2));
        assert_eq!(schema.column_index("missing"), None);
        assert_eq!(schema.len(), 3);
    }
}
