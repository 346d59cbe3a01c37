//! Sync rules: which source table feeds which index.

use std::collections::HashMap;
use tracing::warn;

/// One table-to-index mapping.
///
/// The primary key column is always part of `filterable_columns`; the
/// constructor inserts it when absent and never duplicates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRule {
    pub source_db: String,
    pub source_table: String,
    pub target_index: String,
    pub primary_key_column: String,
    pub filterable_columns: Vec<String>,
}

impl SyncRule {
    pub fn new(
        source_db: impl Into<String>,
        source_table: impl Into<String>,
        target_index: impl Into<String>,
        primary_key_column: impl Into<String>,
        filterable_columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let primary_key_column = primary_key_column.into();

        let mut columns: Vec<String> = Vec::new();
        for column in filterable_columns.into_iter().map(Into::into) {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        if !columns.contains(&primary_key_column) {
            columns.push(primary_key_column.clone());
        }

        Self {
            source_db: source_db.into(),
            source_table: source_table.into(),
            target_index: target_index.into(),
            primary_key_column,
            filterable_columns: columns,
        }
    }

    pub fn matches(&self, db: &str, table: &str) -> bool {
        self.source_db == db && self.source_table == table
    }
}

/// Immutable rule table built once at startup.
///
/// Lookups are exact on (db, table). When two rules name the same table the
/// one registered last wins.
#[derive(Debug, Clone, Default)]
pub struct SyncRules {
    rules: Vec<SyncRule>,
    by_table: HashMap<String, HashMap<String, usize>>,
}

impl SyncRules {
    pub fn new(rules: Vec<SyncRule>) -> Self {
        let mut by_table: HashMap<String, HashMap<String, usize>> = HashMap::new();

        for (position, rule) in rules.iter().enumerate() {
            let tables = by_table.entry(rule.source_db.clone()).or_default();
            if let Some(previous) = tables.insert(rule.source_table.clone(), position) {
                warn!(
                    "Duplicate sync rule for {}.{}: index '{}' replaces index '{}'",
                    rule.source_db,
                    rule.source_table,
                    rule.target_index,
                    rules[previous].target_index
                );
            }
        }

        Self { rules, by_table }
    }

    /// Find the rule for a table, if any.
    pub fn find(&self, db: &str, table: &str) -> Option<&SyncRule> {
        self.by_table
            .get(db)
            .and_then(|tables| tables.get(table))
            .map(|&position| &self.rules[position])
    }

    /// All rules in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &SyncRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_key_added_to_filterable_columns() {
        let rule = SyncRule::new("shop", "users", "users", "id", ["email"]);
        assert_eq!(rule.filterable_columns, vec!["email", "id"]);
    }

    #[test]
    fn test_primary_key_not_duplicated() {
        let rule = SyncRule::new("shop", "users", "users", "id", ["id", "email"]);
        assert_eq!(rule.filterable_columns, vec!["id", "email"]);

        let rule = SyncRule::new("shop", "users", "users", "id", Vec::<String>::new());
        assert_eq!(rule.filterable_columns, vec!["id"]);
    }

    #[test]
    fn test_find_exact_match_only() {
        let rules = SyncRules::new(vec![
            SyncRule::new("shop", "users", "users", "id", ["id"]),
            SyncRule::new("shop", "orders", "orders", "order_id", ["status"]),
        ]);

        assert_eq!(rules.find("shop", "orders").unwrap().target_index, "orders");
        assert!(rules.find("shop", "Users").is_none());
        assert!(rules.find("other", "users").is_none());
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_last_registered_rule_wins() {
        let rules = SyncRules::new(vec![
            SyncRule::new("shop", "users", "users_v1", "id", ["id"]),
            SyncRule::new("shop", "users", "users_v2", "id", ["id"]),
        ]);

        assert_eq!(rules.find("shop", "users").unwrap().target_index, "users_v2");
        let indexes: Vec<_> = rules.iter().map(|r| r.target_index.as_str()).collect();
        assert_eq!(indexes, vec!["users_v1", "users_v2"]);
    }
}
