//! Recognition of table-level DDL in binlog query events.
//!
//! Only statements that change a table's column layout matter to the
//! stream: they invalidate cached column names and are reported to the
//! handler. Everything else (`BEGIN`, `CREATE DATABASE`, grants, ...) is
//! ignored.

use sqlparser::ast::{ObjectName, ObjectNamePart, ObjectType, Statement};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};
use tracing::debug;

/// A table named by a DDL statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdlTarget {
    pub db: String,
    pub table: String,
}

/// Return the tables a DDL statement touches, or `None` when the query is
/// not table-level DDL.
///
/// `default_db` is the schema the statement ran in; it is used for table
/// names that are not qualified.
///
/// An empty list means the statement is table DDL the parser could not
/// read, so the affected tables are unknown.
pub fn parse_table_ddl(query: &str, default_db: &str) -> Option<Vec<DdlTarget>> {
    let dialect = MySqlDialect {};

    let statements = match Parser::parse_sql(&dialect, query) {
        Ok(statements) => statements,
        Err(e) => {
            if starts_table_ddl(&dialect, query) {
                debug!("Unparsed table DDL ({}): {}", e, query);
                return Some(Vec::new());
            }
            return None;
        }
    };

    let targets: Vec<DdlTarget> = statements
        .iter()
        .flat_map(table_names)
        .filter_map(|name| qualified_name(name, default_db))
        .collect();

    if targets.is_empty() {
        return None;
    }
    Some(targets)
}

fn table_names(statement: &Statement) -> Vec<&ObjectName> {
    match statement {
        Statement::CreateTable(create) => vec![&create.name],
        Statement::AlterTable { name, .. } => vec![name],
        Statement::Drop {
            object_type: ObjectType::Table,
            names,
            ..
        } => names.iter().collect(),
        Statement::RenameTable(renames) => renames
            .iter()
            .flat_map(|rename| [&rename.old_name, &rename.new_name])
            .collect(),
        Statement::Truncate { table_names, .. } => {
            table_names.iter().map(|target| &target.name).collect()
        }
        _ => Vec::new(),
    }
}

fn qualified_name(name: &ObjectName, default_db: &str) -> Option<DdlTarget> {
    let mut parts: Vec<String> = name.0.iter().map(part_value).collect();
    let table = parts.pop()?;
    let db = parts.pop().unwrap_or_else(|| default_db.to_string());
    Some(DdlTarget { db, table })
}

#[allow(unreachable_patterns)]
fn part_value(part: &ObjectNamePart) -> String {
    match part {
        ObjectNamePart::Identifier(ident) => ident.value.clone(),
        other => other.to_string(),
    }
}

/// Whether the first words, comments skipped, open a table statement.
fn starts_table_ddl(dialect: &MySqlDialect, query: &str) -> bool {
    let Ok(tokens) = Tokenizer::new(dialect, query).tokenize() else {
        return false;
    };
    let words: Vec<String> = tokens
        .into_iter()
        .filter(|token| !matches!(token, Token::Whitespace(_)))
        .take(3)
        .map(|token| match token {
            Token::Word(word) => word.value.to_ascii_uppercase(),
            _ => String::new(),
        })
        .collect();
    let words: Vec<&str> = words.iter().map(String::as_str).collect();

    match words.as_slice() {
        ["TRUNCATE", ..] => true,
        ["CREATE" | "ALTER" | "DROP" | "RENAME", "TABLE", ..] => true,
        ["CREATE" | "DROP", "TEMPORARY", "TABLE"] => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(db: &str, table: &str) -> DdlTarget {
        DdlTarget {
            db: db.to_string(),
            table: table.to_string(),
        }
    }

    #[test]
    fn test_alter_table_uses_default_db() {
        let targets = parse_table_ddl("ALTER TABLE users ADD COLUMN age INT", "shop").unwrap();
        assert_eq!(targets, vec![target("shop", "users")]);
    }

    #[test]
    fn test_create_table_with_qualified_quoted_name() {
        let targets = parse_table_ddl(
            "create table if not exists `inventory`.`stock items` (id int primary key)",
            "shop",
        )
        .unwrap();
        assert_eq!(targets, vec![target("inventory", "stock items")]);
    }

    #[test]
    fn test_drop_table_lists_every_table() {
        let targets =
            parse_table_ddl("DROP TABLE IF EXISTS `a`, b.c /* generated by server */", "shop")
                .unwrap();
        assert_eq!(targets, vec![target("shop", "a"), target("b", "c")]);
    }

    #[test]
    fn test_rename_table_reports_both_sides() {
        let targets = parse_table_ddl("RENAME TABLE old_users TO users", "shop").unwrap();
        assert_eq!(targets, vec![target("shop", "old_users"), target("shop", "users")]);
    }

    #[test]
    fn test_truncate() {
        let targets = parse_table_ddl("TRUNCATE TABLE orders", "shop").unwrap();
        assert_eq!(targets, vec![target("shop", "orders")]);
    }

    #[test]
    fn test_leading_comments_are_skipped() {
        for query in [
            "# add age\nALTER TABLE users ADD COLUMN age INT",
            "-- add age\nALTER TABLE users ADD COLUMN age INT",
            "/* add age */ ALTER TABLE users ADD COLUMN age INT",
        ] {
            assert_eq!(
                parse_table_ddl(query, "shop"),
                Some(vec![target("shop", "users")]),
                "{query}"
            );
        }
    }

    #[test]
    fn test_unparsed_table_ddl_has_unknown_targets() {
        assert_eq!(
            parse_table_ddl("# note\nALTER TABLE users ~~ not sql ~~", "shop"),
            Some(vec![])
        );
        assert_eq!(
            parse_table_ddl("DROP TEMPORARY TABLE ~~", "shop"),
            Some(vec![])
        );
    }

    #[test]
    fn test_non_table_statements_are_ignored() {
        assert_eq!(parse_table_ddl("BEGIN", "shop"), None);
        assert_eq!(parse_table_ddl("CREATE DATABASE shop", "shop"), None);
        assert_eq!(
            parse_table_ddl("GRANT SELECT ON shop.* TO 'reader'@'%'", "shop"),
            None
        );
        assert_eq!(parse_table_ddl("", "shop"), None);
    }
}
