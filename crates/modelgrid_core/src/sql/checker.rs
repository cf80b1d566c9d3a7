//! Backing-structure existence checking.
//!
//! # Responsibility
//! - Verify the template's table exists, creating it when missing.
//!
//! # Invariants
//! - Checking is idempotent; repeated calls leave existing data untouched.

use super::table::SqlTable;
use crate::db::DbResult;
use rusqlite::Connection;

/// Verifies (and if needed creates) the structure behind a template.
pub trait DbChecker: Send {
    fn check(&self, conn: &Connection, template: &SqlTable) -> DbResult<()>;
}

/// SQLite checker deriving DDL from the template's column declarations.
#[derive(Debug, Default)]
pub struct SqliteChecker;

impl SqliteChecker {
    pub fn new() -> Self {
        Self
    }

    fn create_table_sql(template: &SqlTable) -> String {
        let columns: Vec<String> = template
            .columns()
            .iter()
            .map(|column| {
                let mut decl = format!(
                    "\"{}\" {}",
                    column.name(),
                    column.sql_type().ddl_keyword()
                );
                if column.is_primary_key() {
                    decl.push_str(" PRIMARY KEY");
                }
                decl
            })
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({})",
            template.name(),
            columns.join(", ")
        )
    }
}

impl DbChecker for SqliteChecker {
    fn check(&self, conn: &Connection, template: &SqlTable) -> DbResult<()> {
        conn.execute_batch(&Self::create_table_sql(template))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteChecker;
    use crate::sql::{SqlTable, SqlType, IDENTIFIER_COLUMN};

    #[test]
    fn ddl_marks_primary_key() {
        let template = SqlTable::new("contacts")
            .primary_key_column(IDENTIFIER_COLUMN, SqlType::Integer)
            .column("name", SqlType::Text);
        assert_eq!(
            SqliteChecker::create_table_sql(&template),
            "CREATE TABLE IF NOT EXISTS \"contacts\" (\"identifier\" INTEGER PRIMARY KEY, \"name\" TEXT)"
        );
    }
}
