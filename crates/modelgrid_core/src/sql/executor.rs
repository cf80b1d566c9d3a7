//! Statement execution over a live connection.
//!
//! # Responsibility
//! - Run generated statements: single writes, rowset reads, ordered batches.
//! - Materialize result rows into dynamic name/value maps.
//!
//! # Invariants
//! - Fetched rows keep result-set order; the executor never re-sorts.
//! - A batch runs inside one transaction; queue order is execution order.

use super::value::SqlValue;
use crate::db::DbResult;
use rusqlite::Connection;

/// One fetched row: column names with dynamic values, in projection order.
#[derive(Debug, Clone)]
pub struct SqlRow {
    values: Vec<(String, SqlValue)>,
}

impl SqlRow {
    pub fn new(values: Vec<(String, SqlValue)>) -> Self {
        Self { values }
    }

    pub fn value(&self, column: &str) -> Option<&SqlValue> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn unsigned(&self, column: &str) -> Option<u64> {
        self.value(column).and_then(SqlValue::as_unsigned)
    }

    pub fn integer(&self, column: &str) -> Option<i64> {
        self.value(column).and_then(SqlValue::as_integer)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.value(column).and_then(SqlValue::as_text)
    }

    pub fn real(&self, column: &str) -> Option<f64> {
        self.value(column).and_then(SqlValue::as_real)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }
}

/// Executes generated SQL against an open connection.
pub trait SqlExecutor: Send {
    /// Runs one statement, returning the affected row count.
    fn execute(&self, conn: &Connection, sql: &str) -> DbResult<usize>;

    /// Runs one query, returning the full rowset. No rows is not an error.
    fn fetch(&self, conn: &Connection, sql: &str) -> DbResult<Vec<SqlRow>>;

    /// Runs an ordered statement queue as a single transaction.
    fn execute_batch(&self, conn: &Connection, queue: &[String]) -> DbResult<()>;
}

/// SQLite-backed executor.
#[derive(Debug, Default)]
pub struct SqliteExecutor;

impl SqliteExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl SqlExecutor for SqliteExecutor {
    fn execute(&self, conn: &Connection, sql: &str) -> DbResult<usize> {
        let changed = conn.execute(sql, [])?;
        Ok(changed)
    }

    fn fetch(&self, conn: &Connection, sql: &str) -> DbResult<Vec<SqlRow>> {
        let mut stmt = conn.prepare(sql)?;
        let column_names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut rows = stmt.query([])?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(column_names.len());
            for (index, name) in column_names.iter().enumerate() {
                let value = SqlValue::from(row.get_ref(index)?);
                values.push((name.clone(), value));
            }
            result.push(SqlRow::new(values));
        }
        Ok(result)
    }

    fn execute_batch(&self, conn: &Connection, queue: &[String]) -> DbResult<()> {
        let mut script = String::from("BEGIN IMMEDIATE;\n");
        for sql in queue {
            script.push_str(sql);
            if !sql.trim_end().ends_with(';') {
                script.push(';');
            }
            script.push('\n');
        }
        script.push_str("COMMIT;");
        conn.execute_batch(&script)?;
        Ok(())
    }
}
