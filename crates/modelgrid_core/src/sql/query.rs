//! Dialect-dispatched SQL statement generation.
//!
//! # Responsibility
//! - Turn a prepared table template into SELECT/INSERT/UPDATE/DELETE text.
//! - Keep dialect differences behind one generator contract.
//!
//! # Invariants
//! - Excluded columns never appear in projections, column lists or SET
//!   lists; WHERE conditions are rendered verbatim.
//! - Generation is pure; it never touches a connection.

use super::table::SqlTable;

/// Supported SQL dialect families.
///
/// Execution in this crate is SQLite-backed; generation stays dispatched so
/// repositories keep working when another executor is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
    Sqlite,
    MySql,
}

/// Builds statement text from a prepared template.
pub trait QueryGenerator: Send + Sync {
    fn select(&self, table: &SqlTable) -> String;
    fn insert(&self, table: &SqlTable) -> String;
    fn update(&self, table: &SqlTable) -> String;
    fn delete(&self, table: &SqlTable) -> String;
}

/// Returns the generator for the given dialect.
pub fn generator_for(kind: DatabaseKind) -> Box<dyn QueryGenerator> {
    match kind {
        DatabaseKind::Sqlite => Box::new(SqliteQueryGenerator),
        DatabaseKind::MySql => Box::new(MySqlQueryGenerator),
    }
}

/// SQLite dialect: double-quoted identifiers.
pub struct SqliteQueryGenerator;

impl QueryGenerator for SqliteQueryGenerator {
    fn select(&self, table: &SqlTable) -> String {
        build_select(table, '"')
    }

    fn insert(&self, table: &SqlTable) -> String {
        build_insert(table, '"')
    }

    fn update(&self, table: &SqlTable) -> String {
        build_update(table, '"')
    }

    fn delete(&self, table: &SqlTable) -> String {
        build_delete(table, '"')
    }
}

/// MySQL dialect: backtick-quoted identifiers.
pub struct MySqlQueryGenerator;

impl QueryGenerator for MySqlQueryGenerator {
    fn select(&self, table: &SqlTable) -> String {
        build_select(table, '`')
    }

    fn insert(&self, table: &SqlTable) -> String {
        build_insert(table, '`')
    }

    fn update(&self, table: &SqlTable) -> String {
        build_update(table, '`')
    }

    fn delete(&self, table: &SqlTable) -> String {
        build_delete(table, '`')
    }
}

fn quote(name: &str, mark: char) -> String {
    format!("{mark}{name}{mark}")
}

fn where_clause(table: &SqlTable) -> String {
    if table.conditions().is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", table.conditions().join(" AND "))
    }
}

fn build_select(table: &SqlTable, mark: char) -> String {
    let columns: Vec<String> = table
        .columns()
        .iter()
        .filter(|column| !column.is_excluded())
        .map(|column| quote(column.name(), mark))
        .collect();
    let projection = if columns.is_empty() {
        "*".to_string()
    } else {
        columns.join(", ")
    };
    format!(
        "SELECT {projection} FROM {}{}",
        quote(table.name(), mark),
        where_clause(table)
    )
}

fn build_insert(table: &SqlTable, mark: char) -> String {
    let mut names = Vec::new();
    let mut literals = Vec::new();
    for column in table.columns() {
        if column.is_excluded() {
            continue;
        }
        if let Some(value) = column.value() {
            names.push(quote(column.name(), mark));
            literals.push(value.render_literal());
        }
    }
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(table.name(), mark),
        names.join(", "),
        literals.join(", ")
    )
}

fn build_update(table: &SqlTable, mark: char) -> String {
    let assignments: Vec<String> = table
        .columns()
        .iter()
        .filter(|column| !column.is_excluded())
        .filter_map(|column| {
            column
                .value()
                .map(|value| format!("{} = {}", quote(column.name(), mark), value.render_literal()))
        })
        .collect();
    format!(
        "UPDATE {} SET {}{}",
        quote(table.name(), mark),
        assignments.join(", "),
        where_clause(table)
    )
}

fn build_delete(table: &SqlTable, mark: char) -> String {
    format!(
        "DELETE FROM {}{}",
        quote(table.name(), mark),
        where_clause(table)
    )
}
