//! Generic model repository composed from injected capabilities.
//!
//! # Responsibility
//! - Provide select/insert/update/delete and ordered batch operations for
//!   one mapped model type.
//! - Scope reads and deletes by a parent identifier when a parent scope is
//!   configured.
//!
//! # Invariants
//! - UPDATE never writes the identifier column but always keys its WHERE
//!   clause on it.
//! - Batch queue order equals input order; atomicity is the executor's.
//! - Row mapping preserves result-set order.

use super::sql_repository::SqlRepository;
use super::{RepoError, RepoResult};
use crate::model::{Model, ModelId};
use crate::sql::{SqlRow, SqlTable, IDENTIFIER_COLUMN};
use log::debug;
use std::marker::PhantomData;

/// Maps one model type onto template columns and back.
///
/// The repository writes the identifier column itself; `write_row` covers
/// the remaining columns. Dependent-model mappers also write/read their
/// parent identifier column here.
pub trait RowMapper<T: Model>: Send {
    /// Writes the item's non-identifier columns into the operation template.
    fn write_row(&self, table: &mut SqlTable, item: &T);

    /// Materializes an item from a fetched row.
    ///
    /// Must at minimum reconstruct the identifier.
    fn read_row(&self, row: &SqlRow) -> RepoResult<T>;

    /// Select-pipeline hook for extending the template (extra conditions,
    /// excluded columns). Defaults to no change.
    fn extend_select(&self, _table: &mut SqlTable) {}

    fn prepare_insert(&self, _item: &T) {}
    fn prepare_update(&self, _item: &T) {}
    fn prepare_delete(&self, _item: &T) {}
    fn after_insert(&self, _item: &T) {}
    fn after_update(&self, _item: &T) {}
    fn after_delete(&self, _item: &T) {}
}

/// Dependence column binding for parent-scoped repositories.
#[derive(Debug, Clone)]
pub struct ParentScope {
    column: String,
}

impl ParentScope {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    fn condition(&self, parent_id: ModelId) -> String {
        format!("{} = {parent_id}", self.column)
    }
}

/// Repository for one mapped model type.
pub struct ModelRepository<T: Model, M: RowMapper<T>> {
    store: SqlRepository,
    mapper: M,
    parent_scope: Option<ParentScope>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Model, M: RowMapper<T>> ModelRepository<T, M> {
    pub fn new(store: SqlRepository, mapper: M) -> Self {
        Self {
            store,
            mapper,
            parent_scope: None,
            _marker: PhantomData,
        }
    }

    /// Adds a parent scope, enabling the `*_by_parent` operations.
    pub fn with_parent_scope(store: SqlRepository, mapper: M, scope: ParentScope) -> Self {
        Self {
            store,
            mapper,
            parent_scope: Some(scope),
            _marker: PhantomData,
        }
    }

    pub fn check_database(&self) -> RepoResult<()> {
        self.store.check_database()
    }

    pub fn table_template(&self) -> SqlTable {
        self.store.table_template()
    }

    pub fn dispose(&mut self) {
        self.store.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.store.is_disposed()
    }

    /// Selects every mapped row in result-set order.
    pub fn select(&self) -> RepoResult<Vec<T>> {
        let mut table = self.store.table_template();
        self.mapper.extend_select(&mut table);
        self.fetch_mapped(&table)
    }

    /// Selects rows matching all of the given conditions.
    pub fn select_by_condition<I, S>(&self, conditions: I) -> RepoResult<Vec<T>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = self.store.table_template();
        self.mapper.extend_select(&mut table);
        table.add_conditions(conditions);
        self.fetch_mapped(&table)
    }

    /// Selects the item with the given identifier; `None` when no row
    /// matches.
    pub fn select_by_identifier(&self, identifier: ModelId) -> RepoResult<Option<T>> {
        let items = self.select_by_condition([identifier_condition(identifier)])?;
        Ok(items.into_iter().next())
    }

    pub fn insert(&self, item: &T) -> RepoResult<()> {
        self.mapper.prepare_insert(item);
        let sql = self.insert_sql(item);
        self.store.executor().execute(self.store.conn()?, &sql)?;
        self.mapper.after_insert(item);
        debug!(
            "event=repo_insert module=repo status=ok identifier={}",
            item.identifier()
        );
        Ok(())
    }

    pub fn update(&self, item: &T) -> RepoResult<()> {
        self.mapper.prepare_update(item);
        let sql = self.update_sql(item);
        self.store.executor().execute(self.store.conn()?, &sql)?;
        self.mapper.after_update(item);
        debug!(
            "event=repo_update module=repo status=ok identifier={}",
            item.identifier()
        );
        Ok(())
    }

    pub fn delete(&self, item: &T) -> RepoResult<()> {
        self.mapper.prepare_delete(item);
        let sql = self.delete_sql(item);
        self.store.executor().execute(self.store.conn()?, &sql)?;
        self.mapper.after_delete(item);
        debug!(
            "event=repo_delete module=repo status=ok identifier={}",
            item.identifier()
        );
        Ok(())
    }

    pub fn insert_batch(&self, items: &[T]) -> RepoResult<()> {
        self.run_batch("insert", items, |item| self.insert_sql(item))
    }

    pub fn update_batch(&self, items: &[T]) -> RepoResult<()> {
        self.run_batch("update", items, |item| self.update_sql(item))
    }

    pub fn delete_batch(&self, items: &[T]) -> RepoResult<()> {
        self.run_batch("delete", items, |item| self.delete_sql(item))
    }

    /// Selects all items bound to the given parent model.
    pub fn select_by_parent(&self, parent: &impl Model) -> RepoResult<Vec<T>> {
        self.select_by_parent_id(parent.identifier())
    }

    /// Selects all items bound to the given parent identifier.
    ///
    /// `0` is an ordinary identifier value, not a sentinel.
    pub fn select_by_parent_id(&self, parent_id: ModelId) -> RepoResult<Vec<T>> {
        let condition = self.scope()?.condition(parent_id);
        self.select_by_condition([condition])
    }

    /// Deletes every item bound to the given parent in one scoped
    /// statement.
    ///
    /// Deliberately not narrowed by child identifiers.
    pub fn delete_by_parent(&self, parent: &impl Model) -> RepoResult<()> {
        let condition = self.scope()?.condition(parent.identifier());
        let mut table = self.store.table_template();
        table.add_condition(condition);
        let sql = self.store.generator().delete(&table);
        self.store.executor().execute(self.store.conn()?, &sql)?;
        debug!(
            "event=repo_delete_by_parent module=repo status=ok parent={}",
            parent.identifier()
        );
        Ok(())
    }

    fn scope(&self) -> RepoResult<&ParentScope> {
        self.parent_scope.as_ref().ok_or(RepoError::ParentScopeMissing)
    }

    fn fetch_mapped(&self, table: &SqlTable) -> RepoResult<Vec<T>> {
        let sql = self.store.generator().select(table);
        let rows = self.store.executor().fetch(self.store.conn()?, &sql)?;
        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(self.mapper.read_row(row)?);
        }
        Ok(items)
    }

    fn run_batch(
        &self,
        operation: &str,
        items: &[T],
        statement: impl Fn(&T) -> String,
    ) -> RepoResult<()> {
        if items.is_empty() {
            return Ok(());
        }
        let queue: Vec<String> = items.iter().map(statement).collect();
        self.store
            .executor()
            .execute_batch(self.store.conn()?, &queue)?;
        debug!(
            "event=repo_batch module=repo status=ok operation={operation} count={}",
            items.len()
        );
        Ok(())
    }

    fn insert_sql(&self, item: &T) -> String {
        let mut table = self.store.table_template();
        self.write_item(&mut table, item);
        self.store.generator().insert(&table)
    }

    fn update_sql(&self, item: &T) -> String {
        let mut table = self.store.table_template();
        table.exclude_column(IDENTIFIER_COLUMN);
        self.write_item(&mut table, item);
        table.add_condition(identifier_condition(item.identifier()));
        self.store.generator().update(&table)
    }

    fn delete_sql(&self, item: &T) -> String {
        let mut table = self.store.table_template();
        table.add_condition(identifier_condition(item.identifier()));
        self.store.generator().delete(&table)
    }

    /// Writes the identifier column (unless excluded for this operation)
    /// and delegates the rest to the mapper.
    fn write_item(&self, table: &mut SqlTable, item: &T) {
        let identifier_excluded = table
            .column_by_name(IDENTIFIER_COLUMN)
            .is_some_and(|column| column.is_excluded());
        if !identifier_excluded {
            table.set_value(IDENTIFIER_COLUMN, item.identifier());
        }
        self.mapper.write_row(table, item);
    }
}

fn identifier_condition(identifier: ModelId) -> String {
    format!("{IDENTIFIER_COLUMN} = {identifier}")
}
