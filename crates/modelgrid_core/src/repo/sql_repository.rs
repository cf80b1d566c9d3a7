//! Connection-owning capability holder for SQL repositories.
//!
//! # Responsibility
//! - Own one database connection and the table template built over it.
//! - Carry the injected generator/executor/checker capabilities.
//!
//! # Invariants
//! - The stored template is only ever handed out as a deep clone.
//! - Disposal releases the connection exactly once; later operations fail
//!   with `RepoError::Disposed`.

use super::{RepoError, RepoResult};
use crate::sql::{
    generator_for, DatabaseKind, DbChecker, QueryGenerator, SqlExecutor, SqlTable,
    SqliteChecker, SqliteExecutor, IDENTIFIER_COLUMN,
};
use log::{debug, info};
use rusqlite::Connection;

/// Base persistence wrapper: one connection, one template, three injected
/// capabilities.
pub struct SqlRepository {
    conn: Option<Connection>,
    template: SqlTable,
    generator: Box<dyn QueryGenerator>,
    executor: Box<dyn SqlExecutor>,
    checker: Box<dyn DbChecker>,
}

impl SqlRepository {
    /// Creates a repository with the default capabilities for `kind`.
    ///
    /// # Errors
    /// - `RepoError::InvalidArgument` when the template has no identifier
    ///   column.
    pub fn new(kind: DatabaseKind, conn: Connection, template: SqlTable) -> RepoResult<Self> {
        Self::with_capabilities(
            conn,
            template,
            generator_for(kind),
            Box::new(SqliteExecutor::new()),
            Box::new(SqliteChecker::new()),
        )
    }

    /// Creates a repository with explicitly injected capabilities.
    pub fn with_capabilities(
        conn: Connection,
        template: SqlTable,
        generator: Box<dyn QueryGenerator>,
        executor: Box<dyn SqlExecutor>,
        checker: Box<dyn DbChecker>,
    ) -> RepoResult<Self> {
        if !template.has_column(IDENTIFIER_COLUMN) {
            return Err(RepoError::InvalidArgument(format!(
                "table template `{}` declares no `{IDENTIFIER_COLUMN}` column",
                template.name()
            )));
        }
        Ok(Self {
            conn: Some(conn),
            template,
            generator,
            executor,
            checker,
        })
    }

    /// Verifies the backing structure exists, creating it when missing.
    ///
    /// Safe to call repeatedly.
    pub fn check_database(&self) -> RepoResult<()> {
        let conn = self.conn()?;
        self.checker.check(conn, &self.template)?;
        info!(
            "event=db_check module=repo status=ok table={}",
            self.template.name()
        );
        Ok(())
    }

    /// Deep clone of the stored template for one operation.
    ///
    /// Mutations on the clone never leak back into the stored template.
    pub fn table_template(&self) -> SqlTable {
        self.template.clone()
    }

    /// Releases the connection. Idempotent.
    pub fn dispose(&mut self) {
        if let Some(conn) = self.conn.take() {
            drop(conn);
            debug!(
                "event=repo_dispose module=repo status=ok table={}",
                self.template.name()
            );
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.conn.is_none()
    }

    pub(crate) fn conn(&self) -> RepoResult<&Connection> {
        self.conn.as_ref().ok_or(RepoError::Disposed)
    }

    pub(crate) fn generator(&self) -> &dyn QueryGenerator {
        self.generator.as_ref()
    }

    pub(crate) fn executor(&self) -> &dyn SqlExecutor {
        self.executor.as_ref()
    }
}
