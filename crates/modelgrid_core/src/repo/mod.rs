//! Repository layer: model persistence over the SQL capability boundary.
//!
//! # Responsibility
//! - Provide stable CRUD and batch APIs over template-described tables.
//! - Keep SQL details behind the generator/executor/checker capabilities.
//!
//! # Invariants
//! - Every operation builds on a fresh clone of the stored template.
//! - The identifier column is the sole correlation key for UPDATE/DELETE.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod model_repo;
pub mod sql_repository;

pub use model_repo::{ModelRepository, ParentScope, RowMapper};
pub use sql_repository::SqlRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository persistence and query errors.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Caller misuse detectable before touching the database.
    InvalidArgument(String),
    /// A fetched row does not satisfy the mapper's expectations.
    InvalidData(String),
    /// A parent-scoped call on a repository without a configured scope.
    ParentScopeMissing,
    /// Operation on a repository whose connection was already released.
    Disposed,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::ParentScopeMissing => {
                write!(f, "repository has no parent scope configured")
            }
            Self::Disposed => write!(f, "repository has been disposed"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
