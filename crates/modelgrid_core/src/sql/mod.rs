//! SQL capability boundary: templates, generation, execution, checking.
//!
//! # Responsibility
//! - Describe target tables as reusable, clone-before-use templates.
//! - Generate dialect-specific SQL strings from templates.
//! - Execute single statements, rowset queries and ordered batches.
//!
//! # Invariants
//! - Templates are never shared live between queries; callers clone first.
//! - Batch execution preserves queue order and is atomic as a whole.

pub mod checker;
pub mod executor;
pub mod query;
pub mod table;
pub mod value;

pub use checker::{DbChecker, SqliteChecker};
pub use executor::{SqlExecutor, SqlRow, SqliteExecutor};
pub use query::{generator_for, DatabaseKind, MySqlQueryGenerator, QueryGenerator, SqliteQueryGenerator};
pub use table::{SqlColumn, SqlTable, SqlType};
pub use value::SqlValue;

/// Column holding the item identifier in every mapped table.
pub const IDENTIFIER_COLUMN: &str = "identifier";
