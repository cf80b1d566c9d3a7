//! Data-access toolkit: model/row mapping with grid-facing providers.
//! This crate is the single source of truth for persistence and loading
//! invariants; hosts wire UI and dependency injection around it.

pub mod db;
pub mod logging;
pub mod model;
pub mod provider;
pub mod repo;
pub mod sql;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::collection::{CollectionEvent, ModelCollection, SubscriptionId};
pub use model::id::IdAllocator;
pub use model::{DependentModel, Model, ModelId};
pub use provider::{
    ButtonName, DataGridProvider, DataProvider, ItemProvider, LoaderProvider, LoadingCallback,
    LoadingSubscription, ProviderError, ProviderResult, RawSource, RemoveConfirmation,
};
pub use repo::{ModelRepository, ParentScope, RepoError, RepoResult, RowMapper, SqlRepository};
pub use sql::{
    generator_for, DatabaseKind, DbChecker, QueryGenerator, SqlColumn, SqlExecutor, SqlRow,
    SqlTable, SqlType, SqlValue, SqliteChecker, SqliteExecutor, IDENTIFIER_COLUMN,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
