//! Persistence-coupled data provider.
//!
//! # Responsibility
//! - Bind a loader to a repository: loads pull `select()`, mutations write
//!   through after the in-memory change.
//! - Attach the affected identifier to every persistence failure.
//!
//! # Invariants
//! - The in-memory mutation is applied first and is not rolled back when
//!   the follow-up persistence call fails; the error carries the
//!   identifier so callers can reconcile.
//! - The repository is released only after any in-flight load completes.

use super::loader::{LoaderProvider, RawSource};
use super::{lock, ItemProvider, LoadingCallback, LoadingSubscription, ProviderError, ProviderResult};
use crate::model::collection::ModelCollection;
use crate::model::{Model, ModelId};
use crate::repo::{ModelRepository, RepoResult, RowMapper};
use log::info;
use std::sync::{Arc, Mutex};

struct RepositorySource<T: Model, M: RowMapper<T>> {
    repository: Arc<Mutex<ModelRepository<T, M>>>,
}

impl<T: Model, M: RowMapper<T> + 'static> RawSource<T> for RepositorySource<T, M> {
    fn fetch(&self) -> RepoResult<Vec<T>> {
        lock(&self.repository).select()
    }
}

/// Provider whose collection mirrors a repository-backed table.
pub struct DataProvider<T: Model, M: RowMapper<T> + 'static> {
    loader: LoaderProvider<T>,
    repository: Arc<Mutex<ModelRepository<T, M>>>,
}

impl<T: Model, M: RowMapper<T> + 'static> DataProvider<T, M> {
    /// Checks the backing structure, then starts the initial load.
    ///
    /// # Errors
    /// - `ProviderError::Initialization` when the database check fails.
    pub fn new(
        repository: ModelRepository<T, M>,
        factory: impl Fn() -> T + Send + Sync + 'static,
    ) -> ProviderResult<Self> {
        repository
            .check_database()
            .map_err(ProviderError::Initialization)?;

        let repository = Arc::new(Mutex::new(repository));
        let source = Arc::new(RepositorySource {
            repository: Arc::clone(&repository),
        });
        let loader = LoaderProvider::with_source(source, factory);

        let release_target = Arc::clone(&repository);
        loader.set_release_hook(Box::new(move || {
            lock(&release_target).dispose();
        }));

        let provider = Self { loader, repository };
        provider.loader.load();
        info!("event=provider_init module=provider status=ok");
        Ok(provider)
    }

    /// Runs a closure against the live collection (read-only).
    pub fn with_items<R>(&self, f: impl FnOnce(&ModelCollection<T>) -> R) -> R {
        self.loader.with_items(f)
    }

    /// Runs a closure against the live collection (mutable).
    pub fn with_items_mut<R>(&self, f: impl FnOnce(&mut ModelCollection<T>) -> R) -> R {
        self.loader.with_items_mut(f)
    }

    pub fn is_disposed(&self) -> bool {
        self.loader.is_disposed()
    }

    fn persist(
        &self,
        identifier: ModelId,
        operation: impl FnOnce(&ModelRepository<T, M>) -> RepoResult<()>,
    ) -> ProviderResult<()> {
        operation(&lock(&self.repository))
            .map_err(|source| ProviderError::Persistence { identifier, source })
    }
}

impl<T: Model, M: RowMapper<T> + 'static> ItemProvider<T> for DataProvider<T, M> {
    fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    fn items(&self) -> Vec<T> {
        self.loader.items()
    }

    fn item_count(&self) -> usize {
        self.loader.item_count()
    }

    fn new_item(&self) -> T {
        self.loader.new_item()
    }

    /// Appends in memory, then inserts into the repository.
    fn add(&self, item: T) -> ProviderResult<()> {
        let identifier = item.identifier();
        self.loader.add(item.clone())?;
        self.persist(identifier, |repository| repository.insert(&item))
    }

    fn begin_edit(&self, item: &T) -> ProviderResult<T> {
        self.loader.begin_edit(item)
    }

    /// Applies the edit in memory, then updates the repository row.
    fn end_edit(&self, edited: &T) -> ProviderResult<()> {
        self.loader.end_edit(edited)?;
        self.persist(edited.identifier(), |repository| repository.update(edited))
    }

    /// Removes in memory, then deletes the repository row.
    fn remove(&self, item: &T) -> ProviderResult<bool> {
        let removed = self.loader.remove(item)?;
        self.persist(item.identifier(), |repository| repository.delete(item))?;
        Ok(removed)
    }

    fn neighbor_of(&self, identifier: ModelId) -> Option<T> {
        self.loader.neighbor_of(identifier)
    }

    fn begin_load(&self) {
        self.loader.begin_load();
    }

    fn end_load(&self) {
        self.loader.end_load();
    }

    fn load(&self) {
        self.loader.load();
    }

    fn subscribe_loading(&self, callback: LoadingCallback) -> LoadingSubscription {
        self.loader.subscribe_loading(callback)
    }

    fn unsubscribe_loading(&self, subscription: LoadingSubscription) {
        self.loader.unsubscribe_loading(subscription)
    }

    fn dispose(&self) {
        self.loader.dispose();
    }
}
