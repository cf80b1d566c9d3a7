//! Provider layer: observable in-memory collections over repositories.
//!
//! # Responsibility
//! - Orchestrate asynchronous loading, edit sessions and persistence-coupled
//!   mutation for grid-style consumers.
//! - Convert repository failures into provider errors carrying the affected
//!   identifier.
//!
//! # Invariants
//! - Cancellation is a clean termination, never an error.
//! - The loading flag is reference counted; only 0↔1 edges are observable.

use crate::model::{Model, ModelId};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub mod data;
pub mod grid;
pub mod loader;

pub use data::DataProvider;
pub use grid::{ButtonName, DataGridProvider, RemoveConfirmation};
pub use loader::{LoaderProvider, RawSource};

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Provider-level errors: caller misuse, wrapped persistence failures and
/// initialization failures. Cancellation is never represented here.
#[derive(Debug)]
pub enum ProviderError {
    /// Synchronous caller misuse.
    Argument(String),
    /// Edit/removal target not present in the collection.
    ItemNotFound(ModelId),
    /// Repository failure during a persistence-coupled mutation. The
    /// in-memory change has already been applied and is not rolled back.
    Persistence {
        identifier: ModelId,
        source: RepoError,
    },
    /// Construction-time database check failure.
    Initialization(RepoError),
    /// Operation on a disposed provider.
    Disposed,
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Argument(message) => write!(f, "invalid argument: {message}"),
            Self::ItemNotFound(identifier) => {
                write!(f, "no item with identifier {identifier} in the collection")
            }
            Self::Persistence { identifier, source } => {
                write!(f, "persistence failed for item {identifier}: {source}")
            }
            Self::Initialization(source) => {
                write!(f, "provider initialization failed: {source}")
            }
            Self::Disposed => write!(f, "provider has been disposed"),
        }
    }
}

impl Error for ProviderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence { source, .. } | Self::Initialization(source) => Some(source),
            _ => None,
        }
    }
}

/// Callback fired on loading-state edges with the new `is_loading` value.
pub type LoadingCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Handle for cancelling a loading-state subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadingSubscription(pub(crate) u64);

/// The collection-provider contract grid consumers program against.
///
/// Implemented by [`LoaderProvider`] (in-memory only) and [`DataProvider`]
/// (persistence-coupled).
pub trait ItemProvider<T: Model>: Send + Sync {
    /// Whether a loading session is active (reference count above zero).
    fn is_loading(&self) -> bool;

    /// Snapshot of the collection in display order.
    fn items(&self) -> Vec<T>;

    fn item_count(&self) -> usize;

    /// Builds a fresh default item from the injected factory.
    fn new_item(&self) -> T;

    fn add(&self, item: T) -> ProviderResult<()>;

    /// Returns an edit clone of an item currently in the collection.
    fn begin_edit(&self, item: &T) -> ProviderResult<T>;

    /// Copies an edit clone's fields back onto the tracked instance.
    fn end_edit(&self, edited: &T) -> ProviderResult<()>;

    /// Removes by identifier; returns whether an item was found.
    fn remove(&self, item: &T) -> ProviderResult<bool>;

    /// Item nearest to `identifier` by absolute identifier distance
    /// (first-encountered wins on ties).
    fn neighbor_of(&self, identifier: ModelId) -> Option<T>;

    fn begin_load(&self);

    fn end_load(&self);

    /// Starts one background load from the raw source.
    fn load(&self);

    fn subscribe_loading(&self, callback: LoadingCallback) -> LoadingSubscription;

    fn unsubscribe_loading(&self, subscription: LoadingSubscription);

    /// Idempotent teardown; cancels any in-flight load first.
    fn dispose(&self);
}

/// Locks a mutex, recovering the inner data if a writer panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
