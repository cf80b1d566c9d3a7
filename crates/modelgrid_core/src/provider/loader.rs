//! Asynchronous collection loader with reference-counted loading state.
//!
//! # Responsibility
//! - Pull items from a raw source on a background thread and publish them
//!   into the observable collection as one batch.
//! - Track overlapping load requests behind a single loading flag.
//!
//! # Invariants
//! - The loading notification fires exactly once per 0→1 and 1→0 edge.
//! - Cancellation discards the current call's partial results only;
//!   previously loaded items stay untouched.
//! - Disposal never releases resources while a load thread is running.

use super::{lock, ItemProvider, LoadingCallback, LoadingSubscription, ProviderError, ProviderResult};
use crate::model::collection::ModelCollection;
use crate::model::{Model, ModelId};
use crate::repo::RepoResult;
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Source of items for a load pass.
///
/// An absent source yields an empty result, not an error.
pub trait RawSource<T: Model>: Send + Sync {
    fn fetch(&self) -> RepoResult<Vec<T>>;
}

struct LoaderShared<T: Model> {
    items: Mutex<ModelCollection<T>>,
    loading_counter: AtomicI32,
    cancelled: AtomicBool,
    disposed: AtomicBool,
    load_generation: AtomicU64,
    load_task: Mutex<Option<(u64, JoinHandle<()>)>>,
    subscribers: Mutex<Vec<(u64, LoadingCallback)>>,
    next_subscription: AtomicU64,
    release: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl<T: Model> LoaderShared<T> {
    fn begin_load(&self) {
        if self.loading_counter.fetch_add(1, Ordering::SeqCst) + 1 == 1 {
            self.notify_loading(true);
        }
    }

    fn end_load(&self) {
        if self.loading_counter.fetch_sub(1, Ordering::SeqCst) - 1 == 0 {
            self.notify_loading(false);
        }
    }

    /// Fires loading callbacks outside any lock; suppressed after dispose.
    fn notify_loading(&self, is_loading: bool) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        let callbacks: Vec<LoadingCallback> = lock(&self.subscribers)
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(is_loading);
        }
    }

    fn run_release(&self) {
        if let Some(hook) = lock(&self.release).take() {
            hook();
        }
        debug!("event=provider_release module=provider status=ok");
    }
}

enum Collected<T> {
    Items(Vec<T>),
    Cancelled,
    Failed(crate::repo::RepoError),
}

/// Collection loader driving one background thread per `load` call.
pub struct LoaderProvider<T: Model> {
    shared: Arc<LoaderShared<T>>,
    source: Option<Arc<dyn RawSource<T>>>,
    factory: Arc<dyn Fn() -> T + Send + Sync>,
}

impl<T: Model> LoaderProvider<T> {
    /// Creates a loader without a raw source; `load` yields an empty batch.
    pub fn new(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self::build(None, factory)
    }

    /// Creates a loader pulling from the given source.
    pub fn with_source(
        source: Arc<dyn RawSource<T>>,
        factory: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        Self::build(Some(source), factory)
    }

    fn build(
        source: Option<Arc<dyn RawSource<T>>>,
        factory: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            shared: Arc::new(LoaderShared {
                items: Mutex::new(ModelCollection::new()),
                loading_counter: AtomicI32::new(0),
                cancelled: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                load_generation: AtomicU64::new(0),
                load_task: Mutex::new(None),
                subscribers: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(0),
                release: Mutex::new(None),
            }),
            source,
            factory: Arc::new(factory),
        }
    }

    /// Registers teardown work to run once the provider is disposed and no
    /// load thread can touch shared resources anymore.
    pub fn set_release_hook(&self, hook: Box<dyn FnOnce() + Send>) {
        *lock(&self.shared.release) = Some(hook);
    }

    /// Runs a closure against the live collection (read-only).
    pub fn with_items<R>(&self, f: impl FnOnce(&ModelCollection<T>) -> R) -> R {
        f(&lock(&self.shared.items))
    }

    /// Runs a closure against the live collection (mutable), e.g. to
    /// subscribe to change events or sort in place.
    pub fn with_items_mut<R>(&self, f: impl FnOnce(&mut ModelCollection<T>) -> R) -> R {
        f(&mut lock(&self.shared.items))
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::SeqCst)
    }

    fn spawn_load(&self) {
        let generation = self.shared.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let shared = Arc::clone(&self.shared);
        let source = self.source.clone();

        // Hold the slot lock across the spawn so the worker's final
        // slot-clear cannot run before the handle is stored.
        let mut slot = lock(&self.shared.load_task);
        let handle = thread::spawn(move || run_load(shared, source, generation));
        *slot = Some((generation, handle));
    }
}

fn run_load<T: Model>(
    shared: Arc<LoaderShared<T>>,
    source: Option<Arc<dyn RawSource<T>>>,
    generation: u64,
) {
    let started_at = Instant::now();
    debug!("event=provider_load module=provider status=start");

    match collect_items(source.as_deref(), &shared) {
        Collected::Items(batch) => {
            let count = batch.len();
            lock(&shared.items).append_range(batch);
            info!(
                "event=provider_load module=provider status=ok count={count} duration_ms={}",
                started_at.elapsed().as_millis()
            );
        }
        Collected::Cancelled => {
            info!(
                "event=provider_load module=provider status=cancelled duration_ms={}",
                started_at.elapsed().as_millis()
            );
        }
        Collected::Failed(err) => {
            error!(
                "event=provider_load module=provider status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
        }
    }

    shared.end_load();

    let mut slot = lock(&shared.load_task);
    if slot.as_ref().is_some_and(|(current, _)| *current == generation) {
        *slot = None;
    }
}

/// Copies items out of the source, checking the cancellation flag between
/// items. Cancellation wins over partially accumulated results.
fn collect_items<T: Model>(
    source: Option<&dyn RawSource<T>>,
    shared: &LoaderShared<T>,
) -> Collected<T> {
    let Some(source) = source else {
        return Collected::Items(Vec::new());
    };
    if shared.cancelled.load(Ordering::SeqCst) {
        return Collected::Cancelled;
    }
    let raw = match source.fetch() {
        Ok(items) => items,
        Err(err) => return Collected::Failed(err),
    };
    let mut prepared = Vec::with_capacity(raw.len());
    for item in raw {
        if shared.cancelled.load(Ordering::SeqCst) {
            return Collected::Cancelled;
        }
        prepared.push(item);
    }
    Collected::Items(prepared)
}

impl<T: Model> ItemProvider<T> for LoaderProvider<T> {
    fn is_loading(&self) -> bool {
        self.shared.loading_counter.load(Ordering::SeqCst) > 0
    }

    fn items(&self) -> Vec<T> {
        lock(&self.shared.items).clone_items()
    }

    fn item_count(&self) -> usize {
        lock(&self.shared.items).len()
    }

    fn new_item(&self) -> T {
        (self.factory)()
    }

    fn add(&self, item: T) -> ProviderResult<()> {
        lock(&self.shared.items).push(item);
        Ok(())
    }

    fn begin_edit(&self, item: &T) -> ProviderResult<T> {
        let identifier = item.identifier();
        if lock(&self.shared.items).contains_identifier(identifier) {
            Ok(item.clone())
        } else {
            Err(ProviderError::ItemNotFound(identifier))
        }
    }

    fn end_edit(&self, edited: &T) -> ProviderResult<()> {
        if lock(&self.shared.items).apply_edit(edited) {
            Ok(())
        } else {
            Err(ProviderError::ItemNotFound(edited.identifier()))
        }
    }

    fn remove(&self, item: &T) -> ProviderResult<bool> {
        Ok(lock(&self.shared.items)
            .remove_by_identifier(item.identifier())
            .is_some())
    }

    fn neighbor_of(&self, identifier: ModelId) -> Option<T> {
        lock(&self.shared.items).neighbor(identifier).cloned()
    }

    fn begin_load(&self) {
        self.shared.begin_load();
    }

    fn end_load(&self) {
        self.shared.end_load();
    }

    fn load(&self) {
        if self.is_disposed() {
            return;
        }
        self.shared.begin_load();
        self.spawn_load();
    }

    fn subscribe_loading(&self, callback: LoadingCallback) -> LoadingSubscription {
        let id = self
            .shared
            .next_subscription
            .fetch_add(1, Ordering::SeqCst)
            + 1;
        lock(&self.shared.subscribers).push((id, callback));
        LoadingSubscription(id)
    }

    fn unsubscribe_loading(&self, subscription: LoadingSubscription) {
        lock(&self.shared.subscribers).retain(|(id, _)| *id != subscription.0);
    }

    fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.cancelled.store(true, Ordering::SeqCst);
        let task = lock(&self.shared.load_task).take();
        let shared = Arc::clone(&self.shared);
        match task {
            // A load is in flight: release only after it has fully
            // completed, without blocking the caller.
            Some((_, handle)) => {
                thread::spawn(move || {
                    let _ = handle.join();
                    shared.run_release();
                });
            }
            None => shared.run_release(),
        }
        debug!("event=provider_dispose module=provider status=ok");
    }
}

impl<T: Model> Drop for LoaderProvider<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}
