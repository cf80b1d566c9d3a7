mod common;

use common::{wait_until, Person};
use modelgrid_core::{
    IdAllocator, ItemProvider, LoaderProvider, ProviderError, RawSource, RepoResult,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

struct VecSource {
    items: Vec<Person>,
}

impl RawSource<Person> for VecSource {
    fn fetch(&self) -> RepoResult<Vec<Person>> {
        Ok(self.items.clone())
    }
}

/// Source whose fetch blocks until the test opens the gate, making the
/// in-flight window observable.
struct GatedSource {
    gate: Arc<(Mutex<bool>, Condvar)>,
    entered: Arc<AtomicBool>,
    items: Vec<Person>,
}

impl RawSource<Person> for GatedSource {
    fn fetch(&self) -> RepoResult<Vec<Person>> {
        self.entered.store(true, Ordering::SeqCst);
        let (open, signal) = &*self.gate;
        let mut guard = open.lock().unwrap();
        while !*guard {
            guard = signal.wait(guard).unwrap();
        }
        Ok(self.items.clone())
    }
}

fn open_gate(gate: &Arc<(Mutex<bool>, Condvar)>) {
    let (open, signal) = &**gate;
    *open.lock().unwrap() = true;
    signal.notify_all();
}

fn people(ids: &[u64]) -> Vec<Person> {
    ids.iter()
        .map(|id| Person::with_id(*id, &format!("person-{id}")))
        .collect()
}

fn default_factory() -> impl Fn() -> Person + Send + Sync + 'static {
    let allocator = IdAllocator::starting_after(1_000);
    move || Person::with_id(allocator.next(), "fresh")
}

const LOAD_TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn load_pulls_every_source_item_into_the_collection() {
    let loader = LoaderProvider::with_source(
        Arc::new(VecSource {
            items: people(&[1, 2, 3]),
        }),
        default_factory(),
    );

    loader.load();
    assert!(wait_until(LOAD_TIMEOUT, || !loader.is_loading()));

    let loaded: Vec<u64> = loader.items().iter().map(|p| p.identifier).collect();
    assert_eq!(loaded, vec![1, 2, 3]);
}

#[test]
fn load_without_a_source_yields_an_empty_collection() {
    let loader: LoaderProvider<Person> = LoaderProvider::new(default_factory());

    loader.load();
    assert!(wait_until(LOAD_TIMEOUT, || !loader.is_loading()));
    assert_eq!(loader.item_count(), 0);
}

#[test]
fn load_appends_as_one_batched_change() {
    let loader = LoaderProvider::with_source(
        Arc::new(VecSource {
            items: people(&[1, 2, 3]),
        }),
        default_factory(),
    );
    let events = loader.with_items_mut(|items| items.subscribe().1);

    loader.load();
    assert!(wait_until(LOAD_TIMEOUT, || !loader.is_loading()));
    assert!(wait_until(LOAD_TIMEOUT, || loader.item_count() == 3));

    assert_eq!(
        events.try_recv().unwrap(),
        modelgrid_core::CollectionEvent::Reset
    );
    assert!(events.try_recv().is_err());
}

#[test]
fn loading_notification_fires_only_on_edges() {
    let loader: LoaderProvider<Person> = LoaderProvider::new(default_factory());
    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&observed);
    loader.subscribe_loading(Arc::new(move |is_loading| {
        sink.lock().unwrap().push(is_loading);
    }));

    loader.begin_load();
    loader.begin_load();
    loader.begin_load();
    loader.end_load();
    loader.end_load();
    loader.end_load();

    assert_eq!(*observed.lock().unwrap(), vec![true, false]);
}

#[test]
fn unsubscribed_callbacks_stop_firing() {
    let loader: LoaderProvider<Person> = LoaderProvider::new(default_factory());
    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&observed);
    let subscription = loader.subscribe_loading(Arc::new(move |is_loading| {
        sink.lock().unwrap().push(is_loading);
    }));

    loader.unsubscribe_loading(subscription);
    loader.begin_load();
    loader.end_load();

    assert!(observed.lock().unwrap().is_empty());
}

#[test]
fn overlapping_loads_share_one_loading_session() {
    let gate = Arc::new((Mutex::new(false), Condvar::new()));
    let entered = Arc::new(AtomicBool::new(false));
    let loader = LoaderProvider::with_source(
        Arc::new(GatedSource {
            gate: Arc::clone(&gate),
            entered: Arc::clone(&entered),
            items: people(&[1]),
        }),
        default_factory(),
    );
    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&observed);
    loader.subscribe_loading(Arc::new(move |is_loading| {
        sink.lock().unwrap().push(is_loading);
    }));

    loader.load();
    loader.load();
    open_gate(&gate);
    assert!(wait_until(LOAD_TIMEOUT, || !loader.is_loading()));

    assert_eq!(*observed.lock().unwrap(), vec![true, false]);
}

#[test]
fn begin_edit_returns_a_clone_of_a_tracked_item() {
    let loader: LoaderProvider<Person> = LoaderProvider::new(default_factory());
    let tracked = Person::with_id(1, "original");
    loader.add(tracked.clone()).unwrap();

    let mut draft = loader.begin_edit(&tracked).unwrap();
    draft.name = "draft".to_string();

    // The draft is detached until end_edit copies it back.
    assert_eq!(loader.items()[0].name, "original");
}

#[test]
fn begin_edit_rejects_items_outside_the_collection() {
    let loader: LoaderProvider<Person> = LoaderProvider::new(default_factory());
    let stranger = Person::with_id(99, "stranger");

    let result = loader.begin_edit(&stranger);
    assert!(matches!(result, Err(ProviderError::ItemNotFound(99))));
    assert_eq!(loader.item_count(), 0);
}

#[test]
fn end_edit_mutates_the_tracked_instance_in_place() {
    let loader: LoaderProvider<Person> = LoaderProvider::new(default_factory());
    loader.add(Person::with_id(1, "a")).unwrap();
    loader.add(Person::with_id(2, "b")).unwrap();

    let mut draft = loader.begin_edit(&loader.items()[0]).unwrap();
    draft.name = "edited".to_string();
    loader.end_edit(&draft).unwrap();

    let items = loader.items();
    assert_eq!(items[0].name, "edited");
    assert_eq!(items[0].identifier, 1);
    assert_eq!(items.len(), 2);
}

#[test]
fn end_edit_rejects_unknown_identifiers() {
    let loader: LoaderProvider<Person> = LoaderProvider::new(default_factory());
    loader.add(Person::with_id(1, "a")).unwrap();

    let stranger = Person::with_id(99, "stranger");
    assert!(matches!(
        loader.end_edit(&stranger),
        Err(ProviderError::ItemNotFound(99))
    ));
    assert_eq!(loader.items()[0].name, "a");
}

#[test]
fn remove_reports_whether_an_item_was_found() {
    let loader: LoaderProvider<Person> = LoaderProvider::new(default_factory());
    let item = Person::with_id(1, "a");
    loader.add(item.clone()).unwrap();

    assert!(loader.remove(&item).unwrap());
    assert!(!loader.remove(&item).unwrap());
    assert_eq!(loader.item_count(), 0);
}

#[test]
fn new_item_comes_from_the_injected_factory() {
    let loader: LoaderProvider<Person> = LoaderProvider::new(default_factory());
    let first = loader.new_item();
    let second = loader.new_item();
    assert!(second.identifier > first.identifier);
}

#[test]
fn dispose_waits_for_the_inflight_load_before_releasing() {
    let gate = Arc::new((Mutex::new(false), Condvar::new()));
    let entered = Arc::new(AtomicBool::new(false));
    let loader = LoaderProvider::with_source(
        Arc::new(GatedSource {
            gate: Arc::clone(&gate),
            entered: Arc::clone(&entered),
            items: people(&[1]),
        }),
        default_factory(),
    );
    let released = Arc::new(AtomicBool::new(false));
    let release_flag = Arc::clone(&released);
    loader.set_release_hook(Box::new(move || {
        release_flag.store(true, Ordering::SeqCst);
    }));

    loader.load();
    assert!(wait_until(LOAD_TIMEOUT, || entered.load(Ordering::SeqCst)));

    loader.dispose();
    std::thread::sleep(Duration::from_millis(50));
    assert!(
        !released.load(Ordering::SeqCst),
        "release must not run while the load thread is inside the source"
    );

    open_gate(&gate);
    assert!(wait_until(LOAD_TIMEOUT, || released.load(Ordering::SeqCst)));
}

#[test]
fn dispose_without_inflight_load_releases_immediately() {
    let loader: LoaderProvider<Person> = LoaderProvider::new(default_factory());
    let released = Arc::new(AtomicBool::new(false));
    let release_flag = Arc::clone(&released);
    loader.set_release_hook(Box::new(move || {
        release_flag.store(true, Ordering::SeqCst);
    }));

    loader.dispose();
    assert!(released.load(Ordering::SeqCst));

    // Second dispose is a no-op.
    loader.dispose();
}

#[test]
fn cancelled_load_discards_partial_results_silently() {
    let gate = Arc::new((Mutex::new(false), Condvar::new()));
    let entered = Arc::new(AtomicBool::new(false));
    let loader = LoaderProvider::with_source(
        Arc::new(GatedSource {
            gate: Arc::clone(&gate),
            entered: Arc::clone(&entered),
            items: people(&[1, 2, 3]),
        }),
        default_factory(),
    );

    loader.load();
    assert!(wait_until(LOAD_TIMEOUT, || entered.load(Ordering::SeqCst)));

    // Dispose requests cancellation while the source is still blocked; the
    // fetched batch must be thrown away, not published.
    loader.dispose();
    open_gate(&gate);

    assert!(wait_until(LOAD_TIMEOUT, || !loader.is_loading()));
    assert_eq!(loader.item_count(), 0);
}
