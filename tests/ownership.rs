use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use eventkit::{
    Disposable, DisposableStore, Emitter, EmitterOptions, LifecycleError, Ownable, Throttler,
    to_disposable,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A document model: owns its change event and a save queue.
struct Document {
    store: DisposableStore,
    changed: Arc<Emitter<String>>,
    saves: Throttler<usize>,
}

impl Document {
    fn new() -> Result<Arc<Self>, LifecycleError> {
        let store = DisposableStore::new();
        let changed = store.add(Arc::new(Emitter::new()))?;
        let saves = Throttler::new();
        store.add(Arc::new(saves.clone()))?;
        Ok(Arc::new(Self {
            store,
            changed,
            saves,
        }))
    }
}

impl Ownable for Document {
    fn store(&self) -> &DisposableStore {
        &self.store
    }
}

impl Disposable for Document {
    fn dispose(&self) -> Result<(), LifecycleError> {
        self.dispose_owned()
    }
}

#[test]
fn test_disposing_root_tears_down_whole_tree() {
    init_tracing();
    let root = DisposableStore::new();
    let doc = root.add(Document::new().unwrap()).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    let sub = doc
        .changed
        .event()
        .subscribe_into(move |v: &String| s.lock().push(v.clone()), doc.store());

    let closed = Arc::new(AtomicUsize::new(0));
    let c = closed.clone();
    doc.register(to_disposable(move || {
        c.fetch_add(1, Ordering::SeqCst);
    }))
    .unwrap();

    doc.changed.fire("edit".to_string()).unwrap();
    root.dispose().unwrap();
    root.dispose().unwrap();

    assert_eq!(*seen.lock(), vec!["edit".to_string()]);
    assert!(!sub.is_active());
    assert!(doc.changed.is_disposed());
    assert!(Ownable::is_disposed(doc.as_ref()));
    assert_eq!(closed.load(Ordering::SeqCst), 1);

    doc.changed.fire("after".to_string()).unwrap();
    assert_eq!(seen.lock().len(), 1);
}

#[test]
fn test_child_failures_are_aggregated() {
    init_tracing();
    let store = DisposableStore::new();
    let survivor = Arc::new(AtomicUsize::new(0));

    store
        .add_dyn(Arc::new(Failing("first")) as Arc<dyn Disposable>)
        .unwrap();
    let s = survivor.clone();
    store
        .add(to_disposable(move || {
            s.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();
    store
        .add_dyn(Arc::new(Failing("second")) as Arc<dyn Disposable>)
        .unwrap();

    let err = store.dispose().unwrap_err();
    assert_eq!(err.failures().len(), 2);
    assert_eq!(survivor.load(Ordering::SeqCst), 1);
}

struct Failing(&'static str);

impl Disposable for Failing {
    fn dispose(&self) -> Result<(), LifecycleError> {
        Err(LifecycleError::failed(self.0))
    }
}

#[tokio::test]
async fn test_throttler_serializes_and_correlates() {
    init_tracing();
    let doc = Document::new().unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    let o1 = order.clone();
    let first = doc.saves.queue(move || async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        o1.lock().push("a");
        1
    });
    let o2 = order.clone();
    let second = doc.saves.queue(move || async move {
        o2.lock().push("b");
        2
    });

    assert_eq!(first.await.unwrap(), 1);
    assert_eq!(second.await.unwrap(), 2);
    assert_eq!(*order.lock(), vec!["a", "b"]);
    assert!(doc.saves.is_idle());

    doc.dispose().unwrap();
    assert!(doc.saves.queue(|| async { 3 }).await.is_err());
}

#[test]
fn test_leak_warning_names_repeated_site() {
    init_tracing();
    let emitter: Emitter<u32> =
        Emitter::with_options(EmitterOptions::default().with_leak_warning_threshold(2));

    let mut subs = Vec::new();
    for _ in 0..3 {
        subs.push(emitter.subscribe(|_| {}));
    }
    assert_eq!(emitter.leak_warnings(), 1);

    for s in &subs {
        s.dispose();
    }
    assert!(!emitter.has_listeners());
}
