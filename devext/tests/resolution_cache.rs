use devext::{Binding, Dispatcher, ResolutionCache, ResolutionKey, testing::CallLog};
use std::{
    sync::{Arc, Barrier},
    thread,
};

mod common;
use common::{Bar, Foo, registry};

#[test]
fn test_repeated_dispatch_scans_once() {
    let log = CallLog::new();
    let dispatcher = Dispatcher::new(registry());
    let mut foo = Foo::new(&log);

    for _ in 0..5 {
        dispatcher.invoke_instance(&mut foo, "OnStart", &()).unwrap();
    }

    assert_eq!(log.count_of("Foo.start"), 5);
    assert_eq!(dispatcher.cache().scans(), 1);
    assert_eq!(dispatcher.cache().len(), 1);
}

#[test]
fn test_resolution_is_stable_across_calls() {
    let cache = ResolutionCache::new(registry());

    let first = cache.resolve_for::<Bar>("OnStart", Binding::Instance);
    let second = cache.resolve_for::<Bar>("OnStart", Binding::Instance);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.len(), 2);

    let key = ResolutionKey::of::<Bar>("OnStart", Binding::Instance);
    assert!(Arc::ptr_eq(&cache.get(&key).unwrap(), &first));
}

#[test]
fn test_empty_resolution_is_cached() {
    let cache = ResolutionCache::new(registry());

    let first = cache.resolve_for::<Foo>("Nothing", Binding::Instance);
    let second = cache.resolve_for::<Foo>("Nothing", Binding::Instance);
    assert!(first.is_empty());
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.scans(), 1);
}

#[test]
fn test_keys_are_distinct_per_type_and_hook() {
    let cache = ResolutionCache::new(registry());

    cache.resolve_for::<Foo>("OnStart", Binding::Instance);
    cache.resolve_for::<Foo>("OnStop", Binding::Instance);
    cache.resolve_for::<Bar>("OnStart", Binding::Instance);
    cache.resolve_for::<Foo>("OnStart", Binding::Static);

    assert_eq!(cache.len(), 4);
    assert!(!cache.contains(&ResolutionKey::of::<Bar>("OnStop", Binding::Instance)));
}

#[test]
fn test_concurrent_dispatch_shares_one_entry() {
    const THREADS: usize = 8;

    let dispatcher = Dispatcher::new(registry());
    let log = CallLog::new();
    let barrier = Barrier::new(THREADS);

    let resolutions: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    let mut bar = Bar::new(&log);
                    barrier.wait();
                    dispatcher.invoke_instance(&mut bar, "OnStart", &()).unwrap();
                    dispatcher.resolve::<Bar>("OnStart", Binding::Instance)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(log.count(), THREADS * 2);
    assert_eq!(dispatcher.cache().len(), 1);
    assert!(resolutions.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}
