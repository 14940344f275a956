/// Tests for MultiGroupResource

use super::*;
use crate::context::mock_context::{event_log, MockContext, MockResource, ResourceEvent};
use crate::error::Error;
use std::sync::atomic::AtomicUsize;

/// Counts how often each group built its instance
struct Counter {
    built_by: crate::context::ContextId,
    hits: usize,
}

impl SharedResource for Counter {
    fn invalidate_resource(&mut self) {}
    fn free_resource(&mut self, _context: &dyn Context) {}
}

impl FromContext for Counter {
    fn from_context(context: &dyn Context) -> Self {
        Self { built_by: context.id(), hits: 0 }
    }
}

// ============================================================================
// Tests: Lookup and creation
// ============================================================================

#[test]
fn test_ids_are_unique() {
    let first: MultiGroupResource<Counter> = MultiGroupResource::new();
    let second: MultiGroupResource<Counter> = MultiGroupResource::default();
    assert_ne!(first.id(), second.id());
    assert!(first.id().to_string().starts_with("multi#"));
}

#[test]
fn test_get_before_first_access_is_none() {
    let a = MockContext::create(None);
    let counters: MultiGroupResource<Counter> = MultiGroupResource::new();

    assert!(counters.get(&*a).is_none());
    assert_eq!(counters.group_count(), 0);
}

#[test]
fn test_value_is_shared_by_group_members() {
    let a = MockContext::create(None);
    let b = MockContext::create(Some(&a));
    let counters: MultiGroupResource<Counter> = MultiGroupResource::new();

    let from_b = counters.value(&*b).unwrap();
    from_b.lock().hits += 1;
    let from_a = counters.value(&*a).unwrap();

    assert!(Arc::ptr_eq(&from_a, &from_b));
    assert_eq!(from_a.lock().built_by, b.id());
    assert_eq!(from_a.lock().hits, 1);
    assert_eq!(a.share_group().resource_count(), 1);
}

#[test]
fn test_each_group_gets_its_own_instance() {
    let a = MockContext::create(None);
    let other = MockContext::create(None);
    let counters: MultiGroupResource<Counter> = MultiGroupResource::new();

    let in_a = counters.value(&*a).unwrap();
    let in_other = counters.value(&*other).unwrap();

    assert!(!Arc::ptr_eq(&in_a, &in_other));
    assert_eq!(counters.group_count(), 2);
    assert_eq!(counters.resources().len(), 2);
}

#[test]
fn test_value_with_runs_factory_on_first_access_only() {
    let a = MockContext::create(None);
    let events = event_log();
    let resources: MultiGroupResource<MockResource> = MultiGroupResource::new();
    let calls = AtomicUsize::new(0);

    for _ in 0..3 {
        resources
            .value_with(&*a, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                MockResource::new("cache", &events)
            })
            .unwrap();
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_value_in_destroyed_group_fails() {
    let a = MockContext::create(None);
    a.destroy();
    let counters: MultiGroupResource<Counter> = MultiGroupResource::new();

    let result = counters.value(&*a);

    assert!(matches!(result, Err(Error::GroupDestroyed(_))));
    assert_eq!(counters.group_count(), 0);
}

// ============================================================================
// Tests: Replacement and cleanup
// ============================================================================

#[test]
fn test_insert_replaces_and_invalidates_previous() {
    let a = MockContext::create(None);
    let events = event_log();
    let resources: MultiGroupResource<MockResource> = MultiGroupResource::new();

    resources.insert(&*a, MockResource::new("old", &events)).unwrap();
    let current = resources.insert(&*a, MockResource::new("new", &events)).unwrap();

    assert_eq!(*events.lock(), vec![ResourceEvent::Invalidated("old")]);
    assert!(Arc::ptr_eq(&resources.get(&*a).unwrap(), &current));
    assert_eq!(a.share_group().resource_count(), 1);
}

#[test]
fn test_cleanup_only_touches_that_group() {
    let a = MockContext::create(None);
    let other = MockContext::create(None);
    let events = event_log();
    let resources: MultiGroupResource<MockResource> = MultiGroupResource::new();
    resources.insert(&*a, MockResource::new("a", &events)).unwrap();
    resources.insert(&*other, MockResource::new("other", &events)).unwrap();

    assert!(resources.cleanup(&*a));
    assert!(!resources.cleanup(&*a));

    assert_eq!(*events.lock(), vec![ResourceEvent::Invalidated("a")]);
    assert!(resources.get(&*a).is_none());
    assert!(resources.get(&*other).is_some());
    assert_eq!(resources.group_count(), 1);
    assert_eq!(a.share_group().resource_count(), 0);
}

#[test]
fn test_group_teardown_invalidates_instance() {
    let a = MockContext::create(None);
    let other = MockContext::create(None);
    let events = event_log();
    let resources: MultiGroupResource<MockResource> = MultiGroupResource::new();
    resources.insert(&*a, MockResource::new("a", &events)).unwrap();
    resources.insert(&*other, MockResource::new("other", &events)).unwrap();

    a.destroy();

    assert_eq!(*events.lock(), vec![ResourceEvent::Invalidated("a")]);
    assert!(resources.get(&*a).is_none());
    assert_eq!(resources.group_count(), 1);

    // Cleanup after teardown finds nothing left to invalidate
    assert!(!resources.cleanup(&*a));
    assert_eq!(events.lock().len(), 1);
}

#[test]
fn test_drop_invalidates_every_live_instance() {
    let a = MockContext::create(None);
    let other = MockContext::create(None);
    let events = event_log();
    {
        let resources: MultiGroupResource<MockResource> = MultiGroupResource::new();
        resources.insert(&*a, MockResource::new("a", &events)).unwrap();
        resources.insert(&*other, MockResource::new("other", &events)).unwrap();
    }

    let mut seen = events.lock().clone();
    seen.sort_by_key(|e| format!("{:?}", e));
    assert_eq!(seen, vec![ResourceEvent::Invalidated("a"), ResourceEvent::Invalidated("other")]);
    assert_eq!(a.share_group().resource_count(), 0);
    assert_eq!(other.share_group().resource_count(), 0);
}

// ============================================================================
// Tests: Concurrency
// ============================================================================

#[test]
fn test_concurrent_first_access_keeps_one_instance() {
    let a = MockContext::create(None);
    let b = MockContext::create(Some(&a));
    let counters: MultiGroupResource<Counter> = MultiGroupResource::new();

    let seen: Vec<Arc<Mutex<Counter>>> = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..16)
            .map(|i| {
                let context = if i % 2 == 0 { a.clone() } else { b.clone() };
                let counters = &counters;
                scope.spawn(move || counters.value(&*context).unwrap())
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    for instance in &seen[1..] {
        assert!(Arc::ptr_eq(&seen[0], instance));
    }
    assert_eq!(a.share_group().resource_count(), 1);
    assert_eq!(counters.group_count(), 1);
}
