use std::cell::Cell;
use std::sync::Arc;

use strata_chunk::PatchContainer;
use strata_geom::{Box2, IVec2};
use strata_runtime::{PatchCache, TaskError};
use strata_world::PatchKey;

const TILE: i32 = 16;

fn span(x0: i32, x1: i32) -> Box2 {
    Box2::new(IVec2::new(x0 * TILE, 0), IVec2::new(x1 * TILE, TILE))
}

fn blank(key: PatchKey) -> Result<PatchContainer, TaskError> {
    Ok(PatchContainer::new(key, TILE as u32, 1))
}

#[test]
fn moving_window_keeps_retained_patches() {
    let cache = PatchCache::new(TILE as u32);
    let calls = Cell::new(0);
    let baker = |key: PatchKey| {
        calls.set(calls.get() + 1);
        blank(key)
    };

    let steps: Vec<_> = cache.refresh_and_populate(span(0, 2), &baker).unwrap().collect();
    assert_eq!(steps.len(), 2);
    assert_eq!(calls.get(), 2);
    let shared = cache.get(PatchKey::new(1, 0)).unwrap();

    let population = cache.refresh_and_populate(span(1, 3), &baker).unwrap();
    let diff = population.diff().clone();
    assert_eq!(diff.added, vec![PatchKey::new(2, 0)]);
    assert_eq!(diff.removed, vec![PatchKey::new(0, 0)]);
    assert_eq!(diff.retained, vec![PatchKey::new(1, 0)]);
    assert_eq!(population.count(), 1);
    assert_eq!(calls.get(), 3);

    let again = cache.get(PatchKey::new(1, 0)).unwrap();
    assert!(Arc::ptr_eq(&shared, &again));
    assert!(cache.get(PatchKey::new(0, 0)).is_none());
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn refreshing_the_same_region_is_idempotent() {
    let cache = PatchCache::new(TILE as u32);
    let region = Box2::new(IVec2::new(-20, -5), IVec2::new(40, 30));
    cache.refresh_and_populate(region, &blank).unwrap().for_each(drop);
    let before = cache.keys();
    let snapshot: Vec<_> = before.iter().map(|k| cache.get(*k).unwrap()).collect();

    let diff = cache.refresh(region).unwrap();
    assert!(diff.is_unchanged());
    assert!(diff.missing.is_empty());
    assert_eq!(diff.retained, before);
    assert_eq!(cache.keys(), before);
    for (key, old) in before.iter().zip(&snapshot) {
        assert!(Arc::ptr_eq(old, &cache.get(*key).unwrap()));
    }
}

#[test]
fn population_yields_in_enumeration_order() {
    let cache = PatchCache::new(TILE as u32);
    let region = Box2::new(IVec2::new(0, 0), IVec2::new(3 * TILE, 2 * TILE));
    let keys: Vec<_> = cache
        .refresh_and_populate(region, &blank)
        .unwrap()
        .map(|step| step.key)
        .collect();
    assert_eq!(keys, cache.keys());
    assert_eq!(
        &keys[..3],
        &[PatchKey::new(0, 0), PatchKey::new(0, 1), PatchKey::new(1, 0)]
    );
}

#[test]
fn patches_are_readable_as_soon_as_yielded() {
    let cache = PatchCache::new(TILE as u32);
    let mut population = cache.refresh_and_populate(span(0, 3), &blank).unwrap();
    let first = population.next().unwrap();
    assert_eq!(first.key, PatchKey::new(0, 0));
    assert_eq!(population.remaining(), 2);
    assert!(cache.get(PatchKey::new(0, 0)).is_some());
    assert!(cache.get(PatchKey::new(2, 0)).is_none());
}

#[test]
fn failed_bake_leaves_the_key_missing() {
    let cache = PatchCache::new(TILE as u32);
    let flaky = |key: PatchKey| {
        if key == PatchKey::new(1, 0) {
            Err(TaskError::Failed("no terrain".into()))
        } else {
            blank(key)
        }
    };
    let steps: Vec<_> = cache.refresh_and_populate(span(0, 3), &flaky).unwrap().collect();
    assert_eq!(steps.len(), 3);
    assert!(steps[0].result.is_ok());
    assert_eq!(
        steps[1].result.as_ref().unwrap_err(),
        &TaskError::Failed("no terrain".into())
    );
    assert!(steps[2].result.is_ok());
    assert_eq!(cache.missing_keys(), vec![PatchKey::new(1, 0)]);

    let diff = cache.refresh(span(0, 3)).unwrap();
    assert_eq!(diff.missing, vec![PatchKey::new(1, 0)]);
    let retry: Vec<_> = cache.refresh_and_populate(span(0, 3), &blank).unwrap().collect();
    assert_eq!(retry.len(), 1);
    assert!(cache.missing_keys().is_empty());
}

#[test]
fn baker_returning_the_wrong_key_is_rejected() {
    let cache = PatchCache::new(TILE as u32);
    let wrong = |key: PatchKey| blank(key.offset(5, 5));
    let steps: Vec<_> = cache.refresh_and_populate(span(0, 1), &wrong).unwrap().collect();
    assert!(matches!(steps[0].result, Err(TaskError::Failed(_))));
    assert_eq!(cache.missing_keys(), vec![PatchKey::new(0, 0)]);
}

#[test]
fn refresh_during_population_is_a_no_op() {
    let cache = PatchCache::new(TILE as u32);
    let population = cache.refresh_and_populate(span(0, 2), &blank).unwrap();
    assert!(cache.is_refreshing());
    assert!(cache.refresh(span(4, 6)).is_none());
    assert!(cache.refresh_and_populate(span(4, 6), &blank).is_none());
    assert_eq!(cache.keys(), vec![PatchKey::new(0, 0), PatchKey::new(1, 0)]);

    drop(population);
    assert!(!cache.is_refreshing());
    let diff = cache.refresh(span(4, 6)).unwrap();
    assert_eq!(diff.removed.len(), 2);
}
