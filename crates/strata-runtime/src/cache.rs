use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use hashbrown::{HashMap, HashSet};
use strata_chunk::PatchContainer;
use strata_geom::Box2;
use strata_world::{PatchKey, keys_for_region};

use crate::baker::PatchBaker;
use crate::task::TaskError;

/// Key movement produced by one refresh, each list in enumeration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefreshDiff {
    pub added: Vec<PatchKey>,
    pub removed: Vec<PatchKey>,
    pub retained: Vec<PatchKey>,
    /// Keys of the new window with no patch yet.
    pub missing: Vec<PatchKey>,
}

impl RefreshDiff {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatchCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub missing: usize,
}

#[derive(Default)]
struct Window {
    region: Option<Box2>,
    order: Vec<PatchKey>,
    slots: HashMap<PatchKey, Option<Arc<PatchContainer>>>,
}

/// Patch-indexed cache over a rectangular window of the world.
///
/// Only one refresh runs at a time; a refresh started while another holds the
/// guard returns `None` without touching the cache.
pub struct PatchCache {
    tile_size: i32,
    refreshing: AtomicBool,
    window: RwLock<Window>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

struct RefreshGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl PatchCache {
    pub fn new(tile_size: u32) -> Self {
        Self {
            tile_size: tile_size as i32,
            refreshing: AtomicBool::new(false),
            window: RwLock::new(Window::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn tile_size(&self) -> i32 {
        self.tile_size
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    pub fn region(&self) -> Option<Box2> {
        self.read().region
    }

    fn read(&self) -> RwLockReadGuard<'_, Window> {
        self.window.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Window> {
        self.window.write().unwrap_or_else(|e| e.into_inner())
    }

    fn try_guard(&self) -> Option<RefreshGuard<'_>> {
        self.refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RefreshGuard {
                flag: &self.refreshing,
            })
    }

    /// Moves the window to `region`: new keys get empty slots, keys outside
    /// are evicted, retained keys keep their patch untouched.
    pub fn refresh(&self, region: Box2) -> Option<RefreshDiff> {
        let Some(_guard) = self.try_guard() else {
            log::debug!("refresh skipped: another refresh is running");
            return None;
        };
        Some(self.apply_region(region))
    }

    /// Refreshes, then bakes every missing key through `baker` as the returned
    /// iterator is driven. The refresh guard is held until it is dropped.
    pub fn refresh_and_populate<'a, B: PatchBaker>(
        &'a self,
        region: Box2,
        baker: &'a B,
    ) -> Option<Population<'a, B>> {
        let Some(guard) = self.try_guard() else {
            log::debug!("populate skipped: another refresh is running");
            return None;
        };
        let diff = self.apply_region(region);
        let queue = diff
            .missing
            .iter()
            .map(|k| (*k, baker.start(*k)))
            .collect();
        Some(Population {
            cache: self,
            baker,
            diff,
            queue,
            _guard: guard,
        })
    }

    fn apply_region(&self, region: Box2) -> RefreshDiff {
        let keys = keys_for_region(region, self.tile_size);
        let mut diff = RefreshDiff::default();
        let mut guard = self.write();
        let w = &mut *guard;

        let wanted: HashSet<PatchKey> = keys.iter().copied().collect();
        for k in &w.order {
            if !wanted.contains(k) {
                diff.removed.push(*k);
            }
        }
        for k in &diff.removed {
            if let Some(Some(_)) = w.slots.remove(k) {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        for k in &keys {
            match w.slots.get(k) {
                Some(slot) => {
                    diff.retained.push(*k);
                    if slot.is_none() {
                        diff.missing.push(*k);
                    }
                }
                None => {
                    w.slots.insert(*k, None);
                    diff.added.push(*k);
                    diff.missing.push(*k);
                }
            }
        }
        w.order = keys;
        w.region = Some(region);
        drop(guard);

        log::debug!(
            "patch cache refresh: +{} -{} ={} ({} missing)",
            diff.added.len(),
            diff.removed.len(),
            diff.retained.len(),
            diff.missing.len()
        );
        diff
    }

    /// Stores a baked patch if its key is inside the current window.
    pub fn insert(&self, patch: PatchContainer) -> Option<Arc<PatchContainer>> {
        let key = patch.key();
        let mut w = self.write();
        let slot = w.slots.get_mut(&key)?;
        let patch = Arc::new(patch);
        *slot = Some(Arc::clone(&patch));
        Some(patch)
    }

    pub fn get(&self, key: PatchKey) -> Option<Arc<PatchContainer>> {
        let found = self.read().slots.get(&key).cloned().flatten();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Patch holding the world column `(wx, wz)`.
    pub fn patch_at(&self, wx: i32, wz: i32) -> Option<Arc<PatchContainer>> {
        self.get(PatchKey::containing(wx, wz, self.tile_size))
    }

    pub fn contains_key(&self, key: PatchKey) -> bool {
        self.read().slots.contains_key(&key)
    }

    /// Window keys in enumeration order.
    pub fn keys(&self) -> Vec<PatchKey> {
        self.read().order.clone()
    }

    pub fn missing_keys(&self) -> Vec<PatchKey> {
        let w = self.read();
        w.order
            .iter()
            .copied()
            .filter(|k| matches!(w.slots.get(k), Some(None)))
            .collect()
    }

    pub fn stats(&self) -> PatchCacheStats {
        let w = self.read();
        let entries = w.slots.values().filter(|s| s.is_some()).count();
        PatchCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries,
            missing: w.slots.len() - entries,
        }
    }
}

/// Outcome of populating one key.
#[derive(Debug)]
pub struct PopulationStep {
    pub key: PatchKey,
    pub result: Result<Arc<PatchContainer>, TaskError>,
}

/// Lazily bakes the keys a refresh left missing, one per `next()`, in
/// enumeration order. Each patch is readable from the cache as soon as it is
/// yielded. Dropping the population releases the refresh guard.
pub struct Population<'a, B: PatchBaker> {
    cache: &'a PatchCache,
    baker: &'a B,
    diff: RefreshDiff,
    queue: VecDeque<(PatchKey, B::Ticket)>,
    _guard: RefreshGuard<'a>,
}

impl<B: PatchBaker> Population<'_, B> {
    pub fn diff(&self) -> &RefreshDiff {
        &self.diff
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl<B: PatchBaker> Iterator for Population<'_, B> {
    type Item = PopulationStep;

    fn next(&mut self) -> Option<PopulationStep> {
        let (key, ticket) = self.queue.pop_front()?;
        let result = self.baker.finish(key, ticket).and_then(|patch| {
            if patch.key() != key {
                return Err(TaskError::Failed(format!(
                    "baker returned patch {} for {key}",
                    patch.key()
                )));
            }
            self.cache
                .insert(patch)
                .ok_or_else(|| TaskError::Failed(format!("patch {key} left the window")))
        });
        if let Err(e) = &result {
            log::warn!("patch {key} not populated: {e}");
        }
        Some(PopulationStep { key, result })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.queue.len(), Some(self.queue.len()))
    }
}
