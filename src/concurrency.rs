//! Concurrency primitives shared by the cache and layer stack registry
//!
//! [`KeyedOnceMap`] guarantees at most one in-flight computation per key:
//! concurrent requests for the same missing key block on a shared
//! `OnceCell` while different keys compute independently.

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

pub struct KeyedOnceMap<K, V> {
    entries: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Default for KeyedOnceMap<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> KeyedOnceMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the value for `key`, running `compute` if no value exists.
    ///
    /// The map lock is released before `compute` runs, so `compute` may
    /// itself query other keys of the same map.
    pub fn get_or_compute(&self, key: &K, compute: impl FnOnce() -> V) -> V {
        let cell = {
            let mut entries = self.entries.lock();
            entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        cell.get_or_init(compute).clone()
    }

    /// Probe without computing
    pub fn find(&self, key: &K) -> Option<V> {
        let entries = self.entries.lock();
        entries.get(key).and_then(|cell| cell.get().cloned())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Drop the entry for `key`. A computation already in flight finishes
    /// into the detached cell and is never observed by later lookups.
    pub fn invalidate(&self, key: &K) -> bool {
        let removed = self.entries.lock().remove(key);
        matches!(removed, Some(cell) if cell.get().is_some())
    }

    /// Drop the entry for `key` only if its computed value matches
    /// `predicate`. A newer value published under the same key survives.
    pub fn invalidate_if(&self, key: &K, predicate: impl FnOnce(&V) -> bool) -> bool {
        let mut entries = self.entries.lock();
        let matches = entries
            .get(key)
            .and_then(|cell| cell.get())
            .map_or(false, predicate);
        if matches {
            entries.remove(key);
        }
        matches
    }

    /// Drop every entry whose key matches `predicate`, returning the keys
    /// that held a computed value
    pub fn invalidate_where(&self, mut predicate: impl FnMut(&K) -> bool) -> Vec<K> {
        let mut entries = self.entries.lock();
        let doomed: Vec<K> = entries.keys().filter(|k| predicate(k)).cloned().collect();
        doomed
            .into_iter()
            .filter(|key| matches!(entries.remove(key), Some(cell) if cell.get().is_some()))
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of computed entries
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|cell| cell.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the keys holding computed values
    pub fn keys(&self) -> Vec<K> {
        self.entries
            .lock()
            .iter()
            .filter(|(_, cell)| cell.get().is_some())
            .map(|(k, _)| k.clone())
            .collect()
    }
}

/// Build a bounded worker pool; `max_parallelism == 0` means one worker per CPU.
pub fn build_pool(max_parallelism: usize) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(max_parallelism)
        .thread_name(|i| format!("laminate-worker-{}", i))
        .build()
}
