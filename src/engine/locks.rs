use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RawMutex, lock_api::ArcMutexGuard};

pub type KeyGuard = ArcMutexGuard<RawMutex, ()>;

/// Table of mutexes keyed by string (wallet address, owner token). Entries
/// are created on first use and kept for the life of the table.
#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn lock(&self, key: &str) -> KeyGuard {
        // clone the Arc first so the shard guard is released before blocking
        let mutex = self
            .locks
            .entry(key.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_arc()
    }

    /// Number of keys that ever took a lock.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Locks every key in iteration order. Callers must pass distinct keys
    /// in one global order, or two callers can deadlock.
    pub fn lock_all<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Vec<KeyGuard> {
        keys.into_iter().map(|key| self.lock(key)).collect()
    }
}
