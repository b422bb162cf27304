//! Per-user mutual exclusion.
//!
//! Operations on the same user id run one at a time; operations on different
//! user ids never wait on each other.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// A lazily populated map from user id to that user's lock.
///
/// Locks are created on first use and kept for the life of the map. Only one
/// user's lock is ever held per call, so callers cannot deadlock.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: DashMap<u64, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `user_id`.
    ///
    /// Blocks until the lock is free. The lock is released when `f` returns,
    /// including on early error returns and panics.
    pub fn with_user<R>(&self, user_id: u64, f: impl FnOnce() -> R) -> R {
        let lock = self.handle(user_id);
        let _guard = lock.lock();
        f()
    }

    /// Runs a read-only `f` under the lock for `user_id` without creating one.
    ///
    /// If the user has no lock yet, `f` runs unlocked and the map is checked
    /// again afterwards. Writers create the lock before touching state and
    /// locks are never removed, so a second miss means no write overlapped
    /// the read. Otherwise `f` runs again under the now-existing lock.
    pub fn read_user<R>(&self, user_id: u64, f: impl Fn() -> R) -> R {
        if let Some(lock) = self.existing(user_id) {
            let _guard = lock.lock();
            return f();
        }

        let result = f();
        match self.existing(user_id) {
            None => result,
            Some(lock) => {
                let _guard = lock.lock();
                f()
            }
        }
    }

    /// Number of users that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn existing(&self, user_id: u64) -> Option<Arc<Mutex<()>>> {
        self.locks.get(&user_id).map(|lock| Arc::clone(lock.value()))
    }

    fn handle(&self, user_id: u64) -> Arc<Mutex<()>> {
        // The map's shard guard is dropped before the user lock is taken.
        Arc::clone(self.locks.entry(user_id).or_default().value())
    }
}
