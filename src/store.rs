//! Balance and history storage.
//!
//! The store only guarantees that each call is atomic on its own. Making a
//! read-compute-write-append sequence atomic is the job of
//! [`PointService`](crate::PointService).

use crate::point::{PointHistory, TransactionType, UserPoint};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Point lookups and inserts over balances and history.
pub trait LedgerStore: Send + Sync {
    /// Current balance, or `0` for an unknown user.
    fn get_balance(&self, user_id: u64) -> i64;

    /// Creates or overwrites the balance record. `point` is already validated.
    fn set_balance(&self, user_id: u64, point: i64) -> UserPoint;

    /// Appends one entry. Prior entries are never touched.
    fn append_history(
        &self,
        user_id: u64,
        amount: i64,
        kind: TransactionType,
        update_millis: i64,
    ) -> PointHistory;

    /// All entries for the user in insertion order.
    fn list_history(&self, user_id: u64) -> Vec<PointHistory>;
}

/// In-memory store backed by sharded concurrent maps.
///
/// History ids come from a single cursor starting at 1, so ids increase with
/// insertion order across the whole store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    balances: DashMap<u64, i64>,
    histories: DashMap<u64, Vec<PointHistory>>,
    cursor: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with a balance record.
    pub fn user_count(&self) -> usize {
        self.balances.len()
    }
}

impl LedgerStore for InMemoryStore {
    fn get_balance(&self, user_id: u64) -> i64 {
        self.balances.get(&user_id).map(|b| *b.value()).unwrap_or(0)
    }

    fn set_balance(&self, user_id: u64, point: i64) -> UserPoint {
        self.balances.insert(user_id, point);
        UserPoint::new(user_id, point)
    }

    fn append_history(
        &self,
        user_id: u64,
        amount: i64,
        kind: TransactionType,
        update_millis: i64,
    ) -> PointHistory {
        // Id allocation happens under the shard guard so a user's list stays
        // sorted by id.
        let mut entries = self.histories.entry(user_id).or_default();
        let entry = PointHistory {
            id: self.cursor.fetch_add(1, Ordering::SeqCst) + 1,
            user_id,
            amount,
            kind,
            update_millis,
        };
        entries.push(entry.clone());
        entry
    }

    fn list_history(&self, user_id: u64) -> Vec<PointHistory> {
        self.histories
            .get(&user_id)
            .map(|entries| entries.value().clone())
            .unwrap_or_default()
    }
}

impl<T: LedgerStore + ?Sized> LedgerStore for Arc<T> {
    fn get_balance(&self, user_id: u64) -> i64 {
        (**self).get_balance(user_id)
    }

    fn set_balance(&self, user_id: u64, point: i64) -> UserPoint {
        (**self).set_balance(user_id, point)
    }

    fn append_history(
        &self,
        user_id: u64,
        amount: i64,
        kind: TransactionType,
        update_millis: i64,
    ) -> PointHistory {
        (**self).append_history(user_id, amount, kind, update_millis)
    }

    fn list_history(&self, user_id: u64) -> Vec<PointHistory> {
        (**self).list_history(user_id)
    }
}
