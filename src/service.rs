//! Charge, use and query operations over a [`LedgerStore`].
//!
//! Every mutation runs read balance, compute, write balance, append history
//! as one unit under the user's lock. For each user this keeps
//! `balance == sum(charges) - sum(uses)` over their history whenever no
//! mutation for that user is in flight.
//!
//! Reads take the same lock when the user has one, so they never observe a
//! balance write without its history entry. Reads never create a lock.
//! [`PointService::snapshot`] returns both halves from a single acquisition.

use crate::clock::{SystemClock, TimeSource};
use crate::error::{LedgerError, Result};
use crate::lock::UserLocks;
use crate::point::{PointHistory, TransactionType, UserPoint};
use crate::store::{InMemoryStore, LedgerStore};
use log::debug;

/// The point ledger service.
///
/// Safe to share between threads (wrap in `Arc`); all methods take `&self`.
pub struct PointService<S, C> {
    store: S,
    clock: C,
    locks: UserLocks,
}

impl PointService<InMemoryStore, SystemClock> {
    /// A service over a fresh in-memory store, stamped by the wall clock.
    pub fn in_memory() -> Self {
        PointService::new(InMemoryStore::new(), SystemClock::new())
    }
}

impl<S: LedgerStore, C: TimeSource> PointService<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        PointService {
            store,
            clock,
            locks: UserLocks::new(),
        }
    }

    /// Current balance. Users with no activity report zero.
    pub fn user_point(&self, user_id: u64) -> UserPoint {
        let point = self
            .locks
            .read_user(user_id, || self.store.get_balance(user_id));
        UserPoint::new(user_id, point)
    }

    /// Credits `amount` to the user and records a `CHARGE` entry.
    ///
    /// A zero amount is accepted and still recorded.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] if `amount` is negative
    /// - [`LedgerError::BalanceOverflow`] if the new balance does not fit in `i64`
    pub fn charge(&self, user_id: u64, amount: i64) -> Result<UserPoint> {
        validate_amount(amount)?;

        self.locks.with_user(user_id, || {
            let balance = self.store.get_balance(user_id);
            let updated = balance
                .checked_add(amount)
                .ok_or(LedgerError::BalanceOverflow { user_id })?;

            self.commit(user_id, updated, amount, TransactionType::Charge)
        })
    }

    /// Debits `amount` from the user and records a `USE` entry.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] if `amount` is negative
    /// - [`LedgerError::InsufficientBalance`] if the balance is below `amount`;
    ///   nothing is written in that case
    pub fn use_points(&self, user_id: u64, amount: i64) -> Result<UserPoint> {
        validate_amount(amount)?;

        // Short on a consistent read: reject without creating the user's lock.
        let seen = self
            .locks
            .read_user(user_id, || self.store.get_balance(user_id));
        if seen < amount {
            return Err(insufficient(user_id, seen, amount));
        }

        self.locks.with_user(user_id, || {
            let balance = self.store.get_balance(user_id);
            if balance < amount {
                return Err(insufficient(user_id, balance, amount));
            }

            self.commit(user_id, balance - amount, amount, TransactionType::Use)
        })
    }

    /// All history entries for the user, most recent first.
    ///
    /// Entries sharing a timestamp are ordered by insertion, later first.
    pub fn histories(&self, user_id: u64) -> Vec<PointHistory> {
        let mut entries = self
            .locks
            .read_user(user_id, || self.store.list_history(user_id));
        sort_recent_first(&mut entries);
        entries
    }

    /// Balance and history read under one lock acquisition.
    pub fn snapshot(&self, user_id: u64) -> (UserPoint, Vec<PointHistory>) {
        let (point, mut entries) = self.locks.read_user(user_id, || {
            (
                self.store.get_balance(user_id),
                self.store.list_history(user_id),
            )
        });
        sort_recent_first(&mut entries);
        (UserPoint::new(user_id, point), entries)
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Writes the new balance and its history entry. Caller holds the user's lock.
    fn commit(
        &self,
        user_id: u64,
        updated: i64,
        amount: i64,
        kind: TransactionType,
    ) -> Result<UserPoint> {
        let user_point = self.store.set_balance(user_id, updated);
        self.store
            .append_history(user_id, amount, kind, self.clock.now_millis());

        debug!(
            "{} {} for user {}, balance now {}",
            kind, amount, user_id, user_point.point
        );
        Ok(user_point)
    }
}

fn validate_amount(amount: i64) -> Result<()> {
    if amount < 0 {
        return Err(LedgerError::InvalidAmount { amount });
    }
    Ok(())
}

fn insufficient(user_id: u64, balance: i64, amount: i64) -> LedgerError {
    debug!(
        "Rejected use of {} for user {}: balance {}",
        amount, user_id, balance
    );
    LedgerError::InsufficientBalance {
        user_id,
        balance,
        amount,
    }
}

fn sort_recent_first(entries: &mut [PointHistory]) {
    entries.sort_by(|a, b| {
        b.update_millis
            .cmp(&a.update_millis)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    fn service() -> (PointService<InMemoryStore, Arc<ManualClock>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (
            PointService::new(InMemoryStore::new(), Arc::clone(&clock)),
            clock,
        )
    }

    #[test]
    fn test_charge_on_new_user_creates_balance() {
        let (service, _) = service();
        let up = service.charge(1, 100).unwrap();
        assert_eq!(up, UserPoint::new(1, 100));
        assert_eq!(service.store().user_count(), 1);
    }

    #[test]
    fn test_use_on_new_user_is_rejected() {
        let (service, _) = service();
        let err = service.use_points(1, 1).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance {
                user_id: 1,
                balance: 0,
                amount: 1
            }
        ));
        assert_eq!(service.store().user_count(), 0);
    }

    #[test]
    fn test_zero_amounts_are_recorded() {
        let (service, _) = service();
        assert_eq!(service.charge(1, 0).unwrap().point, 0);
        assert_eq!(service.use_points(1, 0).unwrap().point, 0);

        let history = service.histories(1);
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|h| h.amount == 0));
    }

    #[test]
    fn test_negative_rejected_before_any_write() {
        let (service, _) = service();
        assert!(matches!(
            service.charge(1, -10),
            Err(LedgerError::InvalidAmount { amount: -10 })
        ));
        assert!(matches!(
            service.use_points(1, -10),
            Err(LedgerError::InvalidAmount { amount: -10 })
        ));
        assert!(service.histories(1).is_empty());
        assert_eq!(service.store().user_count(), 0);
    }

    #[test]
    fn test_charge_overflow_leaves_state_untouched() {
        let (service, _) = service();
        service.charge(1, i64::MAX - 5).unwrap();

        let err = service.charge(1, 10).unwrap_err();
        assert!(matches!(err, LedgerError::BalanceOverflow { user_id: 1 }));
        assert_eq!(service.user_point(1).point, i64::MAX - 5);
        assert_eq!(service.histories(1).len(), 1);
    }

    #[test]
    fn test_equal_timestamps_list_later_insert_first() {
        let (service, _) = service();
        service.charge(1, 10).unwrap();
        service.charge(1, 20).unwrap();
        service.use_points(1, 5).unwrap();

        let amounts: Vec<i64> = service.histories(1).iter().map(|h| h.amount).collect();
        assert_eq!(amounts, vec![5, 20, 10]);
    }

    #[test]
    fn test_history_stamped_by_clock() {
        let (service, clock) = service();
        clock.set(1_000);
        service.charge(1, 10).unwrap();
        clock.advance(250);
        service.use_points(1, 4).unwrap();

        let history = service.histories(1);
        assert_eq!(history[0].update_millis, 1_250);
        assert_eq!(history[0].kind, TransactionType::Use);
        assert_eq!(history[1].update_millis, 1_000);
        assert_eq!(history[1].kind, TransactionType::Charge);
    }

    #[test]
    fn test_reads_on_untouched_users_leave_no_locks() {
        let (service, _) = service();
        for user_id in 0..10_000 {
            assert_eq!(service.user_point(user_id).point, 0);
            assert!(service.histories(user_id).is_empty());
            assert_eq!(service.snapshot(user_id).0.point, 0);
            assert!(service.use_points(user_id, 1).is_err());
        }
        assert!(service.locks.is_empty());
        assert_eq!(service.store().user_count(), 0);

        service.charge(5, 10).unwrap();
        assert_eq!(service.user_point(5).point, 10);
        assert_eq!(service.locks.len(), 1);
    }

    #[test]
    fn test_snapshot_matches_history() {
        let (service, _) = service();
        service.charge(3, 100).unwrap();
        service.use_points(3, 30).unwrap();

        let (up, history) = service.snapshot(3);
        assert_eq!(up.point, 70);
        assert_eq!(crate::point::net_total(&history), 70);
    }
}
