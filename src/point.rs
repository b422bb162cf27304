//! Balance and history records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A user's current point balance.
///
/// Users with no activity have an implicit balance of zero; see
/// [`UserPoint::empty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPoint {
    /// User identifier.
    pub id: u64,

    /// Current balance. Never negative.
    pub point: i64,
}

impl UserPoint {
    pub fn new(id: u64, point: i64) -> Self {
        UserPoint { id, point }
    }

    /// The default balance for a user with no record.
    pub fn empty(id: u64) -> Self {
        UserPoint { id, point: 0 }
    }
}

/// Direction of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Credit: increases the balance.
    Charge,

    /// Debit: decreases the balance.
    Use,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Charge => f.write_str("CHARGE"),
            TransactionType::Use => f.write_str("USE"),
        }
    }
}

/// An immutable record of one successful charge or use.
///
/// `id` is assigned by the store in insertion order and is not part of the
/// serialized shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointHistory {
    /// Store-assigned sequence number, increasing with insertion order.
    #[serde(skip)]
    pub id: u64,

    pub user_id: u64,

    pub amount: i64,

    #[serde(rename = "type")]
    pub kind: TransactionType,

    pub update_millis: i64,
}

impl PointHistory {
    /// Signed effect of this entry on the balance.
    pub fn signed_amount(&self) -> i64 {
        match self.kind {
            TransactionType::Charge => self.amount,
            TransactionType::Use => -self.amount,
        }
    }
}

/// Sum of charges minus sum of uses over `entries`.
///
/// Widened to `i128` so a long history cannot overflow the running sum.
pub fn net_total(entries: &[PointHistory]) -> i128 {
    entries.iter().map(|h| i128::from(h.signed_amount())).sum()
}
