//! # Point Ledger
//!
//! A per-user point balance ledger with charge (credit) and use (debit)
//! operations and an append-only history per user.
//!
//! ## Design Principles
//!
//! - **Per-user serialization**: mutations on one user run one at a time;
//!   different users proceed in parallel
//! - **Strict invariants**: `balance == sum(charges) - sum(uses)` per user
//! - **No-op on failure**: rejected operations write nothing
//! - **Injected capabilities**: storage and time are traits, swappable in tests
//!
//! ## Example
//!
//! ```
//! use point_ledger::{InMemoryStore, ManualClock, PointService};
//!
//! let service = PointService::new(InMemoryStore::new(), ManualClock::new());
//! service.charge(1, 100).unwrap();
//! service.use_points(1, 30).unwrap();
//! assert_eq!(service.user_point(1).point, 70);
//! assert_eq!(service.histories(1).len(), 2);
//! ```

pub mod clock;
pub mod error;
pub mod lock;
pub mod point;
pub mod replay;
pub mod service;
pub mod store;

pub use clock::{ManualClock, SystemClock, TimeSource};
pub use error::{LedgerError, Result};
pub use lock::UserLocks;
pub use point::{net_total, PointHistory, TransactionType, UserPoint};
pub use replay::{LedgerReplay, Operation, OperationKind, OperationRecord, ReplaySummary};
pub use service::PointService;
pub use store::{InMemoryStore, LedgerStore};
