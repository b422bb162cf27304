//! Error types for the point ledger.

use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur during ledger operation.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Charge or use amount was negative
    #[error("Invalid amount {amount}: amount must not be negative")]
    InvalidAmount { amount: i64 },

    /// Use amount exceeds the user's current balance
    #[error("Insufficient balance for user {user_id}: balance {balance}, requested {amount}")]
    InsufficientBalance {
        user_id: u64,
        balance: i64,
        amount: i64,
    },

    /// Charge would push the balance past the representable maximum
    #[error("Balance overflow for user {user_id}")]
    BalanceOverflow { user_id: u64 },

    /// Failed to open or read the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Missing input file argument
    #[error("Missing input file argument. Usage: point-ledger <operations.csv> [--history]")]
    MissingArgument,

    /// Unrecognized command line argument
    #[error("Unknown argument '{0}'. Usage: point-ledger <operations.csv> [--history]")]
    UnknownArgument(String),
}

impl LedgerError {
    /// Returns `true` for rejections caused by the request itself
    /// (as opposed to I/O or input-format failures).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidAmount { .. }
                | LedgerError::InsufficientBalance { .. }
                | LedgerError::BalanceOverflow { .. }
        )
    }
}
