//! Transaction Error Types
//!
//! Only precondition violations and collaborator failures are errors.
//! Lock contention, expiry and transfer failure are ordinary `Ok(false)`
//! outcomes of `execute`.

use thiserror::Error;

/// Transaction error types
#[derive(Error, Debug)]
pub enum TransactionError {
    /// Missing buyer/seller or negative amount. Never retried internally.
    #[error("This is an invalid transaction")]
    InvalidTransaction,

    /// The lock backend failed while trying to acquire the lock
    #[error("Distributed lock error: {0}")]
    Lock(#[source] anyhow::Error),

    /// The money mover raised an error; the lock was released before this
    /// error was returned
    #[error("Money mover error: {0}")]
    MoneyMover(#[source] anyhow::Error),
}

impl TransactionError {
    /// Get the error code for callers that surface errors to an API
    pub fn code(&self) -> &'static str {
        match self {
            TransactionError::InvalidTransaction => "INVALID_TRANSACTION",
            TransactionError::Lock(_) => "LOCK_ERROR",
            TransactionError::MoneyMover(_) => "MONEY_MOVER_ERROR",
        }
    }

    /// Whether retrying the same transaction could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            TransactionError::InvalidTransaction => false,
            TransactionError::Lock(_) | TransactionError::MoneyMover(_) => true,
        }
    }
}
