//! Wallet Transaction
//!
//! Executes a buyer → seller funds transfer exactly once, even when
//! `execute` is invoked concurrently, by guarding the non-idempotent
//! money mover with a distributed lock keyed by the transaction id.
//!
//! # Execution Protocol
//!
//! ```text
//! validate ──✗──> Err(InvalidTransaction)
//!    │
//! EXECUTED? ──yes──> true                    (optimistic, no lock)
//!    │
//! lock(id) ──busy──> false
//!    │
//! EXECUTED? ──yes──> true                    (double check)
//!    │
//! expired? ──yes──> EXPIRED, false
//!    │
//! move_money ──receipt──> EXECUTED, true
//!            ──none─────> FAILED, false
//!            ──error────> Err(MoneyMover)
//!    │
//! unlock(id)                                 (every path after lock)
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Lock Before Move**: The money mover is only called with the lock held
//! 2. **Executed Is Final**: Once EXECUTED, no further money movement
//! 3. **Always Release**: unlock runs exactly once per acquired lock

pub mod entity;
pub mod error;
pub mod id_gen;
pub mod lock;
pub mod mover;
pub mod state;
pub mod types;

#[cfg(test)]
mod integration_tests;

// Re-exports for convenience
pub use entity::Transaction;
pub use error::TransactionError;
pub use id_gen::{IdGenerator, UlidIdGenerator};
pub use lock::{DistributedLock, InMemoryLock};
pub use mover::MoneyMover;
pub use state::TransactionStatus;
pub use types::{EXPIRY_WINDOW_MS, ID_PREFIX, TransactionRequest, TransactionSnapshot};
