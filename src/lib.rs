//! Wallet Transaction - exactly-once funds transfer
//!
//! # Modules
//!
//! - [`core_types`] - Core type definitions (UserId, ReceiptId, etc.)
//! - [`transaction`] - Transaction entity and its execution protocol
//! - [`config`] - YAML application config
//! - [`logging`] - tracing subscriber setup

// Core types - must be first!
pub mod core_types;

pub mod config;
pub mod logging;
pub mod transaction;

// Convenient re-exports at crate root
pub use config::{AppConfig, LockConfig};
pub use core_types::{ProductId, ReceiptId, TimestampMs, UserId};
pub use transaction::{
    DistributedLock, EXPIRY_WINDOW_MS, ID_PREFIX, IdGenerator, InMemoryLock, MoneyMover,
    Transaction, TransactionError, TransactionRequest, TransactionSnapshot, TransactionStatus,
    UlidIdGenerator,
};
