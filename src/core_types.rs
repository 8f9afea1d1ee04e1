//! Core types used throughout the system
//!
//! Type aliases shared by the transaction protocol and its collaborators.

/// User ID of a transfer party (buyer or seller).
///
/// # Usage:
/// - Passed through to the money mover untouched
/// - Required at execution time, optional at construction time
pub type UserId = u64;

/// Product reference carried for traceability only
pub type ProductId = u64;

/// Receipt/confirmation id returned by a successful transfer
pub type ReceiptId = String;

/// Wall-clock timestamp in unix milliseconds
pub type TimestampMs = i64;
