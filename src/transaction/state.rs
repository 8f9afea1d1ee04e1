//! Transaction Status Definitions
//!
//! Status IDs are stable so a status can be stored in an atomic or persisted
//! by the caller.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Transaction Status
///
/// ```text
/// CREATED → EXECUTED
///        ↘ EXPIRED
///        ↘ FAILED
/// ```
///
/// Only EXECUTED is a hard terminal state. A transaction that ended an
/// attempt as EXPIRED or FAILED may be executed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum TransactionStatus {
    /// Initial state - constructed, never executed
    Created = 0,

    /// Terminal: money moved, receipt obtained
    Executed = 1,

    /// Attempt rejected because the expiry window elapsed
    Expired = 2,

    /// Money mover reported failure for the last attempt
    Failed = 3,
}

impl TransactionStatus {
    /// Check if money has already moved for this transaction
    #[inline]
    pub fn is_executed(&self) -> bool {
        matches!(self, TransactionStatus::Executed)
    }

    /// Get the numeric status ID
    #[inline]
    pub fn id(&self) -> u8 {
        *self as u8
    }

    /// Convert from numeric status ID
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(TransactionStatus::Created),
            1 => Some(TransactionStatus::Executed),
            2 => Some(TransactionStatus::Expired),
            3 => Some(TransactionStatus::Failed),
            _ => None,
        }
    }

    /// Get human-readable status name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Created => "CREATED",
            TransactionStatus::Executed => "EXECUTED",
            TransactionStatus::Expired => "EXPIRED",
            TransactionStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<u8> for TransactionStatus {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        TransactionStatus::from_id(value).ok_or(())
    }
}
