//! Wallet Transaction
//!
//! Holds the transaction state and drives the execution protocol.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::Utc;
use futures::FutureExt;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use super::error::TransactionError;
use super::id_gen::{IdGenerator, UlidIdGenerator};
use super::lock::{DistributedLock, LockRelease};
use super::mover::MoneyMover;
use super::state::TransactionStatus;
use super::types::{
    EXPIRY_WINDOW_MS, ID_PREFIX, TransactionRequest, TransactionSnapshot, assign_id,
};
use crate::core_types::{ProductId, TimestampMs, UserId};

/// A single funds transfer between a buyer and a seller
///
/// `execute` may be called any number of times, concurrently, through a
/// shared `Arc<Transaction>`. Money moves at most once per lock acquisition
/// and never again once the status is EXECUTED.
pub struct Transaction {
    id: String,
    status: AtomicU8,
    buyer_id: Option<UserId>,
    seller_id: Option<UserId>,
    product_id: Option<ProductId>,
    order_id: Option<String>,
    created_at_ms: TimestampMs,
    amount: Decimal,
    lock: Arc<dyn DistributedLock>,
}

impl Transaction {
    /// Create a transaction, generating ULID ids when none is supplied
    pub fn new(request: TransactionRequest, lock: Arc<dyn DistributedLock>) -> Self {
        Self::with_id_generator(request, lock, &UlidIdGenerator)
    }

    pub fn with_id_generator(
        request: TransactionRequest,
        lock: Arc<dyn DistributedLock>,
        generator: &dyn IdGenerator,
    ) -> Self {
        let id = assign_id(request.pre_assigned_id.as_deref(), generator);
        debug!(transaction_id = %id, "Transaction created");

        Self {
            id,
            status: AtomicU8::new(TransactionStatus::Created.id()),
            buyer_id: request.buyer_id,
            seller_id: request.seller_id,
            product_id: request.product_id,
            order_id: request.order_id,
            created_at_ms: Utc::now().timestamp_millis(),
            amount: request.amount,
            lock,
        }
    }

    /// Rebuild a transaction from a snapshot, keeping its status and
    /// creation time
    pub fn restore(snapshot: TransactionSnapshot, lock: Arc<dyn DistributedLock>) -> Self {
        let id = if snapshot.id.starts_with(ID_PREFIX) {
            snapshot.id
        } else {
            format!("{}{}", ID_PREFIX, snapshot.id)
        };

        Self {
            id,
            status: AtomicU8::new(snapshot.status.id()),
            buyer_id: snapshot.buyer_id,
            seller_id: snapshot.seller_id,
            product_id: snapshot.product_id,
            order_id: snapshot.order_id,
            created_at_ms: snapshot.created_at_ms,
            amount: snapshot.amount,
            lock,
        }
    }

    /// Execute the transfer
    ///
    /// - `Err(InvalidTransaction)`: missing party or negative amount
    /// - `Ok(true)`: already executed, or money moved by this call
    /// - `Ok(false)`: lock busy, expired, or the mover refused; see `status()`
    ///
    /// Once the lock is acquired it is released on every exit path,
    /// including collaborator errors, panics, and the caller dropping this
    /// future (e.g. a timeout), in which case release happens on the runtime.
    pub async fn execute(&self, mover: &dyn MoneyMover) -> Result<bool, TransactionError> {
        let (buyer_id, seller_id) = match (self.buyer_id, self.seller_id) {
            (Some(buyer_id), Some(seller_id)) if self.amount >= Decimal::ZERO => {
                (buyer_id, seller_id)
            }
            _ => return Err(TransactionError::InvalidTransaction),
        };

        // Optimistic check, no lock
        if self.is_executed() {
            debug!(transaction_id = %self.id, "Transaction already executed");
            return Ok(true);
        }

        let acquired = self.lock.lock(&self.id).await.map_err(|e| {
            error!(transaction_id = %self.id, error = %e, "Failed to acquire lock");
            TransactionError::Lock(e)
        })?;
        if !acquired {
            info!(transaction_id = %self.id, "Lock held elsewhere, try again later");
            return Ok(false);
        }

        // Armed until released; a cancelled caller still gives the key back
        let release = LockRelease::new(self.lock.clone(), self.id.as_str());
        let outcome = AssertUnwindSafe(self.execute_locked(buyer_id, seller_id, mover))
            .catch_unwind()
            .await;
        release.release().await;

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Critical section, runs with the lock held
    async fn execute_locked(
        &self,
        buyer_id: UserId,
        seller_id: UserId,
        mover: &dyn MoneyMover,
    ) -> Result<bool, TransactionError> {
        // Double check: another holder may have finished while we waited
        if self.is_executed() {
            debug!(transaction_id = %self.id, "Transaction executed by another holder");
            return Ok(true);
        }

        if self.is_expired_at(Utc::now().timestamp_millis()) {
            self.set_status(TransactionStatus::Expired);
            info!(
                transaction_id = %self.id,
                created_at_ms = self.created_at_ms,
                "Transaction expired, not moving money"
            );
            return Ok(false);
        }

        match mover
            .move_money(&self.id, buyer_id, seller_id, self.amount)
            .await
        {
            Ok(Some(receipt)) => {
                self.set_status(TransactionStatus::Executed);
                info!(
                    transaction_id = %self.id,
                    receipt = %receipt,
                    amount = %self.amount,
                    "Transaction executed"
                );
                Ok(true)
            }
            Ok(None) => {
                self.set_status(TransactionStatus::Failed);
                warn!(transaction_id = %self.id, "Money mover refused transfer");
                Ok(false)
            }
            Err(e) => {
                error!(transaction_id = %self.id, error = %e, "Money mover error");
                Err(TransactionError::MoneyMover(e))
            }
        }
    }

    fn is_executed(&self) -> bool {
        self.status().is_executed()
    }

    fn is_expired_at(&self, now_ms: TimestampMs) -> bool {
        now_ms.saturating_sub(self.created_at_ms) > EXPIRY_WINDOW_MS
    }

    pub(super) fn set_status(&self, status: TransactionStatus) {
        self.status.store(status.id(), Ordering::Release);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> TransactionStatus {
        // Only valid ids are ever stored
        TransactionStatus::from_id(self.status.load(Ordering::Acquire))
            .unwrap_or(TransactionStatus::Created)
    }

    pub fn buyer_id(&self) -> Option<UserId> {
        self.buyer_id
    }

    pub fn seller_id(&self) -> Option<UserId> {
        self.seller_id
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.product_id
    }

    pub fn order_id(&self) -> Option<&str> {
        self.order_id.as_deref()
    }

    pub fn created_at_ms(&self) -> TimestampMs {
        self.created_at_ms
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn snapshot(&self) -> TransactionSnapshot {
        TransactionSnapshot {
            id: self.id.clone(),
            status: self.status(),
            buyer_id: self.buyer_id,
            seller_id: self.seller_id,
            product_id: self.product_id,
            order_id: self.order_id.clone(),
            created_at_ms: self.created_at_ms,
            amount: self.amount,
        }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("buyer_id", &self.buyer_id)
            .field("seller_id", &self.seller_id)
            .field("product_id", &self.product_id)
            .field("order_id", &self.order_id)
            .field("created_at_ms", &self.created_at_ms)
            .field("amount", &self.amount)
            .finish_non_exhaustive()
    }
}
