//! Money Mover
//!
//! The external capability that performs the balance-affecting transfer.
//! It is NOT assumed to be idempotent; the transaction protocol guarantees
//! it is called at most once per successful lock acquisition.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::core_types::{ReceiptId, UserId};

#[async_trait]
pub trait MoneyMover: Send + Sync {
    /// Move `amount` from `buyer_id` to `seller_id`.
    ///
    /// - `Ok(Some(receipt))`: transfer confirmed
    /// - `Ok(None)`: transfer refused or failed
    /// - `Err(_)`: unexpected collaborator error, propagated to the caller
    async fn move_money(
        &self,
        transaction_id: &str,
        buyer_id: UserId,
        seller_id: UserId,
        amount: Decimal,
    ) -> anyhow::Result<Option<ReceiptId>>;
}


#[cfg(test)]
pub use mock::{MockMoneyMover, MoveBehavior};
