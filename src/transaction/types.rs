//! Transaction Core Types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id_gen::IdGenerator;
use super::state::TransactionStatus;
use crate::core_types::{ProductId, TimestampMs, UserId};

/// Every transaction id starts with this marker
pub const ID_PREFIX: &str = "t_";

/// A transaction older than this may no longer be executed (20 days)
pub const EXPIRY_WINDOW_MS: i64 = 1_728_000_000;

/// Construction input
///
/// Parties and amount are optional/unchecked here; they are validated when
/// the transaction is executed.
#[derive(Debug, Clone, Default)]
pub struct TransactionRequest {
    pub pre_assigned_id: Option<String>,
    pub buyer_id: Option<UserId>,
    pub seller_id: Option<UserId>,
    pub product_id: Option<ProductId>,
    pub order_id: Option<String>,
    pub amount: Decimal,
}

impl TransactionRequest {
    pub fn new(buyer_id: Option<UserId>, seller_id: Option<UserId>, amount: Decimal) -> Self {
        Self {
            buyer_id,
            seller_id,
            amount,
            ..Default::default()
        }
    }

    pub fn with_pre_assigned_id(mut self, id: impl Into<String>) -> Self {
        self.pre_assigned_id = Some(id.into());
        self
    }

    pub fn with_product_id(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }
}

/// Point-in-time copy of a transaction, for callers that persist records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSnapshot {
    pub id: String,
    pub status: TransactionStatus,
    pub buyer_id: Option<UserId>,
    pub seller_id: Option<UserId>,
    pub product_id: Option<ProductId>,
    pub order_id: Option<String>,
    pub created_at_ms: TimestampMs,
    pub amount: Decimal,
}

/// Resolve the transaction id from the caller's input.
///
/// FIXME: when the chosen id lacks the prefix, the prefix is applied to the
/// caller's original input rather than to the generated id. With no input
/// and an unprefixed generator every transaction gets the id `"t_"`. Callers
/// observe this, so it is kept until they migrate.
pub(crate) fn assign_id(pre_assigned_id: Option<&str>, generator: &dyn IdGenerator) -> String {
    let id = match pre_assigned_id {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => generator.generate(),
    };

    if id.starts_with(ID_PREFIX) {
        return id;
    }
    format!("{}{}", ID_PREFIX, pre_assigned_id.unwrap_or_default())
}
