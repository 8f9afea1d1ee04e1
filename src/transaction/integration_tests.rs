//! Integration Tests for the Execution Protocol
//!
//! These tests drive `Transaction::execute` end to end with MockLock and
//! MockMoneyMover to cover every exit path of the protocol.

#[cfg(test)]
mod integration_tests {
    use std::panic::AssertUnwindSafe;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use futures::FutureExt;
    use rust_decimal::Decimal;

    use crate::transaction::entity::Transaction;
    use crate::transaction::error::TransactionError;
    use crate::transaction::lock::MockLock;
    use crate::transaction::mover::{MockMoneyMover, MoveBehavior};
    use crate::transaction::state::TransactionStatus;
    use crate::transaction::types::{EXPIRY_WINDOW_MS, TransactionRequest, TransactionSnapshot};

    fn request() -> TransactionRequest {
        TransactionRequest::new(Some(1), Some(2), Decimal::ONE)
            .with_pre_assigned_id("id")
            .with_product_id(100)
            .with_order_id("orderId")
    }

    fn transaction(lock: &Arc<MockLock>) -> Transaction {
        Transaction::new(request(), lock.clone())
    }

    /// Transaction rebuilt with an explicit status and creation time
    fn restored(
        lock: &Arc<MockLock>,
        status: TransactionStatus,
        created_at_ms: i64,
    ) -> Transaction {
        let snapshot = TransactionSnapshot {
            id: "t_id".to_string(),
            status,
            buyer_id: Some(1),
            seller_id: Some(2),
            product_id: Some(100),
            order_id: Some("orderId".to_string()),
            created_at_ms,
            amount: Decimal::ONE,
        };
        Transaction::restore(snapshot, lock.clone())
    }

    // ========================================================================
    // Happy Path Tests
    // ========================================================================

    #[tokio::test]
    async fn test_move_money_success() {
        let lock = Arc::new(MockLock::new());
        let mover = MockMoneyMover::succeeding();
        let tx = transaction(&lock);

        assert!(tx.execute(&mover).await.unwrap());
        assert_eq!(tx.status(), TransactionStatus::Executed);

        assert_eq!(mover.calls(), vec![("t_id".to_string(), 1, 2, Decimal::ONE)]);
        assert_eq!(lock.lock_count(), 1);
        assert_eq!(lock.unlock_count(), 1);
    }

    #[tokio::test]
    async fn test_executed_is_final() {
        let lock = Arc::new(MockLock::new());
        let mover = MockMoneyMover::succeeding();
        let tx = transaction(&lock);

        assert!(tx.execute(&mover).await.unwrap());
        assert!(tx.execute(&mover).await.unwrap());
        assert!(tx.execute(&mover).await.unwrap());

        assert_eq!(mover.move_count(), 1);
        assert_eq!(lock.lock_count(), 1);
    }

    // ========================================================================
    // Validation Tests
    // ========================================================================

    #[tokio::test]
    async fn test_missing_buyer_is_invalid() {
        let lock = Arc::new(MockLock::new());
        let mover = MockMoneyMover::succeeding();
        let tx = Transaction::new(TransactionRequest::new(None, Some(2), Decimal::ONE), lock.clone());

        let err = tx.execute(&mover).await.unwrap_err();
        assert!(matches!(err, TransactionError::InvalidTransaction));
        assert_eq!(err.to_string(), "This is an invalid transaction");

        assert_eq!(tx.status(), TransactionStatus::Created);
        assert_eq!(lock.lock_count(), 0);
        assert_eq!(mover.move_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_seller_is_invalid() {
        let lock = Arc::new(MockLock::new());
        let tx = Transaction::new(TransactionRequest::new(Some(1), None, Decimal::ONE), lock.clone());

        let result = tx.execute(&MockMoneyMover::succeeding()).await;
        assert!(matches!(result, Err(TransactionError::InvalidTransaction)));
        assert_eq!(lock.lock_count(), 0);
    }

    #[tokio::test]
    async fn test_negative_amount_is_invalid() {
        let lock = Arc::new(MockLock::new());
        let tx = Transaction::new(
            TransactionRequest::new(Some(1), Some(2), Decimal::new(-1, 2)),
            lock.clone(),
        );

        let result = tx.execute(&MockMoneyMover::succeeding()).await;
        assert!(matches!(result, Err(TransactionError::InvalidTransaction)));
        assert_eq!(tx.status(), TransactionStatus::Created);
    }

    #[tokio::test]
    async fn test_zero_amount_is_valid() {
        let lock = Arc::new(MockLock::new());
        let tx = Transaction::new(TransactionRequest::new(Some(1), Some(2), Decimal::ZERO), lock);

        assert!(tx.execute(&MockMoneyMover::succeeding()).await.unwrap());
    }

    #[tokio::test]
    async fn test_validation_precedes_executed_shortcut() {
        let lock = Arc::new(MockLock::new());
        let mut snapshot = restored(&lock, TransactionStatus::Executed, 0).snapshot();
        snapshot.buyer_id = None;
        let tx = Transaction::restore(snapshot, lock.clone());

        let result = tx.execute(&MockMoneyMover::succeeding()).await;
        assert!(matches!(result, Err(TransactionError::InvalidTransaction)));
    }

    // ========================================================================
    // Idempotency & Lock Tests
    // ========================================================================

    #[tokio::test]
    async fn test_already_executed_skips_lock_and_mover() {
        let lock = Arc::new(MockLock::new());
        lock.set_grant(false);
        let mover = MockMoneyMover::succeeding();
        let tx = restored(&lock, TransactionStatus::Executed, Utc::now().timestamp_millis());

        assert!(tx.execute(&mover).await.unwrap());
        assert_eq!(mover.move_count(), 0);
        assert_eq!(lock.lock_count(), 0);
    }

    #[tokio::test]
    async fn test_lock_not_acquired() {
        let lock = Arc::new(MockLock::new());
        lock.set_grant(false);
        let mover = MockMoneyMover::succeeding();
        let tx = transaction(&lock);

        assert!(!tx.execute(&mover).await.unwrap());
        assert_eq!(tx.status(), TransactionStatus::Created);
        assert_eq!(mover.move_count(), 0);
        assert_eq!(lock.unlock_count(), 0);
    }

    #[tokio::test]
    async fn test_lock_backend_error() {
        let lock = Arc::new(MockLock::new());
        lock.set_fail(true);
        let mover = MockMoneyMover::succeeding();
        let tx = transaction(&lock);

        let err = tx.execute(&mover).await.unwrap_err();
        assert!(matches!(err, TransactionError::Lock(_)));
        assert_eq!(mover.move_count(), 0);
        assert_eq!(lock.unlock_count(), 0);
    }

    /// Another holder completes the transaction while we wait for the lock
    #[tokio::test]
    async fn test_double_check_state_is_executed() {
        let lock = Arc::new(MockLock::new());
        let mover = MockMoneyMover::succeeding();
        let tx = Arc::new(transaction(&lock));

        let racing = Arc::downgrade(&tx);
        lock.set_on_lock(move || {
            if let Some(tx) = racing.upgrade() {
                tx.set_status(TransactionStatus::Executed);
            }
        });

        assert!(tx.execute(&mover).await.unwrap());
        assert_eq!(mover.move_count(), 0);
        assert_eq!(lock.lock_count(), 1);
        assert_eq!(lock.unlock_count(), 1);
    }

    // ========================================================================
    // Expiry Tests
    // ========================================================================

    #[tokio::test]
    async fn test_expired_transaction() {
        let lock = Arc::new(MockLock::new());
        let mover = MockMoneyMover::succeeding();
        let created_at_ms = Utc::now().timestamp_millis() - EXPIRY_WINDOW_MS - 1_000;
        let tx = restored(&lock, TransactionStatus::Created, created_at_ms);

        assert!(!tx.execute(&mover).await.unwrap());
        assert_eq!(tx.status(), TransactionStatus::Expired);
        assert_eq!(mover.move_count(), 0);
        assert_eq!(lock.unlock_count(), 1);
    }

    #[tokio::test]
    async fn test_within_window_is_not_expired() {
        let lock = Arc::new(MockLock::new());
        let mover = MockMoneyMover::succeeding();
        let created_at_ms = Utc::now().timestamp_millis() - EXPIRY_WINDOW_MS + 60_000;
        let tx = restored(&lock, TransactionStatus::Created, created_at_ms);

        assert!(tx.execute(&mover).await.unwrap());
        assert_eq!(tx.status(), TransactionStatus::Executed);
    }

    // ========================================================================
    // Failure Tests
    // ========================================================================

    #[tokio::test]
    async fn test_move_money_failed() {
        let lock = Arc::new(MockLock::new());
        let mover = MockMoneyMover::new(MoveBehavior::Refuse);
        let tx = transaction(&lock);

        assert!(!tx.execute(&mover).await.unwrap());
        assert_eq!(tx.status(), TransactionStatus::Failed);
        assert_eq!(lock.unlock_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_transaction_can_be_retried() {
        let lock = Arc::new(MockLock::new());
        let mover = MockMoneyMover::new(MoveBehavior::Refuse);
        let tx = transaction(&lock);

        assert!(!tx.execute(&mover).await.unwrap());
        assert_eq!(tx.status(), TransactionStatus::Failed);

        mover.set_behavior(MoveBehavior::Receipt("receipt-2"));
        assert!(tx.execute(&mover).await.unwrap());
        assert_eq!(tx.status(), TransactionStatus::Executed);

        assert_eq!(mover.move_count(), 2);
        assert_eq!(lock.unlock_count(), 2);
    }

    #[tokio::test]
    async fn test_lock_contention_then_retry() {
        let lock = Arc::new(MockLock::new());
        lock.set_grant(false);
        let mover = MockMoneyMover::succeeding();
        let tx = transaction(&lock);

        assert!(!tx.execute(&mover).await.unwrap());

        lock.set_grant(true);
        assert!(tx.execute(&mover).await.unwrap());
        assert_eq!(mover.move_count(), 1);
    }

    #[tokio::test]
    async fn test_mover_error_releases_lock() {
        let lock = Arc::new(MockLock::new());
        let mover = MockMoneyMover::new(MoveBehavior::Error);
        let tx = transaction(&lock);

        let err = tx.execute(&mover).await.unwrap_err();
        assert!(matches!(err, TransactionError::MoneyMover(_)));
        assert!(err.is_retryable());

        assert_eq!(tx.status(), TransactionStatus::Created);
        assert_eq!(lock.unlock_count(), 1);
    }

    #[tokio::test]
    async fn test_mover_panic_releases_lock() {
        let lock = Arc::new(MockLock::new());
        let mover = MockMoneyMover::new(MoveBehavior::Panic);
        let tx = transaction(&lock);

        let outcome = AssertUnwindSafe(tx.execute(&mover)).catch_unwind().await;
        assert!(outcome.is_err());

        assert_eq!(tx.status(), TransactionStatus::Created);
        assert_eq!(lock.lock_count(), 1);
        assert_eq!(lock.unlock_count(), 1);
    }

    /// Caller-level timeout drops `execute` while the mover is in flight
    #[tokio::test]
    async fn test_cancelled_execute_releases_lock() {
        let lock = Arc::new(MockLock::new());
        let mover = MockMoneyMover::new(MoveBehavior::Stall(Duration::from_millis(200)));
        let tx = transaction(&lock);

        let result = tokio::time::timeout(Duration::from_millis(20), tx.execute(&mover)).await;
        assert!(result.is_err());

        // Release runs as a background task on the runtime
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(tx.status(), TransactionStatus::Created);
        assert_eq!(lock.lock_count(), 1);
        assert_eq!(lock.unlock_count(), 1);
    }
}
