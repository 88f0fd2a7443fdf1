//! Scoped resolution of purchase transactions.
//!
//! A [`TransactionGuard`] owns a store transaction from `begin` until it is
//! resolved. [`resolve`](TransactionGuard::resolve) commits exactly once when
//! the recorded outcome is `Ok` and rolls back otherwise. A guard that is
//! dropped unresolved (the purchase future was cancelled, or a panic is
//! unwinding through it) drops the transaction, which every
//! [`TicketTransaction`] implementation rolls back.

use crate::error::{Result, StoreError, TicketError};
use crate::providers::TicketTransaction;
use crate::ticket::TicketId;

/// Owns a transaction until it is committed or rolled back.
pub(crate) struct TransactionGuard<T: TicketTransaction> {
    tx: Option<T>,
    ticket_id: TicketId,
}

impl<T: TicketTransaction> TransactionGuard<T> {
    pub(crate) const fn new(tx: T, ticket_id: TicketId) -> Self {
        Self {
            tx: Some(tx),
            ticket_id,
        }
    }

    /// Borrow the open transaction.
    pub(crate) fn transaction(&mut self) -> Result<&mut T> {
        self.tx
            .as_mut()
            .ok_or_else(|| StoreError::Database("transaction already resolved".into()).into())
    }

    /// Give up on the transaction without waiting for the store.
    ///
    /// Used when the caller's deadline has passed: a cancelled lock wait may
    /// still be pending on the connection, and an explicit rollback would
    /// have to wait for it. Dropping hands the rollback to the store.
    pub(crate) fn abandon(mut self) {
        if let Some(tx) = self.tx.take() {
            tracing::debug!(ticket_id = %self.ticket_id, "Abandoning timed-out purchase transaction");
            drop(tx);
        }
    }

    /// Commit if `outcome` is `Ok`, roll back otherwise.
    ///
    /// A failed commit replaces the outcome with the store error. A failed
    /// rollback is logged and the original error is returned.
    pub(crate) async fn resolve<R>(mut self, outcome: Result<R>) -> Result<R> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => return outcome,
        };

        match outcome {
            Ok(value) => {
                tx.commit().await.map_err(|e| {
                    tracing::error!(
                        ticket_id = %self.ticket_id,
                        error = %e,
                        "Failed to commit purchase transaction"
                    );
                    TicketError::Store(e)
                })?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(
                        ticket_id = %self.ticket_id,
                        error = %rollback_err,
                        "Rollback failed; store discards the transaction on disconnect"
                    );
                }
                Err(err)
            }
        }
    }
}

impl<T: TicketTransaction> Drop for TransactionGuard<T> {
    fn drop(&mut self) {
        if self.tx.is_some() {
            // Dropping `tx` right after this rolls it back
            tracing::warn!(
                ticket_id = %self.ticket_id,
                panicking = std::thread::panicking(),
                "Purchase transaction abandoned before resolution, rolling back"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::mocks::MockTicketStore;
    use crate::providers::{TicketStore, TicketTransaction};
    use crate::ticket::NewTicket;

    async fn locked_guard() -> (MockTicketStore, TicketId, TransactionGuard<crate::mocks::MockTransaction>) {
        let store = MockTicketStore::new();
        let id = store
            .insert(&NewTicket::new("Concert", "", 10))
            .await
            .expect("insert");
        let mut guard = TransactionGuard::new(store.begin().await.expect("begin"), id);
        let tx = guard.transaction().expect("open transaction");
        tx.find_for_update(id).await.expect("lock row");
        tx.update_allocation(id, 4).await.expect("stage update");
        (store, id, guard)
    }

    #[tokio::test]
    async fn test_ok_outcome_commits_once() {
        let (store, id, guard) = locked_guard().await;

        let value = guard.resolve(Ok(4)).await.expect("commit");

        assert_eq!(value, 4);
        assert_eq!(store.commit_count(), 1);
        assert_eq!(store.rollback_count(), 0);
        assert_eq!(store.allocation(id), Some(4));
    }

    #[tokio::test]
    async fn test_error_outcome_rolls_back() {
        let (store, id, guard) = locked_guard().await;

        let result: Result<i64> = guard
            .resolve(Err(ValidationError::AllocationTooLarge.into()))
            .await;

        assert!(matches!(result, Err(TicketError::Validation(_))));
        assert_eq!(store.commit_count(), 0);
        assert_eq!(store.rollback_count(), 1);
        assert_eq!(store.allocation(id), Some(10));
    }

    #[tokio::test]
    async fn test_commit_failure_replaces_outcome() {
        let (store, id, guard) = locked_guard().await;
        store.fail_commit(true);

        let result = guard.resolve(Ok(4)).await;

        assert!(matches!(result, Err(TicketError::Store(StoreError::Commit(_)))));
        assert_eq!(store.allocation(id), Some(10));
    }

    #[tokio::test]
    async fn test_abandoned_guard_rolls_back_without_commit() {
        let (store, id, guard) = locked_guard().await;

        guard.abandon();

        assert_eq!(store.commit_count(), 0);
        assert_eq!(store.rollback_count(), 1);
        assert_eq!(store.allocation(id), Some(10));

        // The row lock is released
        let mut tx = store.begin().await.expect("begin");
        let ticket = tx.find_for_update(id).await.expect("lock row");
        assert_eq!(ticket.map(|t| t.allocation), Some(10));
    }

    #[tokio::test]
    async fn test_dropped_guard_rolls_back() {
        let (store, id, guard) = locked_guard().await;

        drop(guard);

        assert_eq!(store.rollback_count(), 1);
        assert_eq!(store.allocation(id), Some(10));
    }
}
