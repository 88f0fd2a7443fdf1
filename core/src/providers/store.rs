//! Ticket store traits.

use crate::error::StoreError;
use crate::ticket::{NewTicket, Ticket, TicketId};
use std::time::Duration;

/// Authoritative ticket store.
///
/// This trait abstracts over the relational store (`PostgreSQL`).
///
/// # Implementation Notes
///
/// - `find` is a plain, non-locking read
/// - All allocation changes go through a [`TicketTransaction`]
/// - The store handle is shared; each transaction is owned by one caller
pub trait TicketStore: Send + Sync {
    /// Transaction handle returned by [`begin`](Self::begin).
    type Transaction: TicketTransaction;

    /// Insert a validated ticket.
    ///
    /// # Returns
    ///
    /// The store-assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails.
    fn insert(
        &self,
        ticket: &NewTicket,
    ) -> impl std::future::Future<Output = Result<TicketId, StoreError>> + Send;

    /// Read a ticket without locking.
    ///
    /// # Returns
    ///
    /// `None` if no ticket has this id.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn find(
        &self,
        id: TicketId,
    ) -> impl std::future::Future<Output = Result<Option<Ticket>, StoreError>> + Send;

    /// Open a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Begin`] if no transaction can be opened.
    fn begin(
        &self,
    ) -> impl std::future::Future<Output = Result<Self::Transaction, StoreError>> + Send;

    /// Open a transaction whose row-lock waits give up after `lock_wait`.
    ///
    /// Stores that can bound lock waits server-side should do so here, so
    /// that an abandoned wait does not keep running after the caller's
    /// deadline. The default ignores `lock_wait`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Begin`] if no transaction can be opened.
    fn begin_within(
        &self,
        lock_wait: Duration,
    ) -> impl std::future::Future<Output = Result<Self::Transaction, StoreError>> + Send {
        let _ = lock_wait;
        self.begin()
    }
}

/// A single store transaction.
///
/// # Implementation Notes
///
/// - Resolved by exactly one call to [`commit`](Self::commit) or
///   [`rollback`](Self::rollback)
/// - Dropping an unresolved transaction must roll it back and release its
///   row locks
pub trait TicketTransaction: Send + Sized {
    /// Read a ticket and take an exclusive lock on its row.
    ///
    /// Concurrent callers locking the same row wait until this transaction
    /// commits or rolls back, then observe its result.
    ///
    /// # Returns
    ///
    /// `None` if no ticket has this id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockTimeout`] if the store gave up waiting for the
    /// lock, or another [`StoreError`] if the query fails.
    fn find_for_update(
        &mut self,
        id: TicketId,
    ) -> impl std::future::Future<Output = Result<Option<Ticket>, StoreError>> + Send;

    /// Overwrite the allocation of a locked row.
    ///
    /// # Errors
    ///
    /// Returns error if the update fails.
    fn update_allocation(
        &mut self,
        id: TicketId,
        allocation: i64,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Commit and release all locks.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Commit`] if the commit fails; the store has then
    /// discarded every write made in this transaction.
    fn commit(self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Discard all writes and release all locks.
    ///
    /// # Errors
    ///
    /// Returns error if the store could not be told to roll back.
    fn rollback(self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
