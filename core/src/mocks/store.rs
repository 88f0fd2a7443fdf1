//! In-memory ticket store with real row locking.

use crate::error::StoreError;
use crate::providers::{HealthProbe, TicketStore, TicketTransaction};
use crate::ticket::{NewTicket, Ticket, TicketId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

/// In-memory ticket store for testing.
///
/// Behaves like a relational store with `SELECT ... FOR UPDATE`:
/// - each row has an async exclusive lock held until commit or rollback
/// - writes are staged in the transaction and applied on commit
/// - dropping an unresolved transaction discards its writes
///
/// Failures can be injected per operation, and every transaction outcome is
/// counted so tests can assert on store interaction.
#[derive(Debug, Clone, Default)]
pub struct MockTicketStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    rows: Mutex<Rows>,
    locks: Mutex<HashMap<TicketId, Arc<RowLock<()>>>>,
    fail_begin: AtomicBool,
    fail_commit: AtomicBool,
    fail_update: AtomicBool,
    panic_on_update: AtomicBool,
    stall_rollback: AtomicBool,
    unhealthy: AtomicBool,
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    finds: AtomicUsize,
    last_lock_wait: Mutex<Option<Duration>>,
}

#[derive(Debug, Default)]
struct Rows {
    tickets: HashMap<TicketId, Ticket>,
    last_id: i64,
}

impl MockTicketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> Result<std::sync::MutexGuard<'_, Rows>, StoreError> {
        self.inner
            .rows
            .lock()
            .map_err(|_| StoreError::Database("Mutex lock failed".into()))
    }

    fn row_lock(&self, id: TicketId) -> Result<Arc<RowLock<()>>, StoreError> {
        let mut locks = self
            .inner
            .locks
            .lock()
            .map_err(|_| StoreError::Database("Mutex lock failed".into()))?;
        Ok(Arc::clone(locks.entry(id).or_default()))
    }

    /// Committed allocation of a ticket, bypassing locks.
    #[must_use]
    pub fn allocation(&self, id: TicketId) -> Option<i64> {
        self.rows()
            .ok()
            .and_then(|rows| rows.tickets.get(&id).map(|t| t.allocation))
    }

    /// Number of transactions opened.
    #[must_use]
    pub fn begin_count(&self) -> usize {
        self.inner.begins.load(Ordering::SeqCst)
    }

    /// Number of transactions committed.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.inner.commits.load(Ordering::SeqCst)
    }

    /// Number of transactions rolled back, explicitly or by drop.
    #[must_use]
    pub fn rollback_count(&self) -> usize {
        self.inner.rollbacks.load(Ordering::SeqCst)
    }

    /// Number of plain (non-locking) reads.
    #[must_use]
    pub fn find_count(&self) -> usize {
        self.inner.finds.load(Ordering::SeqCst)
    }

    /// Make `begin` fail.
    pub fn fail_begin(&self, fail: bool) {
        self.inner.fail_begin.store(fail, Ordering::SeqCst);
    }

    /// Make `commit` fail (the transaction is rolled back).
    pub fn fail_commit(&self, fail: bool) {
        self.inner.fail_commit.store(fail, Ordering::SeqCst);
    }

    /// Make `update_allocation` fail.
    pub fn fail_update(&self, fail: bool) {
        self.inner.fail_update.store(fail, Ordering::SeqCst);
    }

    /// Make `update_allocation` panic while the row lock is held.
    pub fn panic_on_update(&self, panic: bool) {
        self.inner.panic_on_update.store(panic, Ordering::SeqCst);
    }

    /// Make explicit `rollback` calls hang, as a connection still draining a
    /// cancelled lock wait would. Dropping the transaction still rolls back.
    pub fn stall_rollback(&self, stall: bool) {
        self.inner.stall_rollback.store(stall, Ordering::SeqCst);
    }

    /// Lock wait bound passed to the most recent `begin_within`.
    #[must_use]
    pub fn last_lock_wait(&self) -> Option<Duration> {
        self.inner
            .last_lock_wait
            .lock()
            .ok()
            .and_then(|wait| *wait)
    }

    /// Make health probes fail.
    pub fn set_healthy(&self, healthy: bool) {
        self.inner.unhealthy.store(!healthy, Ordering::SeqCst);
    }
}

impl TicketStore for MockTicketStore {
    type Transaction = MockTransaction;

    async fn insert(&self, ticket: &NewTicket) -> Result<TicketId, StoreError> {
        let mut rows = self.rows()?;
        rows.last_id += 1;
        let id = TicketId::new(rows.last_id);
        rows.tickets.insert(id, ticket.clone().into_ticket(id));
        Ok(id)
    }

    async fn find(&self, id: TicketId) -> Result<Option<Ticket>, StoreError> {
        self.inner.finds.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows()?.tickets.get(&id).cloned())
    }

    async fn begin(&self) -> Result<MockTransaction, StoreError> {
        if self.inner.fail_begin.load(Ordering::SeqCst) {
            return Err(StoreError::Begin("connection refused".into()));
        }
        self.inner.begins.fetch_add(1, Ordering::SeqCst);

        Ok(MockTransaction {
            store: self.clone(),
            held: HashMap::new(),
            staged: HashMap::new(),
            resolved: false,
        })
    }

    async fn begin_within(&self, lock_wait: Duration) -> Result<MockTransaction, StoreError> {
        if let Ok(mut last) = self.inner.last_lock_wait.lock() {
            *last = Some(lock_wait);
        }
        self.begin().await
    }
}

impl HealthProbe for MockTicketStore {
    fn component(&self) -> &'static str {
        "database"
    }

    async fn ping(&self) -> Result<(), String> {
        if self.inner.unhealthy.load(Ordering::SeqCst) {
            return Err("database is not healthy".into());
        }
        Ok(())
    }
}

/// Transaction on a [`MockTicketStore`].
#[derive(Debug)]
pub struct MockTransaction {
    store: MockTicketStore,
    held: HashMap<TicketId, OwnedMutexGuard<()>>,
    staged: HashMap<TicketId, i64>,
    resolved: bool,
}

impl MockTransaction {
    fn finish(&mut self, committed: bool) {
        self.resolved = true;
        self.staged.clear();
        self.held.clear();
        let counter = if committed {
            &self.store.inner.commits
        } else {
            &self.store.inner.rollbacks
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

impl TicketTransaction for MockTransaction {
    async fn find_for_update(&mut self, id: TicketId) -> Result<Option<Ticket>, StoreError> {
        if self.store.rows()?.tickets.get(&id).is_none() {
            return Ok(None);
        }

        if !self.held.contains_key(&id) {
            let guard = self.store.row_lock(id)?.lock_owned().await;
            self.held.insert(id, guard);
        }

        // Re-read after locking so the previous holder's commit is visible
        let mut ticket = self.store.rows()?.tickets.get(&id).cloned();
        if let (Some(ticket), Some(staged)) = (ticket.as_mut(), self.staged.get(&id)) {
            ticket.allocation = *staged;
        }
        Ok(ticket)
    }

    #[allow(clippy::panic)]
    async fn update_allocation(&mut self, id: TicketId, allocation: i64) -> Result<(), StoreError> {
        if !self.held.contains_key(&id) {
            return Err(StoreError::Database(format!("row {id} is not locked")));
        }
        if self.store.inner.panic_on_update.load(Ordering::SeqCst) {
            panic!("injected panic while updating ticket {id}");
        }
        if self.store.inner.fail_update.load(Ordering::SeqCst) {
            return Err(StoreError::Database("update failed".into()));
        }
        self.staged.insert(id, allocation);
        Ok(())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        if self.store.inner.fail_commit.load(Ordering::SeqCst) {
            self.finish(false);
            return Err(StoreError::Commit("could not serialize access".into()));
        }

        {
            let mut rows = self.store.rows()?;
            for (id, allocation) in &self.staged {
                if let Some(ticket) = rows.tickets.get_mut(id) {
                    ticket.allocation = *allocation;
                }
            }
        }

        self.finish(true);
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), StoreError> {
        if self.store.inner.stall_rollback.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.finish(false);
        Ok(())
    }
}

impl Drop for MockTransaction {
    fn drop(&mut self) {
        if !self.resolved {
            self.finish(false);
        }
    }
}
