//! Ticket service: creation, cached lookups and concurrency-safe purchases.
//!
//! # Architecture
//!
//! - **Reads** are cache-aside: `ticket:{id}` is tried first, the store is the
//!   fallback, and the cache is repopulated best-effort.
//! - **Purchases** never consult the cache. Each purchase locks the ticket row
//!   inside a store transaction (`SELECT ... FOR UPDATE`), checks the
//!   allocation, writes the decrement and commits. Purchases of the same
//!   ticket are therefore strictly serialized by the store, across every
//!   service instance.
//! - **Invalidation** happens only after a successful commit. If it fails the
//!   cached copy stays stale for at most [`ServiceConfig::cache_ttl`].
//!
//! # Example
//!
//! ```
//! use ticketbox_core::mocks::{MockTicketCache, MockTicketStore};
//! use ticketbox_core::{NewTicket, ServiceConfig, TicketService};
//!
//! # async fn example() -> ticketbox_core::Result<()> {
//! let service = TicketService::new(
//!     MockTicketStore::new(),
//!     MockTicketCache::new(),
//!     ServiceConfig::default(),
//! );
//!
//! let ticket = service.create(&NewTicket::new("Concert", "Main stage", 100)).await?;
//! let receipt = service.purchase(ticket.id, 30).await?;
//! assert_eq!(receipt.remaining, 70);
//! # Ok(())
//! # }
//! ```

use crate::config::ServiceConfig;
use crate::error::{CacheError, Result, StoreError, TicketError};
use crate::providers::{TicketCache, TicketStore, TicketTransaction};
use crate::ticket::{NewTicket, Purchase, Ticket, TicketId, validate_quantity};
use crate::transaction::TransactionGuard;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};

/// Ticket service over an injected store and cache.
///
/// Cloning the service clones the store and cache handles; both are expected
/// to be cheap shared handles (a connection pool, a connection manager).
#[derive(Debug, Clone)]
pub struct TicketService<S, C> {
    store: S,
    cache: C,
    config: ServiceConfig,
}

impl<S, C> TicketService<S, C>
where
    S: TicketStore,
    C: TicketCache,
{
    /// Create a new ticket service.
    ///
    /// # Arguments
    ///
    /// * `store` - Authoritative ticket store
    /// * `cache` - Read-through cache
    /// * `config` - Cache TTL and purchase lock timeout
    #[must_use]
    pub const fn new(store: S, cache: C, config: ServiceConfig) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    /// Get the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Get the underlying cache.
    #[must_use]
    pub const fn cache(&self) -> &C {
        &self.cache
    }

    /// Get the service configuration.
    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Validate and persist a new ticket.
    ///
    /// The cache is not touched; it is populated by the first [`get`](Self::get).
    ///
    /// # Returns
    ///
    /// The ticket with its store-assigned id.
    ///
    /// # Errors
    ///
    /// - [`TicketError::Validation`] for the first violated rule, before any
    ///   store interaction
    /// - [`TicketError::Store`] if the insert fails
    pub async fn create(&self, ticket: &NewTicket) -> Result<Ticket> {
        ticket.validate()?;

        let id = self.store.insert(ticket).await.map_err(|e| {
            tracing::error!(name = %ticket.name, error = %e, "Failed to insert ticket");
            TicketError::Store(e)
        })?;

        metrics::counter!("tickets_created_total").increment(1);
        tracing::info!(
            ticket_id = %id,
            name = %ticket.name,
            allocation = ticket.allocation,
            "Created ticket"
        );

        Ok(ticket.clone().into_ticket(id))
    }

    /// Look up a ticket, serving from the cache when possible.
    ///
    /// Cache misses, cache failures and undecodable entries all fall through
    /// to the store. A successful store read repopulates the cache.
    ///
    /// # Errors
    ///
    /// - [`TicketError::NotFound`] if no ticket has this id
    /// - [`TicketError::Store`] if the store query fails
    pub async fn get(&self, id: TicketId) -> Result<Ticket> {
        if let Some(ticket) = self.cached_ticket(id).await {
            return Ok(ticket);
        }

        let ticket = self
            .store
            .find(id)
            .await
            .map_err(|e| {
                tracing::error!(ticket_id = %id, error = %e, "Failed to load ticket");
                TicketError::Store(e)
            })?
            .ok_or(TicketError::NotFound { id })?;

        self.cache_ticket(&ticket).await;

        Ok(ticket)
    }

    /// Purchase `quantity` units using the configured lock timeout.
    ///
    /// # Errors
    ///
    /// See [`purchase_within`](Self::purchase_within).
    pub async fn purchase(&self, id: TicketId, quantity: i64) -> Result<Purchase> {
        self.purchase_within(id, quantity, self.config.lock_timeout)
            .await
    }

    /// Purchase `quantity` units, waiting at most `timeout` for the row lock.
    ///
    /// The deadline covers opening the transaction and locking the row, and
    /// the remaining time is handed to the store as its lock wait bound. Once
    /// the lock is held the purchase runs to completion. A timed-out
    /// transaction is dropped rather than explicitly rolled back, so the call
    /// returns at the deadline even if the store is still unwinding the wait.
    ///
    /// # Errors
    ///
    /// - [`TicketError::Validation`] if `quantity` is out of range; no
    ///   transaction is opened
    /// - [`TicketError::NotFound`] if no ticket has this id
    /// - [`TicketError::SoldOut`] if the allocation is zero
    /// - [`TicketError::InsufficientAllocation`] if the allocation is smaller
    ///   than `quantity`
    /// - [`TicketError::Timeout`] if the lock was not acquired in time
    /// - [`TicketError::Store`] if the store fails, including on commit
    pub async fn purchase_within(
        &self,
        id: TicketId,
        quantity: i64,
        timeout: Duration,
    ) -> Result<Purchase> {
        let started = Instant::now();
        let deadline = started
            .checked_add(timeout)
            .unwrap_or_else(|| started + Duration::from_secs(86_400));
        let outcome = self.purchase_inner(id, quantity, deadline).await;

        metrics::histogram!("ticket_purchase_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        metrics::counter!("ticket_purchases_total", "outcome" => outcome_label(&outcome))
            .increment(1);

        match &outcome {
            Ok(purchase) => tracing::info!(
                ticket_id = %id,
                quantity = quantity,
                remaining = purchase.remaining,
                "Purchase committed"
            ),
            Err(e) if e.is_retryable() => tracing::warn!(
                ticket_id = %id,
                quantity = quantity,
                error = %e,
                "Purchase failed"
            ),
            Err(e) => tracing::debug!(
                ticket_id = %id,
                quantity = quantity,
                error = %e,
                "Purchase rejected"
            ),
        }

        outcome
    }

    async fn purchase_inner(
        &self,
        id: TicketId,
        quantity: i64,
        deadline: Instant,
    ) -> Result<Purchase> {
        validate_quantity(quantity)?;

        let started = Instant::now();
        let lock_wait = deadline.saturating_duration_since(started);
        let tx = timeout_at(deadline, self.store.begin_within(lock_wait))
            .await
            .map_err(|_| TicketError::Timeout {
                id,
                waited: started.elapsed(),
            })??;

        let mut guard = TransactionGuard::new(tx, id);
        let outcome = match guard.transaction() {
            Ok(tx) => Self::decrement(tx, id, quantity, deadline, started).await,
            Err(e) => Err(e),
        };
        let remaining = match outcome {
            Err(e @ TicketError::Timeout { .. }) => {
                guard.abandon();
                return Err(e);
            }
            outcome => guard.resolve(outcome).await?,
        };

        // Only after commit: earlier, a concurrent reader could repopulate the
        // cache with the pre-purchase allocation
        self.invalidate(id).await;

        Ok(Purchase {
            ticket_id: id,
            quantity,
            remaining,
        })
    }

    /// Lock the row, check the allocation and write the decrement.
    async fn decrement(
        tx: &mut S::Transaction,
        id: TicketId,
        quantity: i64,
        deadline: Instant,
        started: Instant,
    ) -> Result<i64> {
        let ticket = match timeout_at(deadline, tx.find_for_update(id)).await {
            Ok(Ok(Some(ticket))) => ticket,
            Ok(Ok(None)) => return Err(TicketError::NotFound { id }),
            Ok(Err(StoreError::LockTimeout(_))) | Err(_) => {
                return Err(TicketError::Timeout {
                    id,
                    waited: started.elapsed(),
                });
            }
            Ok(Err(e)) => return Err(TicketError::Store(e)),
        };

        if ticket.is_sold_out() {
            return Err(TicketError::SoldOut { id });
        }

        if ticket.allocation < quantity {
            return Err(TicketError::InsufficientAllocation {
                id,
                requested: quantity,
                available: ticket.allocation,
            });
        }

        let remaining = ticket.allocation - quantity;
        tx.update_allocation(id, remaining).await?;

        Ok(remaining)
    }

    /// Read and decode a cached ticket. Any failure is reported as `None`.
    async fn cached_ticket(&self, id: TicketId) -> Option<Ticket> {
        let key = id.cache_key();

        let bytes = match self.cache.get(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                metrics::counter!("ticket_cache_lookups_total", "outcome" => "miss").increment(1);
                tracing::debug!(ticket_id = %id, "Ticket cache miss");
                return None;
            }
            Err(e) => {
                metrics::counter!("ticket_cache_lookups_total", "outcome" => "error").increment(1);
                tracing::warn!(ticket_id = %id, error = %e, "Ticket cache lookup failed, reading store");
                return None;
            }
        };

        match bincode::deserialize::<Ticket>(&bytes) {
            Ok(ticket) => {
                metrics::counter!("ticket_cache_lookups_total", "outcome" => "hit").increment(1);
                Some(ticket)
            }
            Err(e) => {
                metrics::counter!("ticket_cache_lookups_total", "outcome" => "error").increment(1);
                let err = CacheError::Serialization(e.to_string());
                tracing::warn!(ticket_id = %id, error = %err, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Best-effort cache population.
    async fn cache_ticket(&self, ticket: &Ticket) {
        let result = match bincode::serialize(ticket) {
            Ok(bytes) => {
                self.cache
                    .set(&ticket.id.cache_key(), bytes, self.config.cache_ttl)
                    .await
            }
            Err(e) => Err(CacheError::Serialization(e.to_string())),
        };

        if let Err(e) = result {
            metrics::counter!("ticket_cache_write_failures_total").increment(1);
            tracing::warn!(ticket_id = %ticket.id, error = %e, "Failed to cache ticket");
        }
    }

    /// Best-effort cache invalidation after a committed purchase.
    async fn invalidate(&self, id: TicketId) {
        if let Err(e) = self.cache.delete(&id.cache_key()).await {
            metrics::counter!("ticket_cache_invalidation_failures_total").increment(1);
            tracing::warn!(
                ticket_id = %id,
                error = %e,
                ttl_seconds = self.config.cache_ttl.as_secs(),
                "Failed to invalidate cached ticket; entry stays stale until it expires"
            );
        }
    }
}

/// Metric label for a purchase outcome.
const fn outcome_label(outcome: &Result<Purchase>) -> &'static str {
    match outcome {
        Ok(_) => "success",
        Err(TicketError::Validation(_) | TicketError::MissingTicket) => "invalid",
        Err(TicketError::NotFound { .. }) => "not_found",
        Err(TicketError::SoldOut { .. }) => "sold_out",
        Err(TicketError::InsufficientAllocation { .. }) => "insufficient",
        Err(TicketError::Timeout { .. } | TicketError::Store(StoreError::LockTimeout(_))) => {
            "timeout"
        }
        Err(TicketError::Store(_)) => "error",
    }
}
