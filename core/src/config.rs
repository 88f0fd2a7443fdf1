//! Tunables for [`TicketService`](crate::TicketService).

use std::time::Duration;

/// Default lifetime of a cached ticket (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default deadline for opening a purchase transaction and locking the row.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Ticket service configuration.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use ticketbox_core::ServiceConfig;
///
/// let config = ServiceConfig::default().with_lock_timeout(Duration::from_millis(250));
/// assert_eq!(config.cache_ttl, Duration::from_secs(300));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Lifetime of cached tickets; also the maximum staleness after a failed
    /// invalidation
    pub cache_ttl: Duration,
    /// Deadline for acquiring the row lock during a purchase
    pub lock_timeout: Duration,
}

impl ServiceConfig {
    /// Create a configuration with explicit values.
    #[must_use]
    pub const fn new(cache_ttl: Duration, lock_timeout: Duration) -> Self {
        Self {
            cache_ttl,
            lock_timeout,
        }
    }

    /// Override the cache TTL.
    #[must_use]
    pub const fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    /// Override the purchase lock timeout.
    #[must_use]
    pub const fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL, DEFAULT_LOCK_TIMEOUT)
    }
}
