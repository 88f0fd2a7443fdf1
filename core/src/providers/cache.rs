//! Ticket cache trait.

use crate::error::CacheError;
use std::time::Duration;

/// Advisory key/value cache.
///
/// This trait abstracts over the read-through cache (Redis).
///
/// # Implementation Notes
///
/// - Values are opaque bytes; the service owns the encoding
/// - The cache is never authoritative and may lose entries at any time
/// - Implementations must be safe for concurrent use through `&self`
pub trait TicketCache: Send + Sync {
    /// Get a value.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the key is absent or expired.
    ///
    /// # Errors
    ///
    /// Returns error if the cache cannot be reached.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<Vec<u8>>, CacheError>> + Send;

    /// Store a value that expires after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns error if the cache cannot be reached.
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<(), CacheError>> + Send;

    /// Remove a value. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the cache cannot be reached.
    fn delete(&self, key: &str) -> impl std::future::Future<Output = Result<(), CacheError>> + Send;
}
