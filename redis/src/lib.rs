//! Redis ticket cache for Ticketbox.
//!
//! Implements [`TicketCache`](ticketbox_core::TicketCache) with plain
//! `GET`/`SET EX`/`DEL` on a shared `ConnectionManager`, which reconnects on
//! its own after the server goes away.
//!
//! # Example
//!
//! ```no_run
//! use ticketbox_redis::RedisTicketCache;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = RedisTicketCache::new("redis://127.0.0.1:6379").await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use ticketbox_core::{CacheError, HealthProbe, TicketCache};

/// Redis-backed ticket cache.
///
/// Cloning is cheap; clones share one multiplexed connection.
#[derive(Clone)]
pub struct RedisTicketCache {
    /// Connection manager for connection reuse and reconnects.
    conn_manager: ConnectionManager,
}

impl RedisTicketCache {
    /// Connect to Redis.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://127.0.0.1:6379")
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Unavailable`] if the URL is invalid or the first
    /// connection fails.
    pub async fn new(redis_url: &str) -> Result<Self, CacheError> {
        let client = Client::open(redis_url).map_err(|e| {
            CacheError::Unavailable(format!("Failed to create Redis client: {e}"))
        })?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::Unavailable(format!("Failed to create Redis connection manager: {e}"))
        })?;

        tracing::debug!(url = %redis_url, "Connected to Redis");

        Ok(Self { conn_manager })
    }
}

/// Whole seconds for `SET EX`, which rejects zero.
fn expiry_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

impl TicketCache for RedisTicketCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn_manager.clone();
        conn.get(key)
            .await
            .map_err(|e| CacheError::Unavailable(format!("Failed to get {key}: {e}")))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn_manager.clone();
        let _: () = conn
            .set_ex(key, value, expiry_seconds(ttl))
            .await
            .map_err(|e| CacheError::Unavailable(format!("Failed to set {key}: {e}")))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn_manager.clone();
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| CacheError::Unavailable(format!("Failed to delete {key}: {e}")))?;
        Ok(())
    }
}

impl HealthProbe for RedisTicketCache {
    fn component(&self) -> &'static str {
        "cache"
    }

    async fn ping(&self) -> Result<(), String> {
        let mut conn = self.conn_manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_rounds_up_to_one_second() {
        assert_eq!(expiry_seconds(Duration::from_millis(10)), 1);
        assert_eq!(expiry_seconds(Duration::ZERO), 1);
        assert_eq!(expiry_seconds(Duration::from_secs(300)), 300);
    }
}
