//! In-memory ticket cache.

use crate::error::CacheError;
use crate::providers::{HealthProbe, TicketCache};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// In-memory cache with TTL expiry for testing.
///
/// Expiry uses `tokio::time`, so tests running with a paused clock can
/// advance past the TTL deterministically. Reads, writes and deletes can be
/// made to fail independently.
#[derive(Debug, Clone, Default)]
pub struct MockTicketCache {
    entries: Arc<Mutex<HashMap<String, (Vec<u8>, Instant)>>>,
    flags: Arc<Flags>,
}

#[derive(Debug, Default)]
struct Flags {
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    fail_delete: AtomicBool,
    gets: AtomicUsize,
    sets: AtomicUsize,
    deletes: AtomicUsize,
}

impl MockTicketCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, (Vec<u8>, Instant)>>, CacheError> {
        self.entries
            .lock()
            .map_err(|_| CacheError::Unavailable("Mutex lock failed".into()))
    }

    /// Whether an unexpired entry exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.lock().is_ok_and(|entries| {
            entries
                .get(key)
                .is_some_and(|(_, expires_at)| *expires_at > Instant::now())
        })
    }

    /// Remaining lifetime of the entry for `key`.
    #[must_use]
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.lock().ok().and_then(|entries| {
            entries
                .get(key)
                .map(|(_, expires_at)| expires_at.saturating_duration_since(Instant::now()))
        })
    }

    /// Write raw bytes directly, bypassing failure injection.
    pub fn insert_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        if let Ok(mut entries) = self.lock() {
            entries.insert(key.to_string(), (value, Instant::now() + ttl));
        }
    }

    /// Number of `get` calls.
    #[must_use]
    pub fn get_count(&self) -> usize {
        self.flags.gets.load(Ordering::SeqCst)
    }

    /// Number of `set` calls.
    #[must_use]
    pub fn set_count(&self) -> usize {
        self.flags.sets.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls.
    #[must_use]
    pub fn delete_count(&self) -> usize {
        self.flags.deletes.load(Ordering::SeqCst)
    }

    /// Make `get` fail.
    pub fn fail_get(&self, fail: bool) {
        self.flags.fail_get.store(fail, Ordering::SeqCst);
    }

    /// Make `set` fail.
    pub fn fail_set(&self, fail: bool) {
        self.flags.fail_set.store(fail, Ordering::SeqCst);
    }

    /// Make `delete` fail.
    pub fn fail_delete(&self, fail: bool) {
        self.flags.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Make every operation (and health probes) fail or succeed.
    pub fn set_healthy(&self, healthy: bool) {
        self.fail_get(!healthy);
        self.fail_set(!healthy);
        self.fail_delete(!healthy);
    }
}

impl TicketCache for MockTicketCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.flags.gets.fetch_add(1, Ordering::SeqCst);
        if self.flags.fail_get.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("redis server is not healthy".into()));
        }

        let mut entries = self.lock()?;
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.flags.sets.fetch_add(1, Ordering::SeqCst);
        if self.flags.fail_set.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("redis server is not healthy".into()));
        }

        self.lock()?
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.flags.deletes.fetch_add(1, Ordering::SeqCst);
        if self.flags.fail_delete.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("redis server is not healthy".into()));
        }

        self.lock()?.remove(key);
        Ok(())
    }
}

impl HealthProbe for MockTicketCache {
    fn component(&self) -> &'static str {
        "cache"
    }

    async fn ping(&self) -> Result<(), String> {
        if self.flags.fail_get.load(Ordering::SeqCst) {
            return Err("redis server is not healthy".into());
        }
        Ok(())
    }
}
