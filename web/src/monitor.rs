//! Background health polling of backing services.
//!
//! Each registered [`HealthProbe`] is pinged on its own interval and the
//! result is kept in a flag that the `/health` endpoint reads. Only state
//! transitions are logged. Reconnecting is left to the connection pool and the
//! Redis connection manager; the monitor only observes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use ticketbox_core::HealthProbe;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone)]
struct Component {
    name: &'static str,
    healthy: Arc<AtomicBool>,
}

/// Latest known health of each backing service.
///
/// Cloning is cheap; clones observe the same flags.
#[derive(Debug, Clone, Default)]
pub struct HealthMonitor {
    components: Vec<Component>,
}

impl HealthMonitor {
    /// Create a monitor with no components.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start polling `probe` every `interval`.
    ///
    /// The component starts out healthy, since the server only registers
    /// probes after connecting successfully. The task runs until the returned
    /// handle is aborted or the runtime shuts down.
    pub fn spawn_probe<P>(&mut self, probe: P, interval: Duration) -> JoinHandle<()>
    where
        P: HealthProbe + 'static,
    {
        let healthy = Arc::new(AtomicBool::new(true));
        self.components.push(Component {
            name: probe.component(),
            healthy: Arc::clone(&healthy),
        });

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let result = probe.ping().await;
                let was_healthy = healthy.swap(result.is_ok(), Ordering::SeqCst);

                match result {
                    Err(e) if was_healthy => tracing::warn!(
                        component = probe.component(),
                        error = %e,
                        "Health check failed"
                    ),
                    Err(e) => tracing::debug!(
                        component = probe.component(),
                        error = %e,
                        "Still unhealthy"
                    ),
                    Ok(()) if !was_healthy => tracing::info!(
                        component = probe.component(),
                        "Health check recovered"
                    ),
                    Ok(()) => {}
                }
            }
        })
    }

    /// Whether every registered component passed its last check.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.components
            .iter()
            .all(|c| c.healthy.load(Ordering::SeqCst))
    }

    /// Last known status of one component, if registered.
    #[must_use]
    pub fn component_status(&self, name: &str) -> Option<bool> {
        self.components
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.healthy.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketbox_core::mocks::{MockTicketCache, MockTicketStore};

    #[test]
    fn test_empty_monitor_is_healthy() {
        assert!(HealthMonitor::new().is_healthy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_tracks_transitions() {
        let store = MockTicketStore::new();
        let cache = MockTicketCache::new();
        let mut monitor = HealthMonitor::new();
        let db_task = monitor.spawn_probe(store.clone(), Duration::from_secs(10));
        let cache_task = monitor.spawn_probe(cache.clone(), Duration::from_secs(1));

        assert!(monitor.is_healthy());

        cache.set_healthy(false);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(monitor.component_status("cache"), Some(false));
        assert_eq!(monitor.component_status("database"), Some(true));
        assert!(!monitor.is_healthy());

        cache.set_healthy(true);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(monitor.is_healthy());

        store.set_healthy(false);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(monitor.component_status("database"), Some(false));

        db_task.abort();
        cache_task.abort();
    }

    #[test]
    fn test_unknown_component() {
        assert_eq!(HealthMonitor::new().component_status("queue"), None);
    }
}
