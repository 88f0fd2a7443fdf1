//! Application state for the ticket HTTP handlers.

use crate::monitor::HealthMonitor;
use axum::extract::FromRef;
use std::sync::Arc;
use ticketbox_core::TicketService;

/// Application state shared across all HTTP handlers.
///
/// Generic over the store and cache so the same router serves both the
/// production adapters and the in-memory mocks. It's cloned (cheaply via
/// `Arc`) for each request.
pub struct AppState<S, C> {
    /// Ticket service
    pub service: Arc<TicketService<S, C>>,
    /// Health flags read by `GET /health`
    pub health: HealthMonitor,
}

impl<S, C> AppState<S, C> {
    /// Create a new application state.
    #[must_use]
    pub fn new(service: TicketService<S, C>, health: HealthMonitor) -> Self {
        Self {
            service: Arc::new(service),
            health,
        }
    }
}

// Not derived: that would require `S: Clone` and `C: Clone`
impl<S, C> Clone for AppState<S, C> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            health: self.health.clone(),
        }
    }
}

impl<S, C> FromRef<AppState<S, C>> for HealthMonitor {
    fn from_ref(state: &AppState<S, C>) -> Self {
        state.health.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketbox_core::ServiceConfig;
    use ticketbox_core::mocks::{MockTicketCache, MockTicketStore};

    #[test]
    fn test_clones_share_service() {
        let state = AppState::new(
            TicketService::new(
                MockTicketStore::new(),
                MockTicketCache::new(),
                ServiceConfig::default(),
            ),
            HealthMonitor::new(),
        );

        let clone = state.clone();

        assert!(Arc::ptr_eq(&state.service, &clone.service));
    }
}
