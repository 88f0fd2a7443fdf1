//! Provider traits for the ticket service.
//!
//! The service talks to its collaborators only through these traits, so that
//! alternate stores and caches (including the in-memory mocks) can be
//! substituted without touching the purchase logic.
//!
//! - [`TicketStore`] / [`TicketTransaction`]: authoritative relational store
//! - [`TicketCache`]: advisory key/value cache with TTL
//! - [`HealthProbe`]: liveness check used by background health polling

pub mod cache;
pub mod health;
pub mod store;

pub use cache::TicketCache;
pub use health::HealthProbe;
pub use store::{TicketStore, TicketTransaction};
