//! Mock provider implementations for testing.
//!
//! This module provides in-memory implementations of the provider traits for
//! use in unit and integration tests.

pub mod cache;
pub mod store;

pub use cache::MockTicketCache;
pub use store::{MockTicketStore, MockTransaction};
