//! # Ticketbox Core
//!
//! Ticket domain model and the concurrency-safe purchase service.
//!
//! ## Core Concepts
//!
//! - **Ticket**: a ticket type with a fixed, only-decreasing allocation
//! - **Store**: the authoritative relational store, accessed through
//!   [`TicketStore`] and row-locking [`TicketTransaction`]s
//! - **Cache**: an advisory read-through [`TicketCache`], never consulted when
//!   deciding a purchase
//! - **Service**: [`TicketService`] ties the two together
//!
//! ## Consistency
//!
//! Purchases of one ticket are serialized by the store's exclusive row lock,
//! so the sum of successful purchase quantities never exceeds the allocation
//! the ticket was created with. Correctness never depends on process memory:
//! any number of service instances may share one store.
//!
//! ## Example
//!
//! ```
//! use ticketbox_core::mocks::{MockTicketCache, MockTicketStore};
//! use ticketbox_core::{NewTicket, ServiceConfig, TicketError, TicketService};
//!
//! # async fn example() -> ticketbox_core::Result<()> {
//! let service = TicketService::new(
//!     MockTicketStore::new(),
//!     MockTicketCache::new(),
//!     ServiceConfig::default(),
//! );
//!
//! let ticket = service.create(&NewTicket::new("Concert", "", 1)).await?;
//! service.purchase(ticket.id, 1).await?;
//!
//! let err = service.purchase(ticket.id, 1).await.unwrap_err();
//! assert!(matches!(err, TicketError::SoldOut { .. }));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod providers;
pub mod service;
pub mod ticket;

mod transaction;

/// Mock implementations for testing
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use config::ServiceConfig;
pub use error::{CacheError, ErrorKind, Result, StoreError, TicketError, ValidationError};
pub use providers::{HealthProbe, TicketCache, TicketStore, TicketTransaction};
pub use service::TicketService;
pub use ticket::{
    MAX_ALLOCATION, MAX_NAME_LENGTH, NewTicket, Purchase, TICKET_CACHE_PREFIX, Ticket, TicketId,
    validate_quantity,
};
