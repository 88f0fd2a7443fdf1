//! HTTP request layer for Ticketbox.
//!
//! Maps JSON requests onto [`TicketService`](ticketbox_core::TicketService)
//! operations and [`TicketError`](ticketbox_core::TicketError)s onto status
//! codes. Also hosts the background [`HealthMonitor`] behind `GET /health`.
//!
//! # Example
//!
//! ```
//! use ticketbox_core::mocks::{MockTicketCache, MockTicketStore};
//! use ticketbox_core::{ServiceConfig, TicketService};
//! use ticketbox_web::{AppState, HealthMonitor, build_router};
//!
//! let service = TicketService::new(
//!     MockTicketStore::new(),
//!     MockTicketCache::new(),
//!     ServiceConfig::default(),
//! );
//! let app = build_router(AppState::new(service, HealthMonitor::new()));
//! # drop(app);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod monitor;
pub mod router;
pub mod state;

pub use error::AppError;
pub use monitor::HealthMonitor;
pub use router::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
