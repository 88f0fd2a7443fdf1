//! Ticketbox server.
//!
//! Wires the `PostgreSQL` store, the Redis cache and the HTTP layer into one
//! process:
//!
//! 1. Start the Prometheus metrics listener
//! 2. Connect the database pool (optionally applying migrations)
//! 3. Connect Redis
//! 4. Start background health probes
//! 5. Serve the API until Ctrl+C or SIGTERM, then drain in-flight requests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod config;
pub mod metrics;

pub use app::{init_tracing, run};
pub use config::Config;
