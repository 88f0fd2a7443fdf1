//! `PostgreSQL` ticket store for Ticketbox.
//!
//! Implements [`TicketStore`](ticketbox_core::TicketStore) on a `sqlx`
//! connection pool. Purchases lock the ticket row with `SELECT ... FOR UPDATE`
//! inside a transaction, so concurrent purchases of one ticket are serialized
//! by the database across every service instance sharing it.
//!
//! # Example
//!
//! ```no_run
//! use ticketbox_postgres::PostgresTicketStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresTicketStore::new("postgres://localhost/tickets").await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod store;

pub use store::{PostgresTicketStore, PostgresTransaction};
