//! HTTP request handlers.

pub mod health;
pub mod tickets;

pub use health::health_check;
pub use tickets::{create_ticket, get_ticket, purchase_ticket};
