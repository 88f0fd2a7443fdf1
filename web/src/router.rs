//! Router configuration.

use crate::handlers::{create_ticket, get_ticket, health_check, purchase_ticket};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use ticketbox_core::{TicketCache, TicketStore};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// # Routes
///
/// - `GET /health`
/// - `POST /api/v1/tickets`
/// - `GET /api/v1/tickets/:id`
/// - `POST /api/v1/tickets/:id/purchases`
pub fn build_router<S, C>(state: AppState<S, C>) -> Router
where
    S: TicketStore + 'static,
    C: TicketCache + 'static,
{
    let api_routes = Router::new()
        .route("/tickets", post(create_ticket::<S, C>))
        .route("/tickets/:id", get(get_ticket::<S, C>))
        .route("/tickets/:id/purchases", post(purchase_ticket::<S, C>));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
