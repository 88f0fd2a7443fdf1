//! Ticket API endpoints.
//!
//! - POST /api/v1/tickets - Create a ticket type
//! - GET /api/v1/tickets/:id - Get a ticket type
//! - POST /api/v1/tickets/:id/purchases - Purchase units of a ticket type

use crate::WebResult;
use crate::state::AppState;
use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use ticketbox_core::{
    NewTicket, Purchase, Ticket, TicketCache, TicketError, TicketId, TicketStore,
};

// ============================================================================
// Request Types
// ============================================================================

/// Request to purchase units of a ticket.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    /// Number of units to buy
    pub quantity: i64,
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a ticket type.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/v1/tickets \
///   -H "Content-Type: application/json" \
///   -d '{"name": "Concert", "description": "Main stage", "allocation": 100}'
/// # 201 {"id":1,"name":"Concert","description":"Main stage","allocation":100}
/// ```
///
/// # Errors
///
/// - 400 for malformed JSON, a `null` body or a validation failure
/// - 500 if the store rejects the insert
pub async fn create_ticket<S, C>(
    State(state): State<AppState<S, C>>,
    payload: Result<Json<Option<NewTicket>>, JsonRejection>,
) -> WebResult<(StatusCode, Json<Ticket>)>
where
    S: TicketStore + 'static,
    C: TicketCache + 'static,
{
    let Json(ticket) = payload?;
    let ticket = ticket.ok_or(TicketError::MissingTicket)?;

    let created = state.service.create(&ticket).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a ticket type by id.
///
/// # Errors
///
/// - 400 if the id is not an integer
/// - 404 if no ticket has this id
pub async fn get_ticket<S, C>(
    State(state): State<AppState<S, C>>,
    id: Result<Path<i64>, PathRejection>,
) -> WebResult<Json<Ticket>>
where
    S: TicketStore + 'static,
    C: TicketCache + 'static,
{
    let Path(id) = id?;

    let ticket = state.service.get(TicketId::new(id)).await?;

    Ok(Json(ticket))
}

/// Purchase units of a ticket type.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/v1/tickets/1/purchases \
///   -H "Content-Type: application/json" \
///   -d '{"quantity": 2}'
/// # 200 {"ticket_id":1,"quantity":2,"remaining":98}
/// ```
///
/// # Errors
///
/// - 400 for a bad id or body, an out-of-range quantity, or too few units left
/// - 404 if no ticket has this id
/// - 503 if the ticket stayed locked past the purchase deadline
/// - 500 on store failure
pub async fn purchase_ticket<S, C>(
    State(state): State<AppState<S, C>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PurchaseRequest>, JsonRejection>,
) -> WebResult<Json<Purchase>>
where
    S: TicketStore + 'static,
    C: TicketCache + 'static,
{
    let Path(id) = id?;
    let Json(request) = payload?;

    let receipt = state
        .service
        .purchase(TicketId::new(id), request.quantity)
        .await?;

    Ok(Json(receipt))
}
