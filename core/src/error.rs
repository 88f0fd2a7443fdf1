//! Error types for ticket operations.
//!
//! Every failure the service can report is a [`TicketError`]. Each variant
//! carries an [`ErrorKind`] classification that the request layer maps onto a
//! transport status. Cache failures are a separate [`CacheError`] type that the
//! service never returns to callers.

use crate::ticket::TicketId;
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for ticket operations.
pub type Result<T> = std::result::Result<T, TicketError>;

/// Status classification of a [`TicketError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Client supplied invalid input or violated a business rule
    BadRequest,
    /// Referenced ticket does not exist
    NotFound,
    /// Row lock or transaction could not be obtained before the deadline
    Timeout,
    /// Infrastructure failure on the server side
    Internal,
}

impl ErrorKind {
    /// HTTP status code equivalent of this classification.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Timeout => 503,
            Self::Internal => 500,
        }
    }
}

/// Input rejected by ticket or quantity validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Ticket name is empty.
    #[error("Field 'name' is required")]
    NameRequired,

    /// Ticket name exceeds the maximum length.
    #[error("Field 'name' must be at most 255 characters")]
    NameTooLong {
        /// Length of the rejected name in characters
        length: usize,
    },

    /// Allocation is zero or negative.
    #[error("Field 'allocation' must be greater than 0")]
    AllocationNotPositive,

    /// Allocation exceeds the signed 32-bit maximum.
    #[error("Allocation is too large")]
    AllocationTooLarge,

    /// Purchase quantity outside `1..=MAX_ALLOCATION`.
    #[error("Quantity must be a positive number within the valid range")]
    QuantityOutOfRange {
        /// Rejected quantity
        quantity: i64,
    },
}

/// Failure reported by a [`TicketStore`](crate::providers::TicketStore).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Could not open a transaction.
    #[error("Failed to start transaction: {0}")]
    Begin(String),

    /// Commit was rejected; the store has rolled the transaction back.
    #[error("Failed to commit transaction: {0}")]
    Commit(String),

    /// The store gave up waiting for a row lock.
    #[error("Lock not available: {0}")]
    LockTimeout(String),

    /// Any other query or connectivity failure.
    #[error("Database error: {0}")]
    Database(String),
}

/// Failure reported by a [`TicketCache`](crate::providers::TicketCache).
///
/// Never surfaced by [`TicketService`](crate::TicketService); logged and
/// treated as a miss or a no-op.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Cache backend unreachable or command failed.
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// Cached payload could not be encoded or decoded.
    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

/// Error taxonomy for ticket operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TicketError {
    // ═══════════════════════════════════════════════════════════
    // Client Errors
    // ═══════════════════════════════════════════════════════════

    /// Ticket or quantity failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No ticket payload was supplied to create.
    #[error("ticket is missing")]
    MissingTicket,

    /// Referenced ticket does not exist.
    #[error("Ticket {id} not found")]
    NotFound {
        /// Requested ticket
        id: TicketId,
    },

    /// Allocation is exhausted.
    #[error("Ticket is sold out")]
    SoldOut {
        /// Requested ticket
        id: TicketId,
    },

    /// Allocation is positive but smaller than the requested quantity.
    #[error("Not enough tickets available")]
    InsufficientAllocation {
        /// Requested ticket
        id: TicketId,
        /// Quantity the caller asked for
        requested: i64,
        /// Allocation observed under the row lock
        available: i64,
    },

    // ═══════════════════════════════════════════════════════════
    // Server Errors
    // ═══════════════════════════════════════════════════════════

    /// Row lock could not be acquired before the deadline.
    #[error("Timed out after {waited:?} waiting for ticket {id}")]
    Timeout {
        /// Requested ticket
        id: TicketId,
        /// Time spent before giving up
        waited: Duration,
    },

    /// Store connectivity, transaction start or commit failure.
    #[error("Store failure: {0}")]
    Store(#[from] StoreError),
}

impl TicketError {
    /// Status classification for the request layer.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ticketbox_core::{ErrorKind, TicketError, TicketId};
    /// let err = TicketError::SoldOut { id: TicketId::new(1) };
    /// assert_eq!(err.kind(), ErrorKind::BadRequest);
    /// ```
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_)
            | Self::MissingTicket
            | Self::SoldOut { .. }
            | Self::InsufficientAllocation { .. } => ErrorKind::BadRequest,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Timeout { .. } | Self::Store(StoreError::LockTimeout(_)) => ErrorKind::Timeout,
            Self::Store(_) => ErrorKind::Internal,
        }
    }

    /// Returns `true` if the caller may retry the same request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Timeout | ErrorKind::Internal)
    }

    /// Message safe to show to the caller.
    ///
    /// Internal failures are reported opaquely; their detail belongs in
    /// server-side logs only.
    #[must_use]
    pub fn public_message(&self) -> Cow<'static, str> {
        match self.kind() {
            ErrorKind::Internal => Cow::Borrowed("Something went wrong, please try again."),
            ErrorKind::Timeout => Cow::Borrowed("Ticket is busy, please try again."),
            ErrorKind::BadRequest | ErrorKind::NotFound => Cow::Owned(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_carries_id() {
        let err = TicketError::NotFound { id: TicketId::new(999) };
        assert_eq!(err.to_string(), "Ticket 999 not found");
        assert_eq!(err.kind().http_status(), 404);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_sold_out_and_insufficient_are_distinct() {
        let sold_out = TicketError::SoldOut { id: TicketId::new(1) };
        let insufficient = TicketError::InsufficientAllocation {
            id: TicketId::new(1),
            requested: 80,
            available: 70,
        };
        assert_eq!(sold_out.kind(), ErrorKind::BadRequest);
        assert_eq!(insufficient.kind(), ErrorKind::BadRequest);
        assert_ne!(sold_out.public_message(), insufficient.public_message());
    }

    #[test]
    fn test_validation_message_passes_through() {
        let err = TicketError::from(ValidationError::NameRequired);
        assert_eq!(err.public_message(), "Field 'name' is required");
        assert_eq!(err.kind().http_status(), 400);
    }

    #[test]
    fn test_store_errors_are_opaque_and_retryable() {
        let err = TicketError::from(StoreError::Commit("connection reset by peer".into()));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.is_retryable());
        assert!(!err.public_message().contains("connection reset"));
    }

    #[test]
    fn test_store_lock_timeout_classified_as_timeout() {
        let err = TicketError::from(StoreError::LockTimeout("55P03".into()));
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.kind().http_status(), 503);
        assert!(err.is_retryable());
    }
}
