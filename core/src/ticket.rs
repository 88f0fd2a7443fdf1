//! Ticket domain types and validation rules.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound for allocations and purchase quantities (the signed 32-bit maximum).
pub const MAX_ALLOCATION: i64 = 2_147_483_647;

/// Maximum number of characters in a ticket name.
pub const MAX_NAME_LENGTH: usize = 255;

/// Prefix for ticket entries in the cache.
pub const TICKET_CACHE_PREFIX: &str = "ticket:";

// ============================================================================
// Identifiers
// ============================================================================

/// Store-assigned identifier of a ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub i64);

impl TicketId {
    /// Create a `TicketId` from its raw value.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Cache key under which this ticket is stored: `ticket:{id}`.
    #[must_use]
    pub fn cache_key(self) -> String {
        format!("{TICKET_CACHE_PREFIX}{}", self.0)
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TicketId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ============================================================================
// Tickets
// ============================================================================

/// A ticket type that has not been persisted yet.
///
/// Allocation is 64-bit so that out-of-range requests reach validation
/// instead of failing to decode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTicket {
    /// Display name (1..=255 characters)
    #[serde(default)]
    pub name: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Number of purchasable units
    #[serde(default)]
    pub allocation: i64,
}

impl NewTicket {
    /// Create a new, unvalidated ticket.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, allocation: i64) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            allocation,
        }
    }

    /// Check the ticket against the creation rules.
    ///
    /// Rules are applied in order and the first violation wins:
    /// name present, name length, allocation positive, allocation bounded.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::NameRequired);
        }

        let length = self.name.chars().count();
        if length > MAX_NAME_LENGTH {
            return Err(ValidationError::NameTooLong { length });
        }

        if self.allocation <= 0 {
            return Err(ValidationError::AllocationNotPositive);
        }

        if self.allocation > MAX_ALLOCATION {
            return Err(ValidationError::AllocationTooLarge);
        }

        Ok(())
    }

    /// Attach the store-assigned identifier.
    #[must_use]
    pub fn into_ticket(self, id: TicketId) -> Ticket {
        Ticket {
            id,
            name: self.name,
            description: self.description,
            allocation: self.allocation,
        }
    }
}

/// A persisted ticket type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Store-assigned identifier
    pub id: TicketId,
    /// Display name
    pub name: String,
    /// Free-text description
    pub description: String,
    /// Remaining purchasable units
    pub allocation: i64,
}

impl Ticket {
    /// Whether every unit has been purchased.
    #[must_use]
    pub const fn is_sold_out(&self) -> bool {
        self.allocation == 0
    }
}

/// Check a purchase quantity: `0 < quantity <= MAX_ALLOCATION`.
///
/// # Errors
///
/// Returns [`ValidationError::QuantityOutOfRange`] otherwise.
pub const fn validate_quantity(quantity: i64) -> Result<(), ValidationError> {
    if quantity <= 0 || quantity > MAX_ALLOCATION {
        return Err(ValidationError::QuantityOutOfRange { quantity });
    }
    Ok(())
}

/// Receipt for a committed purchase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    /// Purchased ticket
    pub ticket_id: TicketId,
    /// Units bought
    pub quantity: i64,
    /// Allocation left after this purchase was committed
    pub remaining: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(name: &str, allocation: i64) -> NewTicket {
        NewTicket::new(name, "Live at the arena", allocation)
    }

    #[test]
    fn test_max_allocation_matches_i32() {
        assert_eq!(MAX_ALLOCATION, i64::from(i32::MAX));
    }

    #[test]
    fn test_valid_ticket() {
        assert_eq!(ticket("Concert", 100).validate(), Ok(()));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert_eq!(ticket("", 100).validate(), Err(ValidationError::NameRequired));
    }

    #[test]
    fn test_name_length_boundary() {
        let exact = "a".repeat(MAX_NAME_LENGTH);
        assert_eq!(ticket(&exact, 1).validate(), Ok(()));

        let long = "a".repeat(MAX_NAME_LENGTH + 1);
        assert_eq!(
            ticket(&long, 1).validate(),
            Err(ValidationError::NameTooLong { length: 256 })
        );
    }

    #[test]
    fn test_name_length_counts_characters() {
        // 255 two-byte characters are 510 bytes but still a valid name
        let name = "é".repeat(MAX_NAME_LENGTH);
        assert_eq!(ticket(&name, 1).validate(), Ok(()));
    }

    #[test]
    fn test_allocation_boundaries() {
        assert_eq!(
            ticket("Concert", 0).validate(),
            Err(ValidationError::AllocationNotPositive)
        );
        assert_eq!(
            ticket("Concert", -5).validate(),
            Err(ValidationError::AllocationNotPositive)
        );
        assert_eq!(ticket("Concert", MAX_ALLOCATION).validate(), Ok(()));
        assert_eq!(
            ticket("Concert", MAX_ALLOCATION + 1).validate(),
            Err(ValidationError::AllocationTooLarge)
        );
    }

    #[test]
    fn test_first_violation_wins() {
        // Empty name and a zero allocation: the name rule is reported
        assert_eq!(ticket("", 0).validate(), Err(ValidationError::NameRequired));
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ALLOCATION + 1).is_err());
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ALLOCATION).is_ok());
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(TicketId::new(42).cache_key(), "ticket:42");
    }
}
