//! # Error Types
//!
//! Domain-specific error types for medipos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  medipos-core errors (this file)                                       │
//! │  ├── CoreError        - Cart / checkout rule violations                │
//! │  ├── ValidationError  - Operator input failures                        │
//! │  └── TemplateError    - Unknown or malformed template tokens           │
//! │                                                                         │
//! │  medipos-client errors (separate crate)                                │
//! │  └── ClientError      - Network, server and receipt output failures    │
//! │                                                                         │
//! │  Terminal errors (in app)                                              │
//! │  └── AppError         - What the operator sees                         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ClientError → AppError → Operator │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant's message is written to be shown to the operator as-is.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Cart and checkout rule violations.
///
/// All of these are raised locally, before any network call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// Selling more than the catalog has in stock.
    ///
    /// ## User Workflow
    /// ```text
    /// Add to Cart (qty: 3, already 3 in cart)
    ///      │
    ///      ▼
    /// Check stock: available=5
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Amoxicillin", available: 5, requested: 6 }
    ///      │
    ///      ▼
    /// Operator sees: "Only 5 Amoxicillin in stock (requested 6)"
    /// ```
    #[error("Only {available} {name} in stock (requested {requested})")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// The item id is not a line in the cart.
    #[error("Item {0} is not in the cart")]
    LineNotFound(String),

    /// The item id is not in the current catalog.
    #[error("Item {0} is not in the catalog")]
    ItemNotFound(String),

    /// Checkout or review attempted with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cash sale where the received amount does not cover the total.
    #[error("Insufficient payment: received {received}, total {total}")]
    InsufficientPayment { received: Money, total: Money },

    /// A submission is already in flight.
    #[error("A transaction is already being submitted")]
    SubmissionInProgress,

    /// The operation is not valid in the current UI state.
    #[error("Cannot {action} right now")]
    InvalidState { action: &'static str },

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Operator input validation errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be greater than zero.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value is too large to represent.
    #[error("{field} is too large")]
    TooLarge { field: String },

    /// Value is not in the allowed set.
    #[error("{field} must be one of: {}", allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Template Error
// =============================================================================

/// Failures of the closed placeholder resolver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// `{{name}}` where `name` is not a known token.
    #[error("Unknown template token '{token}' at byte {offset}")]
    UnknownToken { token: String, offset: usize },

    /// `{{` with no matching `}}`.
    #[error("Unterminated template token at byte {offset}")]
    Unterminated { offset: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            name: "Amoxicillin".to_string(),
            available: 5,
            requested: 6,
        };
        assert_eq!(err.to_string(), "Only 5 Amoxicillin in stock (requested 6)");

        let err = CoreError::InsufficientPayment {
            received: Money::new(20, 0),
            total: Money::new(2835, 2),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient payment: received 20.00, total 28.35"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "Return reason".to_string(),
        };
        assert_eq!(err.to_string(), "Return reason is required");

        let err = ValidationError::NotAllowed {
            field: "payment_method".to_string(),
            allowed: vec!["cash".to_string(), "card".to_string()],
        };
        assert_eq!(err.to_string(), "payment_method must be one of: cash, card");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "Quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "Quantity must be positive");
    }

    #[test]
    fn test_template_error_message() {
        let err = TemplateError::UnknownToken {
            token: "shop_owner".to_string(),
            offset: 4,
        };
        assert_eq!(
            err.to_string(),
            "Unknown template token 'shop_owner' at byte 4"
        );
    }
}
