//! # Validation Module
//!
//! Operator input validation for MediPOS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Text fields (quantity, received, discount)                   │
//! │  ├── Lenient numeric parsing (empty / garbage → default)               │
//! │  └── THIS MODULE                                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Cart and checkout rules (cart.rs, workflow/checkout.rs)      │
//! │  ├── Stock limits in sale mode                                          │
//! │  └── Payment / return-field gates                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Backend                                                       │
//! │  └── Model validation, reported as {"detail": ...}                     │
//! │                                                                         │
//! │  Layers 1 and 2 never touch the network.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Text
// =============================================================================

/// Reads a leading integer (optional sign, then digits) and ignores the rest.
///
/// ```rust
/// use medipos_core::validation::parse_int_prefix;
///
/// assert_eq!(parse_int_prefix("12"), Some(12));
/// assert_eq!(parse_int_prefix(" 3 boxes"), Some(3));
/// assert_eq!(parse_int_prefix("-2"), Some(-2));
/// assert_eq!(parse_int_prefix("2.9"), Some(2));
/// assert_eq!(parse_int_prefix("x"), None);
/// ```
pub fn parse_int_prefix(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    // Saturates on overflow.
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Parses quantity text; empty or non-numeric text means 1.
///
/// ```rust
/// use medipos_core::validation::parse_quantity_text;
///
/// assert_eq!(parse_quantity_text(""), 1);
/// assert_eq!(parse_quantity_text("abc"), 1);
/// assert_eq!(parse_quantity_text("4"), 4);
/// assert_eq!(parse_quantity_text("0"), 0);
/// ```
pub fn parse_quantity_text(text: &str) -> i64 {
    parse_int_prefix(text).unwrap_or(1)
}

/// Validates a quantity for a cart operation.
///
/// ## Rules
/// - Must be greater than zero
/// - Must fit in a `u32`
pub fn validate_quantity(quantity: i64) -> ValidationResult<u32> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "Quantity".to_string(),
        });
    }
    u32::try_from(quantity).map_err(|_| ValidationError::TooLarge {
        field: "Quantity".to_string(),
    })
}

/// Reads the received-amount field. Empty or non-numeric text counts as zero.
pub fn parse_received(text: &str) -> Money {
    Money::parse_or_zero(text)
}

/// Reads the discount field. Empty or non-numeric text counts as zero.
pub fn parse_discount_value(text: &str) -> Decimal {
    Money::parse_or_zero(text).amount()
}

// =============================================================================
// String Validators
// =============================================================================

/// Requires non-blank text and returns it trimmed.
///
/// ```rust
/// use medipos_core::validation::validate_required;
///
/// assert_eq!(validate_required("Return reason", "  damaged ").unwrap(), "damaged");
/// assert!(validate_required("Return reason", "   ").is_err());
/// ```
pub fn validate_required<'a>(field: &str, value: &'a str) -> ValidationResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(trimmed)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_prefix() {
        assert_eq!(parse_int_prefix("7"), Some(7));
        assert_eq!(parse_int_prefix("+7"), Some(7));
        assert_eq!(parse_int_prefix("007"), Some(7));
        assert_eq!(parse_int_prefix("12abc"), Some(12));
        assert_eq!(parse_int_prefix(""), None);
        assert_eq!(parse_int_prefix("-"), None);
        assert_eq!(parse_int_prefix(".5"), None);
        assert_eq!(parse_int_prefix("99999999999999999999999"), Some(i64::MAX));
    }

    #[test]
    fn test_parse_quantity_text_defaults_to_one() {
        assert_eq!(parse_quantity_text(""), 1);
        assert_eq!(parse_quantity_text("   "), 1);
        assert_eq!(parse_quantity_text("many"), 1);
        assert_eq!(parse_quantity_text("-3"), -3);
    }

    #[test]
    fn test_validate_quantity() {
        assert_eq!(validate_quantity(3).unwrap(), 3);
        assert!(matches!(
            validate_quantity(0),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(matches!(
            validate_quantity(-1),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(matches!(
            validate_quantity(i64::from(u32::MAX) + 1),
            Err(ValidationError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_parse_received() {
        assert_eq!(parse_received(""), Money::zero());
        assert_eq!(parse_received("abc"), Money::zero());
        assert_eq!(parse_received("50"), Money::new(50, 0));
    }

    #[test]
    fn test_parse_discount_value() {
        assert_eq!(parse_discount_value("10"), Decimal::new(10, 0));
        assert_eq!(parse_discount_value(""), Decimal::ZERO);
    }
}
