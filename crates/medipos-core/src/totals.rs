//! # Totals Calculator
//!
//! Pure function from cart contents to the six displayed amounts.
//!
//! ## Calculation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lines ──► subtotal  = round(Σ quantity × unit_price)                   │
//! │                │                                                        │
//! │                ▼                                                        │
//! │            discount  = round(subtotal × d / 100)   (percentage)         │
//! │                      = round(d)                     (flat)              │
//! │                │                                                        │
//! │                ▼                                                        │
//! │            taxable   = round(subtotal − discount)                       │
//! │                │                                                        │
//! │                ▼                                                        │
//! │            tax       = round(taxable × rate / 100)                      │
//! │                │                                                        │
//! │                ▼                                                        │
//! │            total     = round(taxable + tax)                             │
//! │                                                                         │
//! │  received  = round(received)       change = round(received − total)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every step rounds half away from zero to the shop's precision, and later
//! steps consume the rounded values only. The discount is not clamped, so a
//! flat discount larger than the subtotal yields a negative total.

use serde::{Deserialize, Serialize};

use crate::cart::CartLine;
use crate::money::{Money, Precision};
use crate::types::{Discount, DiscountKind, TaxRate};

/// The derived amounts shown in the cart panel and on the receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub total: Money,
    pub received: Money,
    pub change: Money,
}

impl Totals {
    /// The discounted, pre-tax amount (already rounded).
    pub fn taxable(&self) -> Money {
        self.total - self.tax_amount
    }
}

/// Computes totals for the given lines.
///
/// ```rust
/// use medipos_core::cart::CartLine;
/// use medipos_core::money::{Money, Precision};
/// use medipos_core::totals::calculate;
/// use medipos_core::types::{Discount, TaxRate};
/// use rust_decimal::Decimal;
///
/// let lines = vec![CartLine::new("m1", "Amoxicillin", Money::new(10, 0), 3, 50)];
/// let totals = calculate(
///     &lines,
///     Discount::percentage(Decimal::new(10, 0)),
///     TaxRate::from_percent(Decimal::new(5, 0)),
///     Money::zero(),
///     Precision::default(),
/// );
/// assert_eq!(totals.subtotal, Money::new(3000, 2));
/// assert_eq!(totals.discount_amount, Money::new(300, 2));
/// assert_eq!(totals.tax_amount, Money::new(135, 2));
/// assert_eq!(totals.total, Money::new(2835, 2));
/// ```
pub fn calculate(
    lines: &[CartLine],
    discount: Discount,
    tax_rate: TaxRate,
    received: Money,
    precision: Precision,
) -> Totals {
    let subtotal = lines
        .iter()
        .map(CartLine::line_total)
        .sum::<Money>()
        .round(precision);

    let discount_amount = match discount.kind {
        DiscountKind::Percentage => subtotal.percent(discount.value),
        DiscountKind::Flat => Money::from_decimal(discount.value),
    }
    .round(precision);

    let taxable = (subtotal - discount_amount).round(precision);
    let tax_amount = taxable.percent(tax_rate.percent()).round(precision);
    let total = (taxable + tax_amount).round(precision);

    let received = received.round(precision);
    let change = (received - total).round(precision);

    Totals {
        subtotal,
        discount_amount,
        tax_amount,
        total,
        received,
        change,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
