//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │    1.005 rounded to 2 places = 1.00  ❌ (1.005 is really 1.00499...)    │
//! │                                                                         │
//! │  OUR SOLUTION: Base-10 Decimal                                          │
//! │    0.1 + 0.2 = 0.3 exactly                                              │
//! │    1.005 → 1.01 (half away from zero, as the shop expects)              │
//! │                                                                         │
//! │  The number of decimal places is a shop setting, so the value keeps    │
//! │  full precision and every calculation step rounds explicitly.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use medipos_core::money::{Money, Precision};
//!
//! let price = Money::new(1099, 2); // 10.99
//! let line = price * 3;            // 32.97
//! assert_eq!(line, Money::new(3297, 2));
//!
//! let tax = Money::new(27, 0).percent(rust_decimal::Decimal::new(5, 0));
//! assert_eq!(tax.round(Precision::default()), Money::new(135, 2));
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

// =============================================================================
// Precision
// =============================================================================

/// Number of decimal places amounts are rounded to.
///
/// Comes from the shop's `decimal_places` setting. Values above the
/// decimal type's maximum scale are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Precision(u32);

impl Precision {
    /// Largest scale `rust_decimal` can represent.
    pub const MAX: u32 = 28;

    pub const fn new(places: u32) -> Self {
        if places > Self::MAX {
            Precision(Self::MAX)
        } else {
            Precision(places)
        }
    }

    #[inline]
    pub const fn places(&self) -> u32 {
        self.0
    }
}

impl Default for Precision {
    fn default() -> Self {
        Precision(2)
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in the shop's currency.
///
/// ## Design Decisions
/// - **Decimal (signed)**: Allows negative values for over-discounted carts
///   and change owed back
/// - **Transparent serde**: Serialized as a plain JSON number, which is what
///   the pharmacy backend stores
/// - **No implicit rounding**: Arithmetic is exact; callers round at each
///   step with [`Money::round`]
/// - **Saturating**: Operator-typed amounts can reach `Decimal::MAX`, so
///   sums and products clamp to the representable range
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  CatalogItem.unit_price ──► CartLine.unit_price ──► CartLine.line_total │
/// │                                                                         │
/// │  Totals.subtotal ──► discount ──► taxable ──► tax ──► total ──► change │
/// │                                                                         │
/// │  Receipt rows and the transaction submitted to the backend             │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Creates money from a mantissa and scale: `Money::new(1099, 2)` is 10.99.
    #[inline]
    pub fn new(num: i64, scale: u32) -> Self {
        Money(Decimal::new(num, scale))
    }

    #[inline]
    pub const fn from_decimal(value: Decimal) -> Self {
        Money(value)
    }

    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Rounds half away from zero to the given precision.
    ///
    /// ```rust
    /// use medipos_core::money::{Money, Precision};
    ///
    /// assert_eq!(Money::new(1005, 3).round(Precision::new(2)), Money::new(101, 2));
    /// assert_eq!(Money::new(-1005, 3).round(Precision::new(2)), Money::new(-101, 2));
    /// ```
    pub fn round(&self, precision: Precision) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(precision.places(), RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Returns `self × percent / 100`, unrounded. Saturates at the
    /// representable range instead of overflowing.
    pub fn percent(&self, percent: Decimal) -> Money {
        let scaled = self.0.saturating_mul(percent);
        Money(scaled.checked_div(Decimal::ONE_HUNDRED).unwrap_or(scaled))
    }

    /// Formats the amount with exactly `precision` decimal places.
    ///
    /// No currency symbol; see `ShopSettings::format_currency` for display.
    pub fn to_fixed(&self, precision: Precision) -> String {
        let places = precision.places() as usize;
        format!("{:.*}", places, self.round(precision).0)
    }

    /// Parses operator-typed text the way a lenient numeric field does:
    /// leading whitespace, an optional sign, digits with at most one decimal
    /// point. Trailing garbage is ignored (`"12abc"` is 12).
    ///
    /// Returns `None` when no number can be read at all.
    ///
    /// ```rust
    /// use medipos_core::money::Money;
    ///
    /// assert_eq!(Money::parse_lenient("50"), Some(Money::new(50, 0)));
    /// assert_eq!(Money::parse_lenient(" 12.5kg"), Some(Money::new(125, 1)));
    /// assert_eq!(Money::parse_lenient(".5"), Some(Money::new(5, 1)));
    /// assert_eq!(Money::parse_lenient("abc"), None);
    /// assert_eq!(Money::parse_lenient(""), None);
    /// ```
    pub fn parse_lenient(text: &str) -> Option<Money> {
        let text = text.trim_start();
        let mut end = 0;
        let mut seen_digit = false;
        let mut seen_dot = false;

        for (idx, ch) in text.char_indices() {
            match ch {
                '+' | '-' if idx == 0 => {}
                '0'..='9' => seen_digit = true,
                '.' if !seen_dot => seen_dot = true,
                _ => break,
            }
            end = idx + ch.len_utf8();
        }

        if !seen_digit {
            return None;
        }

        let mut prefix = text[..end].trim_start_matches('+').to_string();
        if prefix.ends_with('.') {
            prefix.pop();
        }
        if prefix.starts_with('.') {
            prefix.insert(0, '0');
        } else if prefix.starts_with("-.") {
            prefix.insert(1, '0');
        }

        Decimal::from_str(&prefix).ok().map(Money)
    }

    /// Same as [`Money::parse_lenient`], reading unparseable text as zero.
    pub fn parse_or_zero(text: &str) -> Money {
        Money::parse_lenient(text).unwrap_or_default()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-style display with two decimals and no symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fixed(Precision::default()))
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money(value)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by a quantity.
impl Mul<u32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: u32) -> Self {
        Money(self.0.saturating_mul(Decimal::from(qty)))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
