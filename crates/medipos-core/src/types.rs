//! # Domain Types
//!
//! Core domain types used throughout MediPOS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CatalogItem    │   │   Customer      │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  Cash           │       │
//! │  │  name           │   │  name           │   │  Card           │       │
//! │  │  generic_name   │   │  phone          │   │  Upi            │       │
//! │  │  selling_price  │   │  date_of_birth  │   │  Credit         │       │
//! │  │  stock_quantity │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │  TransactionMode│   │   Discount      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  percent        │   │  Sale           │   │  value          │       │
//! │  │  5 = 5%         │   │  Return         │   │  Percentage|Flat│       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Wire payloads: TransactionRequest (Sale | Return), TransactionOutcome, │
//! │                 PastTransaction                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Compatibility
//! Field names follow the pharmacy backend's JSON documents (`selling_price`,
//! `patient_id`, `refund_method`, ...). Timestamps from the backend are
//! naive UTC ISO strings; [`utc_timestamp`] accepts both that form and RFC 3339.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate expressed as a percentage (`5` means 5 %).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(Decimal);

impl TaxRate {
    #[inline]
    pub const fn from_percent(percent: Decimal) -> Self {
        TaxRate(percent)
    }

    #[inline]
    pub const fn percent(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(Decimal::ZERO)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Catalog Item
// =============================================================================

/// A medicine available for sale, as listed by `GET /medicines`.
///
/// The catalog is replaced wholesale on every refresh and never mutated
/// locally. Unknown backend fields (batch, expiry, purchase price) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,

    /// Display name shown to the operator and on the receipt.
    pub name: String,

    #[serde(default)]
    pub generic_name: Option<String>,

    #[serde(rename = "selling_price")]
    pub unit_price: Money,

    #[serde(default)]
    pub stock_quantity: i64,

    #[serde(default = "default_minimum_stock_level")]
    pub minimum_stock_level: i64,
}

fn default_minimum_stock_level() -> i64 {
    10
}

impl CatalogItem {
    #[inline]
    pub fn is_in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    /// Case-insensitive substring match on name or generic name.
    ///
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self
                .generic_name
                .as_deref()
                .is_some_and(|generic| generic.to_lowercase().contains(needle))
    }

    pub fn stock_status(&self) -> StockStatus {
        StockStatus::classify(self.stock_quantity, self.minimum_stock_level)
    }
}

// =============================================================================
// Stock Status
// =============================================================================

/// Stock level bucket shown next to each search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    /// Out of stock at zero or below, low at or below the minimum level.
    pub fn classify(quantity: i64, minimum_level: i64) -> Self {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= minimum_level {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StockStatus::InStock => "In Stock",
            StockStatus::LowStock => "Low Stock",
            StockStatus::OutOfStock => "Out of Stock",
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer record (the backend calls them patients).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, with = "opt_utc_timestamp")]
    pub date_of_birth: Option<DateTime<Utc>>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub medical_history: Option<String>,
}

impl Customer {
    /// Name contains the query (case-insensitive) or phone contains it.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle)
            || self
                .phone
                .as_deref()
                .is_some_and(|phone| phone.contains(needle.as_str()))
    }
}

/// Patient name sent with transactions that have no selected customer.
pub const WALK_IN_CUSTOMER: &str = "Walk-in Customer";

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment; the only method that needs a received amount.
    #[default]
    Cash,
    Card,
    Upi,
    /// Store credit, settled later.
    Credit,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Upi,
        PaymentMethod::Credit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Credit => "credit",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        PaymentMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: PaymentMethod::ALL.iter().map(|m| m.to_string()).collect(),
            })
    }
}

// =============================================================================
// Transaction Mode
// =============================================================================

/// Whether the cart is being rung up as a sale or a return.
///
/// Switching modes keeps the cart contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionMode {
    #[default]
    Sale,
    Return,
}

impl TransactionMode {
    pub fn toggled(self) -> Self {
        match self {
            TransactionMode::Sale => TransactionMode::Return,
            TransactionMode::Return => TransactionMode::Sale,
        }
    }

    pub fn is_return(&self) -> bool {
        matches!(self, TransactionMode::Return)
    }
}

// =============================================================================
// Discount
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` is a percentage of the subtotal.
    #[default]
    Percentage,
    /// `value` is an absolute amount.
    Flat,
}

impl FromStr for DiscountKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "percentage" | "percent" | "%" => Ok(DiscountKind::Percentage),
            "flat" | "amount" => Ok(DiscountKind::Flat),
            _ => Err(ValidationError::NotAllowed {
                field: "discount_type".to_string(),
                allowed: vec!["percentage".to_string(), "flat".to_string()],
            }),
        }
    }
}

/// Cart-level discount. Defaults to 0 %.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Discount {
    pub value: Decimal,
    pub kind: DiscountKind,
}

impl Discount {
    pub fn percentage(value: Decimal) -> Self {
        Discount {
            value,
            kind: DiscountKind::Percentage,
        }
    }

    pub fn flat(value: Decimal) -> Self {
        Discount {
            value,
            kind: DiscountKind::Flat,
        }
    }
}

// =============================================================================
// Transaction Payloads
// =============================================================================

/// One line of a submitted or past transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLine {
    pub medicine_id: String,
    pub medicine_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
}

/// Body of `POST /sales`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleSubmission {
    pub patient_id: Option<String>,
    pub patient_name: String,
    pub items: Vec<TransactionLine>,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
    pub payment_method: PaymentMethod,
}

/// Body of `POST /returns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSubmission {
    pub original_sale_id: String,
    pub patient_id: Option<String>,
    pub patient_name: String,
    pub items: Vec<TransactionLine>,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
    pub reason: String,
    pub refund_method: PaymentMethod,
}

/// A validated transaction ready to be sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransactionRequest {
    Return(ReturnSubmission),
    Sale(SaleSubmission),
}

impl TransactionRequest {
    pub fn mode(&self) -> TransactionMode {
        match self {
            TransactionRequest::Sale(_) => TransactionMode::Sale,
            TransactionRequest::Return(_) => TransactionMode::Return,
        }
    }

    pub fn items(&self) -> &[TransactionLine] {
        match self {
            TransactionRequest::Sale(sale) => &sale.items,
            TransactionRequest::Return(ret) => &ret.items,
        }
    }

    pub fn total_amount(&self) -> Money {
        match self {
            TransactionRequest::Sale(sale) => sale.total_amount,
            TransactionRequest::Return(ret) => ret.total_amount,
        }
    }
}

/// What the backend echoes back for a created sale or return.
///
/// Only the fields the receipt needs are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionOutcome {
    pub id: String,
    #[serde(default, with = "opt_utc_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A prior sale of the selected customer (`GET /sales/patient/{id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PastTransaction {
    pub id: String,
    pub items: Vec<TransactionLine>,
    pub subtotal: Money,
    #[serde(default)]
    pub discount_amount: Money,
    #[serde(default)]
    pub tax_amount: Money,
    pub total_amount: Money,
    pub payment_method: PaymentMethod,
    #[serde(default, with = "opt_utc_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Timestamps
// =============================================================================

/// Parses an RFC 3339 timestamp, or a naive ISO timestamp taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Serde adapter for optional backend timestamps.
///
/// Unparseable strings deserialize as `None` instead of failing the
/// whole document.
pub mod opt_utc_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_some(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(super::parse_timestamp))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
