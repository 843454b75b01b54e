//! # medipos-core: Pure Business Logic for the MediPOS Workstation
//!
//! The cart, totals, checkout workflow and document rendering of the
//! pharmacy point-of-sale screen, with no I/O of any kind.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      MediPOS Workstation                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 pos-terminal (apps/pos-terminal)                │   │
//! │  │       key presses ──► dispatch ──► effects ──► screen           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 medipos-client (REST + receipts)                │   │
//! │  │       runs Effect::Submit / LoadHistory / RefreshCatalog        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ medipos-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │  money   │ │   cart   │ │  totals  │ │     workflow     │  │   │
//! │  │   │  Money   │ │   Cart   │ │  Totals  │ │ PosSession, keys │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────────┐ ┌────────────┐    │   │
//! │  │   │ receipt  │ │ template │ │ prescription │ │  settings  │    │   │
//! │  │   └──────────┘ └──────────┘ └──────────────┘ └────────────┘    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO CLOCK READS • PURE FUNCTIONS        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Catalog items, customers, transactions
//! - [`money`] - Exact decimal money with configurable rounding precision
//! - [`cart`] - Cart lines, merge and stock rules
//! - [`totals`] - Subtotal / discount / tax / change calculation
//! - [`workflow`] - Overlays, checkout state machine, keyboard dispatch
//! - [`receipt`] - Receipt documents (HTML and plain text)
//! - [`template`] - Closed `{{token}}` resolver
//! - [`prescription`] - OPD prescription pages
//! - [`settings`] - Shop settings and display formatting
//! - [`error`] - Domain error types
//! - [`validation`] - Operator input parsing
//!
//! ## Example Usage
//!
//! ```rust
//! use medipos_core::money::{Money, Precision};
//! use medipos_core::totals;
//! use medipos_core::cart::CartLine;
//! use medipos_core::types::{Discount, TaxRate};
//! use rust_decimal::Decimal;
//!
//! let lines = [CartLine::new("m1", "Amoxicillin", Money::new(1000, 2), 3, 10)];
//! let totals = totals::calculate(
//!     &lines,
//!     Discount::percentage(Decimal::new(10, 0)),
//!     TaxRate::from_percent(Decimal::new(5, 0)),
//!     Money::new(50, 0),
//!     Precision::default(),
//! );
//!
//! assert_eq!(totals.total, Money::new(2835, 2));
//! assert_eq!(totals.change, Money::new(2165, 2));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod prescription;
pub mod receipt;
pub mod settings;
pub mod template;
pub mod totals;
pub mod types;
pub mod validation;
pub mod workflow;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine};
pub use error::{CoreError, CoreResult, TemplateError, ValidationError};
pub use money::{Money, Precision};
pub use settings::ShopSettings;
pub use totals::Totals;
pub use types::*;
pub use workflow::{dispatch, Effect, KeyInput, PosSession};
