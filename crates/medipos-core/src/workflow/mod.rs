//! # POS Workflow
//!
//! The keyboard-driven checkout workflow as an explicit state machine.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │            F2                 Enter / click            Enter            │
//! │   Idle ──────────► Searching ──────────────► EnteringQuantity ───┐      │
//! │    ▲ ▲               │  Esc                        │  Esc        │      │
//! │    │ └───────────────┘                             ▼             │      │
//! │    │ ◄──────────────────────────────────────────── Idle ◄────────┘      │
//! │    │                                                                    │
//! │    │   F8 (cart not empty)        Ctrl+Enter / submit                   │
//! │    ├──────────────────► Reviewing ─────────────────► Submitting         │
//! │    │        Esc            ▲                            │    │          │
//! │    │ ◄─────────────────────┤ failure (message kept)     │    │          │
//! │    │                       └────────────────────────────┘    │          │
//! │    │ ◄───────────────────────────────────────────────────────┘          │
//! │         success: receipt, catalog refresh, cart reset                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Side panels (help, customer search, history) and the inline quantity
//! editor are layered on top of the main state and closed innermost first.
//!
//! Every transition is synchronous. Anything that needs I/O is returned as
//! an [`Effect`] for the caller to run.

pub mod checkout;
pub mod editor;
pub mod keyboard;
pub mod quantity;
pub mod search;
pub mod session;

use serde::{Deserialize, Serialize};

pub use checkout::{CheckoutReview, ReturnForm, Submission};
pub use editor::InlineEditor;
pub use keyboard::{dispatch, Key, KeyInput, Modifiers};
pub use quantity::QuantityEntry;
pub use search::SearchOverlay;
pub use session::PosSession;

// =============================================================================
// UI State
// =============================================================================

/// The main workflow state. Exactly one is active at a time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UiState {
    #[default]
    Idle,
    Searching(SearchOverlay),
    EnteringQuantity(QuantityEntry),
    Reviewing(CheckoutReview),
    Submitting,
}

impl UiState {
    pub fn name(&self) -> &'static str {
        match self {
            UiState::Idle => "idle",
            UiState::Searching(_) => "searching",
            UiState::EnteringQuantity(_) => "entering_quantity",
            UiState::Reviewing(_) => "reviewing",
            UiState::Submitting => "submitting",
        }
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, UiState::Submitting)
    }
}

/// Panels that can be open next to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SidePanel {
    Help,
    CustomerSearch,
    History,
}

/// Which text input has keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Focus {
    #[default]
    None,
    Search,
    Discount,
    Received,
    Quantity,
    InlineEditor,
    CustomerSearch,
    ReturnReason,
    OriginalReference,
}

impl Focus {
    pub fn is_text_input(&self) -> bool {
        !matches!(self, Focus::None)
    }
}

// =============================================================================
// Effects
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A message for the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Work the reducer asks the I/O layer to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Notice(Notice),
    /// Fetch the previous sales of a customer.
    LoadHistory { customer_id: String },
    /// Send a validated transaction to the backend.
    Submit(Submission),
    /// Re-fetch the catalog.
    RefreshCatalog,
}

impl Effect {
    pub fn info(message: impl Into<String>) -> Self {
        Effect::Notice(Notice::info(message))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Effect::Notice(Notice::error(message))
    }
}
