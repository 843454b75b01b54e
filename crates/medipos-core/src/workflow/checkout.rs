//! # Checkout
//!
//! Local gates a transaction must pass before it is sent, and the payload
//! built from the cart once it does.
//!
//! ## Submission Gates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  prepare(cart, return form)                                             │
//! │      │                                                                  │
//! │      ├── cart empty ─────────────────────────────► EmptyCart           │
//! │      │                                                                  │
//! │      ├── sale + cash, received < total ──────────► InsufficientPayment │
//! │      │   (blank received counts as 0)                                   │
//! │      │                                                                  │
//! │      ├── return, blank reason ───────────────────► Required            │
//! │      ├── return, blank original sale id ─────────► Required            │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  Submission { request, totals, customer }                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No gate touches the network; a refused checkout never reaches the API.

use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult};
use crate::money::Precision;
use crate::totals::Totals;
use crate::types::{
    PaymentMethod, ReturnSubmission, SaleSubmission, TransactionMode, TransactionRequest,
    WALK_IN_CUSTOMER,
};
use crate::validation::validate_required;

/// State of the open checkout review.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckoutReview {
    /// Last refusal or server failure, shown in the review.
    pub error: Option<String>,
}

impl CheckoutReview {
    pub fn with_error(message: impl Into<String>) -> Self {
        CheckoutReview {
            error: Some(message.into()),
        }
    }
}

/// Extra fields a return needs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReturnForm {
    pub reason: String,
    pub original_reference: String,
}

impl ReturnForm {
    pub fn clear(&mut self) {
        self.reason.clear();
        self.original_reference.clear();
    }
}

/// A transaction that passed every local gate.
///
/// Carries the totals it was priced with so the receipt shows exactly what
/// was submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub request: TransactionRequest,
    pub totals: Totals,
    pub customer_name: String,
}

impl Submission {
    pub fn mode(&self) -> TransactionMode {
        self.request.mode()
    }

    pub fn payment_method(&self) -> PaymentMethod {
        match &self.request {
            TransactionRequest::Sale(sale) => sale.payment_method,
            TransactionRequest::Return(ret) => ret.refund_method,
        }
    }
}

/// Validates the cart for submission and builds the backend payload.
pub fn prepare(cart: &Cart, form: &ReturnForm, precision: Precision) -> CoreResult<Submission> {
    if cart.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let totals = cart.totals(precision);
    let (patient_id, customer_name) = match &cart.customer {
        Some(customer) => (Some(customer.id.clone()), customer.name.clone()),
        None => (None, WALK_IN_CUSTOMER.to_string()),
    };
    let items = cart.transaction_lines(precision);

    let request = match cart.mode {
        TransactionMode::Sale => {
            if cart.payment_method == PaymentMethod::Cash && totals.received < totals.total {
                return Err(CoreError::InsufficientPayment {
                    received: totals.received,
                    total: totals.total,
                });
            }
            TransactionRequest::Sale(SaleSubmission {
                patient_id,
                patient_name: customer_name.clone(),
                items,
                subtotal: totals.subtotal,
                tax_amount: totals.tax_amount,
                discount_amount: totals.discount_amount,
                total_amount: totals.total,
                payment_method: cart.payment_method,
            })
        }
        TransactionMode::Return => {
            let reason = validate_required("Return reason", &form.reason)?;
            let original = validate_required("Original sale ID", &form.original_reference)?;
            TransactionRequest::Return(ReturnSubmission {
                original_sale_id: original.to_string(),
                patient_id,
                patient_name: customer_name.clone(),
                items,
                subtotal: totals.subtotal,
                tax_amount: totals.tax_amount,
                discount_amount: totals.discount_amount,
                total_amount: totals.total,
                reason: reason.to_string(),
                refund_method: cart.payment_method,
            })
        }
    };

    Ok(Submission {
        request,
        totals,
        customer_name,
    })
}
