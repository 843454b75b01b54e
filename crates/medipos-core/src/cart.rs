//! # Cart
//!
//! The working cart of a POS session.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Operator Action          Cart Method             Cart Change           │
//! │  ───────────────          ───────────             ───────────           │
//! │                                                                         │
//! │  Confirm quantity ───────► add_item() ──────────► merge or push line   │
//! │                                                                         │
//! │  Stepper / inline edit ──► set_quantity() ──────► lines[i].qty = n     │
//! │                                                  (n ≤ 0 removes)       │
//! │                                                                         │
//! │  Remove ─────────────────► remove_line() ───────► lines.remove(i)      │
//! │                                                                         │
//! │  F10 / Ctrl+N ───────────► clear() ─────────────► lines, discount and  │
//! │                                                   received cleared     │
//! │                                                                         │
//! │  Load previous sale ─────► replay_previous() ───► lines replaced       │
//! │                                                                         │
//! │  NOTE: Stock limits apply in sale mode only. A rejected operation      │
//! │        leaves the cart exactly as it was.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, Precision};
use crate::totals::{self, Totals};
use crate::types::{
    CatalogItem, Customer, Discount, DiscountKind, PastTransaction, PaymentMethod, TaxRate,
    TransactionLine, TransactionMode,
};
use crate::validation::{parse_received, validate_quantity};

// =============================================================================
// Cart Line
// =============================================================================

/// A line in the cart.
///
/// ## Design Notes
/// - `name` and `unit_price` are frozen when the line is created, so a
///   catalog refresh does not reprice an open cart.
/// - `max_stock` is the catalog stock seen when the line was last added to;
///   it is the fallback limit when the item has left the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub max_stock: i64,
}

impl CartLine {
    pub fn new(item_id: &str, name: &str, unit_price: Money, quantity: u32, max_stock: i64) -> Self {
        CartLine {
            item_id: item_id.to_string(),
            name: name.to_string(),
            unit_price,
            quantity,
            max_stock,
        }
    }

    /// Unrounded `quantity × unit_price`.
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }

    pub fn to_transaction_line(&self, precision: Precision) -> TransactionLine {
        TransactionLine {
            medicine_id: self.item_id.clone(),
            medicine_name: self.name.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price,
            total_price: self.line_total().round(precision),
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The cart and the checkout fields that travel with it.
///
/// ## Invariants
/// - No two lines share an `item_id` (adding an item again merges)
/// - Every line has `quantity > 0`
/// - In sale mode, no line exceeds the catalog stock it was checked against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    pub discount: Discount,
    pub tax_rate: TaxRate,
    /// `None` is a walk-in customer.
    pub customer: Option<Customer>,
    pub mode: TransactionMode,
    pub payment_method: PaymentMethod,
    /// Raw text of the received-amount field.
    pub received_text: String,
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new(TaxRate::zero())
    }
}

impl Cart {
    pub fn new(tax_rate: TaxRate) -> Self {
        Cart {
            lines: Vec::new(),
            discount: Discount::default(),
            tax_rate,
            customer: None,
            mode: TransactionMode::Sale,
            payment_method: PaymentMethod::Cash,
            received_text: String::new(),
        }
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, item_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.item_id == item_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Adds `quantity` of a catalog item, merging into an existing line.
    ///
    /// ## Behavior
    /// - Quantity must be positive
    /// - Sale mode: the merged quantity may not exceed `stock_quantity`
    /// - Return mode: no stock limit
    ///
    /// ## Returns
    /// The new quantity of the line.
    pub fn add_item(&mut self, item: &CatalogItem, quantity: i64) -> CoreResult<u32> {
        let quantity = validate_quantity(quantity)?;
        let mode = self.mode;

        let existing = self.lines.iter().position(|line| line.item_id == item.id);
        let current = existing.map(|idx| self.lines[idx].quantity).unwrap_or(0);
        let merged = current
            .checked_add(quantity)
            .ok_or_else(|| ValidationError::TooLarge {
                field: "Quantity".to_string(),
            })?;

        if mode == TransactionMode::Sale && i64::from(merged) > item.stock_quantity {
            return Err(CoreError::InsufficientStock {
                name: item.name.clone(),
                available: item.stock_quantity,
                requested: i64::from(merged),
            });
        }

        match existing {
            Some(idx) => {
                let line = &mut self.lines[idx];
                line.quantity = merged;
                line.max_stock = item.stock_quantity;
            }
            None => self.lines.push(CartLine::new(
                &item.id,
                &item.name,
                item.unit_price,
                merged,
                item.stock_quantity,
            )),
        }

        debug!(item_id = %item.id, quantity = merged, ?mode, "Cart line updated");
        Ok(merged)
    }

    /// Sets a line's quantity. Zero or below removes the line.
    ///
    /// In sale mode the quantity is checked against the item's current
    /// catalog stock, or the line's `max_stock` when the item is no longer
    /// in the catalog.
    pub fn set_quantity(
        &mut self,
        item_id: &str,
        quantity: i64,
        catalog: &[CatalogItem],
    ) -> CoreResult<()> {
        if quantity <= 0 {
            self.remove_line(item_id)?;
            return Ok(());
        }

        let quantity = validate_quantity(quantity)?;
        let mode = self.mode;
        let line = self
            .lines
            .iter_mut()
            .find(|line| line.item_id == item_id)
            .ok_or_else(|| CoreError::LineNotFound(item_id.to_string()))?;

        if mode == TransactionMode::Sale {
            let available = catalog
                .iter()
                .find(|item| item.id == item_id)
                .map(|item| item.stock_quantity)
                .unwrap_or(line.max_stock);
            if i64::from(quantity) > available {
                return Err(CoreError::InsufficientStock {
                    name: line.name.clone(),
                    available,
                    requested: i64::from(quantity),
                });
            }
        }

        line.quantity = quantity;
        Ok(())
    }

    /// Stepper `+`.
    pub fn increment(&mut self, item_id: &str, catalog: &[CatalogItem]) -> CoreResult<()> {
        let current = self.current_quantity(item_id)?;
        self.set_quantity(item_id, current + 1, catalog)
    }

    /// Stepper `−`; stepping below 1 removes the line.
    pub fn decrement(&mut self, item_id: &str, catalog: &[CatalogItem]) -> CoreResult<()> {
        let current = self.current_quantity(item_id)?;
        self.set_quantity(item_id, current - 1, catalog)
    }

    fn current_quantity(&self, item_id: &str) -> CoreResult<i64> {
        self.line(item_id)
            .map(|line| i64::from(line.quantity))
            .ok_or_else(|| CoreError::LineNotFound(item_id.to_string()))
    }

    pub fn remove_line(&mut self, item_id: &str) -> CoreResult<CartLine> {
        let idx = self
            .lines
            .iter()
            .position(|line| line.item_id == item_id)
            .ok_or_else(|| CoreError::LineNotFound(item_id.to_string()))?;
        Ok(self.lines.remove(idx))
    }

    /// Empties the cart, zeroes the discount value and clears the received
    /// amount. Customer, mode, payment method and discount type are kept.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.discount.value = Decimal::ZERO;
        self.received_text.clear();
    }

    /// Full reset after a completed transaction: also drops the customer
    /// and restores the default discount and payment method.
    pub fn reset_after_checkout(&mut self) {
        self.clear();
        self.customer = None;
        self.discount = Discount::default();
        self.payment_method = PaymentMethod::default();
    }

    /// Switches sale/return mode. The lines are kept.
    pub fn toggle_mode(&mut self) -> TransactionMode {
        self.mode = self.mode.toggled();
        self.mode
    }

    pub fn set_discount_value(&mut self, value: Decimal) {
        self.discount.value = value;
    }

    pub fn set_discount_kind(&mut self, kind: DiscountKind) {
        self.discount.kind = kind;
    }

    /// Replaces the cart with the lines of a previous sale.
    ///
    /// Lines with the same item merge. Each line's stock limit is taken from
    /// the current catalog (0 when the item is gone). The past discount
    /// amount becomes a flat discount and the payment method is restored;
    /// the tax rate is left alone.
    pub fn replay_previous(&mut self, past: &PastTransaction, catalog: &[CatalogItem]) {
        self.lines.clear();

        for item in past.items.iter().filter(|item| item.quantity > 0) {
            if let Some(line) = self
                .lines
                .iter_mut()
                .find(|line| line.item_id == item.medicine_id)
            {
                line.quantity = line.quantity.saturating_add(item.quantity);
                continue;
            }

            let max_stock = catalog
                .iter()
                .find(|entry| entry.id == item.medicine_id)
                .map(|entry| entry.stock_quantity)
                .unwrap_or(0);
            self.lines.push(CartLine::new(
                &item.medicine_id,
                &item.medicine_name,
                item.unit_price,
                item.quantity,
                max_stock,
            ));
        }

        self.discount = Discount::flat(past.discount_amount.amount());
        self.payment_method = past.payment_method;
        debug!(sale_id = %past.id, lines = self.lines.len(), "Previous sale loaded into cart");
    }

    pub fn received(&self) -> Money {
        parse_received(&self.received_text)
    }

    pub fn totals(&self, precision: Precision) -> Totals {
        totals::calculate(
            &self.lines,
            self.discount,
            self.tax_rate,
            self.received(),
            precision,
        )
    }

    pub fn transaction_lines(&self, precision: Precision) -> Vec<TransactionLine> {
        self.lines
            .iter()
            .map(|line| line.to_transaction_line(precision))
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn catalog_item(id: &str, price_cents: i64, stock: i64) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            name: format!("Medicine {id}"),
            generic_name: None,
            unit_price: Money::new(price_cents, 2),
            stock_quantity: stock,
            minimum_stock_level: 2,
        }
    }

    #[test]
    fn test_add_new_item() {
        let mut cart = Cart::default();
        let item = catalog_item("m1", 1000, 5);

        assert_eq!(cart.add_item(&item, 2).unwrap(), 2);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].name, "Medicine m1");
        assert_eq!(cart.lines()[0].max_stock, 5);
    }

    #[test]
    fn test_add_same_item_merges() {
        let mut cart = Cart::default();
        let item = catalog_item("m1", 1000, 10);

        cart.add_item(&item, 2).unwrap();
        cart.add_item(&item, 3).unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 5);
    }

    #[test]
    fn test_second_add_over_stock_is_rejected() {
        let mut cart = Cart::default();
        let item = catalog_item("m1", 1000, 5);

        cart.add_item(&item, 3).unwrap();
        let before = cart.clone();
        let err = cart.add_item(&item, 3).unwrap_err();

        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 5,
                requested: 6,
                ..
            }
        ));
        assert_eq!(cart, before);
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn test_return_mode_ignores_stock() {
        let mut cart = Cart::default();
        cart.toggle_mode();
        let item = catalog_item("m1", 1000, 1);

        cart.add_item(&item, 4).unwrap();
        assert_eq!(cart.lines()[0].quantity, 4);
    }

    #[test]
    fn test_add_rejects_non_positive_quantity() {
        let mut cart = Cart::default();
        let item = catalog_item("m1", 1000, 5);

        assert!(matches!(
            cart.add_item(&item, 0),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));
        assert!(cart.add_item(&item, -2).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::default();
        let item = catalog_item("m1", 1000, 5);
        cart.add_item(&item, 2).unwrap();

        cart.set_quantity("m1", 0, &[item]).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_checks_catalog_stock_in_sale_mode() {
        let mut cart = Cart::default();
        let item = catalog_item("m1", 1000, 5);
        cart.add_item(&item, 2).unwrap();

        let restocked = catalog_item("m1", 1000, 3);
        assert!(cart.set_quantity("m1", 4, &[restocked.clone()]).is_err());
        cart.set_quantity("m1", 3, &[restocked]).unwrap();
        assert_eq!(cart.lines()[0].quantity, 3);

        // Item gone from the catalog: fall back to the snapshot.
        assert!(cart.set_quantity("m1", 6, &[]).is_err());
        cart.set_quantity("m1", 5, &[]).unwrap();
    }

    #[test]
    fn test_set_quantity_unknown_line() {
        let mut cart = Cart::default();
        assert_eq!(
            cart.set_quantity("nope", 2, &[]),
            Err(CoreError::LineNotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_stepper() {
        let mut cart = Cart::default();
        let item = catalog_item("m1", 1000, 2);
        let catalog = vec![item.clone()];
        cart.add_item(&item, 1).unwrap();

        cart.increment("m1", &catalog).unwrap();
        assert_eq!(cart.lines()[0].quantity, 2);
        assert!(cart.increment("m1", &catalog).is_err());

        cart.decrement("m1", &catalog).unwrap();
        cart.decrement("m1", &catalog).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_toggle_mode_keeps_cart() {
        let mut cart = Cart::default();
        cart.add_item(&catalog_item("m1", 1000, 5), 2).unwrap();

        assert_eq!(cart.toggle_mode(), TransactionMode::Return);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn test_clear_keeps_customer_and_kind() {
        let mut cart = Cart::default();
        cart.add_item(&catalog_item("m1", 1000, 5), 2).unwrap();
        cart.discount = Discount::flat(Decimal::new(3, 0));
        cart.received_text = "50".to_string();
        cart.customer = Some(Customer {
            id: "p1".to_string(),
            name: "Jane".to_string(),
            phone: None,
            email: None,
            address: None,
            date_of_birth: None,
            gender: None,
            medical_history: None,
        });

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.discount, Discount::flat(Decimal::ZERO));
        assert!(cart.received_text.is_empty());
        assert!(cart.customer.is_some());

        cart.reset_after_checkout();
        assert!(cart.customer.is_none());
        assert_eq!(cart.discount, Discount::default());
    }

    #[test]
    fn test_replay_previous_sale() {
        let mut cart = Cart::new(TaxRate::from_percent(Decimal::new(5, 0)));
        cart.add_item(&catalog_item("old", 100, 5), 1).unwrap();

        let line = |id: &str, qty: u32| TransactionLine {
            medicine_id: id.to_string(),
            medicine_name: format!("Medicine {id}"),
            quantity: qty,
            unit_price: Money::new(250, 2),
            total_price: Money::new(250, 2) * qty,
        };
        let past = PastTransaction {
            id: "sale-1".to_string(),
            items: vec![line("m1", 2), line("m2", 1), line("m1", 1)],
            subtotal: Money::new(1000, 2),
            discount_amount: Money::new(150, 2),
            tax_amount: Money::new(43, 2),
            total_amount: Money::new(893, 2),
            payment_method: PaymentMethod::Upi,
            created_at: None,
        };

        cart.replay_previous(&past, &[catalog_item("m1", 250, 7)]);

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.line("m1").unwrap().quantity, 3);
        assert_eq!(cart.line("m1").unwrap().max_stock, 7);
        assert_eq!(cart.line("m2").unwrap().max_stock, 0);
        assert!(cart.line("old").is_none());
        assert_eq!(cart.discount, Discount::flat(Decimal::new(150, 2)));
        assert_eq!(cart.payment_method, PaymentMethod::Upi);
        assert_eq!(cart.tax_rate.percent(), Decimal::new(5, 0));
    }

    #[test]
    fn test_totals_from_cart() {
        let mut cart = Cart::new(TaxRate::from_percent(Decimal::new(5, 0)));
        cart.add_item(&catalog_item("m1", 1000, 5), 3).unwrap();
        cart.discount = Discount::percentage(Decimal::new(10, 0));
        cart.received_text = "30".to_string();

        let totals = cart.totals(Precision::default());
        assert_eq!(totals.total, Money::new(2835, 2));
        assert_eq!(totals.change, Money::new(165, 2));

        let wire = cart.transaction_lines(Precision::default());
        assert_eq!(wire[0].total_price, Money::new(3000, 2));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(usize, i64),
        Set(usize, i64),
        Remove(usize),
        Toggle,
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..4, -3i64..8).prop_map(|(i, q)| Op::Add(i, q)),
            (0usize..4, -3i64..12).prop_map(|(i, q)| Op::Set(i, q)),
            (0usize..4).prop_map(Op::Remove),
            Just(Op::Toggle),
        ]
    }

    proptest! {
        #[test]
        fn prop_cart_invariants_hold(ops in prop::collection::vec(arb_op(), 0..40)) {
            let catalog: Vec<CatalogItem> = (0..4)
                .map(|i| catalog_item(&format!("m{i}"), 100 * (i as i64 + 1), 2 + i as i64 * 2))
                .collect();
            let mut cart = Cart::default();

            for op in ops {
                let before = cart.clone();
                let result = match op {
                    Op::Add(i, q) => cart.add_item(&catalog[i], q).map(|_| ()),
                    Op::Set(i, q) => cart.set_quantity(&catalog[i].id, q, &catalog),
                    Op::Remove(i) => cart.remove_line(&catalog[i].id).map(|_| ()),
                    Op::Toggle => {
                        cart.toggle_mode();
                        Ok(())
                    }
                };
                if result.is_err() {
                    prop_assert_eq!(&cart, &before);
                }

                let mut ids: Vec<&str> = cart.lines().iter().map(|l| l.item_id.as_str()).collect();
                ids.sort_unstable();
                ids.dedup();
                prop_assert_eq!(ids.len(), cart.lines().len());
                prop_assert!(cart.lines().iter().all(|l| l.quantity > 0));
            }
        }

        #[test]
        fn prop_sale_mode_never_exceeds_stock(adds in prop::collection::vec((0usize..3, 1i64..6), 0..30)) {
            let catalog: Vec<CatalogItem> = (0..3)
                .map(|i| catalog_item(&format!("m{i}"), 500, 3 + i as i64))
                .collect();
            let mut cart = Cart::default();

            for (i, q) in adds {
                let _ = cart.add_item(&catalog[i], q);
            }
            for line in cart.lines() {
                let stock = catalog.iter().find(|c| c.id == line.item_id).unwrap().stock_quantity;
                prop_assert!(i64::from(line.quantity) <= stock);
            }
        }

        #[test]
        fn prop_merge_sums_quantities(q1 in 1i64..50, q2 in 1i64..50) {
            let mut cart = Cart::default();
            let item = catalog_item("m1", 100, 1_000);
            cart.add_item(&item, q1).unwrap();
            cart.add_item(&item, q2).unwrap();
            prop_assert_eq!(cart.lines().len(), 1);
            prop_assert_eq!(i64::from(cart.lines()[0].quantity), q1 + q2);
        }
    }
}
