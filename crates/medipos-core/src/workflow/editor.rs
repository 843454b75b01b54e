//! Inline quantity editor on a cart line.

use crate::cart::{Cart, CartLine};
use crate::error::CoreResult;
use crate::types::CatalogItem;
use crate::validation::parse_quantity_text;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineEditor {
    item_id: String,
    text: String,
}

impl InlineEditor {
    /// Opens on a line with its current quantity as the text.
    pub fn open(line: &CartLine) -> Self {
        InlineEditor {
            item_id: line.item_id.clone(),
            text: line.quantity.to_string(),
        }
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn type_char(&mut self, ch: char) {
        self.text.push(ch);
    }

    pub fn backspace(&mut self) {
        self.text.pop();
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    /// Applies the edit. Empty or non-numeric text commits as 1; zero or
    /// below removes the line.
    pub fn commit(self, cart: &mut Cart, catalog: &[CatalogItem]) -> CoreResult<()> {
        cart.set_quantity(&self.item_id, parse_quantity_text(&self.text), catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    fn setup() -> (Cart, Vec<CatalogItem>) {
        let item = CatalogItem {
            id: "m1".to_string(),
            name: "Ibuprofen".to_string(),
            generic_name: None,
            unit_price: Money::new(450, 2),
            stock_quantity: 6,
            minimum_stock_level: 1,
        };
        let mut cart = Cart::default();
        cart.add_item(&item, 2).unwrap();
        (cart, vec![item])
    }

    #[test]
    fn test_open_uses_current_quantity() {
        let (cart, _) = setup();
        let editor = InlineEditor::open(&cart.lines()[0]);
        assert_eq!(editor.text(), "2");
        assert_eq!(editor.item_id(), "m1");
    }

    #[test]
    fn test_commit_sets_quantity() {
        let (mut cart, catalog) = setup();
        let mut editor = InlineEditor::open(&cart.lines()[0]);
        editor.backspace();
        editor.type_char('5');
        editor.commit(&mut cart, &catalog).unwrap();
        assert_eq!(cart.lines()[0].quantity, 5);
    }

    #[test]
    fn test_commit_empty_is_one() {
        let (mut cart, catalog) = setup();
        let mut editor = InlineEditor::open(&cart.lines()[0]);
        editor.set_text("");
        editor.commit(&mut cart, &catalog).unwrap();
        assert_eq!(cart.lines()[0].quantity, 1);
    }

    #[test]
    fn test_commit_zero_removes_line() {
        let (mut cart, catalog) = setup();
        let mut editor = InlineEditor::open(&cart.lines()[0]);
        editor.set_text("0");
        editor.commit(&mut cart, &catalog).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_commit_over_stock_keeps_line() {
        let (mut cart, catalog) = setup();
        let mut editor = InlineEditor::open(&cart.lines()[0]);
        editor.set_text("7");
        assert!(editor.commit(&mut cart, &catalog).is_err());
        assert_eq!(cart.lines()[0].quantity, 2);
    }
}
