//! Quantity-entry overlay shown after picking a search result.

use crate::cart::Cart;
use crate::error::CoreResult;
use crate::types::CatalogItem;
use crate::validation::parse_quantity_text;

/// Pending selection plus the quantity being typed.
///
/// The text starts as `"1"` and fully selected, so the first typed
/// character replaces it.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantityEntry {
    item: CatalogItem,
    text: String,
    selected: bool,
}

impl QuantityEntry {
    pub fn new(item: CatalogItem) -> Self {
        QuantityEntry {
            item,
            text: "1".to_string(),
            selected: true,
        }
    }

    pub fn item(&self) -> &CatalogItem {
        &self.item
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn type_char(&mut self, ch: char) {
        if self.selected {
            self.text.clear();
            self.selected = false;
        }
        self.text.push(ch);
    }

    pub fn backspace(&mut self) {
        if self.selected {
            self.text.clear();
            self.selected = false;
        } else {
            self.text.pop();
        }
    }

    /// Replaces the whole text, as when a value is pasted or set directly.
    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.selected = false;
    }

    /// Adds the item to the cart with the typed quantity.
    ///
    /// Empty or non-numeric text adds 1. Zero or negative text is a
    /// validation error, not a silent 1, so a typed "0" never adds a unit
    /// the operator did not ask for. Over-stock in sale mode is rejected by
    /// the cart.
    pub fn confirm(&self, cart: &mut Cart) -> CoreResult<u32> {
        cart.add_item(&self.item, parse_quantity_text(&self.text))
    }
}
