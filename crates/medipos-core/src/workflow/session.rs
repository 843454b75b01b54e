//! # POS Session
//!
//! Everything one workstation screen holds: settings, catalog, customers,
//! the cart, the workflow state and which field has focus.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  keyboard::dispatch ──┐                                                 │
//! │                       ├──► PosSession method ──► state change           │
//! │  terminal gestures ───┘          │                                      │
//! │  (clicks, picks)                 └──► Vec<Effect> ──► medipos-client    │
//! │                                                                         │
//! │  medipos-client ──► replace_catalog / apply_history / finish_success   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Methods never block and never perform I/O. Failures the operator should
//! see come back as `Effect::Notice`; while a transaction is submitting,
//! anything that would change the cart is refused.

use tracing::{debug, info};

use super::checkout::{self, CheckoutReview, ReturnForm};
use super::editor::InlineEditor;
use super::quantity::QuantityEntry;
use super::search::SearchOverlay;
use super::{Effect, Focus, SidePanel, UiState};
use crate::cart::Cart;
use crate::error::CoreError;
use crate::settings::ShopSettings;
use crate::totals::Totals;
use crate::types::{CatalogItem, Customer, DiscountKind, PastTransaction, PaymentMethod, TransactionMode};
use crate::validation::parse_discount_value;

/// Number of previous sales kept for the history panel.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Fields Tab cycles through, in order. `Received` only while reviewing.
const TAB_ORDER: [Focus; 3] = [Focus::Search, Focus::Discount, Focus::Received];

#[derive(Debug, Clone)]
pub struct PosSession {
    settings: ShopSettings,
    catalog: Vec<CatalogItem>,
    customers: Vec<Customer>,
    history: Vec<PastTransaction>,
    history_limit: usize,
    cart: Cart,
    ui: UiState,
    focus: Focus,
    side_panel: Option<SidePanel>,
    editor: Option<InlineEditor>,
    search_query: String,
    customer_query: String,
    discount_text: String,
    return_form: ReturnForm,
}

impl Default for PosSession {
    fn default() -> Self {
        PosSession::new(ShopSettings::default())
    }
}

impl PosSession {
    pub fn new(settings: ShopSettings) -> Self {
        PosSession {
            cart: Cart::new(settings.default_tax_rate()),
            settings,
            catalog: Vec::new(),
            customers: Vec::new(),
            history: Vec::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            ui: UiState::Idle,
            focus: Focus::None,
            side_panel: None,
            editor: None,
            search_query: String::new(),
            customer_query: String::new(),
            discount_text: String::new(),
            return_form: ReturnForm::default(),
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    // =========================================================================
    // Read Access
    // =========================================================================

    pub fn settings(&self) -> &ShopSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &[CatalogItem] {
        &self.catalog
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn history(&self) -> &[PastTransaction] {
        &self.history
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn side_panel(&self) -> Option<SidePanel> {
        self.side_panel
    }

    pub fn editor(&self) -> Option<&InlineEditor> {
        self.editor.as_ref()
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn customer_query(&self) -> &str {
        &self.customer_query
    }

    pub fn discount_text(&self) -> &str {
        &self.discount_text
    }

    pub fn return_form(&self) -> &ReturnForm {
        &self.return_form
    }

    pub fn totals(&self) -> Totals {
        self.cart.totals(self.settings.precision())
    }

    /// Customers matching the customer-search field.
    pub fn customer_matches(&self) -> Vec<&Customer> {
        self.customers
            .iter()
            .filter(|customer| customer.matches(&self.customer_query))
            .collect()
    }

    // =========================================================================
    // Backend Data
    // =========================================================================

    /// Installs fetched settings and adopts their default tax rate.
    pub fn set_settings(&mut self, settings: ShopSettings) {
        self.cart.tax_rate = settings.default_tax_rate();
        self.settings = settings;
    }

    /// Replaces the catalog wholesale. An open search re-filters.
    pub fn replace_catalog(&mut self, catalog: Vec<CatalogItem>) {
        self.catalog = catalog;
        if let UiState::Searching(overlay) = &mut self.ui {
            if !self.search_query.trim().is_empty() {
                overlay.refilter(&self.catalog, &self.search_query);
            }
        }
        debug!(items = self.catalog.len(), "Catalog replaced");
    }

    pub fn replace_customers(&mut self, customers: Vec<Customer>) {
        self.customers = customers;
    }

    /// Stores fetched history if it still belongs to the selected customer.
    pub fn apply_history(&mut self, customer_id: &str, mut sales: Vec<PastTransaction>) {
        let current = self.cart.customer.as_ref().map(|c| c.id.as_str());
        if current != Some(customer_id) {
            debug!(customer_id, "Dropping history for a customer no longer selected");
            return;
        }
        sales.truncate(self.history_limit);
        self.history = sales;
    }

    // =========================================================================
    // Guards
    // =========================================================================

    fn busy(&self) -> Option<Vec<Effect>> {
        if self.ui.is_submitting() {
            Some(vec![Effect::error(CoreError::SubmissionInProgress.to_string())])
        } else {
            None
        }
    }

    fn report(result: Result<(), CoreError>) -> Vec<Effect> {
        match result {
            Ok(()) => Vec::new(),
            Err(err) => vec![Effect::error(err.to_string())],
        }
    }

    // =========================================================================
    // Focus
    // =========================================================================

    /// Moves focus. Leaving the inline editor commits it.
    pub fn set_focus(&mut self, focus: Focus) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.focus == Focus::InlineEditor && focus != Focus::InlineEditor {
            effects.extend(self.commit_inline_edit());
        }
        self.focus = focus;

        if focus == Focus::Search
            && matches!(self.ui, UiState::Idle)
            && !self.search_query.trim().is_empty()
        {
            self.ui = UiState::Searching(SearchOverlay::with_query(&self.catalog, &self.search_query));
        }
        effects
    }

    /// Tab / Shift+Tab over search, discount and (while reviewing) received.
    pub fn cycle_focus(&mut self, backwards: bool) -> Vec<Effect> {
        let reviewing = matches!(self.ui, UiState::Reviewing(_));
        let order: Vec<Focus> = TAB_ORDER
            .into_iter()
            .filter(|focus| *focus != Focus::Received || reviewing)
            .collect();

        let len = order.len();
        let next = match order.iter().position(|focus| *focus == self.focus) {
            None if backwards => len - 1,
            None => 0,
            Some(0) if backwards => len - 1,
            Some(idx) if backwards => idx - 1,
            Some(idx) => (idx + 1) % len,
        };
        self.set_focus(order[next])
    }

    /// Types a character into the focused field.
    pub fn type_char(&mut self, ch: char) -> Vec<Effect> {
        match self.focus {
            Focus::None => Vec::new(),
            Focus::Search => {
                let mut query = self.search_query.clone();
                query.push(ch);
                self.set_search_query(&query)
            }
            Focus::Quantity => {
                if let UiState::EnteringQuantity(entry) = &mut self.ui {
                    entry.type_char(ch);
                }
                Vec::new()
            }
            Focus::InlineEditor => {
                if let Some(editor) = &mut self.editor {
                    editor.type_char(ch);
                }
                Vec::new()
            }
            Focus::Discount => {
                let mut text = self.discount_text.clone();
                text.push(ch);
                self.set_discount_text(&text)
            }
            Focus::Received => {
                let mut text = self.cart.received_text.clone();
                text.push(ch);
                self.set_received_text(&text)
            }
            Focus::CustomerSearch => {
                self.customer_query.push(ch);
                Vec::new()
            }
            Focus::ReturnReason => {
                let mut text = self.return_form.reason.clone();
                text.push(ch);
                self.set_return_reason(&text)
            }
            Focus::OriginalReference => {
                let mut text = self.return_form.original_reference.clone();
                text.push(ch);
                self.set_original_reference(&text)
            }
        }
    }

    /// Deletes the last character of the focused field.
    pub fn backspace(&mut self) -> Vec<Effect> {
        match self.focus {
            Focus::None => Vec::new(),
            Focus::Search => {
                let mut query = self.search_query.clone();
                query.pop();
                self.set_search_query(&query)
            }
            Focus::Quantity => {
                if let UiState::EnteringQuantity(entry) = &mut self.ui {
                    entry.backspace();
                }
                Vec::new()
            }
            Focus::InlineEditor => {
                if let Some(editor) = &mut self.editor {
                    editor.backspace();
                }
                Vec::new()
            }
            Focus::Discount => {
                let mut text = self.discount_text.clone();
                text.pop();
                self.set_discount_text(&text)
            }
            Focus::Received => {
                let mut text = self.cart.received_text.clone();
                text.pop();
                self.set_received_text(&text)
            }
            Focus::CustomerSearch => {
                self.customer_query.pop();
                Vec::new()
            }
            Focus::ReturnReason => {
                let mut text = self.return_form.reason.clone();
                text.pop();
                self.set_return_reason(&text)
            }
            Focus::OriginalReference => {
                let mut text = self.return_form.original_reference.clone();
                text.pop();
                self.set_original_reference(&text)
            }
        }
    }

    // =========================================================================
    // Search Overlay
    // =========================================================================

    /// Search hotkey: clears the query and opens an empty overlay.
    pub fn open_search(&mut self) -> Vec<Effect> {
        if self.ui.is_submitting() {
            return Vec::new();
        }
        let mut effects = self.set_focus(Focus::Search);
        self.search_query.clear();
        self.ui = UiState::Searching(SearchOverlay::fresh());
        effects
    }

    /// New query text. An empty query closes the overlay.
    pub fn set_search_query(&mut self, query: &str) -> Vec<Effect> {
        self.search_query = query.to_string();
        let empty = self.search_query.trim().is_empty();

        let next = match &mut self.ui {
            UiState::Searching(_) if empty => Some(UiState::Idle),
            UiState::Searching(overlay) => {
                overlay.refilter(&self.catalog, &self.search_query);
                None
            }
            UiState::Idle if !empty => Some(UiState::Searching(SearchOverlay::with_query(
                &self.catalog,
                &self.search_query,
            ))),
            _ => None,
        };
        if let Some(state) = next {
            self.ui = state;
        }
        Vec::new()
    }

    pub fn search_move_down(&mut self) {
        if let UiState::Searching(overlay) = &mut self.ui {
            overlay.move_down();
        }
    }

    pub fn search_move_up(&mut self) {
        if let UiState::Searching(overlay) = &mut self.ui {
            overlay.move_up();
        }
    }

    /// Enter in the overlay: picks the highlighted row (or the first).
    pub fn select_highlighted(&mut self) -> Vec<Effect> {
        let picked = match &self.ui {
            UiState::Searching(overlay) => overlay.selection().cloned(),
            _ => None,
        };
        if let Some(item) = picked {
            self.choose_item(item);
        }
        Vec::new()
    }

    /// Click on a result row.
    pub fn select_result(&mut self, index: usize) -> Vec<Effect> {
        let picked = match &self.ui {
            UiState::Searching(overlay) => overlay.get(index).cloned(),
            _ => None,
        };
        match picked {
            Some(item) => {
                self.choose_item(item);
                Vec::new()
            }
            None => vec![Effect::error(format!("No search result at position {}", index + 1))],
        }
    }

    fn choose_item(&mut self, item: CatalogItem) {
        debug!(item_id = %item.id, "Item selected, asking for quantity");
        self.ui = UiState::EnteringQuantity(QuantityEntry::new(item));
        self.focus = Focus::Quantity;
    }

    /// Escape in the overlay: close and clear the query.
    pub fn close_search(&mut self) {
        if matches!(self.ui, UiState::Searching(_)) {
            self.ui = UiState::Idle;
        }
        self.search_query.clear();
    }

    // =========================================================================
    // Quantity Overlay
    // =========================================================================

    /// Confirms the pending quantity. The overlay closes and the search is
    /// reset whether or not the cart accepted the item.
    pub fn confirm_quantity(&mut self) -> Vec<Effect> {
        let entry = match std::mem::take(&mut self.ui) {
            UiState::EnteringQuantity(entry) => entry,
            other => {
                self.ui = other;
                return Vec::new();
            }
        };

        let result = entry.confirm(&mut self.cart).map(|_| ());
        self.reset_search();
        Self::report(result)
    }

    pub fn cancel_quantity(&mut self) {
        if matches!(self.ui, UiState::EnteringQuantity(_)) {
            self.reset_search();
        }
    }

    fn reset_search(&mut self) {
        self.ui = UiState::Idle;
        self.search_query.clear();
        self.focus = Focus::Search;
    }

    // =========================================================================
    // Cart Lines
    // =========================================================================

    pub fn begin_inline_edit(&mut self, item_id: &str) -> Vec<Effect> {
        if let Some(effects) = self.busy() {
            return effects;
        }
        let mut effects = Vec::new();
        if self.editor.is_some() {
            effects.extend(self.commit_inline_edit());
        }
        match self.cart.line(item_id) {
            Some(line) => {
                self.editor = Some(InlineEditor::open(line));
                self.focus = Focus::InlineEditor;
            }
            None => effects.push(Effect::error(CoreError::LineNotFound(item_id.to_string()).to_string())),
        }
        effects
    }

    /// Enter or blur in the inline editor.
    pub fn commit_inline_edit(&mut self) -> Vec<Effect> {
        let Some(editor) = self.editor.take() else {
            return Vec::new();
        };
        if self.focus == Focus::InlineEditor {
            self.focus = Focus::None;
        }
        if let Some(effects) = self.busy() {
            return effects;
        }
        Self::report(editor.commit(&mut self.cart, &self.catalog))
    }

    /// Escape in the inline editor.
    pub fn discard_inline_edit(&mut self) {
        self.editor = None;
        if self.focus == Focus::InlineEditor {
            self.focus = Focus::None;
        }
    }

    pub fn increment_line(&mut self, item_id: &str) -> Vec<Effect> {
        if let Some(effects) = self.busy() {
            return effects;
        }
        Self::report(self.cart.increment(item_id, &self.catalog))
    }

    pub fn decrement_line(&mut self, item_id: &str) -> Vec<Effect> {
        if let Some(effects) = self.busy() {
            return effects;
        }
        Self::report(self.cart.decrement(item_id, &self.catalog))
    }

    pub fn remove_line(&mut self, item_id: &str) -> Vec<Effect> {
        if let Some(effects) = self.busy() {
            return effects;
        }
        if self.editor.as_ref().is_some_and(|editor| editor.item_id() == item_id) {
            self.discard_inline_edit();
        }
        Self::report(self.cart.remove_line(item_id).map(|_| ()))
    }

    /// F10 / Ctrl+N. Also closes the checkout review.
    pub fn clear_cart(&mut self) -> Vec<Effect> {
        if let Some(effects) = self.busy() {
            return effects;
        }
        self.discard_inline_edit();
        self.cart.clear();
        self.discount_text.clear();
        if matches!(self.ui, UiState::Reviewing(_)) {
            self.close_review();
        }
        debug!("Cart cleared");
        Vec::new()
    }

    /// F9. The cart is kept.
    pub fn toggle_mode(&mut self) -> Vec<Effect> {
        if let Some(effects) = self.busy() {
            return effects;
        }
        let mode = self.cart.toggle_mode();
        let label = match mode {
            TransactionMode::Sale => "Sale mode",
            TransactionMode::Return => "Return mode",
        };
        vec![Effect::info(label)]
    }

    // =========================================================================
    // Discount & Payment
    // =========================================================================

    pub fn set_discount_text(&mut self, text: &str) -> Vec<Effect> {
        if let Some(effects) = self.busy() {
            return effects;
        }
        self.discount_text = text.to_string();
        self.cart.set_discount_value(parse_discount_value(text));
        Vec::new()
    }

    pub fn set_discount_kind(&mut self, kind: DiscountKind) -> Vec<Effect> {
        if let Some(effects) = self.busy() {
            return effects;
        }
        self.cart.set_discount_kind(kind);
        Vec::new()
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) -> Vec<Effect> {
        if let Some(effects) = self.busy() {
            return effects;
        }
        self.cart.payment_method = method;
        Vec::new()
    }

    pub fn set_received_text(&mut self, text: &str) -> Vec<Effect> {
        if let Some(effects) = self.busy() {
            return effects;
        }
        self.cart.received_text = text.to_string();
        Vec::new()
    }

    pub fn set_return_reason(&mut self, text: &str) -> Vec<Effect> {
        if let Some(effects) = self.busy() {
            return effects;
        }
        self.return_form.reason = text.to_string();
        Vec::new()
    }

    pub fn set_original_reference(&mut self, text: &str) -> Vec<Effect> {
        if let Some(effects) = self.busy() {
            return effects;
        }
        self.return_form.original_reference = text.to_string();
        Vec::new()
    }

    // =========================================================================
    // Side Panels
    // =========================================================================

    fn close_side_panel(&mut self) {
        if self.side_panel == Some(SidePanel::CustomerSearch) && self.focus == Focus::CustomerSearch {
            self.focus = Focus::None;
        }
        self.side_panel = None;
    }

    pub fn toggle_help(&mut self) -> Vec<Effect> {
        if self.side_panel == Some(SidePanel::Help) {
            self.close_side_panel();
        } else {
            self.close_side_panel();
            self.side_panel = Some(SidePanel::Help);
        }
        Vec::new()
    }

    pub fn toggle_customer_search(&mut self) -> Vec<Effect> {
        if self.side_panel == Some(SidePanel::CustomerSearch) {
            self.close_side_panel();
            return Vec::new();
        }
        self.close_side_panel();
        self.customer_query.clear();
        self.side_panel = Some(SidePanel::CustomerSearch);
        self.set_focus(Focus::CustomerSearch)
    }

    /// History needs a selected customer; opening it reloads the history.
    pub fn toggle_history(&mut self) -> Vec<Effect> {
        if self.side_panel == Some(SidePanel::History) {
            self.close_side_panel();
            return Vec::new();
        }
        let Some(customer) = &self.cart.customer else {
            return vec![Effect::info("Select a customer to see previous sales")];
        };
        let customer_id = customer.id.clone();
        self.close_side_panel();
        self.side_panel = Some(SidePanel::History);
        vec![Effect::LoadHistory { customer_id }]
    }

    // =========================================================================
    // Customers
    // =========================================================================

    pub fn set_customer_query(&mut self, query: &str) {
        self.customer_query = query.to_string();
    }

    /// Selects a customer and asks for their history.
    pub fn pick_customer(&mut self, customer_id: &str) -> Vec<Effect> {
        if let Some(effects) = self.busy() {
            return effects;
        }
        let Some(customer) = self.customers.iter().find(|c| c.id == customer_id).cloned() else {
            return vec![Effect::error(format!("Customer {customer_id} not found"))];
        };

        debug!(customer_id, "Customer selected");
        self.cart.customer = Some(customer);
        self.history.clear();
        self.customer_query.clear();
        if self.side_panel == Some(SidePanel::CustomerSearch) {
            self.close_side_panel();
        }
        vec![Effect::LoadHistory {
            customer_id: customer_id.to_string(),
        }]
    }

    /// Enter in customer search: picks the first match.
    pub fn pick_first_customer_match(&mut self) -> Vec<Effect> {
        match self.customer_matches().first().map(|c| c.id.clone()) {
            Some(id) => self.pick_customer(&id),
            None => vec![Effect::info("No matching customer")],
        }
    }

    pub fn clear_customer(&mut self) -> Vec<Effect> {
        if let Some(effects) = self.busy() {
            return effects;
        }
        self.cart.customer = None;
        self.history.clear();
        if self.side_panel == Some(SidePanel::History) {
            self.close_side_panel();
        }
        Vec::new()
    }

    /// Loads one of the listed previous sales into the cart.
    pub fn load_previous_sale(&mut self, sale_id: &str) -> Vec<Effect> {
        if let Some(effects) = self.busy() {
            return effects;
        }
        let Some(sale) = self.history.iter().find(|sale| sale.id == sale_id).cloned() else {
            return vec![Effect::error(format!("Previous sale {sale_id} not found"))];
        };

        self.discard_inline_edit();
        self.cart.replay_previous(&sale, &self.catalog);
        self.discount_text = self.cart.discount.value.normalize().to_string();
        if self.side_panel == Some(SidePanel::History) {
            self.close_side_panel();
        }
        vec![Effect::info("Previous sale loaded into cart")]
    }

    pub fn request_refresh(&self) -> Vec<Effect> {
        vec![Effect::RefreshCatalog]
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// F8: opens the review and focuses the received field.
    pub fn open_review(&mut self) -> Vec<Effect> {
        if let Some(effects) = self.busy() {
            return effects;
        }
        if self.cart.is_empty() {
            return vec![Effect::error(CoreError::EmptyCart.to_string())];
        }
        let effects = self.commit_inline_edit();
        self.ui = UiState::Reviewing(CheckoutReview::default());
        self.focus = Focus::Received;
        effects
    }

    pub fn close_review(&mut self) {
        if matches!(self.ui, UiState::Reviewing(_)) {
            self.ui = UiState::Idle;
        }
        if matches!(
            self.focus,
            Focus::Received | Focus::ReturnReason | Focus::OriginalReference
        ) {
            self.focus = Focus::None;
        }
    }

    /// Validates and, if everything passes, moves to `Submitting` and asks
    /// for the transaction to be sent.
    pub fn begin_submit(&mut self) -> Vec<Effect> {
        match self.ui {
            UiState::Submitting => {
                return vec![Effect::error(CoreError::SubmissionInProgress.to_string())]
            }
            UiState::Searching(_) | UiState::EnteringQuantity(_) => {
                return vec![Effect::error(
                    CoreError::InvalidState { action: "submit" }.to_string(),
                )]
            }
            UiState::Idle | UiState::Reviewing(_) => {}
        }

        let mut effects = self.commit_inline_edit();
        match checkout::prepare(&self.cart, &self.return_form, self.settings.precision()) {
            Ok(submission) => {
                debug!(
                    mode = ?submission.mode(),
                    total = %submission.totals.total,
                    "Submitting transaction"
                );
                self.ui = UiState::Submitting;
                self.focus = Focus::None;
                effects.push(Effect::Submit(submission));
            }
            Err(err) => {
                let message = err.to_string();
                if let UiState::Reviewing(review) = &mut self.ui {
                    review.error = Some(message.clone());
                }
                effects.push(Effect::error(message));
            }
        }
        effects
    }

    /// The backend accepted the transaction and the catalog was refreshed.
    pub fn finish_success(&mut self) -> Result<(), CoreError> {
        if !self.ui.is_submitting() {
            return Err(CoreError::InvalidState {
                action: "finish a checkout",
            });
        }
        self.cart.reset_after_checkout();
        self.return_form.clear();
        self.discount_text.clear();
        self.history.clear();
        if self.side_panel == Some(SidePanel::History) {
            self.side_panel = None;
        }
        self.ui = UiState::Idle;
        self.focus = Focus::None;
        info!("Checkout complete, cart reset");
        Ok(())
    }

    /// The backend refused the transaction: back to the review, cart intact.
    pub fn finish_failure(&mut self, message: &str) {
        if self.ui.is_submitting() {
            self.ui = UiState::Reviewing(CheckoutReview::with_error(message));
            self.focus = Focus::Received;
        }
    }

    /// Escape outside the overlays: closes the innermost open surface.
    pub fn escape_topmost(&mut self) -> Vec<Effect> {
        if self.editor.is_some() {
            self.discard_inline_edit();
        } else if self.side_panel.is_some() {
            self.close_side_panel();
        } else if matches!(self.ui, UiState::Reviewing(_)) {
            self.close_review();
        } else {
            self.focus = Focus::None;
        }
        Vec::new()
    }
}
