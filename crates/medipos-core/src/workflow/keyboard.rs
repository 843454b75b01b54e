//! # Keyboard Dispatch
//!
//! Routes one key press to the session.
//!
//! ## Priority
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  key ──► quantity overlay open?  ──yes──► Char / ⌫ / Enter / Esc / F2   │
//! │              │ no                                                       │
//! │              ▼                                                          │
//! │          search overlay open?    ──yes──► Char / ⌫ / ↑ / ↓ / Enter /    │
//! │              │ no                         Esc / F2                      │
//! │              ▼                                                          │
//! │          text input focused?     ──yes──► typing; F-keys, Ctrl/Alt,     │
//! │              │ no                         Tab and Esc fall through      │
//! │              ▼                                                          │
//! │          global shortcuts                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An open overlay swallows every key it does not handle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::session::PosSession;
use super::{Effect, Focus, UiState};
use crate::error::ValidationError;

// =============================================================================
// Key Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Char(char),
    Backspace,
    Enter,
    Escape,
    Tab,
    Up,
    Down,
    /// Function key F1..F12.
    F(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInput {
    pub key: Key,
    pub mods: Modifiers,
}

impl KeyInput {
    pub fn plain(key: Key) -> Self {
        KeyInput {
            key,
            mods: Modifiers::default(),
        }
    }

    pub fn ctrl(key: Key) -> Self {
        KeyInput {
            key,
            mods: Modifiers {
                ctrl: true,
                ..Modifiers::default()
            },
        }
    }

    pub fn shift(key: Key) -> Self {
        KeyInput {
            key,
            mods: Modifiers {
                shift: true,
                ..Modifiers::default()
            },
        }
    }

    /// A character typed without Ctrl or Alt.
    fn typed_char(&self) -> Option<char> {
        match self.key {
            Key::Char(ch) if !self.mods.ctrl && !self.mods.alt => Some(ch),
            _ => None,
        }
    }

    fn is_ctrl_char(&self, expected: char) -> bool {
        matches!(self.key, Key::Char(ch) if self.mods.ctrl && ch.eq_ignore_ascii_case(&expected))
    }

    /// Keys that still reach the global shortcuts while a text input has focus.
    fn passes_through_inputs(&self) -> bool {
        matches!(self.key, Key::F(_) | Key::Tab | Key::Escape) || self.mods.ctrl || self.mods.alt
    }
}

impl fmt::Display for KeyInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mods.ctrl {
            write!(f, "ctrl+")?;
        }
        if self.mods.alt {
            write!(f, "alt+")?;
        }
        if self.mods.shift {
            write!(f, "shift+")?;
        }
        match self.key {
            Key::Char(' ') => write!(f, "space"),
            Key::Char(ch) => write!(f, "{ch}"),
            Key::Backspace => write!(f, "backspace"),
            Key::Enter => write!(f, "enter"),
            Key::Escape => write!(f, "esc"),
            Key::Tab => write!(f, "tab"),
            Key::Up => write!(f, "up"),
            Key::Down => write!(f, "down"),
            Key::F(n) => write!(f, "F{n}"),
        }
    }
}

/// Parses key names such as `F2`, `ctrl+enter`, `shift+tab`, `esc` or `a`.
impl FromStr for KeyInput {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "Key".to_string(),
            reason: format!("{reason}: '{s}'"),
        };

        let mut mods = Modifiers::default();
        let mut parts: Vec<&str> = s.trim().split('+').collect();
        let name = parts.pop().filter(|p| !p.is_empty()).ok_or_else(|| invalid("empty key"))?;

        for modifier in parts {
            match modifier.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => mods.ctrl = true,
                "alt" => mods.alt = true,
                "shift" => mods.shift = true,
                _ => return Err(invalid("unknown modifier")),
            }
        }

        let lower = name.to_ascii_lowercase();
        let key = match lower.as_str() {
            "enter" | "return" => Key::Enter,
            "esc" | "escape" => Key::Escape,
            "tab" => Key::Tab,
            "up" => Key::Up,
            "down" => Key::Down,
            "backspace" | "bs" => Key::Backspace,
            "space" => Key::Char(' '),
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Key::Char(ch),
                    _ => match lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                        Some(n @ 1..=12) => Key::F(n),
                        _ => return Err(invalid("unknown key")),
                    },
                }
            }
        };

        Ok(KeyInput { key, mods })
    }
}

// =============================================================================
// Shortcut Table
// =============================================================================

/// Shortcuts listed in the help panel.
pub const SHORTCUTS: &[(&str, &str)] = &[
    ("F1", "Show or hide this help"),
    ("F2", "Search medicines"),
    ("F3 / Ctrl+P", "Search customers"),
    ("F4 / Ctrl+H", "Previous sales of the selected customer"),
    ("F5", "Discount field"),
    ("F8", "Review checkout"),
    ("F9", "Switch sale / return mode"),
    ("F10 / Ctrl+N", "Clear cart"),
    ("Ctrl+Enter", "Complete transaction"),
    ("Esc", "Close the topmost panel"),
    ("Tab / Shift+Tab", "Next / previous field"),
    ("Up / Down", "Move through search results"),
];

pub fn shortcut_help() -> String {
    let width = SHORTCUTS.iter().map(|(keys, _)| keys.len()).max().unwrap_or(0);
    SHORTCUTS
        .iter()
        .map(|(keys, action)| format!("{keys:<width$}  {action}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// Dispatch
// =============================================================================

/// Applies one key press to the session and returns the resulting effects.
pub fn dispatch(session: &mut PosSession, input: KeyInput) -> Vec<Effect> {
    debug!(key = %input, state = session.ui().name(), focus = ?session.focus(), "Key");

    match session.ui() {
        UiState::EnteringQuantity(_) => return quantity_keys(session, input),
        UiState::Searching(_) => return search_keys(session, input),
        _ => {}
    }

    if session.focus().is_text_input() && !input.passes_through_inputs() {
        return input_keys(session, input);
    }

    global_keys(session, input)
}

fn quantity_keys(session: &mut PosSession, input: KeyInput) -> Vec<Effect> {
    if let Some(ch) = input.typed_char() {
        return session.type_char(ch);
    }
    match input.key {
        Key::Backspace => session.backspace(),
        Key::Enter => session.confirm_quantity(),
        Key::Escape => {
            session.cancel_quantity();
            Vec::new()
        }
        Key::F(2) => {
            let mut effects = session.confirm_quantity();
            effects.extend(session.open_search());
            effects
        }
        _ => Vec::new(),
    }
}

fn search_keys(session: &mut PosSession, input: KeyInput) -> Vec<Effect> {
    if let Some(ch) = input.typed_char() {
        return session.type_char(ch);
    }
    match input.key {
        Key::Backspace => session.backspace(),
        Key::Down => {
            session.search_move_down();
            Vec::new()
        }
        Key::Up => {
            session.search_move_up();
            Vec::new()
        }
        Key::Enter => session.select_highlighted(),
        Key::Escape => {
            session.close_search();
            Vec::new()
        }
        Key::F(2) => session.open_search(),
        _ => Vec::new(),
    }
}

fn input_keys(session: &mut PosSession, input: KeyInput) -> Vec<Effect> {
    if let Some(ch) = input.typed_char() {
        return session.type_char(ch);
    }
    match (session.focus(), input.key) {
        (_, Key::Backspace) => session.backspace(),
        (Focus::InlineEditor, Key::Enter) => session.commit_inline_edit(),
        (Focus::CustomerSearch, Key::Enter) => session.pick_first_customer_match(),
        _ => Vec::new(),
    }
}

fn global_keys(session: &mut PosSession, input: KeyInput) -> Vec<Effect> {
    if input.is_ctrl_char('p') {
        return session.toggle_customer_search();
    }
    if input.is_ctrl_char('h') {
        return session.toggle_history();
    }
    if input.is_ctrl_char('n') {
        return session.clear_cart();
    }

    match input.key {
        Key::Enter if input.mods.ctrl => {
            if session.cart().is_empty() {
                Vec::new()
            } else {
                session.begin_submit()
            }
        }
        Key::F(1) => session.toggle_help(),
        Key::F(2) => {
            session.close_review();
            session.open_search()
        }
        Key::F(3) => session.toggle_customer_search(),
        Key::F(4) => session.toggle_history(),
        Key::F(5) => session.set_focus(Focus::Discount),
        Key::F(8) => session.open_review(),
        Key::F(9) => session.toggle_mode(),
        Key::F(10) => session.clear_cart(),
        Key::Escape => session.escape_topmost(),
        Key::Tab => session.cycle_focus(input.mods.shift),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::{CatalogItem, PaymentMethod, TransactionMode};
    use crate::workflow::SidePanel;
    use rust_decimal::Decimal;

    fn key(name: &str) -> KeyInput {
        name.parse().unwrap()
    }

    fn press(session: &mut PosSession, names: &[&str]) -> Vec<Effect> {
        names
            .iter()
            .flat_map(|name| dispatch(session, key(name)))
            .collect()
    }

    fn type_text(session: &mut PosSession, text: &str) {
        for ch in text.chars() {
            dispatch(session, KeyInput::plain(Key::Char(ch)));
        }
    }

    fn session() -> PosSession {
        let mut session = PosSession::default();
        session.replace_catalog(vec![
            CatalogItem {
                id: "m1".to_string(),
                name: "Amoxicillin".to_string(),
                generic_name: None,
                unit_price: Money::new(1000, 2),
                stock_quantity: 5,
                minimum_stock_level: 2,
            },
            CatalogItem {
                id: "m2".to_string(),
                name: "Ambroxol".to_string(),
                generic_name: None,
                unit_price: Money::new(400, 2),
                stock_quantity: 8,
                minimum_stock_level: 2,
            },
        ]);
        session
    }

    #[test]
    fn test_parse_key_names() {
        assert_eq!(key("F2"), KeyInput::plain(Key::F(2)));
        assert_eq!(key("ctrl+enter"), KeyInput::ctrl(Key::Enter));
        assert_eq!(key("Shift+Tab"), KeyInput::shift(Key::Tab));
        assert_eq!(key("esc"), KeyInput::plain(Key::Escape));
        assert_eq!(key("ctrl+p"), KeyInput::ctrl(Key::Char('p')));
        assert_eq!(key("A"), KeyInput::plain(Key::Char('A')));
        assert!("F13".parse::<KeyInput>().is_err());
        assert!("hyper+x".parse::<KeyInput>().is_err());
        assert!("".parse::<KeyInput>().is_err());
    }

    #[test]
    fn test_display_round_trips_names() {
        assert_eq!(key("ctrl+enter").to_string(), "ctrl+enter");
        assert_eq!(key("f10").to_string(), "F10");
    }

    #[test]
    fn test_search_pick_and_confirm_quantity() {
        let mut session = session();
        press(&mut session, &["F2"]);
        assert!(matches!(session.ui(), UiState::Searching(_)));

        type_text(&mut session, "am");
        press(&mut session, &["down", "enter"]);
        match session.ui() {
            UiState::EnteringQuantity(entry) => assert_eq!(entry.item().id, "m2"),
            other => panic!("expected quantity entry, got {other:?}"),
        }

        type_text(&mut session, "3");
        let effects = press(&mut session, &["enter"]);
        assert!(effects.is_empty());
        assert_eq!(session.cart().line("m2").unwrap().quantity, 3);
        assert_eq!(session.ui(), &UiState::Idle);
        assert_eq!(session.focus(), Focus::Search);
    }

    #[test]
    fn test_second_add_over_stock_is_rejected() {
        let mut session = session();
        let add_three = |session: &mut PosSession| {
            press(session, &["F2"]);
            type_text(session, "amox");
            press(session, &["enter"]);
            type_text(session, "3");
            press(session, &["enter"])
        };

        assert!(add_three(&mut session).is_empty());
        let effects = add_three(&mut session);
        assert!(matches!(&effects[..], [Effect::Notice(n)] if n.message.contains("Only 5")));
        assert_eq!(session.cart().line("m1").unwrap().quantity, 3);
    }

    #[test]
    fn test_overlay_swallows_global_shortcuts() {
        let mut session = session();
        press(&mut session, &["F2"]);
        type_text(&mut session, "am");
        press(&mut session, &["F9", "F1", "ctrl+n"]);
        assert_eq!(session.cart().mode, TransactionMode::Sale);
        assert_eq!(session.side_panel(), None);

        press(&mut session, &["esc"]);
        assert_eq!(session.ui(), &UiState::Idle);
        assert!(session.search_query().is_empty());
    }

    #[test]
    fn test_f2_in_quantity_overlay_confirms_and_reopens() {
        let mut session = session();
        press(&mut session, &["F2"]);
        type_text(&mut session, "amox");
        press(&mut session, &["enter", "F2"]);
        assert_eq!(session.cart().line("m1").unwrap().quantity, 1);
        match session.ui() {
            UiState::Searching(overlay) => assert_eq!(overlay.highlight(), None),
            other => panic!("expected fresh search, got {other:?}"),
        }
    }

    #[test]
    fn test_text_input_blocks_plain_keys_but_not_function_keys() {
        let mut session = session();
        press(&mut session, &["F5"]);
        assert_eq!(session.focus(), Focus::Discount);

        type_text(&mut session, "10");
        assert_eq!(session.discount_text(), "10");
        assert_eq!(session.cart().discount.value, Decimal::new(10, 0));

        press(&mut session, &["F9"]);
        assert_eq!(session.cart().mode, TransactionMode::Return);
        press(&mut session, &["F9"]);
        assert_eq!(session.cart().mode, TransactionMode::Sale);
    }

    #[test]
    fn test_mode_switch_keeps_cart() {
        let mut session = session();
        press(&mut session, &["F2"]);
        type_text(&mut session, "amox");
        press(&mut session, &["enter", "enter"]);

        let effects = press(&mut session, &["esc", "F9"]);
        assert_eq!(effects, vec![Effect::info("Return mode")]);
        assert_eq!(session.cart().lines().len(), 1);
    }

    #[test]
    fn test_ctrl_enter_submits_from_idle() {
        let mut session = session();
        assert!(press(&mut session, &["ctrl+enter"]).is_empty());

        press(&mut session, &["F2"]);
        type_text(&mut session, "amb");
        press(&mut session, &["enter", "enter", "esc"]);
        session.set_payment_method(PaymentMethod::Card);

        let effects = press(&mut session, &["ctrl+enter"]);
        assert!(matches!(&effects[..], [Effect::Submit(_)]));
        assert!(session.ui().is_submitting());

        let again = press(&mut session, &["ctrl+enter"]);
        assert_eq!(again, vec![Effect::error("A transaction is already being submitted")]);
    }

    #[test]
    fn test_underpaid_cash_submit_never_emits_submit() {
        let mut session = session();
        press(&mut session, &["F2"]);
        type_text(&mut session, "amb");
        press(&mut session, &["enter", "enter", "F8"]);
        assert_eq!(session.focus(), Focus::Received);

        type_text(&mut session, "1");
        let effects = press(&mut session, &["ctrl+enter"]);
        assert!(effects.iter().all(|e| !matches!(e, Effect::Submit(_))));
        assert!(matches!(session.ui(), UiState::Reviewing(r) if r.error.is_some()));

        type_text(&mut session, "0");
        let effects = press(&mut session, &["ctrl+enter"]);
        assert!(matches!(&effects[..], [Effect::Submit(_)]));
    }

    #[test]
    fn test_escape_order_and_tab_cycle() {
        let mut session = session();
        press(&mut session, &["F2"]);
        type_text(&mut session, "amox");
        press(&mut session, &["enter", "enter", "F8", "F1"]);
        assert_eq!(session.side_panel(), Some(SidePanel::Help));

        press(&mut session, &["esc"]);
        assert_eq!(session.side_panel(), None);
        assert!(matches!(session.ui(), UiState::Reviewing(_)));

        press(&mut session, &["tab"]);
        assert_eq!(session.focus(), Focus::Search);
        press(&mut session, &["shift+tab"]);
        assert_eq!(session.focus(), Focus::Received);

        press(&mut session, &["esc"]);
        assert_eq!(session.ui(), &UiState::Idle);
        assert_eq!(session.focus(), Focus::None);
    }

    #[test]
    fn test_inline_editor_enter_and_escape() {
        let mut session = session();
        press(&mut session, &["F2"]);
        type_text(&mut session, "amb");
        press(&mut session, &["enter", "enter", "esc"]);

        session.begin_inline_edit("m2");
        press(&mut session, &["backspace"]);
        type_text(&mut session, "4");
        press(&mut session, &["enter"]);
        assert_eq!(session.cart().line("m2").unwrap().quantity, 4);

        session.begin_inline_edit("m2");
        type_text(&mut session, "9");
        press(&mut session, &["esc"]);
        assert_eq!(session.cart().line("m2").unwrap().quantity, 4);
        assert!(session.editor().is_none());
    }

    #[test]
    fn test_help_lists_every_function_key() {
        let help = shortcut_help();
        for f in ["F1", "F2", "F3", "F4", "F5", "F8", "F9", "F10", "Ctrl+Enter"] {
            assert!(help.contains(f), "missing {f}");
        }
    }
}
