//! Keys, typing and clicks applied to the session.

use medipos_core::workflow::Key;
use medipos_core::{dispatch, Effect, KeyInput, PosSession};

use super::Command;

/// Applies a command that only touches the session.
///
/// Returns `None` for commands the terminal handles itself.
pub fn apply(session: &mut PosSession, command: &Command) -> Option<Vec<Effect>> {
    let effects = match command {
        Command::Key(input) => dispatch(session, *input),
        Command::Type(text) => text
            .chars()
            .flat_map(|ch| dispatch(session, KeyInput::plain(Key::Char(ch))))
            .collect(),
        Command::Pick(row) => session.select_result(row - 1),
        Command::Edit(item_id) => session.begin_inline_edit(item_id),
        Command::Increment(item_id) => session.increment_line(item_id),
        Command::Decrement(item_id) => session.decrement_line(item_id),
        Command::Remove(item_id) => session.remove_line(item_id),
        Command::Customer(customer_id) => session.pick_customer(customer_id),
        Command::WalkIn => session.clear_customer(),
        Command::Replay(sale_id) => session.load_previous_sale(sale_id),
        Command::Pay(method) => session.set_payment_method(*method),
        Command::Discount(kind) => session.set_discount_kind(*kind),
        Command::Focus(focus) => session.set_focus(*focus),
        Command::Refresh => session.request_refresh(),
        Command::Prescription(_) | Command::Show | Command::Help | Command::Quit => return None,
    };
    Some(effects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use medipos_core::money::Money;
    use medipos_core::workflow::{Focus, UiState};
    use medipos_core::{CatalogItem, PaymentMethod};

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
                name: "Amlodipine".to_string(),
                generic_name: None,
                unit_price: Money::new(450, 2),
                stock_quantity: 30,
                minimum_stock_level: 5,
            },
        ]);
        session
    }

    fn run(session: &mut PosSession, line: &str) -> Vec<Effect> {
        let command = Command::parse(line).unwrap();
        apply(session, &command).unwrap()
    }

    #[test]
    fn test_search_type_pick_and_confirm() {
        let mut session = session();
        run(&mut session, "F2");
        run(&mut session, "type am");
        assert!(matches!(session.ui(), UiState::Searching(_)));

        run(&mut session, "pick 2");
        assert!(matches!(session.ui(), UiState::EnteringQuantity(_)));

        run(&mut session, "backspace");
        run(&mut session, "type 3");
        run(&mut session, "enter");

        assert_eq!(session.cart().line("m2").map(|l| l.quantity), Some(3));
        assert_eq!(session.focus(), Focus::Search);
    }

    #[test]
    fn test_line_clicks() {
        let mut session = session();
        run(&mut session, "F2");
        run(&mut session, "type amox");
        run(&mut session, "enter");
        run(&mut session, "enter");

        run(&mut session, "inc m1");
        assert_eq!(session.cart().line("m1").map(|l| l.quantity), Some(2));
        run(&mut session, "dec m1");
        assert_eq!(session.cart().line("m1").map(|l| l.quantity), Some(1));
        run(&mut session, "rm m1");
        assert!(session.cart().is_empty());
    }

    #[test]
    fn test_payment_click_and_received_typing() {
        let mut session = session();
        run(&mut session, "pay card");
        assert_eq!(session.cart().payment_method, PaymentMethod::Card);

        run(&mut session, "focus received");
        run(&mut session, "type 20");
        assert_eq!(session.cart().received_text, "20");
    }

    #[test]
    fn test_terminal_commands_are_not_applied() {
        let mut session = session();
        assert!(apply(&mut session, &Command::Help).is_none());
        assert!(apply(&mut session, &Command::Quit).is_none());
    }

    #[test]
    fn test_refresh_asks_for_catalog() {
        let mut session = session();
        assert_eq!(run(&mut session, "refresh"), vec![Effect::RefreshCatalog]);
    }
}
