//! Text rendering of the POS screen.
//!
//! ```text
//! ── SALE ─ Customer: Walk-in Customer ─ Focus: search ───────────────
//!  Search: amox
//!   > 1. Amoxicillin                 $10.00   5 left (In Stock)
//!  Cart (3 items)
//!    m1  Amoxicillin           x3      $30.00
//!  Subtotal $30.00  Discount -$3.00  Tax 5.0% +$1.35  TOTAL $28.35
//! ```

use std::fmt::Write;

use medipos_core::workflow::{Focus, Notice, NoticeLevel, SidePanel, UiState};
use medipos_core::{DiscountKind, PaymentMethod, PosSession, TransactionMode, WALK_IN_CUSTOMER};

const RULE_WIDTH: usize = 72;

pub fn render(session: &PosSession) -> String {
    let mut out = String::new();
    let settings = session.settings();
    let cart = session.cart();

    let mode = match cart.mode {
        TransactionMode::Sale => "SALE",
        TransactionMode::Return => "RETURN",
    };
    let customer = cart
        .customer
        .as_ref()
        .map(|c| c.name.as_str())
        .unwrap_or(WALK_IN_CUSTOMER);
    let header = format!(
        "── {mode} ─ Customer: {customer} ─ Focus: {} ",
        focus_name(session.focus())
    );
    let _ = writeln!(out, "{header}{}", "─".repeat(RULE_WIDTH.saturating_sub(header.chars().count())));

    match session.ui() {
        UiState::Searching(overlay) => {
            let _ = writeln!(out, " Search: {}", session.search_query());
            if overlay.results().is_empty() {
                let _ = writeln!(out, "   (no matching medicines in stock)");
            }
            for (idx, item) in overlay.results().iter().enumerate() {
                let marker = if overlay.highlight() == Some(idx) { '>' } else { ' ' };
                let _ = writeln!(
                    out,
                    "  {marker} {}. {:<28} {:>10} {:>5} left ({})",
                    idx + 1,
                    item.name,
                    settings.format_currency(item.unit_price),
                    item.stock_quantity,
                    item.stock_status().label()
                );
            }
        }
        UiState::EnteringQuantity(entry) => {
            let _ = writeln!(
                out,
                " Quantity for {} ({} in stock): {}_",
                entry.item().name,
                entry.item().stock_quantity,
                entry.text()
            );
        }
        _ => {}
    }

    if cart.is_empty() {
        let _ = writeln!(out, " Cart\n   (empty)");
    } else {
        let _ = writeln!(out, " Cart ({} items)", cart.item_count());
    }
    for line in cart.lines() {
        let quantity = match session.editor() {
            Some(editor) if editor.item_id() == line.item_id => format!("[{}_]", editor.text()),
            _ => format!("x{}", line.quantity),
        };
        let _ = writeln!(
            out,
            "   {:<8} {:<24} {:>6} {:>10}",
            line.item_id,
            line.name,
            quantity,
            settings.format_currency(line.line_total())
        );
    }

    let totals = session.totals();
    let _ = writeln!(
        out,
        " Subtotal {}  Discount -{}  Tax {} +{}  TOTAL {}",
        settings.format_currency(totals.subtotal),
        settings.format_currency(totals.discount_amount),
        settings.format_percentage(cart.tax_rate.percent()),
        settings.format_currency(totals.tax_amount),
        settings.format_currency(totals.total)
    );
    let applied = match cart.discount.kind {
        DiscountKind::Percentage => settings.format_percentage(cart.discount.value),
        DiscountKind::Flat => format!("{} flat", settings.format_number(cart.discount.value)),
    };
    let _ = writeln!(
        out,
        " Discount: {} ({applied})  Payment: {}",
        session.discount_text(),
        cart.payment_method.as_str().to_uppercase()
    );

    match session.ui() {
        UiState::Reviewing(review) => {
            let _ = write!(out, " Received: {}", cart.received_text);
            if cart.payment_method == PaymentMethod::Cash && cart.mode == TransactionMode::Sale {
                let _ = write!(out, "  Change: {}", settings.format_currency(totals.change));
            }
            let _ = writeln!(out);
            if cart.mode == TransactionMode::Return {
                let form = session.return_form();
                let _ = writeln!(
                    out,
                    " Reason: {}  Original sale: {}",
                    form.reason, form.original_reference
                );
            }
            if let Some(error) = &review.error {
                let _ = writeln!(out, " ! {error}");
            }
            let _ = writeln!(out, " Ctrl+Enter to complete, Esc to go back");
        }
        UiState::Submitting => {
            let _ = writeln!(out, " Processing...");
        }
        _ => {}
    }

    match session.side_panel() {
        Some(SidePanel::Help) => {
            let _ = writeln!(out, "{}", medipos_core::workflow::keyboard::shortcut_help());
        }
        Some(SidePanel::CustomerSearch) => {
            let _ = writeln!(out, " Customer search: {}", session.customer_query());
            for customer in session.customer_matches() {
                let _ = writeln!(
                    out,
                    "   {:<8} {:<24} {}",
                    customer.id,
                    customer.name,
                    customer.phone.as_deref().unwrap_or("")
                );
            }
        }
        Some(SidePanel::History) => {
            let _ = writeln!(out, " Previous sales");
            if session.history().is_empty() {
                let _ = writeln!(out, "   (none)");
            }
            for sale in session.history() {
                let date = sale
                    .created_at
                    .map(|at| settings.format_date(&at))
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "   {:<10} {:<12} {:>3} items {:>10}",
                    sale.id,
                    date,
                    sale.items.len(),
                    settings.format_currency(sale.total_amount)
                );
            }
        }
        None => {}
    }

    out
}

pub fn render_notice(notice: &Notice) -> String {
    match notice.level {
        NoticeLevel::Info => format!("* {}", notice.message),
        NoticeLevel::Error => format!("! {}", notice.message),
    }
}

fn focus_name(focus: Focus) -> &'static str {
    match focus {
        Focus::None => "none",
        Focus::Search => "search",
        Focus::Discount => "discount",
        Focus::Received => "received",
        Focus::Quantity => "quantity",
        Focus::InlineEditor => "line quantity",
        Focus::CustomerSearch => "customer",
        Focus::ReturnReason => "reason",
        Focus::OriginalReference => "original sale",
    }
}
