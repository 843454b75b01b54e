//! # Receipts
//!
//! Builds the printable receipt for a completed sale or return.
//!
//! ## Layout
//! ```text
//! ┌────────────────────────────────────────┐
//! │            MediPOS Pharmacy            │  receipt header (or shop name)
//! │     123 Main Street, City, State       │
//! │            +1-234-567-8900             │
//! │              SALE RECEIPT              │
//! ├────────────────────────────────────────┤
//! │ Receipt ID:      a1b2c3d4              │  last 8 chars of the id
//! │ Date & Time:     2024-03-01 14:05      │
//! │ Customer:        Walk-in Customer      │
//! │ Payment Method:  CASH                  │
//! ├────────────────────────────────────────┤
//! │ Amoxicillin x3                  $30.00 │
//! ├────────────────────────────────────────┤
//! │ Subtotal:                       $30.00 │
//! │ Discount:                       -$3.00 │
//! │ Tax:                            +$1.35 │
//! │ TOTAL:                          $28.35 │
//! │ Received / Change (cash sales only)    │
//! ├────────────────────────────────────────┤
//! │      Thank you for your business!      │
//! └────────────────────────────────────────┘
//! ```
//!
//! Header and footer text may use `{{token}}` placeholders (see
//! [`crate::template`]). Everything placed in the HTML is escaped.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::settings::ShopSettings;
use crate::template::{escape_html, resolve, TemplateToken, TemplateValues};
use crate::types::{PaymentMethod, TransactionMode, TransactionOutcome, TransactionRequest};
use crate::workflow::Submission;

const PLAIN_WIDTH: usize = 40;
const GENERATED_BY: &str = "Generated by MediPOS System";
const RETURNED_NOTE: &str = "Items returned to inventory";

/// Last eight characters of an identifier.
pub fn short_id(id: &str) -> String {
    let count = id.chars().count();
    id.chars().skip(count.saturating_sub(8)).collect()
}

// =============================================================================
// Document
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptField {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub description: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalsLine {
    pub label: String,
    pub amount: String,
    #[serde(default)]
    pub emphasize: bool,
}

impl TotalsLine {
    fn new(label: &str, amount: String) -> Self {
        TotalsLine {
            label: label.to_string(),
            amount,
            emphasize: false,
        }
    }
}

/// A receipt with every value already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptDocument {
    pub mode: TransactionMode,
    pub title: String,
    pub address: String,
    pub phone: String,
    pub details: Vec<ReceiptField>,
    pub items: Vec<ReceiptItem>,
    pub totals: Vec<TotalsLine>,
    pub footer: Vec<String>,
}

impl ReceiptDocument {
    /// Builds the receipt for an accepted transaction.
    ///
    /// ## Errors
    /// `CoreError::Template` when the receipt header or footer contains an
    /// unknown or unterminated placeholder.
    pub fn build(
        submission: &Submission,
        outcome: &TransactionOutcome,
        settings: &ShopSettings,
        printed_at: DateTime<FixedOffset>,
    ) -> CoreResult<ReceiptDocument> {
        let mode = submission.mode();
        let method = submission.payment_method();
        let totals = &submission.totals;
        let date_time = settings.format_date_time(&printed_at);

        let values = receipt_values(submission, outcome, settings, &printed_at);
        let title = resolve(settings.receipt_title(), &values)?;
        let message = resolve(&settings.printer.receipt_footer, &values)?;

        let mut details = vec![
            field("Receipt ID", short_id(&outcome.id)),
            field("Date & Time", date_time),
            field("Customer", submission.customer_name.clone()),
        ];
        let method_label = match mode {
            TransactionMode::Sale => "Payment Method",
            TransactionMode::Return => "Refund Method",
        };
        details.push(field(method_label, method.as_str().to_uppercase()));
        if let TransactionRequest::Return(ret) = &submission.request {
            details.push(field("Return Reason", ret.reason.clone()));
            if !ret.original_sale_id.is_empty() {
                details.push(field("Original Sale ID", short_id(&ret.original_sale_id)));
            }
        }

        let items = submission
            .request
            .items()
            .iter()
            .map(|line| ReceiptItem {
                description: format!("{} x{}", line.medicine_name, line.quantity),
                amount: settings.format_currency(line.total_price),
            })
            .collect();

        let mut total_lines = vec![
            TotalsLine::new("Subtotal", settings.format_currency(totals.subtotal)),
            TotalsLine::new(
                "Discount",
                format!("-{}", settings.format_currency(totals.discount_amount)),
            ),
            TotalsLine::new("Tax", format!("+{}", settings.format_currency(totals.tax_amount))),
        ];
        let total_label = match mode {
            TransactionMode::Sale => "TOTAL",
            TransactionMode::Return => "REFUND TOTAL",
        };
        total_lines.push(TotalsLine {
            emphasize: true,
            ..TotalsLine::new(total_label, settings.format_currency(totals.total))
        });
        if mode == TransactionMode::Sale && method == PaymentMethod::Cash && !totals.received.is_zero() {
            total_lines.push(TotalsLine::new("Received", settings.format_currency(totals.received)));
            total_lines.push(TotalsLine::new("Change", settings.format_currency(totals.change)));
        }

        let mut footer = Vec::new();
        if !message.trim().is_empty() {
            footer.push(message);
        }
        footer.push(GENERATED_BY.to_string());
        if mode == TransactionMode::Return {
            footer.push(RETURNED_NOTE.to_string());
        }

        Ok(ReceiptDocument {
            mode,
            title,
            address: settings.general.shop_address.clone(),
            phone: settings.general.shop_phone.clone(),
            details,
            items,
            totals: total_lines,
            footer,
        })
    }

    pub fn heading(&self) -> &'static str {
        match self.mode {
            TransactionMode::Sale => "SALE RECEIPT",
            TransactionMode::Return => "RETURN RECEIPT",
        }
    }

    fn page_title(&self) -> &'static str {
        match self.mode {
            TransactionMode::Sale => "Sale Receipt",
            TransactionMode::Return => "Return Receipt",
        }
    }

    pub fn render_html(&self) -> String {
        let mut body = format!(
            "<div class=\"receipt-header\"><div class=\"receipt-title\">{}</div>\
             <div>{}</div><div>{}</div><div class=\"heading\">{}</div></div>",
            escape_html(&self.title),
            escape_html(&self.address),
            escape_html(&self.phone),
            self.heading()
        );

        body.push_str("<div class=\"receipt-details\">");
        for detail in &self.details {
            body.push_str(&format!(
                "<div><strong>{}:</strong> {}</div>",
                escape_html(&detail.label),
                escape_html(&detail.value)
            ));
        }
        body.push_str("</div>");

        body.push_str("<div class=\"receipt-items\"><div class=\"items-label\">Items:</div>");
        for item in &self.items {
            body.push_str(&format!(
                "<div class=\"row\"><span>{}</span><span>{}</span></div>",
                escape_html(&item.description),
                escape_html(&item.amount)
            ));
        }
        body.push_str("</div>");

        body.push_str("<div class=\"receipt-totals\">");
        for line in &self.totals {
            let class = if line.emphasize { "row grand-total" } else { "row" };
            body.push_str(&format!(
                "<div class=\"{}\"><span>{}:</span><span>{}</span></div>",
                class,
                escape_html(&line.label),
                escape_html(&line.amount)
            ));
        }
        body.push_str("</div>");

        body.push_str("<div class=\"receipt-footer\">");
        for line in &self.footer {
            body.push_str(&format!("<div>{}</div>", escape_html(line)));
        }
        body.push_str("</div>");

        html_shell(self.page_title(), &body)
    }

    /// Fixed-width text version for terminals and as a fallback.
    pub fn render_plain(&self) -> String {
        let rule = "-".repeat(PLAIN_WIDTH);
        let mut out = Vec::new();

        for line in [self.title.as_str(), self.address.as_str(), self.phone.as_str(), self.heading()] {
            if !line.trim().is_empty() {
                out.push(center(line));
            }
        }
        out.push(rule.clone());
        for detail in &self.details {
            out.push(format!("{}: {}", detail.label, detail.value));
        }
        out.push(rule.clone());
        for item in &self.items {
            out.push(columns(&item.description, &item.amount));
        }
        out.push(rule.clone());
        for line in &self.totals {
            out.push(columns(&format!("{}:", line.label), &line.amount));
        }
        out.push(rule);
        for line in &self.footer {
            out.push(center(line));
        }
        out.join("\n")
    }
}

/// A minimal text summary that needs no templates, for when the receipt
/// itself cannot be built.
pub fn fallback_summary(submission: &Submission, outcome: &TransactionOutcome, settings: &ShopSettings) -> String {
    let label = match submission.mode() {
        TransactionMode::Sale => "Sale",
        TransactionMode::Return => "Return",
    };
    format!(
        "{} {} for {}: {} ({} items, {})",
        label,
        short_id(&outcome.id),
        submission.customer_name,
        settings.format_currency(submission.totals.total),
        submission.request.items().len(),
        submission.payment_method().as_str().to_uppercase()
    )
}

fn receipt_values(
    submission: &Submission,
    outcome: &TransactionOutcome,
    settings: &ShopSettings,
    printed_at: &DateTime<FixedOffset>,
) -> TemplateValues {
    let general = &settings.general;
    TemplateValues::new()
        .with(TemplateToken::ClinicName, general.shop_name.clone())
        .with(TemplateToken::ClinicAddress, general.shop_address.clone())
        .with(TemplateToken::ClinicPhone, general.shop_phone.clone())
        .with(TemplateToken::ClinicEmail, general.shop_email.clone())
        .with(TemplateToken::ShopLicense, general.shop_license.clone())
        .with(TemplateToken::ReceiptId, short_id(&outcome.id))
        .with(TemplateToken::ReceiptDate, settings.format_date(printed_at))
        .with(TemplateToken::ReceiptTime, settings.format_time(printed_at))
        .with(TemplateToken::CustomerName, submission.customer_name.clone())
        .with(
            TemplateToken::PaymentMethod,
            submission.payment_method().as_str().to_uppercase(),
        )
        .with(
            TemplateToken::TotalAmount,
            settings.format_currency(submission.totals.total),
        )
}

fn field(label: &str, value: String) -> ReceiptField {
    ReceiptField {
        label: label.to_string(),
        value,
    }
}

fn center(text: &str) -> String {
    let len = text.chars().count();
    let pad = PLAIN_WIDTH.saturating_sub(len) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

fn columns(left: &str, right: &str) -> String {
    let used = left.chars().count() + right.chars().count();
    let gap = PLAIN_WIDTH.saturating_sub(used).max(1);
    format!("{}{}{}", left, " ".repeat(gap), right)
}

fn html_shell(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8"/>
<title>{}</title>
<style>
body {{ font-family: 'Courier New', monospace; margin: 0; padding: 20px; line-height: 1.4; font-size: 12px; }}
.receipt-header {{ text-align: center; border-bottom: 2px solid #000; padding-bottom: 10px; margin-bottom: 15px; }}
.receipt-title {{ font-size: 18px; font-weight: bold; margin-bottom: 5px; }}
.heading {{ margin-top: 10px; }}
.receipt-details {{ margin-bottom: 15px; }}
.receipt-items {{ border-bottom: 1px solid #000; padding-bottom: 10px; margin-bottom: 10px; }}
.items-label {{ font-weight: bold; margin-bottom: 5px; }}
.row {{ display: flex; justify-content: space-between; margin-bottom: 3px; }}
.grand-total {{ font-weight: bold; font-size: 14px; border-top: 1px solid #000; padding-top: 5px; }}
.receipt-footer {{ text-align: center; margin-top: 20px; font-style: italic; }}
@media print {{ body {{ margin: 0; padding: 10px; }} }}
</style>
</head>
<body>{}</body>
</html>"#,
        escape_html(title),
        body
    )
}
