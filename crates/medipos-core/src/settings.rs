//! # Shop Settings
//!
//! The shop-wide settings document served by `GET /settings`, plus the
//! display formatting derived from it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       ShopSettings                                      │
//! │                                                                         │
//! │  general ──────► shop identity, currency symbol, default tax rate,     │
//! │                  decimal places, date / time formats                   │
//! │  printer ──────► receipt header / footer, auto-print                   │
//! │  opd_paper ────► prescription page layout, custom template             │
//! │                                                                         │
//! │  Passed explicitly to the cart (tax rate), the totals calculator       │
//! │  (precision) and the receipt / prescription renderers.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every field has a default, so a partial document from the backend (or no
//! document at all) still yields usable settings.

use chrono::{DateTime, TimeZone};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::{Money, Precision};
use crate::types::TaxRate;

// =============================================================================
// Settings Document
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopSettings {
    pub general: GeneralSettings,
    pub printer: PrinterSettings,
    pub opd_paper: OpdPaperSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    pub shop_name: String,
    pub shop_address: String,
    pub shop_phone: String,
    pub shop_email: String,
    pub shop_license: String,
    pub currency_symbol: String,
    /// Percentage applied to every new cart.
    pub default_tax_rate: Decimal,
    pub decimal_places: u32,
    /// One of `YYYY-MM-DD`, `DD/MM/YYYY`, `MM/DD/YYYY`, `DD-MM-YYYY`.
    pub date_format: String,
    /// `"12"` or `"24"`.
    pub time_format: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        GeneralSettings {
            shop_name: "MediPOS Pharmacy".to_string(),
            shop_address: "123 Main Street, City, State, ZIP".to_string(),
            shop_phone: "+1-234-567-8900".to_string(),
            shop_email: "info@medipos.com".to_string(),
            shop_license: "PH-2024-001".to_string(),
            currency_symbol: "$".to_string(),
            default_tax_rate: Decimal::new(10, 0),
            decimal_places: 2,
            date_format: "YYYY-MM-DD".to_string(),
            time_format: "24".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterSettings {
    pub receipt_header: String,
    pub receipt_footer: String,
    pub auto_print_receipts: bool,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        PrinterSettings {
            receipt_header: "MediPOS Pharmacy".to_string(),
            receipt_footer: "Thank you for your business!".to_string(),
            auto_print_receipts: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpdPaperSettings {
    pub paper_size: String,
    pub margin_top: u32,
    pub margin_bottom: u32,
    pub margin_left: u32,
    pub margin_right: u32,
    pub font_size: u32,
    pub font_family: String,
    pub show_medical_history: bool,
    pub watermark_text: String,
    pub print_instructions: String,
    /// When set, `custom_html` replaces the built-in prescription layout.
    pub custom_html_enabled: bool,
    pub custom_html: String,
    pub custom_css: String,
}

impl Default for OpdPaperSettings {
    fn default() -> Self {
        OpdPaperSettings {
            paper_size: "A4".to_string(),
            margin_top: 20,
            margin_bottom: 20,
            margin_left: 20,
            margin_right: 20,
            font_size: 12,
            font_family: "Arial".to_string(),
            show_medical_history: true,
            watermark_text: String::new(),
            print_instructions: "Please follow doctor's instructions carefully".to_string(),
            custom_html_enabled: false,
            custom_html: String::new(),
            custom_css: String::new(),
        }
    }
}

// =============================================================================
// Date / Time Formats
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    YearMonthDay,
    DaySlashMonth,
    MonthSlashDay,
    DayDashMonth,
}

impl DateFormat {
    /// Unknown values fall back to `YYYY-MM-DD`.
    pub fn from_setting(raw: &str) -> Self {
        match raw.trim() {
            "DD/MM/YYYY" => DateFormat::DaySlashMonth,
            "MM/DD/YYYY" => DateFormat::MonthSlashDay,
            "DD-MM-YYYY" => DateFormat::DayDashMonth,
            _ => DateFormat::YearMonthDay,
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            DateFormat::YearMonthDay => "%Y-%m-%d",
            DateFormat::DaySlashMonth => "%d/%m/%Y",
            DateFormat::MonthSlashDay => "%m/%d/%Y",
            DateFormat::DayDashMonth => "%d-%m-%Y",
        }
    }
}

// =============================================================================
// Formatting
// =============================================================================

impl ShopSettings {
    pub fn precision(&self) -> Precision {
        Precision::new(self.general.decimal_places)
    }

    pub fn default_tax_rate(&self) -> TaxRate {
        TaxRate::from_percent(self.general.default_tax_rate)
    }

    /// Symbol followed by the fixed-point amount: `$28.35`, `$-5.00`.
    ///
    /// ```rust
    /// use medipos_core::money::Money;
    /// use medipos_core::settings::ShopSettings;
    ///
    /// let settings = ShopSettings::default();
    /// assert_eq!(settings.format_currency(Money::new(2835, 2)), "$28.35");
    /// assert_eq!(settings.format_currency(Money::new(-5, 0)), "$-5.00");
    /// ```
    pub fn format_currency(&self, amount: Money) -> String {
        format!(
            "{}{}",
            self.general.currency_symbol,
            amount.to_fixed(self.precision())
        )
    }

    pub fn format_number(&self, value: Decimal) -> String {
        Money::from_decimal(value).to_fixed(self.precision())
    }

    /// Percentages use one decimal place fewer than amounts.
    pub fn format_percentage(&self, value: Decimal) -> String {
        let places = self.general.decimal_places.saturating_sub(1).min(Precision::MAX);
        let rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
        format!("{:.*}%", places as usize, rounded)
    }

    pub fn date_format(&self) -> DateFormat {
        DateFormat::from_setting(&self.general.date_format)
    }

    pub fn uses_12_hour_clock(&self) -> bool {
        self.general.time_format.trim() == "12"
    }

    pub fn format_date<Tz>(&self, at: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        at.format(self.date_format().pattern()).to_string()
    }

    /// `14:05` or `2:05 PM` depending on the time format setting.
    pub fn format_time<Tz>(&self, at: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        if self.uses_12_hour_clock() {
            at.format("%-I:%M %p").to_string()
        } else {
            at.format("%H:%M").to_string()
        }
    }

    pub fn format_date_time<Tz>(&self, at: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        format!("{} {}", self.format_date(at), self.format_time(at))
    }

    /// Header line for receipts: the printer header, or the shop name when
    /// the header is blank.
    pub fn receipt_title(&self) -> &str {
        let header = self.printer.receipt_header.trim();
        if header.is_empty() {
            &self.general.shop_name
        } else {
            header
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = ShopSettings::default();
        assert_eq!(settings.general.shop_name, "MediPOS Pharmacy");
        assert_eq!(settings.precision(), Precision::new(2));
        assert_eq!(settings.default_tax_rate().percent(), Decimal::new(10, 0));
        assert_eq!(settings.printer.receipt_footer, "Thank you for your business!");
        assert_eq!(settings.opd_paper.margin_left, 20);
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let json = r#"{
            "id": "settings-1",
            "general": { "currency_symbol": "₹", "decimal_places": 3 },
            "telegram": { "enabled": false }
        }"#;
        let settings: ShopSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.general.currency_symbol, "₹");
        assert_eq!(settings.general.shop_name, "MediPOS Pharmacy");
        assert_eq!(settings.format_currency(Money::new(5, 1)), "₹0.500");
        assert_eq!(settings.printer, PrinterSettings::default());
    }

    #[test]
    fn test_format_currency_negative_keeps_symbol_first() {
        let settings = ShopSettings::default();
        assert_eq!(settings.format_currency(Money::new(-5, 0)), "$-5.00");
        assert_eq!(settings.format_currency(Money::zero()), "$0.00");
    }

    #[test]
    fn test_format_number_and_percentage() {
        let settings = ShopSettings::default();
        assert_eq!(settings.format_number(Decimal::new(3, 0)), "3.00");
        assert_eq!(settings.format_percentage(Decimal::new(125, 1)), "12.5%");
        assert_eq!(settings.format_percentage(Decimal::new(10, 0)), "10.0%");

        let mut whole = ShopSettings::default();
        whole.general.decimal_places = 0;
        assert_eq!(whole.format_percentage(Decimal::new(125, 1)), "13%");
    }

    #[test]
    fn test_date_formats() {
        let mut settings = ShopSettings::default();
        assert_eq!(settings.format_date(&at()), "2024-03-05");

        settings.general.date_format = "DD/MM/YYYY".to_string();
        assert_eq!(settings.format_date(&at()), "05/03/2024");

        settings.general.date_format = "MM/DD/YYYY".to_string();
        assert_eq!(settings.format_date(&at()), "03/05/2024");

        settings.general.date_format = "DD-MM-YYYY".to_string();
        assert_eq!(settings.format_date(&at()), "05-03-2024");

        settings.general.date_format = "nonsense".to_string();
        assert_eq!(settings.format_date(&at()), "2024-03-05");
    }

    #[test]
    fn test_time_formats() {
        let mut settings = ShopSettings::default();
        assert_eq!(settings.format_time(&at()), "14:07");
        assert_eq!(settings.format_date_time(&at()), "2024-03-05 14:07");

        settings.general.time_format = "12".to_string();
        assert_eq!(settings.format_time(&at()), "2:07 PM");
    }

    #[test]
    fn test_receipt_title_falls_back_to_shop_name() {
        let mut settings = ShopSettings::default();
        settings.printer.receipt_header = "Corner Chemist".to_string();
        assert_eq!(settings.receipt_title(), "Corner Chemist");

        settings.printer.receipt_header = "  ".to_string();
        assert_eq!(settings.receipt_title(), "MediPOS Pharmacy");
    }
}
