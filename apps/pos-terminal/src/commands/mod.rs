//! # Operator Commands
//!
//! One input line is one command: a key gesture, typed text, or a pointer
//! action the graphical screen would do with a click.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (parsing)
//! ├── session.rs   ◄─── Keys, typing and clicks applied to the session
//! └── document.rs  ◄─── Prescription files
//! ```
//!
//! ## Grammar
//! ```text
//! ┌──────────────────────────┬──────────────────────────────────────────────┐
//! │  F2, ctrl+enter, esc ... │  a key gesture (see `help`)                  │
//! │  type <text>             │  types each character into the focused field │
//! │  pick <n>                │  clicks row n of the search results          │
//! │  edit|inc|dec|rm <id>    │  quantity edit / +1 / -1 / remove on a line  │
//! │  customer <id>           │  selects a customer                          │
//! │  walkin                  │  clears the customer                         │
//! │  replay <sale id>        │  loads a previous sale into the cart         │
//! │  pay <method>            │  cash | card | upi | credit                  │
//! │  discount <kind>         │  percentage | flat                           │
//! │  focus <field>           │  search | discount | received | customer |   │
//! │                          │  reason | reference                          │
//! │  rx <file.json>          │  prints a prescription                       │
//! │  refresh                 │  re-fetches the stock list                   │
//! │  help | show | quit      │                                              │
//! └──────────────────────────┴──────────────────────────────────────────────┘
//! ```

pub mod document;
pub mod session;

use std::path::PathBuf;

use medipos_core::workflow::Focus;
use medipos_core::{DiscountKind, KeyInput, PaymentMethod};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Key(KeyInput),
    Type(String),
    /// 1-based row of the search overlay.
    Pick(usize),
    Edit(String),
    Increment(String),
    Decrement(String),
    Remove(String),
    Customer(String),
    WalkIn,
    Replay(String),
    Pay(PaymentMethod),
    Discount(DiscountKind),
    Focus(Focus),
    Prescription(PathBuf),
    Refresh,
    Show,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, AppError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Command::Show);
        }

        // `tail` is everything after the single separator character.
        let (word, tail) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = tail.trim();

        let command = match word.to_lowercase().as_str() {
            "type" => Command::Type(required(word, tail)?.to_string()),
            "pick" => {
                let row = required(word, rest)?
                    .parse::<usize>()
                    .ok()
                    .filter(|row| *row > 0)
                    .ok_or_else(|| AppError::validation(format!("Not a row number: {rest}")))?;
                Command::Pick(row)
            }
            "edit" => Command::Edit(required(word, rest)?.to_string()),
            "inc" => Command::Increment(required(word, rest)?.to_string()),
            "dec" => Command::Decrement(required(word, rest)?.to_string()),
            "rm" | "remove" => Command::Remove(required(word, rest)?.to_string()),
            "customer" => Command::Customer(required(word, rest)?.to_string()),
            "walkin" => Command::WalkIn,
            "replay" => Command::Replay(required(word, rest)?.to_string()),
            "pay" => Command::Pay(required(word, rest)?.parse()?),
            "discount" => Command::Discount(required(word, rest)?.parse()?),
            "focus" => Command::Focus(parse_focus(required(word, rest)?)?),
            "rx" => Command::Prescription(PathBuf::from(required(word, rest)?)),
            "refresh" => Command::Refresh,
            "show" => Command::Show,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => {
                let key = line
                    .parse::<KeyInput>()
                    .map_err(|_| AppError::invalid_command(format!("Unknown command: {line}")))?;
                Command::Key(key)
            }
        };
        Ok(command)
    }
}

fn required<'a>(command: &str, arg: &'a str) -> Result<&'a str, AppError> {
    if arg.is_empty() {
        Err(AppError::validation(format!("{command} needs an argument")))
    } else {
        Ok(arg)
    }
}

fn parse_focus(name: &str) -> Result<Focus, AppError> {
    match name.to_lowercase().as_str() {
        "search" => Ok(Focus::Search),
        "discount" => Ok(Focus::Discount),
        "received" => Ok(Focus::Received),
        "customer" => Ok(Focus::CustomerSearch),
        "reason" => Ok(Focus::ReturnReason),
        "reference" | "original" => Ok(Focus::OriginalReference),
        "none" => Ok(Focus::None),
        other => Err(AppError::validation(format!("Unknown field: {other}"))),
    }
}

/// Operator help: commands followed by the shortcut table.
pub fn help_text() -> String {
    format!(
        "Commands: type <text>, pick <n>, edit|inc|dec|rm <item id>, customer <id>, walkin,\n\
         replay <sale id>, pay <method>, discount <kind>, focus <field>, rx <file>,\n\
         refresh, show, help, quit. Anything else is read as a key.\n\n{}",
        medipos_core::workflow::keyboard::shortcut_help()
    )
}
