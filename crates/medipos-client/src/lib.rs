//! # medipos-client: Backend Client for the MediPOS Workstation
//!
//! Everything the POS screen does that is not pure logic: REST calls to the
//! pharmacy backend, client configuration, receipt output and the effect
//! runner that ties them to the session.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Dispatcher (effect runner)                         │
//! │                                                                         │
//! │   KeyInput ──► SharedSession ──► medipos_core::dispatch ──► Effects     │
//! │                                                               │         │
//! │         ┌─────────────────────┬───────────────────────────────┤         │
//! │         ▼                     ▼                               ▼         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ PosApi         │  │ ReceiptSink    │  │ Session updates        │    │
//! │  │ (HttpPosApi)   │  │ (HTML files)   │  │ finish_success/failure │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`api`] - `PosApi` trait and the reqwest implementation
//! - [`config`] - `ClientConfig` (defaults, client.toml, environment)
//! - [`dispatcher`] - Runs effects, submits, prints receipts
//! - [`session`] - Mutex-guarded session shared with spawned tasks
//! - [`sink`] - Receipt and prescription output
//! - [`error`] - Client error types

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod session;
pub mod sink;

pub use api::{HttpPosApi, PosApi};
pub use config::ClientConfig;
pub use dispatcher::{partition, Dispatcher};
pub use error::{ClientError, ClientResult};
pub use session::SharedSession;
pub use sink::{FileReceiptSink, ReceiptSink};
