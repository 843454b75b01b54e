//! # Client Error Types
//!
//! Error types for backend calls, configuration and receipt output.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Client Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Backend             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  Server {status,detail} │ │
//! │  │  InvalidUrl     │  │                 │  │  Deserialization        │ │
//! │  │  ConfigLoad/Save│  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │  Receipt Output │  │     Domain      │                              │
//! │  │                 │  │                 │                              │
//! │  │  ReceiptOutput  │  │  Core(CoreError)│                              │
//! │  │  Io             │  │                 │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use medipos_core::CoreError;
use thiserror::Error;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid client configuration.
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    /// Backend URL that does not parse or is not http(s).
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// The request never produced a response.
    #[error("{message}")]
    Connection { url: String, message: String },

    // =========================================================================
    // Backend Errors
    // =========================================================================
    /// Non-success HTTP status. `detail` is the backend's `{"detail": ...}`.
    #[error("Server returned HTTP {status}{}", detail_suffix(.detail))]
    Server { status: u16, detail: Option<String> },

    /// Response body did not match the expected shape.
    #[error("Invalid response from {endpoint}: {message}")]
    Deserialization { endpoint: String, message: String },

    // =========================================================================
    // Output Errors
    // =========================================================================
    /// Receipt or prescription could not be written.
    #[error("Receipt output failed: {0}")]
    ReceiptOutput(String),

    /// File system error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // =========================================================================
    // Domain Errors
    // =========================================================================
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ClientError {
    /// Text shown to the operator.
    ///
    /// The backend's own detail wins when it sent one, so messages such as
    /// "Insufficient stock for Paracetamol" reach the screen unchanged.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Server {
                detail: Some(detail),
                ..
            } => detail.clone(),
            ClientError::Server {
                status,
                detail: None,
            } => status_message(*status),
            ClientError::Connection { message, .. } => message.clone(),
            ClientError::Core(err) => err.to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the backend was reached at all.
    pub fn is_connection(&self) -> bool {
        matches!(self, ClientError::Connection { .. })
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

/// Generic text for a status the backend sent without a detail.
pub(crate) fn status_message(status: u16) -> String {
    match status {
        400 => "The server rejected the request".to_string(),
        401 => "Session expired, please sign in again".to_string(),
        403 => "Not allowed to perform this action".to_string(),
        404 => "Requested record not found".to_string(),
        s if s >= 500 => format!("Pharmacy server error (HTTP {s})"),
        s => format!("Unexpected response from pharmacy server (HTTP {s})"),
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ClientError {
    fn from(err: toml::ser::Error) -> Self {
        ClientError::ConfigSaveFailed(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}
