//! # Terminal Error Type
//!
//! What the operator sees when a command fails.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  input line                                                             │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  Command::parse ── unknown command ─────────────────┐                   │
//! │      │                                              │                   │
//! │      ▼                                              ▼                   │
//! │  client / core call ── ClientError / CoreError ──► AppError ──► prompt  │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  notices ─────────────────────────────────────────────────────► prompt  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rejections that happen inside the session (stock, payment, empty cart)
//! are not errors here: they come back as notices.

use medipos_client::ClientError;
use medipos_core::{CoreError, ValidationError};
use serde::Serialize;

/// ```json
/// { "code": "INVALID_COMMAND", "message": "Unknown command: frobnicate" }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input line not understood
    InvalidCommand,

    /// Input validation failed
    ValidationError,

    /// Client configuration unusable
    ConfigError,

    /// Backend unreachable
    ConnectionError,

    /// Backend answered with an error
    ServerError,

    /// Receipt or prescription could not be written
    OutputError,

    /// Business rule refused the action
    BusinessLogic,

    /// Anything else
    Internal,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_command(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::InvalidCommand, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::ValidationError, message)
    }
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        let code = match &err {
            ClientError::InvalidConfig(_)
            | ClientError::InvalidUrl(_)
            | ClientError::ConfigLoadFailed(_)
            | ClientError::ConfigSaveFailed(_) => ErrorCode::ConfigError,
            ClientError::Connection { .. } => ErrorCode::ConnectionError,
            ClientError::Server { .. } | ClientError::Deserialization { .. } => {
                ErrorCode::ServerError
            }
            ClientError::ReceiptOutput(_) | ClientError::Io(_) => ErrorCode::OutputError,
            ClientError::Core(CoreError::Validation(_)) => ErrorCode::ValidationError,
            ClientError::Core(_) => ErrorCode::BusinessLogic,
        };
        AppError::new(code, err.user_message())
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => e.into(),
            other => AppError::new(ErrorCode::BusinessLogic, other.to_string()),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::validation(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::new(ErrorCode::Internal, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_detail_reaches_operator() {
        let err: AppError = ClientError::Server {
            status: 400,
            detail: Some("Insufficient stock for Amoxicillin".to_string()),
        }
        .into();
        assert_eq!(err.code, ErrorCode::ServerError);
        assert_eq!(err.message, "Insufficient stock for Amoxicillin");
    }

    #[test]
    fn test_connection_code() {
        let err: AppError = ClientError::Connection {
            url: "http://localhost:8001/".to_string(),
            message: "Cannot reach the pharmacy server at http://localhost:8001/".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::ConnectionError);
    }

    #[test]
    fn test_serializes_screaming_code() {
        let err = AppError::invalid_command("Unknown command: frobnicate");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "INVALID_COMMAND");
        assert_eq!(json["message"], "Unknown command: frobnicate");
    }
}
