//! # Standardized Error Types
//!
//! Error taxonomy shared by the sandbox crates. Service-specific error enums
//! implement [`ServiceError`] so the HTTP layer, the logger and the
//! monitoring client can classify them uniformly.

use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A type alias for Result with the error type defaulting to our Error
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The severity level of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// A failed operation
    Error,
    /// The process cannot continue
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Error
    }
}

/// Categorizes different kinds of errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Arithmetic fault such as division by zero
    Arithmetic,
    /// A value outside what the operation accepts
    Value,
    /// Failure detected while running an operation
    Runtime,
    /// Anything not covered by a more specific kind
    Generic,
    /// Invalid or unreadable configuration
    Configuration,
    /// Internal server error
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Arithmetic => write!(f, "Arithmetic Error"),
            ErrorKind::Value => write!(f, "Value Error"),
            ErrorKind::Runtime => write!(f, "Runtime Error"),
            ErrorKind::Generic => write!(f, "Error"),
            ErrorKind::Configuration => write!(f, "Configuration Error"),
            ErrorKind::Internal => write!(f, "Internal Server Error"),
        }
    }
}

/// Core error type for the shared crates
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub severity: Severity,
    cause: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the specified kind and message
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
            severity: Severity::default(),
            cause: None,
        }
    }

    /// Sets the error severity
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.kind, self.message)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_ref().map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        let message = format!("Configuration error: {}", err);
        Self {
            cause: Some(Box::new(err)),
            ..Self::new(ErrorKind::Configuration, message)
        }
    }
}

/// A trait for service-specific error types
pub trait ServiceError: StdError + Send + Sync + 'static {
    /// The taxonomy bucket of this error
    fn kind(&self) -> ErrorKind;

    /// The error's severity level
    fn severity(&self) -> Severity {
        Severity::Error
    }
}

/// JSON body returned to HTTP callers when a request fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new<S: Into<String>>(code: u16, error: S) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }

    /// Generic body for 500 responses. Never carries internal details.
    pub fn internal() -> Self {
        Self::new(500, ErrorKind::Internal.to_string())
    }
}
