//! # Error Handling
//!
//! Shared error handling for the Sentry sandbox service:
//!
//! - Error taxonomy (kind and severity) used to classify every failure
//! - The `ServiceError` trait implemented by service-specific error enums
//! - Structured context objects attached to errors and monitoring events
//! - The JSON body returned to HTTP callers on failure
//! - Structured logging initialisation
//!

pub mod types;
pub mod context;
pub mod logging;

pub use types::{Error, ErrorKind, ErrorResponse, Result, ServiceError, Severity};
pub use context::Context;
pub use logging::{init_logging, log_service_error, LoggingConfig, LoggingGuard};
