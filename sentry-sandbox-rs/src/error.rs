//! Errors raised by the sandbox endpoints.
//!
//! Handlers that let an error escape return `Err(SandboxError)`; the
//! `IntoResponse` impl turns it into a generic 500 and tags the response so
//! the router middleware can report it as unhandled.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use error_handling::{ErrorKind, ErrorResponse, ServiceError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("attempt to divide {0} by zero")]
    DivisionByZero(u32),

    #[error("{0}")]
    InvalidValue(String),

    #[error("{0}")]
    Runtime(String),

    #[error("{0}")]
    Unexpected(String),
}

impl ServiceError for SandboxError {
    fn kind(&self) -> ErrorKind {
        match self {
            SandboxError::DivisionByZero(_) => ErrorKind::Arithmetic,
            SandboxError::InvalidValue(_) => ErrorKind::Value,
            SandboxError::Runtime(_) => ErrorKind::Runtime,
            SandboxError::Unexpected(_) => ErrorKind::Generic,
        }
    }
}

/// Response extension marking an error that escaped its handler
#[derive(Debug, Clone)]
pub struct UnhandledError(pub Arc<SandboxError>);

impl IntoResponse for SandboxError {
    fn into_response(self) -> Response {
        let mut response = (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::internal()),
        )
            .into_response();
        response.extensions_mut().insert(UnhandledError(Arc::new(self)));
        response
    }
}

/// Unsigned division; a zero divisor is its only failure
pub fn divide(numerator: u32, divisor: u32) -> Result<u32, SandboxError> {
    numerator
        .checked_div(divisor)
        .ok_or(SandboxError::DivisionByZero(numerator))
}
