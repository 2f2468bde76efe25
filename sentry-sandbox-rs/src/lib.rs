//! # Sentry Sandbox
//!
//! HTTP endpoints that each drive one reporting mode of the error-monitoring
//! client: escaped errors, captured errors, messages, scope enrichment and
//! performance transactions.

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use error_handling::{log_service_error, ErrorResponse};
use sentry::integrations::tower::{NewSentryLayer, SentryHttpLayer};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod handlers;
pub mod monitor;

pub use error::{SandboxError, UnhandledError};
pub use monitor::{Monitor, RecordingMonitor, SentryMonitor};

/// Shared application state
pub struct SandboxApp {
    monitor: Arc<dyn Monitor>,
}

impl SandboxApp {
    pub fn new(monitor: Arc<dyn Monitor>) -> Self {
        Self { monitor }
    }

    pub fn monitor(&self) -> &dyn Monitor {
        self.monitor.as_ref()
    }

    /// Create the Axum router with all routes and middleware
    pub fn create_router(self: Arc<Self>) -> Router {
        Router::new()
            .route(handlers::INDEX, get(handlers::index))
            .route(handlers::ERROR, get(handlers::trigger_error))
            .route(handlers::UNHANDLED, get(handlers::unhandled_exception))
            .route(handlers::CAPTURE, get(handlers::capture_exception))
            .route(handlers::MESSAGE, get(handlers::capture_message))
            .route(handlers::CONTEXT, get(handlers::error_with_context))
            .route(handlers::TRANSACTION, get(handlers::performance_transaction))
            .route(handlers::SUCCESS, get(handlers::success_endpoint))
            .fallback(handlers::not_found)
            .layer(middleware::from_fn_with_state(self.clone(), report_unhandled))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TraceLayer::new_for_http())
            // Outermost: a fresh hub per request, then request data on every event
            .layer(
                ServiceBuilder::new()
                    .layer(NewSentryLayer::<Request>::new_from_top())
                    .layer(SentryHttpLayer::with_transaction()),
            )
            .with_state(self)
    }
}

/// Reports errors that escaped their handler, on the request's own hub
async fn report_unhandled(
    State(app): State<Arc<SandboxApp>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    if let Some(UnhandledError(error)) = response.extensions().get::<UnhandledError>() {
        log_service_error(error.as_ref());
        let event_id = app.monitor().capture_error(error, false);
        tracing::warn!(%method, %path, %event_id, "Unhandled error reported");
    }

    response
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    tracing::error!(panic = detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::internal()),
    )
        .into_response()
}
