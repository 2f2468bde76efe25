//! Sandbox endpoints. Each one exercises a single reporting mode of the
//! monitoring client and touches no state shared between requests.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse},
    Json,
};
use error_handling::{Context, ErrorResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{divide, SandboxError};
use crate::monitor::{run_traced, Breadcrumb, Level, SpanPlan, UserInfo};
use crate::SandboxApp;

pub const INDEX: &str = "/";
pub const ERROR: &str = "/error/";
pub const UNHANDLED: &str = "/unhandled/";
pub const CAPTURE: &str = "/capture/";
pub const MESSAGE: &str = "/message/";
pub const CONTEXT: &str = "/context/";
pub const TRANSACTION: &str = "/transaction/";
pub const SUCCESS: &str = "/success/";

pub const UNHANDLED_MESSAGE: &str = "This is an unhandled test exception from the Sentry sandbox!";
pub const CAPTURED_MESSAGE: &str = "This is a manually captured exception";
pub const TEST_MESSAGE: &str = "Test message from the Sentry sandbox!";
pub const CONTEXT_ERROR_MESSAGE: &str = "Test error with rich context!";

pub const TRANSACTION_NAME: &str = "sandbox-performance-test";
pub const TRANSACTION_OP: &str = "test";

/// Simulated work inside the performance transaction
pub const SIMULATED_SPANS: [SpanPlan; 3] = [
    SpanPlan {
        op: "db",
        description: "fetch_user_data",
        delay: Duration::from_millis(100),
    },
    SpanPlan {
        op: "http",
        description: "external_api_call",
        delay: Duration::from_millis(200),
    },
    SpanPlan {
        op: "process",
        description: "data_processing",
        delay: Duration::from_millis(50),
    },
];

/// Listed on the index page, in display order
pub const ENDPOINTS: [(&str, &str); 7] = [
    (ERROR, "Triggers a basic <code>division by zero</code> error"),
    (UNHANDLED, "Triggers an unhandled value error"),
    (CAPTURE, "Manually captures an error using <code>capture_error</code>"),
    (MESSAGE, "Sends a custom message using <code>capture_message</code>"),
    (CONTEXT, "Error with custom context, tags, and user info"),
    (TRANSACTION, "Creates a performance transaction with spans"),
    (SUCCESS, "A successful endpoint (no errors) for baseline testing"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub status: String,
    pub transaction_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub status: String,
    pub message: String,
    pub sentry_dsn_configured: bool,
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Sentry Sandbox</title>
    <style>
        body { font-family: Arial, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; }
        h1 { color: #362d59; }
        .endpoint { margin: 15px 0; padding: 15px; background: #f5f5f5; border-radius: 5px; }
        a { color: #6c5ce7; text-decoration: none; font-weight: bold; }
        a:hover { text-decoration: underline; }
        code { background: #e0e0e0; padding: 2px 6px; border-radius: 3px; }
        .description { color: #666; margin-top: 5px; }
    </style>
</head>
<body>
    <h1>Sentry Sandbox</h1>
    <p>Use these endpoints to test your Sentry integration:</p>
"#;

const PAGE_FOOT: &str = r#"
    <hr style="margin: 30px 0;">
    <p><strong>Setup:</strong> Make sure to set your <code>SENTRY_DSN</code> environment variable!</p>
</body>
</html>
"#;

pub fn render_index() -> String {
    let links: String = ENDPOINTS
        .iter()
        .map(|(path, description)| {
            format!(
                "\n    <div class=\"endpoint\">\n        <a href=\"{path}\">{path}</a>\n        <div class=\"description\">{description}</div>\n    </div>\n"
            )
        })
        .collect();

    format!("{PAGE_HEAD}{links}{PAGE_FOOT}")
}

/// GET / - Listing page
pub async fn index() -> Html<String> {
    Html(render_index())
}

/// GET /error/ - Divides by zero and lets the error escape
pub async fn trigger_error() -> Result<Html<&'static str>, SandboxError> {
    let _quotient = divide(1, 0)?;
    Ok(Html("This will never be reached"))
}

/// GET /unhandled/
pub async fn unhandled_exception() -> Result<Html<&'static str>, SandboxError> {
    Err(SandboxError::InvalidValue(UNHANDLED_MESSAGE.to_string()))
}

/// GET /capture/ - Reports a caught error and answers normally
pub async fn capture_exception(State(app): State<Arc<SandboxApp>>) -> Json<StatusResponse> {
    let error = SandboxError::Runtime(CAPTURED_MESSAGE.to_string());
    let event_id = app.monitor().capture_error(&error, true);
    tracing::info!(%event_id, error = %error, "Captured handled error");

    Json(StatusResponse::new("Exception captured and sent to Sentry"))
}

/// GET /message/
pub async fn capture_message(State(app): State<Arc<SandboxApp>>) -> Json<StatusResponse> {
    let event_id = app.monitor().capture_message(TEST_MESSAGE, Level::Info);
    tracing::info!(%event_id, "Captured message");

    Json(StatusResponse::new("Message sent to Sentry"))
}

/// GET /context/ - Enriches the request scope, then lets an error escape
pub async fn error_with_context(
    State(app): State<Arc<SandboxApp>>,
) -> Result<Html<&'static str>, SandboxError> {
    let monitor = app.monitor();

    monitor.set_user(UserInfo {
        id: Some("test-user-123".to_string()),
        email: Some("test@example.com".to_string()),
        username: Some("sandbox_tester".to_string()),
    });

    monitor.set_tag("test_type", "context_test");
    monitor.set_tag("sandbox", "true");

    monitor.set_context(
        Context::new("test_data")
            .add("request_id", "abc-123-xyz")
            .add("feature_flags", ["new_ui", "beta_api"])
            .add(
                "user_preferences",
                json!({
                    "theme": "dark",
                    "notifications": true,
                }),
            ),
    );

    monitor.add_breadcrumb(Breadcrumb {
        category: "test".to_string(),
        message: "About to trigger test error with context".to_string(),
        level: Level::Info,
    });

    Err(SandboxError::Unexpected(CONTEXT_ERROR_MESSAGE.to_string()))
}

/// GET /transaction/ - Traced run of the simulated spans
pub async fn performance_transaction(
    State(app): State<Arc<SandboxApp>>,
) -> Json<TransactionResponse> {
    let transaction_id = run_traced(
        app.monitor(),
        TRANSACTION_NAME,
        TRANSACTION_OP,
        &SIMULATED_SPANS,
    )
    .await;

    Json(TransactionResponse {
        status: "Performance transaction completed".to_string(),
        transaction_id,
    })
}

/// GET /success/ - Baseline, never reports anything
pub async fn success_endpoint(State(app): State<Arc<SandboxApp>>) -> Json<SuccessResponse> {
    Json(SuccessResponse {
        status: "success".to_string(),
        message: "This endpoint works correctly!".to_string(),
        sentry_dsn_configured: app.monitor().is_configured(),
    })
}

pub async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(
            StatusCode::NOT_FOUND.as_u16(),
            format!("No route for {}", uri.path()),
        )),
    )
}
