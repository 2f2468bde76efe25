use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use error_handling::{ErrorKind, ErrorResponse};
use sentry::protocol::{Context as SentryContext, EnvelopeItem, Event, Transaction};
use sentry::test::TestTransport;
use sentry::{ClientOptions, Hub, Scope, SentryFutureExt};
use serde::de::DeserializeOwned;
use serde_json::json;
use tower::ServiceExt;

use sentry_sandbox::handlers::{
    self, StatusResponse, SuccessResponse, TransactionResponse, CAPTURED_MESSAGE,
    CONTEXT_ERROR_MESSAGE, TEST_MESSAGE, UNHANDLED_MESSAGE,
};
use sentry_sandbox::monitor::{Level, MonitorCall, RecordingMonitor, UserInfo};
use sentry_sandbox::{SandboxApp, SentryMonitor};

fn setup(configured: bool) -> (Router, RecordingMonitor) {
    let monitor = RecordingMonitor::new(configured);
    let app = Arc::new(SandboxApp::new(Arc::new(monitor.clone()))).create_router();
    (app, monitor)
}

/// Hub with a live client whose envelopes stay in memory
fn sentry_hub() -> (Arc<Hub>, Arc<TestTransport>) {
    let transport = TestTransport::new();
    let options = ClientOptions {
        dsn: Some("https://public@sentry.invalid/1".parse().unwrap()),
        transport: Some(Arc::new(transport.clone())),
        traces_sample_rate: 1.0,
        ..Default::default()
    };
    let hub = Hub::new(Some(Arc::new(options.into())), Arc::new(Scope::default()));
    (Arc::new(hub), transport)
}

fn event_for<'a>(events: &[&'a Event<'static>], message: &str) -> &'a Event<'static> {
    events
        .iter()
        .copied()
        .find(|event| {
            event
                .exception
                .values
                .iter()
                .any(|exception| exception.value.as_deref() == Some(message))
        })
        .unwrap_or_else(|| panic!("no event for {message:?}"))
}

async fn get(app: &Router, path: &str) -> Response {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body<T: DeserializeOwned>(response: Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn content_type(response: &Response) -> &str {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn index_lists_all_routes() {
    let (app, monitor) = setup(false);

    let response = get(&app, handlers::INDEX).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(content_type(&response).starts_with("text/html"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    for (path, _) in handlers::ENDPOINTS {
        assert!(page.contains(path), "index page does not link {path}");
    }
    assert!(monitor.calls().is_empty());
}

#[tokio::test]
async fn success_returns_ok_without_reporting() {
    for configured in [true, false] {
        let (app, monitor) = setup(configured);

        let response = get(&app, handlers::SUCCESS).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(content_type(&response).starts_with("application/json"));

        let body: SuccessResponse = json_body(response).await;
        assert_eq!(
            body,
            SuccessResponse {
                status: "success".to_string(),
                message: "This endpoint works correctly!".to_string(),
                sentry_dsn_configured: configured,
            }
        );
        assert!(monitor.calls().is_empty());
    }
}

#[tokio::test]
async fn error_route_returns_500_and_reports_arithmetic_error() {
    let (app, monitor) = setup(true);

    let response = get(&app, handlers::ERROR).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorResponse = json_body(response).await;
    assert_eq!(body, ErrorResponse::internal());

    match monitor.calls().as_slice() {
        [MonitorCall::CaptureError { kind, message, handled, .. }] => {
            assert_eq!(*kind, ErrorKind::Arithmetic);
            assert_eq!(message, "attempt to divide 1 by zero");
            assert!(!handled);
        }
        other => panic!("unexpected monitor calls: {:?}", other),
    }
}

#[tokio::test]
async fn unhandled_route_returns_500_and_reports_value_error() {
    let (app, monitor) = setup(true);

    let response = get(&app, handlers::UNHANDLED).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    match monitor.calls().as_slice() {
        [MonitorCall::CaptureError { kind, message, handled, .. }] => {
            assert_eq!(*kind, ErrorKind::Value);
            assert_eq!(message, UNHANDLED_MESSAGE);
            assert!(!handled);
        }
        other => panic!("unexpected monitor calls: {:?}", other),
    }
}

#[tokio::test]
async fn capture_route_reports_handled_error() {
    let (app, monitor) = setup(true);

    let response = get(&app, handlers::CAPTURE).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: StatusResponse = json_body(response).await;
    assert_eq!(body.status, "Exception captured and sent to Sentry");

    match monitor.calls().as_slice() {
        [MonitorCall::CaptureError { kind, message, handled, .. }] => {
            assert_eq!(*kind, ErrorKind::Runtime);
            assert_eq!(message, CAPTURED_MESSAGE);
            assert!(handled);
        }
        other => panic!("unexpected monitor calls: {:?}", other),
    }
}

#[tokio::test]
async fn message_route_sends_info_message() {
    let (app, monitor) = setup(true);

    let response = get(&app, handlers::MESSAGE).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: StatusResponse = json_body(response).await;
    assert_eq!(body.status, "Message sent to Sentry");

    match monitor.calls().as_slice() {
        [MonitorCall::CaptureMessage { message, level, .. }] => {
            assert_eq!(message, TEST_MESSAGE);
            assert_eq!(*level, Level::Info);
        }
        other => panic!("unexpected monitor calls: {:?}", other),
    }
}

#[tokio::test]
async fn context_route_enriches_then_reports_unhandled_error() {
    let (app, monitor) = setup(true);

    let response = get(&app, handlers::CONTEXT).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let calls = monitor.calls();
    assert_eq!(calls.len(), 6, "unexpected monitor calls: {:?}", calls);
    assert_eq!(
        calls[0],
        MonitorCall::SetUser(UserInfo {
            id: Some("test-user-123".to_string()),
            email: Some("test@example.com".to_string()),
            username: Some("sandbox_tester".to_string()),
        })
    );
    assert_eq!(
        calls[1],
        MonitorCall::SetTag {
            key: "test_type".to_string(),
            value: "context_test".to_string()
        }
    );
    assert_eq!(
        calls[2],
        MonitorCall::SetTag {
            key: "sandbox".to_string(),
            value: "true".to_string()
        }
    );
    match &calls[3] {
        MonitorCall::SetContext(context) => {
            assert_eq!(context.name, "test_data");
            assert_eq!(context.get("request_id"), Some(&json!("abc-123-xyz")));
            assert_eq!(
                context.get("user_preferences"),
                Some(&json!({"theme": "dark", "notifications": true}))
            );
        }
        other => panic!("expected context, got {:?}", other),
    }
    assert!(matches!(&calls[4], MonitorCall::AddBreadcrumb(crumb)
        if crumb.category == "test" && crumb.message == "About to trigger test error with context"));
    assert!(matches!(&calls[5], MonitorCall::CaptureError { kind, message, handled: false, .. }
        if *kind == ErrorKind::Generic && message == CONTEXT_ERROR_MESSAGE));
}

#[tokio::test]
async fn transaction_route_runs_three_spans() {
    let (app, monitor) = setup(true);

    let started = Instant::now();
    let response = get(&app, handlers::TRANSACTION).await;
    let elapsed = started.elapsed();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(elapsed >= Duration::from_millis(350), "took only {:?}", elapsed);

    let body: TransactionResponse = json_body(response).await;
    assert_eq!(body.status, "Performance transaction completed");
    assert!(!body.transaction_id.is_empty());

    let calls = monitor.calls();
    assert_eq!(
        calls.first(),
        Some(&MonitorCall::StartTransaction {
            name: handlers::TRANSACTION_NAME.to_string(),
            op: handlers::TRANSACTION_OP.to_string(),
            trace_id: body.transaction_id.clone(),
        })
    );

    let spans: Vec<(&str, &str)> = calls
        .iter()
        .filter_map(|call| match call {
            MonitorCall::StartSpan { op, description, .. } => {
                Some((op.as_str(), description.as_str()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        spans,
        [
            ("db", "fetch_user_data"),
            ("http", "external_api_call"),
            ("process", "data_processing"),
        ]
    );

    assert!(matches!(calls.last(), Some(MonitorCall::FinishTransaction { trace_id, .. })
        if *trace_id == body.transaction_id));
}

#[tokio::test]
async fn repeated_calls_keep_the_same_shape() {
    let (app, monitor) = setup(false);

    for path in [handlers::CAPTURE, handlers::MESSAGE, handlers::SUCCESS] {
        let first: serde_json::Value = json_body(get(&app, path).await).await;
        let second: serde_json::Value = json_body(get(&app, path).await).await;
        assert_eq!(first, second, "response for {path} changed between calls");
    }

    for path in [handlers::ERROR, handlers::UNHANDLED, handlers::CONTEXT] {
        assert_eq!(get(&app, path).await.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(get(&app, path).await.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    let first: TransactionResponse = json_body(get(&app, handlers::TRANSACTION).await).await;
    let second: TransactionResponse = json_body(get(&app, handlers::TRANSACTION).await).await;
    assert_eq!(first.status, second.status);
    assert_ne!(first.transaction_id, second.transaction_id);

    let unhandled = monitor
        .calls()
        .iter()
        .filter(|call| matches!(call, MonitorCall::CaptureError { handled: false, .. }))
        .count();
    assert_eq!(unhandled, 6);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let (app, monitor) = setup(false);

    let response = get(&app, "/nope/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: ErrorResponse = json_body(response).await;
    assert_eq!(body.code, 404);
    assert!(body.error.contains("/nope/"));
    assert!(monitor.calls().is_empty());
}

#[tokio::test]
async fn sentry_scope_is_per_request() {
    let (hub, transport) = sentry_hub();
    let app = Arc::new(SandboxApp::new(Arc::new(SentryMonitor::new()))).create_router();

    let (context_status, capture_status, traced) = async {
        let context = get(&app, handlers::CONTEXT).await.status();
        let capture = get(&app, handlers::CAPTURE).await.status();
        let traced: TransactionResponse = json_body(get(&app, handlers::TRANSACTION).await).await;
        (context, capture, traced)
    }
    .bind_hub(hub)
    .await;

    assert_eq!(context_status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(capture_status, StatusCode::OK);

    let envelopes = transport.fetch_and_clear_envelopes();
    let events: Vec<&Event<'static>> = envelopes.iter().filter_map(|envelope| envelope.event()).collect();
    let transactions: Vec<&Transaction<'static>> = envelopes
        .iter()
        .flat_map(|envelope| envelope.items())
        .filter_map(|item| match item {
            EnvelopeItem::Transaction(transaction) => Some(transaction),
            _ => None,
        })
        .collect();

    // Enrichment from /context/ lands on its own unhandled event
    let enriched = event_for(&events, CONTEXT_ERROR_MESSAGE);
    assert_eq!(
        enriched.user.as_ref().and_then(|user| user.id.as_deref()),
        Some("test-user-123")
    );
    assert_eq!(enriched.tags.get("test_type").map(String::as_str), Some("context_test"));
    assert_eq!(enriched.tags.get("sandbox").map(String::as_str), Some("true"));
    assert!(enriched.contexts.contains_key("test_data"));
    assert_eq!(enriched.breadcrumbs.values.len(), 1);
    assert_eq!(
        enriched.breadcrumbs.values[0].message.as_deref(),
        Some("About to trigger test error with context")
    );
    let mechanism = enriched.exception.values[0].mechanism.as_ref().unwrap();
    assert_eq!(mechanism.handled, Some(false));

    // ...and none of it leaks into the next request
    let captured = event_for(&events, CAPTURED_MESSAGE);
    assert!(captured.user.is_none());
    assert!(captured.breadcrumbs.values.is_empty());
    assert!(!captured.tags.contains_key("sandbox"));
    assert!(!captured.tags.contains_key("test_type"));
    assert!(!captured.contexts.contains_key("test_data"));
    let mechanism = captured.exception.values[0].mechanism.as_ref().unwrap();
    assert_eq!(mechanism.handled, Some(true));

    let performance = transactions
        .iter()
        .find(|transaction| transaction.name.as_deref() == Some(handlers::TRANSACTION_NAME))
        .expect("performance transaction sent");
    match performance.contexts.get("trace") {
        Some(SentryContext::Trace(trace)) => {
            assert_eq!(trace.trace_id.to_string(), traced.transaction_id);
            assert_eq!(trace.op.as_deref(), Some(handlers::TRANSACTION_OP));
        }
        other => panic!("missing trace context: {:?}", other),
    }
    let span_ops: Vec<Option<&str>> = performance.spans.iter().map(|span| span.op.as_deref()).collect();
    assert_eq!(span_ops, [Some("db"), Some("http"), Some("process")]);
}
