//! Error-monitoring client abstraction.
//!
//! Handlers only talk to [`Monitor`]; [`SentryMonitor`] forwards to the
//! Sentry SDK and [`RecordingMonitor`] keeps every call in memory.

use std::time::Duration;

use error_handling::{Context, Severity};
use serde::{Deserialize, Serialize};

use crate::error::SandboxError;

pub mod recording;
pub mod sentry_monitor;

pub use recording::{MonitorCall, RecordingMonitor};
pub use sentry_monitor::{init_sentry, SentryMonitor};

/// Identifier the monitoring backend assigns to a captured event
pub type EventId = uuid::Uuid;

/// Event and breadcrumb level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Error,
    Fatal,
}

impl From<Severity> for Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => Level::Error,
            Severity::Fatal => Level::Fatal,
        }
    }
}

/// Identity attached to subsequent events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub category: String,
    pub message: String,
    pub level: Level,
}

/// Calls into the error-monitoring client.
///
/// Scope mutations (user, tags, context, breadcrumbs) apply to events
/// captured later within the same request.
#[cfg_attr(test, mockall::automock)]
pub trait Monitor: Send + Sync {
    /// True when the client holds a usable DSN
    fn is_configured(&self) -> bool;

    /// Reports an error. `handled` is false for errors that escaped their handler.
    fn capture_error(&self, error: &SandboxError, handled: bool) -> EventId;

    fn capture_message(&self, message: &str, level: Level) -> EventId;

    fn set_user(&self, user: UserInfo);

    fn set_tag(&self, key: &str, value: &str);

    fn set_context(&self, context: Context);

    fn add_breadcrumb(&self, breadcrumb: Breadcrumb);

    fn start_transaction(&self, name: &str, op: &str) -> Box<dyn TransactionScope>;
}

/// An open performance transaction
pub trait TransactionScope: Send {
    /// Opaque trace identifier of this transaction
    fn trace_id(&self) -> String;

    fn start_span(&self, op: &str, description: &str) -> Box<dyn SpanScope>;

    fn finish(self: Box<Self>);
}

/// An open span inside a transaction
pub trait SpanScope: Send {
    fn finish(self: Box<Self>);
}

/// One timed sub-scope of a traced run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanPlan {
    pub op: &'static str,
    pub description: &'static str,
    pub delay: Duration,
}

/// Runs `spans` one after another inside a transaction, waiting each span's
/// delay before closing it. Returns the transaction's trace id.
pub async fn run_traced(monitor: &dyn Monitor, name: &str, op: &str, spans: &[SpanPlan]) -> String {
    let transaction = monitor.start_transaction(name, op);

    for plan in spans {
        let span = transaction.start_span(plan.op, plan.description);
        tokio::time::sleep(plan.delay).await;
        span.finish();
    }

    let trace_id = transaction.trace_id();
    transaction.finish();

    tracing::debug!(transaction = name, trace_id = %trace_id, spans = spans.len(), "Transaction finished");
    trace_id
}
