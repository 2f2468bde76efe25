//! Sentry-backed monitor.
//!
//! Every call goes through the hub bound to the current request, so scope
//! changes made while serving one request never reach another.

use std::borrow::Cow;

use config_rs::MonitoringConfig;
use error_handling::{Context, ServiceError};
use sentry::protocol::{Event, Mechanism};
use sentry::{Hub, TransactionOrSpan};

use super::{Breadcrumb, EventId, Level, Monitor, SpanScope, TransactionScope, UserInfo};
use crate::error::SandboxError;

/// Initialises the global Sentry client.
///
/// A missing DSN leaves the client disabled; an unparseable one is logged
/// and treated the same way. The returned guard flushes pending events when
/// dropped and must outlive the server.
pub fn init_sentry(config: &MonitoringConfig) -> sentry::ClientInitGuard {
    let dsn = match config.dsn.as_deref().map(str::parse::<sentry::types::Dsn>).transpose() {
        Ok(dsn) => dsn,
        Err(err) => {
            tracing::warn!(error = %err, "Ignoring invalid SENTRY_DSN");
            None
        }
    };

    let release = config
        .release
        .clone()
        .map(Cow::Owned)
        .or_else(|| sentry::release_name!());

    let guard = sentry::init(sentry::ClientOptions {
        dsn,
        release,
        environment: Some(Cow::Owned(config.environment.clone())),
        traces_sample_rate: config.traces_sample_rate,
        send_default_pii: config.send_default_pii,
        debug: config.debug,
        attach_stacktrace: true,
        ..Default::default()
    });

    if guard.is_enabled() {
        tracing::info!(
            environment = %config.environment,
            traces_sample_rate = config.traces_sample_rate,
            "Sentry client initialized"
        );
    } else {
        tracing::warn!("SENTRY_DSN not configured; events will be discarded");
    }

    guard
}

impl From<Level> for sentry::Level {
    fn from(level: Level) -> Self {
        match level {
            Level::Info => sentry::Level::Info,
            Level::Error => sentry::Level::Error,
            Level::Fatal => sentry::Level::Fatal,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SentryMonitor;

impl SentryMonitor {
    pub fn new() -> Self {
        Self
    }
}

/// Builds the event for a captured error, flagging escaped errors as unhandled
fn error_event(error: &SandboxError, handled: bool) -> Event<'static> {
    let mut event = sentry::event_from_error(error);
    event.level = Level::from(error.severity()).into();

    if let Some(exception) = event.exception.values.last_mut() {
        exception.mechanism = Some(Mechanism {
            ty: "axum".to_string(),
            handled: Some(handled),
            ..Default::default()
        });
    }

    event
        .tags
        .insert("error_kind".to_string(), error.kind().to_string());
    event
}

impl Monitor for SentryMonitor {
    fn is_configured(&self) -> bool {
        Hub::current()
            .client()
            .map_or(false, |client| client.dsn().is_some())
    }

    fn capture_error(&self, error: &SandboxError, handled: bool) -> EventId {
        sentry::capture_event(error_event(error, handled))
    }

    fn capture_message(&self, message: &str, level: Level) -> EventId {
        sentry::capture_message(message, level.into())
    }

    fn set_user(&self, user: UserInfo) {
        let user = sentry::User {
            id: user.id,
            email: user.email,
            username: user.username,
            ..Default::default()
        };
        sentry::configure_scope(|scope| scope.set_user(Some(user)));
    }

    fn set_tag(&self, key: &str, value: &str) {
        sentry::configure_scope(|scope| scope.set_tag(key, value));
    }

    fn set_context(&self, context: Context) {
        let name = context.name;
        let data = context.data.into_iter().collect();
        sentry::configure_scope(|scope| {
            scope.set_context(&name, sentry::protocol::Context::Other(data));
        });
    }

    fn add_breadcrumb(&self, breadcrumb: Breadcrumb) {
        sentry::add_breadcrumb(sentry::Breadcrumb {
            category: Some(breadcrumb.category),
            message: Some(breadcrumb.message),
            level: breadcrumb.level.into(),
            ..Default::default()
        });
    }

    fn start_transaction(&self, name: &str, op: &str) -> Box<dyn TransactionScope> {
        let transaction = sentry::start_transaction(sentry::TransactionContext::new(name, op));

        // Events captured while the transaction is open are linked to it.
        let previous = sentry::configure_scope(|scope| {
            let previous = scope.get_span();
            scope.set_span(Some(TransactionOrSpan::from(transaction.clone())));
            previous
        });

        Box::new(SentryTransaction {
            inner: transaction,
            previous,
        })
    }
}

struct SentryTransaction {
    inner: sentry::Transaction,
    previous: Option<TransactionOrSpan>,
}

impl TransactionScope for SentryTransaction {
    fn trace_id(&self) -> String {
        self.inner.get_trace_context().trace_id.to_string()
    }

    fn start_span(&self, op: &str, description: &str) -> Box<dyn SpanScope> {
        Box::new(SentrySpan(self.inner.start_child(op, description)))
    }

    fn finish(self: Box<Self>) {
        let SentryTransaction { inner, previous } = *self;
        sentry::configure_scope(|scope| scope.set_span(previous));
        inner.finish();
    }
}

struct SentrySpan(sentry::Span);

impl SpanScope for SentrySpan {
    fn finish(self: Box<Self>) {
        self.0.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_event_marks_mechanism() {
        let event = error_event(&SandboxError::InvalidValue("bad".into()), false);

        let exception = event.exception.values.last().unwrap();
        assert_eq!(exception.value.as_deref(), Some("bad"));
        let mechanism = exception.mechanism.as_ref().unwrap();
        assert_eq!(mechanism.handled, Some(false));
        assert_eq!(event.level, sentry::Level::Error);
        assert_eq!(event.tags.get("error_kind").map(String::as_str), Some("Value Error"));
    }

    #[test]
    fn test_unconfigured_hub_reports_not_configured() {
        let hub = std::sync::Arc::new(Hub::new(None, std::sync::Arc::new(Default::default())));
        Hub::run(hub, || assert!(!SentryMonitor::new().is_configured()));
    }

    #[test]
    fn test_transaction_trace_id_is_hex() {
        let transaction = SentryMonitor::new().start_transaction("unit", "test");
        let trace_id = transaction.trace_id();
        transaction.finish();

        assert_eq!(trace_id.len(), 32);
        assert!(trace_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_captures_reach_test_transport() {
        let events = sentry::test::with_captured_events(|| {
            let monitor = SentryMonitor::new();
            monitor.set_user(UserInfo {
                id: Some("unit-user".into()),
                ..Default::default()
            });
            monitor.set_tag("sandbox", "true");
            monitor.capture_message("hello", Level::Info);
            monitor.capture_error(&SandboxError::Runtime("caught".into()), true);
        });

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message.as_deref(), Some("hello"));
        assert_eq!(events[0].level, sentry::Level::Info);
        assert_eq!(events[0].tags.get("sandbox").map(String::as_str), Some("true"));
        assert_eq!(
            events[0].user.as_ref().and_then(|user| user.id.as_deref()),
            Some("unit-user")
        );

        let mechanism = events[1].exception.values[0].mechanism.as_ref().unwrap();
        assert_eq!(mechanism.handled, Some(true));
    }
}
