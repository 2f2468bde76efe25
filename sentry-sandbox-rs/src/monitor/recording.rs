//! In-memory monitor that records every call instead of reporting it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use error_handling::{Context, ErrorKind, ServiceError};

use super::{Breadcrumb, EventId, Level, Monitor, SpanScope, TransactionScope, UserInfo};
use crate::error::SandboxError;

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorCall {
    CaptureError {
        event_id: EventId,
        kind: ErrorKind,
        message: String,
        handled: bool,
    },
    CaptureMessage {
        event_id: EventId,
        message: String,
        level: Level,
    },
    SetUser(UserInfo),
    SetTag {
        key: String,
        value: String,
    },
    SetContext(Context),
    AddBreadcrumb(Breadcrumb),
    StartTransaction {
        name: String,
        op: String,
        trace_id: String,
    },
    StartSpan {
        trace_id: String,
        op: String,
        description: String,
    },
    FinishSpan {
        trace_id: String,
        op: String,
        elapsed: Duration,
    },
    FinishTransaction {
        trace_id: String,
        elapsed: Duration,
    },
}

type CallLog = Arc<Mutex<Vec<MonitorCall>>>;

fn lock(calls: &CallLog) -> MutexGuard<'_, Vec<MonitorCall>> {
    calls.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cloning shares the call log, so a test can keep a handle while the
/// router owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingMonitor {
    configured: bool,
    calls: CallLog,
}

impl RecordingMonitor {
    pub fn new(configured: bool) -> Self {
        Self {
            configured,
            calls: CallLog::default(),
        }
    }

    /// Snapshot of the calls recorded so far, oldest first
    pub fn calls(&self) -> Vec<MonitorCall> {
        lock(&self.calls).clone()
    }

    /// Drains the call log
    pub fn take_calls(&self) -> Vec<MonitorCall> {
        std::mem::take(&mut *lock(&self.calls))
    }

    fn record(&self, call: MonitorCall) {
        lock(&self.calls).push(call);
    }
}

impl Monitor for RecordingMonitor {
    fn is_configured(&self) -> bool {
        self.configured
    }

    fn capture_error(&self, error: &SandboxError, handled: bool) -> EventId {
        let event_id = EventId::new_v4();
        self.record(MonitorCall::CaptureError {
            event_id,
            kind: error.kind(),
            message: error.to_string(),
            handled,
        });
        event_id
    }

    fn capture_message(&self, message: &str, level: Level) -> EventId {
        let event_id = EventId::new_v4();
        self.record(MonitorCall::CaptureMessage {
            event_id,
            message: message.to_string(),
            level,
        });
        event_id
    }

    fn set_user(&self, user: UserInfo) {
        self.record(MonitorCall::SetUser(user));
    }

    fn set_tag(&self, key: &str, value: &str) {
        self.record(MonitorCall::SetTag {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    fn set_context(&self, context: Context) {
        self.record(MonitorCall::SetContext(context));
    }

    fn add_breadcrumb(&self, breadcrumb: Breadcrumb) {
        self.record(MonitorCall::AddBreadcrumb(breadcrumb));
    }

    fn start_transaction(&self, name: &str, op: &str) -> Box<dyn TransactionScope> {
        let trace_id = EventId::new_v4().simple().to_string();
        self.record(MonitorCall::StartTransaction {
            name: name.to_string(),
            op: op.to_string(),
            trace_id: trace_id.clone(),
        });

        Box::new(RecordedTransaction {
            trace_id,
            started: Instant::now(),
            calls: Arc::clone(&self.calls),
        })
    }
}

struct RecordedTransaction {
    trace_id: String,
    started: Instant,
    calls: CallLog,
}

impl TransactionScope for RecordedTransaction {
    fn trace_id(&self) -> String {
        self.trace_id.clone()
    }

    fn start_span(&self, op: &str, description: &str) -> Box<dyn SpanScope> {
        lock(&self.calls).push(MonitorCall::StartSpan {
            trace_id: self.trace_id.clone(),
            op: op.to_string(),
            description: description.to_string(),
        });

        Box::new(RecordedSpan {
            trace_id: self.trace_id.clone(),
            op: op.to_string(),
            started: Instant::now(),
            calls: Arc::clone(&self.calls),
        })
    }

    fn finish(self: Box<Self>) {
        lock(&self.calls).push(MonitorCall::FinishTransaction {
            trace_id: self.trace_id,
            elapsed: self.started.elapsed(),
        });
    }
}

struct RecordedSpan {
    trace_id: String,
    op: String,
    started: Instant,
    calls: CallLog,
}

impl SpanScope for RecordedSpan {
    fn finish(self: Box<Self>) {
        lock(&self.calls).push(MonitorCall::FinishSpan {
            trace_id: self.trace_id,
            op: self.op,
            elapsed: self.started.elapsed(),
        });
    }
}
