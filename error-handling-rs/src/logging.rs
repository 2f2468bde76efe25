//! # Structured Logging
//!
//! Subscriber setup for the sandbox service and severity-aware logging of
//! service errors.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::types::{Error, ErrorKind, Result, ServiceError, Severity};

/// Environment prefix for logging settings, e.g. `SANDBOX_LOG_LEVEL`
pub const ENV_PREFIX: &str = "SANDBOX_LOG";

/// Configuration for the logging system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// The log level to use (trace, debug, info, warn, error)
    pub level: String,
    /// The service name for identification
    pub service_name: String,
    /// Whether to use JSON formatting
    pub json_format: bool,
    /// Directory for daily rolling log files; stdout only when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            service_name: "sentry-sandbox".to_string(),
            json_format: false,
            log_dir: None,
        }
    }
}

impl LoggingConfig {
    /// Defaults overridden by `SANDBOX_LOG_LEVEL`, `SANDBOX_LOG_SERVICE_NAME`,
    /// `SANDBOX_LOG_JSON_FORMAT` and `SANDBOX_LOG_DIR`
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        Ok(Self::try_from(cfg)?)
    }
}

impl TryFrom<config::Config> for LoggingConfig {
    type Error = config::ConfigError;

    fn try_from(cfg: config::Config) -> std::result::Result<Self, Self::Error> {
        let mut base = LoggingConfig::default();

        if let Ok(level) = cfg.get::<String>("level") {
            base.level = level;
        }
        if let Ok(service_name) = cfg.get::<String>("service_name") {
            base.service_name = service_name;
        }
        if let Ok(json_format) = cfg.get::<bool>("json_format") {
            base.json_format = json_format;
        }
        if let Ok(dir) = cfg.get::<String>("dir") {
            if !dir.trim().is_empty() {
                base.log_dir = Some(PathBuf::from(dir));
            }
        }

        Ok(base)
    }
}

/// Keeps the non-blocking file writer alive. Drop it only at shutdown.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over `config.level`.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", config.level)));

    let json_layer = config.json_format.then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_target(true)
    });

    let text_layer = (!config.json_format).then(|| fmt::layer().with_target(true));

    let (file_layer, file_guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, format!("{}.log", config.service_name));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| {
            Error::new(ErrorKind::Configuration, format!("Failed to set global subscriber: {}", e))
                .severity(Severity::Fatal)
        })?;

    tracing::info!(
        service = %config.service_name,
        level = %config.level,
        json = config.json_format,
        "Structured logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Logs a service error with its taxonomy fields
pub fn log_service_error(error: &dyn ServiceError) {
    tracing::error!(
        error_kind = %error.kind(),
        severity = %error.severity(),
        message = %error,
        "Error occurred"
    );
}
