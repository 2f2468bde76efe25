// sentry-sandbox-rs/src/main.rs
// Sentry Sandbox - HTTP endpoints that exercise the error-monitoring client
// Port 8000 by default (SENTRY_SANDBOX_SERVICE_PORT / SENTRY_SANDBOX_SERVICE_ADDR)

use std::sync::Arc;

use anyhow::Context as _;
use config_rs::{MonitoringConfig, DEFAULT_PORT, SERVICE_NAME};
use error_handling::{init_logging, LoggingConfig};
use sentry_sandbox::monitor::{init_sentry, Monitor, SentryMonitor};
use sentry_sandbox::SandboxApp;

fn main() -> anyhow::Result<()> {
    let dotenv_loaded = config_rs::load_dotenv();

    let logging_config = LoggingConfig::from_env().context("failed to read logging configuration")?;
    let _logging_guard = init_logging(&logging_config).context("failed to initialize logging")?;

    if dotenv_loaded {
        tracing::info!("Loaded environment from .env");
    }

    let monitoring_config = MonitoringConfig::from_env();

    // The client must exist before the runtime starts so worker threads
    // inherit the main hub.
    let _sentry_guard = init_sentry(&monitoring_config);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?
        .block_on(serve())
}

async fn serve() -> anyhow::Result<()> {
    let monitor: Arc<dyn Monitor> = Arc::new(SentryMonitor::new());
    let dsn_configured = monitor.is_configured();
    let app = Arc::new(SandboxApp::new(monitor)).create_router();

    let addr = config_rs::get_bind_address(SERVICE_NAME, DEFAULT_PORT);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(%addr, dsn_configured, "Sentry sandbox listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Sentry sandbox stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
