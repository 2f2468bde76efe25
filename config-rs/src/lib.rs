//! config-rs/lib.rs
//! Shared configuration utilities for the sandbox service.
//! Provides bind address resolution and the monitoring client settings,
//! all read from the process environment.

use std::env;
use std::net::SocketAddr;

/// Service name used to derive the `<NAME>_SERVICE_PORT` / `<NAME>_SERVICE_ADDR` variables
pub const SERVICE_NAME: &str = "SENTRY_SANDBOX";

/// Default listening port
pub const DEFAULT_PORT: u16 = 8000;

/// Default environment reported with every event
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Default fraction of transactions sent to the monitoring backend
pub const DEFAULT_TRACES_SAMPLE_RATE: f32 = 1.0;

/// Loads variables from a `.env` file in the working directory, if present.
///
/// Returns `true` when a file was found and applied.
pub fn load_dotenv() -> bool {
    dotenv::dotenv().is_ok()
}

/// Get service port from environment variables with proper fallback
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "SENTRY_SANDBOX")
/// * `default_port` - The default port to use if not specified in environment
pub fn get_service_port(service_name: &str, default_port: u16) -> u16 {
    let var_name = format!("{}_SERVICE_PORT", service_name.to_uppercase());
    match env::var(&var_name) {
        Ok(value) => value.parse::<u16>().unwrap_or_else(|_| {
            log::warn!("Invalid port in {}, using default {}", var_name, default_port);
            default_port
        }),
        Err(_) => default_port,
    }
}

/// Create a SocketAddr for binding a service
///
/// `<NAME>_SERVICE_ADDR` may hold either `host:port` or `http://host:port`;
/// otherwise the service binds on all interfaces at the configured port.
pub fn get_bind_address(service_name: &str, default_port: u16) -> SocketAddr {
    let var_name = format!("{}_SERVICE_ADDR", service_name.to_uppercase());

    if let Ok(addr_str) = env::var(&var_name) {
        let trimmed = addr_str
            .strip_prefix("http://")
            .or_else(|| addr_str.strip_prefix("https://"))
            .unwrap_or(&addr_str);

        match trimmed.parse::<SocketAddr>() {
            Ok(addr) => return addr,
            Err(_) => log::warn!("Invalid address format in {}, using default", var_name),
        }
    }

    let port = get_service_port(service_name, default_port);
    SocketAddr::from(([0, 0, 0, 0], port))
}

/// Reads a boolean flag, accepting `1`, `true`, `yes` and `on` (case-insensitive)
pub fn env_flag(var_name: &str, default: bool) -> bool {
    env::var(var_name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

/// Reads a non-empty string variable
fn env_non_empty(var_name: &str) -> Option<String> {
    env::var(var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Settings for the error-monitoring client
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringConfig {
    /// Endpoint identifier/credential; `None` leaves the client disabled
    pub dsn: Option<String>,
    pub environment: String,
    pub release: Option<String>,
    /// Always within `[0.0, 1.0]`
    pub traces_sample_rate: f32,
    pub send_default_pii: bool,
    pub debug: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            release: None,
            traces_sample_rate: DEFAULT_TRACES_SAMPLE_RATE,
            send_default_pii: true,
            debug: false,
        }
    }
}

impl MonitoringConfig {
    pub fn from_env() -> Self {
        let dsn = env_non_empty("SENTRY_DSN");

        let environment = env_non_empty("SENTRY_ENVIRONMENT")
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        let release = env_non_empty("SENTRY_RELEASE");

        let traces_sample_rate = match env_non_empty("SENTRY_TRACES_SAMPLE_RATE") {
            Some(raw) => parse_sample_rate(&raw).unwrap_or_else(|| {
                log::warn!(
                    "Invalid SENTRY_TRACES_SAMPLE_RATE {:?}, using default {}",
                    raw,
                    DEFAULT_TRACES_SAMPLE_RATE
                );
                DEFAULT_TRACES_SAMPLE_RATE
            }),
            None => DEFAULT_TRACES_SAMPLE_RATE,
        };

        let send_default_pii = env_flag("SENTRY_SEND_DEFAULT_PII", true);
        let debug = env_flag("SENTRY_DEBUG", false);

        Self {
            dsn,
            environment,
            release,
            traces_sample_rate,
            send_default_pii,
            debug,
        }
    }
}

/// Parses a sample rate and clamps it into `[0, 1]`. Rejects NaN.
pub fn parse_sample_rate(raw: &str) -> Option<f32> {
    let rate = raw.trim().parse::<f32>().ok()?;
    if rate.is_nan() {
        return None;
    }
    Some(rate.clamp(0.0, 1.0))
}
