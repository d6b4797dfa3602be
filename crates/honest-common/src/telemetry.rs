//! Telemetry setup for honest binaries.
//!
//! Provides:
//! - Prometheus metrics recorder with text rendering
//! - Tracing with compact console output
//!
//! # Usage
//!
//! ```ignore
//! use honest_common::telemetry::{self, TelemetryConfig};
//!
//! telemetry::init(TelemetryConfig::from_env("honest-cli"));
//! tracing::info!("started");
//! println!("{}", telemetry::render());
//! ```

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static PROMETHEUS_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line.
    pub service_name: String,
    /// Console log level (default: INFO, DEBUG in debug builds)
    pub console_level: Level,
    /// Install the prometheus recorder.
    pub metrics: bool,
}

impl TelemetryConfig {
    /// Build config from the environment.
    ///
    /// - `RUST_LOG`: standard env filter (optional, overrides console_level)
    /// - `HONEST_METRICS`: set to anything to install the metrics recorder
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        Self {
            service_name: service_name.into(),
            console_level,
            metrics: std::env::var_os("HONEST_METRICS").is_some(),
        }
    }
}

/// Initialize tracing and, if enabled, the metrics recorder.
///
/// Call once at startup. Later calls leave the first subscriber in place.
pub fn init(config: TelemetryConfig) {
    if config.metrics {
        init_metrics();
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.console_level.as_str().to_lowercase()));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(env_filter);

    if tracing_subscriber::registry()
        .with(console_layer)
        .try_init()
        .is_err()
    {
        return;
    }

    tracing::debug!(
        service = %config.service_name,
        metrics = config.metrics,
        "telemetry initialized"
    );
}

/// Install the prometheus recorder if nobody has yet.
///
/// Returns `None` when another global recorder was already installed.
pub fn init_metrics() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "failed to install prometheus recorder");
                None
            }
        })
        .as_ref()
}

/// Render metrics in prometheus text format.
///
/// Empty when the recorder is not installed.
pub fn render() -> String {
    PROMETHEUS_HANDLE
        .get()
        .and_then(Option::as_ref)
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

// Re-export the metrics crate for convenience
pub use metrics::{counter, gauge, histogram};
