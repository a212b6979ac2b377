//! # Mascoord Telemetry
//!
//! Logging and metrics for the dashboard bridge.
//!
//! ## Components
//!
//! - **Logs**: `tracing` events rendered by `tracing-subscriber`, pretty for
//!   development or JSON for log shippers.
//! - **Metrics**: Prometheus counters, gauges and histograms in a process-wide
//!   registry, served as text by the bridge's admin API.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mascoord_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `mascoord-bridge` | Service name attached to logs |
//! | `MC_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter directives |
//! | `MC_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `MC_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use metrics::{encode_metrics, register_metrics, HistogramTimer, MetricsHandle};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Install the log subscriber and register metrics.
///
/// Hold the returned guard for the lifetime of the process.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first so that nothing logged during startup is missing a counter.
    let metrics = register_metrics()?;
    logging::init_logging(&config)?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard { _metrics: metrics })
}

/// Keeps telemetry alive. Logs on drop.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry");
    }
}

/// Structured log line tagged with the emitting component.
///
/// ```rust,ignore
/// log_event!(info, "bridge-core", "Session opened", session_id = %id);
/// ```
#[macro_export]
macro_rules! log_event {
    (info, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(component = $component, $($($field)*,)? $msg)
    };
    (warn, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(component = $component, $($($field)*,)? $msg)
    };
    (error, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(component = $component, $($($field)*,)? $msg)
    };
    (debug, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(component = $component, $($($field)*,)? $msg)
    };
}

/// Log a session-related event with the session id attached.
#[macro_export]
macro_rules! log_session_event {
    ($level:ident, $msg:expr, $session_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = "sessions",
            session_id = %$session_id,
            $($($field)*,)?
            $msg
        )
    };
}

/// Increment a counter, optionally by label values.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
