//! Structured logging for storefront tools
//!
//! Installs a `tracing` subscriber with:
//! - an `EnvFilter` (`RUST_LOG` overrides the configured level)
//! - a compact or JSON formatter writing to stderr
//! - a process session id attached to the first event for correlation

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

/// Global session ID for correlating logs
static SESSION_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

/// Initialize logging with defaults
pub fn init() -> anyhow::Result<()> {
    init_with_config(TelemetryConfig::default())
}

/// Initialize with custom configuration
///
/// Fails if a global subscriber is already installed.
pub fn init_with_config(config: TelemetryConfig) -> anyhow::Result<()> {
    let filter = build_filter(&config);

    let result = match config.format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(config.show_target)
                    .with_thread_ids(config.show_thread_ids)
                    .with_file(config.show_file)
                    .with_line_number(config.show_line_number)
                    .compact(),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(config.show_target)
                    .with_thread_ids(config.show_thread_ids)
                    .with_file(config.show_file)
                    .with_line_number(config.show_line_number)
                    .json(),
            )
            .try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {e}"))?;

    tracing::debug!(
        session_id = %session_id(),
        version = env!("CARGO_PKG_VERSION"),
        "Telemetry initialized"
    );

    Ok(())
}

/// `RUST_LOG` when set and valid, otherwise the configured level
fn build_filter(config: &TelemetryConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
}

/// Get the current session ID
pub fn session_id() -> &'static str {
    &SESSION_ID
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single line
    #[default]
    Compact,
    /// One JSON object per line
    Json,
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
    pub show_target: bool,
    pub show_thread_ids: bool,
    pub show_file: bool,
    pub show_line_number: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            format: LogFormat::Compact,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
        }
    }
}

impl TelemetryConfig {
    /// Level from a CLI verbosity count: 0 warn, 1 info, 2 debug, 3+ trace
    #[must_use]
    pub fn from_verbosity(verbosity: u8) -> Self {
        let log_level = match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        Self {
            log_level: log_level.to_string(),
            show_target: verbosity >= 2,
            ..Self::default()
        }
    }

    /// Switch to JSON output
    #[must_use]
    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }
}

/// Logs how long an operation took when stopped or dropped
pub struct Timer {
    name: String,
    start: Instant,
    stopped: bool,
}

impl Timer {
    /// Start a new timer
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            stopped: false,
        }
    }

    /// Stop the timer and log the duration
    pub fn stop(mut self) -> Duration {
        self.stopped = true;
        let duration = self.start.elapsed();
        tracing::debug!(
            operation = %self.name,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
        duration
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if !self.stopped {
            tracing::debug!(
                operation = %self.name,
                duration_ms = self.start.elapsed().as_millis(),
                "Operation ended"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(TelemetryConfig::from_verbosity(0).log_level, "warn");
        assert_eq!(TelemetryConfig::from_verbosity(1).log_level, "info");
        assert_eq!(TelemetryConfig::from_verbosity(2).log_level, "debug");
        assert_eq!(TelemetryConfig::from_verbosity(9).log_level, "trace");
        assert!(TelemetryConfig::from_verbosity(2).show_target);
    }

    #[test]
    fn test_json_format() {
        let config = TelemetryConfig::default().json();
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_init_twice_fails() {
        // Either this call or another test's installed the subscriber first
        let _ = init_with_config(TelemetryConfig::from_verbosity(3));
        assert!(init().is_err());
    }

    #[test]
    fn test_timer() {
        let timer = Timer::start("test_operation");
        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.stop();
        assert!(duration.as_millis() >= 10);
    }

    #[test]
    fn test_session_id() {
        let id = session_id();
        assert!(!id.is_empty());
        // Should be a valid UUID
        assert!(Uuid::parse_str(id).is_ok());
    }
}
