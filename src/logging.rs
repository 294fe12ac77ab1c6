//! Structured Logging
//!
//! `tracing` subscriber setup plus the per-index sweep events.
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to this
//! crate only. JSON output is meant for log collectors, pretty output for
//! terminals.
//!
//! Nothing here ever receives the seed phrase or a private key.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::SweepError;
use crate::types::SweepOutcome;

// ============================================================================
// Log Levels
// ============================================================================

/// Application log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl From<&str> for LogLevel {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

// ============================================================================
// Sweep Events
// ============================================================================

/// Log the outcome of one derivation index
pub fn log_index_outcome(index: u32, address: &str, outcome: &SweepOutcome) {
    match outcome {
        SweepOutcome::Swept {
            txid,
            inputs,
            amount_sats,
            fee_sats,
        } => tracing::info!(
            target: "tapsweep::sweep",
            index,
            address,
            txid = %txid,
            inputs,
            amount_sats,
            fee_sats,
            "swept"
        ),
        SweepOutcome::DryRun {
            txid,
            inputs,
            amount_sats,
            fee_sats,
            ..
        } => tracing::info!(
            target: "tapsweep::sweep",
            index,
            address,
            txid = %txid,
            inputs,
            amount_sats,
            fee_sats,
            "dry run, not broadcast"
        ),
        SweepOutcome::Empty => tracing::info!(
            target: "tapsweep::sweep",
            index,
            address,
            "no funds"
        ),
    }
}

/// Log a failed derivation index
pub fn log_index_error(index: u32, address: Option<&str>, error: &SweepError) {
    tracing::error!(
        target: "tapsweep::sweep",
        index,
        address = address.unwrap_or("-"),
        code = error.error_code(),
        retryable = error.is_retryable(),
        error = %error,
        "error"
    );
}

// ============================================================================
// Initialization
// ============================================================================

/// Initialize the logging system
///
/// # Arguments
/// * `level` - Minimum log level for this crate when `RUST_LOG` is unset
/// * `json_format` - Emit one JSON object per event
pub fn init_logging(level: LogLevel, json_format: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tapsweep={}", level.as_filter())));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    }

    Ok(())
}

/// Logging errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    InitFailed(String),
}
