//! Monitor Error Types

use alerting::AlertError;
use thiserror::Error;

/// Errors that stop the monitor
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Configuration could not be read
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Alert settings rejected
    #[error(transparent)]
    Alert(#[from] AlertError),

    /// Tracing subscriber could not be installed
    #[error("Logging setup failed: {0}")]
    Logging(String),

    /// Operator typed something we do not understand
    #[error("Invalid operator command: {0}")]
    Operator(String),

    /// Sensor link task has gone away
    #[error("Sensor link closed")]
    LinkClosed,
}
