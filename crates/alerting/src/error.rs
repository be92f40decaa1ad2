//! Alerting Error Types

use thiserror::Error;

/// Errors raised while setting up the alert scheduler.
///
/// The scheduler itself never fails at runtime; bad readings degrade to
/// "no alert".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlertError {
    /// Configuration value out of range
    #[error("Invalid alert configuration: {0}")]
    InvalidConfig(String),

    /// Tone preset cannot be played
    #[error("Tone preset {0} is not playable")]
    InvalidTone(&'static str),
}
