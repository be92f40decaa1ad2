//! Sensor Protocol Error Types

use thiserror::Error;

/// Errors that can occur talking to the torque sensor
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Could not open the WebSocket
    #[error("Failed to connect to sensor at {url}: {reason}")]
    Connection { url: String, reason: String },

    /// Transport failure on an open connection
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Numeric field is not a finite number
    #[error("Invalid value in {field}: {raw:?}")]
    InvalidValue { field: &'static str, raw: String },

    /// Text is not a known device command
    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),
}
