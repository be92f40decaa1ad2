//! Scale Error Types

use thiserror::Error;

/// Errors raised by scale calibration and factor storage
#[derive(Debug, Error)]
pub enum ScaleError {
    /// Reference load must be a positive finite number
    #[error("Invalid known weight: {0}")]
    InvalidKnownWeight(f64),

    /// Calibration factor must be finite and non-zero
    #[error("Invalid calibration factor: {0}")]
    InvalidFactor(f64),

    /// Failed to read or write the factor file
    #[error("Factor store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Factor file is not valid JSON
    #[error("Factor store format error: {0}")]
    Format(#[from] serde_json::Error),
}
