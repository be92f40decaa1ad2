//! Alert configuration

use crate::error::AlertError;
use crate::tone::Tone;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Alert scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Poll period for re-evaluating measurement and threshold (default: 75ms)
    pub poll_interval_ms: u64,
    /// Tone repeated while the measurement is in the alert band
    pub short_tone: Tone,
    /// Tone played once at or above threshold
    pub long_tone: Tone,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 75,
            short_tone: Tone::short_beep(),
            long_tone: Tone::long_beep(),
        }
    }
}

impl AlertConfig {
    /// Poll period as a duration, never shorter than 1 ms
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Reject configurations the runtime cannot drive
    pub fn validate(&self) -> Result<(), AlertError> {
        if self.poll_interval_ms == 0 {
            return Err(AlertError::InvalidConfig(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if !self.short_tone.is_playable() {
            return Err(AlertError::InvalidTone("short_tone"));
        }
        if !self.long_tone.is_playable() {
            return Err(AlertError::InvalidTone("long_tone"));
        }
        Ok(())
    }
}
