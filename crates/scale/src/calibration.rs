//! Tare and Calibration

use crate::error::ScaleError;
use crate::load_cell::LoadCell;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Scale configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// Raw conversions averaged per reported reading (default: 5)
    pub samples_per_reading: u32,
    /// Raw conversions averaged when calibrating (default: 10)
    pub calibration_samples: u32,
    /// Raw conversions averaged when taring (default: 10)
    pub tare_samples: u32,
    /// Period between reports to clients (default: 100ms)
    pub report_interval_ms: u64,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            samples_per_reading: 5,
            calibration_samples: 10,
            tare_samples: 10,
            report_interval_ms: 100,
        }
    }
}

impl ScaleConfig {
    /// Report period as a duration
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }
}

/// Calibrated view of a load cell
pub struct Scale<L> {
    cell: L,
    config: ScaleConfig,
    /// Raw counts per unit
    factor: f64,
    /// Raw reading at zero load
    offset: f64,
}

impl<L: LoadCell> Scale<L> {
    /// Create an uncalibrated scale (factor 1, no tare)
    pub fn new(cell: L, config: ScaleConfig) -> Self {
        Self {
            cell,
            config,
            factor: 1.0,
            offset: 0.0,
        }
    }

    /// Apply a factor restored from storage; values below 1 fall back to 1
    pub fn restore_factor(&mut self, stored: Option<f64>) {
        self.factor = match stored {
            Some(factor) if factor.is_finite() && factor >= 1.0 => factor,
            Some(factor) => {
                warn!("Stored calibration factor {} rejected, using 1", factor);
                1.0
            }
            None => 1.0,
        };
        info!("Calibration factor: {}", self.factor);
    }

    /// Current calibration factor
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Current tare offset (raw counts)
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Scale configuration
    pub fn config(&self) -> &ScaleConfig {
        &self.config
    }

    /// Whether the load cell has a conversion ready
    pub fn is_ready(&self) -> bool {
        self.cell.is_ready()
    }

    /// Mutable access to the load cell
    pub fn cell_mut(&mut self) -> &mut L {
        &mut self.cell
    }

    /// Set the calibration factor directly
    pub fn set_factor(&mut self, factor: f64) -> Result<(), ScaleError> {
        if !factor.is_finite() || factor == 0.0 {
            return Err(ScaleError::InvalidFactor(factor));
        }
        self.factor = factor;
        debug!("Calibration factor set to {}", factor);
        Ok(())
    }

    /// Zero the scale at the current load
    pub fn tare(&mut self) {
        self.offset = self.average_raw(self.config.tare_samples);
        debug!("Tare offset {}", self.offset);
    }

    /// Factor back to 1, then tare
    pub fn reset(&mut self) {
        self.factor = 1.0;
        self.tare();
    }

    /// Derive the factor from a known load currently on the scale
    pub fn calibrate(&mut self, known_weight: f64) -> Result<f64, ScaleError> {
        if !known_weight.is_finite() || known_weight <= 0.0 {
            return Err(ScaleError::InvalidKnownWeight(known_weight));
        }
        let value = self.read_value(self.config.calibration_samples);
        let factor = value / known_weight;
        self.set_factor(factor)?;
        info!("New calibration factor set: {}", factor);
        Ok(factor)
    }

    /// Tared reading in raw counts, averaged over `samples`
    pub fn read_value(&mut self, samples: u32) -> f64 {
        self.average_raw(samples) - self.offset
    }

    /// Tared reading in calibrated units, averaged over `samples`
    pub fn read_units(&mut self, samples: u32) -> f64 {
        self.read_value(samples) / self.factor
    }

    /// One reported reading: absolute calibrated value, if the cell is ready
    pub fn sample(&mut self) -> Option<f64> {
        if !self.cell.is_ready() {
            return None;
        }
        Some(self.read_units(self.config.samples_per_reading).abs())
    }

    fn average_raw(&mut self, samples: u32) -> f64 {
        let samples = samples.max(1);
        let total: i64 = (0..samples).map(|_| self.cell.read_raw()).sum();
        total as f64 / f64::from(samples)
    }
}
