//! Monitor configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! file, then `TORQUE_*` environment variables (`__` separates sections,
//! e.g. `TORQUE_SENSOR__URL`).

use crate::error::MonitorError;
use alerting::AlertConfig;
use scale::ScaleConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use torque_protocol::DEFAULT_SENSOR_URL;

/// Where measurements come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorSource {
    /// Remote sensor over WebSocket
    #[default]
    Websocket,
    /// In-process simulated load cell
    Simulated,
}

/// Sensor connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Measurement source
    pub source: SensorSource,
    /// Sensor WebSocket URL
    pub url: String,
    /// Connect timeout (ms)
    pub connect_timeout_ms: u64,
    /// Wait before reconnecting after the link drops (ms)
    pub reconnect_delay_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            source: SensorSource::Websocket,
            url: DEFAULT_SENSOR_URL.to_string(),
            connect_timeout_ms: 5000,
            reconnect_delay_ms: 2000,
        }
    }
}

/// Simulated sensor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Top of the simulated torque sweep (Nm)
    pub peak_torque_nm: f64,
    /// Torque change per raw conversion (Nm)
    pub step_nm: f64,
    /// Raw counts per Nm of the simulated cell
    pub counts_per_nm: f64,
    /// File holding the saved calibration factor (in memory if unset)
    pub factor_file: Option<PathBuf>,
    /// Scale averaging and report timing
    pub scale: ScaleConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            peak_torque_nm: 60.0,
            step_nm: 0.1,
            counts_per_nm: 100.0,
            factor_file: None,
            scale: ScaleConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Maximum level (`trace`, `debug`, `info`, `warn`, `error`)
    pub level: String,
    /// Emit JSON lines instead of plain text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Top-level monitor configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Threshold active at startup (Nm); unset disables alerting
    pub threshold: Option<f64>,
    /// Sensor connection
    pub sensor: SensorConfig,
    /// Simulated sensor
    pub simulation: SimulationConfig,
    /// Alert scheduler
    pub alert: AlertConfig,
    /// Logging
    pub logging: LoggingConfig,
}

impl MonitorConfig {
    /// Load configuration from an optional file plus the environment
    pub fn load(path: Option<&Path>) -> Result<Self, MonitorError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        } else {
            builder = builder.add_source(config::File::with_name("torque-monitor").required(false));
        }

        let config: MonitorConfig = builder
            .add_source(
                config::Environment::with_prefix("TORQUE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the monitor cannot run with
    pub fn validate(&self) -> Result<(), MonitorError> {
        self.alert.validate()?;

        if self.sensor.source == SensorSource::Websocket && self.sensor.url.trim().is_empty() {
            return Err(MonitorError::InvalidConfig("sensor.url is empty".to_string()));
        }
        if self.sensor.connect_timeout_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "sensor.connect_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.sensor.source == SensorSource::Simulated {
            let sim = &self.simulation;
            let positive = |v: f64| v.is_finite() && v > 0.0;
            if !positive(sim.peak_torque_nm) || !positive(sim.step_nm) || !positive(sim.counts_per_nm) {
                return Err(MonitorError::InvalidConfig(
                    "simulation values must be positive".to_string(),
                ));
            }
            if sim.scale.report_interval_ms == 0 {
                return Err(MonitorError::InvalidConfig(
                    "simulation.scale.report_interval_ms must be greater than zero".to_string(),
                ));
            }
        }
        if let Some(threshold) = self.threshold {
            if !threshold.is_finite() {
                return Err(MonitorError::InvalidConfig(format!(
                    "threshold {} is not a number",
                    threshold
                )));
            }
        }
        Ok(())
    }

    /// Connect timeout as a duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.sensor.connect_timeout_ms)
    }

    /// Reconnect delay as a duration
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.sensor.reconnect_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.alert.poll_interval_ms, 75);
        assert_eq!(config.sensor.url, "ws://192.168.5.1:81/");
        assert_eq!(config.threshold, None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.toml");
        fs::write(
            &path,
            r#"
threshold = 40.0

[sensor]
source = "simulated"

[alert]
poll_interval_ms = 50

[alert.long_tone]
duration_ms = 1500
frequency_hz = 1800.0
volume = 0.8
"#,
        )
        .unwrap();

        let config = MonitorConfig::load(Some(&path)).unwrap();
        assert_eq!(config.threshold, Some(40.0));
        assert_eq!(config.sensor.source, SensorSource::Simulated);
        assert_eq!(config.alert.poll_interval_ms, 50);
        assert_eq!(config.alert.long_tone.duration_ms, 1500);
        assert_eq!(config.alert.short_tone.duration_ms, 100);
        assert_eq!(config.sensor.reconnect_delay_ms, 2000);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.toml");
        fs::write(&path, "[alert]\npoll_interval_ms = 0\n").unwrap();

        assert!(matches!(
            MonitorConfig::load(Some(&path)),
            Err(MonitorError::Alert(_))
        ));
    }

    #[test]
    fn test_bad_simulation_rejected() {
        let mut config = MonitorConfig::default();
        config.sensor.source = SensorSource::Simulated;
        config.simulation.step_nm = 0.0;
        assert!(matches!(config.validate(), Err(MonitorError::InvalidConfig(_))));
    }
}
