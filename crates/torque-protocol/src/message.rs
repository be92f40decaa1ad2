//! Sensor Messages and Commands
//!
//! Every frame is a short UTF-8 text. Device frames are either a bare
//! decimal measurement, a `calibrationFactor:<f>` report or a free-form
//! status line. Commands are `name` or `name:<value>`.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;

const CALIBRATION_FACTOR_PREFIX: &str = "calibrationFactor:";

/// Frame sent by the sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SensorMessage {
    /// Latest torque reading (absolute value, Nm)
    Measurement(f64),
    /// Calibration factor currently applied by the device
    CalibrationFactor(f64),
    /// Human-readable reply to a command
    Status(String),
}

impl SensorMessage {
    /// Classify a text frame from the sensor
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let text = text.trim();

        if let Some(value) = text.strip_prefix(CALIBRATION_FACTOR_PREFIX) {
            return parse_finite("calibrationFactor", value).map(SensorMessage::CalibrationFactor);
        }

        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(SensorMessage::Measurement(value)),
            Ok(_) => Err(ProtocolError::InvalidValue {
                field: "measurement",
                raw: text.to_string(),
            }),
            Err(_) => Ok(SensorMessage::Status(text.to_string())),
        }
    }

    /// Text frame as the device sends it
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SensorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorMessage::Measurement(value) => write!(f, "{:.2}", value),
            SensorMessage::CalibrationFactor(factor) => {
                write!(f, "{}{:.2}", CALIBRATION_FACTOR_PREFIX, factor)
            }
            SensorMessage::Status(text) => f.write_str(text),
        }
    }
}

/// Command sent to the sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Derive the calibration factor from a known reference load
    SetKnownWeight(f64),
    /// Apply a calibration factor directly
    SetCalibrationFactor(f64),
    /// Factor back to 1 and tare
    ResetScale,
    /// Zero the scale at the current load
    Tare,
    /// Persist the current calibration factor
    SaveCalibrationFactor,
}

impl Command {
    /// Parse a command frame
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let text = text.trim();
        let (name, value) = match text.split_once(':') {
            Some((name, value)) => (name, Some(value)),
            None => (text, None),
        };

        match (name, value) {
            ("setKnownWeight", Some(v)) => parse_finite("setKnownWeight", v).map(Command::SetKnownWeight),
            ("calibrationFactorInput", Some(v)) => {
                parse_finite("calibrationFactorInput", v).map(Command::SetCalibrationFactor)
            }
            ("reset_scale", None) => Ok(Command::ResetScale),
            ("tare", None) => Ok(Command::Tare),
            ("saveCalibrationFactor", None) => Ok(Command::SaveCalibrationFactor),
            _ => Err(ProtocolError::UnknownCommand(text.to_string())),
        }
    }

    /// Text frame for this command
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetKnownWeight(weight) => write!(f, "setKnownWeight:{}", weight),
            Command::SetCalibrationFactor(factor) => write!(f, "calibrationFactorInput:{}", factor),
            Command::ResetScale => f.write_str("reset_scale"),
            Command::Tare => f.write_str("tare"),
            Command::SaveCalibrationFactor => f.write_str("saveCalibrationFactor"),
        }
    }
}

fn parse_finite(field: &'static str, raw: &str) -> Result<f64, ProtocolError> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ProtocolError::InvalidValue {
            field,
            raw: raw.to_string(),
        }),
    }
}
