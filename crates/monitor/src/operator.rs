//! Operator console commands

use crate::error::MonitorError;
use torque_protocol::Command;

/// One line typed by the operator
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorCommand {
    /// Change the alert threshold (`None` disables alerting)
    SetThreshold(Option<f64>),
    /// Forward a command to the sensor
    Device(Command),
    /// Print the current reading, threshold and calibration factor
    Status,
}

/// Console help text
pub const HELP: &str = "commands: threshold <nm>|off, tare, calibrate <known>, factor <f>, save, reset, status";

impl OperatorCommand {
    /// Parse one console line; blank lines yield `None`
    pub fn parse(line: &str) -> Result<Option<Self>, MonitorError> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();
        if words.next().is_some() {
            return Err(MonitorError::Operator(format!("too many arguments: {}", line.trim())));
        }

        let command = match (verb.to_ascii_lowercase().as_str(), arg) {
            ("threshold", Some("off")) => OperatorCommand::SetThreshold(None),
            ("threshold", Some(value)) => OperatorCommand::SetThreshold(Some(number(value)?)),
            ("tare", None) => OperatorCommand::Device(Command::Tare),
            ("calibrate", Some(value)) => OperatorCommand::Device(Command::SetKnownWeight(number(value)?)),
            ("factor", Some(value)) => {
                OperatorCommand::Device(Command::SetCalibrationFactor(number(value)?))
            }
            ("save", None) => OperatorCommand::Device(Command::SaveCalibrationFactor),
            ("reset", None) => OperatorCommand::Device(Command::ResetScale),
            ("status", None) => OperatorCommand::Status,
            _ => return Err(MonitorError::Operator(format!("{} ({})", line.trim(), HELP))),
        };
        Ok(Some(command))
    }
}

fn number(text: &str) -> Result<f64, MonitorError> {
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(MonitorError::Operator(format!("not a number: {}", text))),
    }
}
