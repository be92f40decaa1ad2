//! Torque Sensor Protocol
//!
//! Text frames exchanged with the load-cell torque sensor over WebSocket:
//! measurements and calibration reports from the device, calibration and
//! tare commands to it.

mod client;
mod error;
mod message;

pub use client::{CommandWriter, MessageReader, SensorClient, SensorConnection};
pub use error::ProtocolError;
pub use message::{Command, SensorMessage};

/// Address of the sensor's own access point
pub const DEFAULT_SENSOR_URL: &str = "ws://192.168.5.1:81/";
