//! Torque Sensor Scale
//!
//! Device-side behavior of the load-cell torque sensor: averaging raw
//! readings, tare, calibration against a known load, factor persistence,
//! and the replies the device sends for each command.

mod calibration;
mod error;
mod handler;
mod load_cell;
mod store;

pub use calibration::{Scale, ScaleConfig};
pub use error::ScaleError;
pub use handler::{CommandHandler, Reply};
pub use load_cell::{LoadCell, SimulatedLoadCell};
pub use store::{FactorStore, JsonFactorStore, MemoryFactorStore};
