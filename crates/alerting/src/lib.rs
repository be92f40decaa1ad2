//! Torque Alerting
//!
//! Turns a live torque measurement and an operator threshold into an
//! escalating sequence of beeps: short tones whose cadence shrinks as the
//! measurement approaches the threshold, then one long tone once it is
//! reached.

pub mod cadence;
mod config;
mod error;
mod runner;
mod scheduler;
mod tone;

pub use cadence::{cadence_delay, cadence_ms, ALERT_BAND_RATIO};
pub use config::AlertConfig;
pub use error::AlertError;
pub use runner::run_scheduler;
pub use scheduler::{AlertScheduler, AlertState, BeepTimer, Reading, TimerId};
pub use tone::{ChannelEmitter, LogEmitter, Tone, ToneEmitter, Waveform};
