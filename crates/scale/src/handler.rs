//! Device Command Handling
//!
//! Applies commands from a client to the scale and produces the frames the
//! device answers with: some go back to the requesting client only, some
//! are broadcast to every connected client.

use crate::calibration::Scale;
use crate::load_cell::LoadCell;
use crate::store::FactorStore;
use torque_protocol::{Command, SensorMessage};
use tracing::{info, warn};

/// Frame produced in response to a command or report tick
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Only for the client that sent the command
    ToSender(SensorMessage),
    /// For every connected client
    Broadcast(SensorMessage),
}

/// Scale plus factor storage, driven by protocol commands
pub struct CommandHandler<L, S> {
    scale: Scale<L>,
    store: S,
}

impl<L: LoadCell, S: FactorStore> CommandHandler<L, S> {
    /// Create a handler, restoring the saved factor from `store`
    pub fn new(mut scale: Scale<L>, store: S) -> Self {
        let stored = match store.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Failed to load calibration factor: {}", e);
                None
            }
        };
        scale.restore_factor(stored);
        Self { scale, store }
    }

    /// The underlying scale
    pub fn scale(&self) -> &Scale<L> {
        &self.scale
    }

    /// Mutable access to the underlying scale
    pub fn scale_mut(&mut self) -> &mut Scale<L> {
        &mut self.scale
    }

    /// The factor store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply `command` and return the frames to send
    pub fn handle(&mut self, command: &Command) -> Vec<Reply> {
        match command {
            Command::SetKnownWeight(known) => match self.scale.calibrate(*known) {
                Ok(factor) => vec![
                    Reply::ToSender(status(format!("Calibration factor updated to {:.2}", factor))),
                    Reply::Broadcast(SensorMessage::CalibrationFactor(factor)),
                ],
                Err(e) => {
                    warn!("Calibration rejected: {}", e);
                    vec![Reply::ToSender(status("Invalid weight input"))]
                }
            },
            Command::SetCalibrationFactor(factor) => match self.scale.set_factor(*factor) {
                Ok(()) => {
                    info!("Calibration factor input: {}", factor);
                    Vec::new()
                }
                Err(e) => {
                    warn!("Factor input rejected: {}", e);
                    vec![Reply::ToSender(status("Invalid calibration factor"))]
                }
            },
            Command::ResetScale => {
                self.scale.reset();
                info!("Scale reset");
                vec![
                    Reply::Broadcast(SensorMessage::CalibrationFactor(self.scale.factor())),
                    Reply::ToSender(status("Scale reset")),
                ]
            }
            Command::Tare => {
                self.scale.tare();
                info!("Scale tared");
                vec![Reply::ToSender(status("Scale tared"))]
            }
            Command::SaveCalibrationFactor => {
                if let Err(e) = self.store.save(self.scale.factor()) {
                    warn!("Failed to save calibration factor: {}", e);
                }
                Vec::new()
            }
        }
    }

    /// Frames broadcast on every report tick
    pub fn report(&mut self) -> Vec<Reply> {
        let mut frames = Vec::with_capacity(2);
        if let Some(value) = self.scale.sample() {
            frames.push(Reply::Broadcast(SensorMessage::Measurement(value)));
        }
        frames.push(Reply::Broadcast(SensorMessage::CalibrationFactor(
            self.scale.factor(),
        )));
        frames
    }
}

fn status(text: impl Into<String>) -> SensorMessage {
    SensorMessage::Status(text.into())
}
