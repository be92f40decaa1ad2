//! Sensor links
//!
//! A link runs in its own task and exposes two channels: device frames in,
//! commands out. The WebSocket link reconnects after the sensor drops; the
//! simulated link runs the scale logic in-process.

use crate::config::{MonitorConfig, SensorSource, SimulationConfig};
use scale::{
    CommandHandler, FactorStore, JsonFactorStore, LoadCell, MemoryFactorStore, Reply, Scale,
    SimulatedLoadCell,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use torque_protocol::{Command, ProtocolError, SensorClient, SensorMessage};
use tracing::{debug, info, warn};

/// Buffered device frames before the link waits on the monitor
const MESSAGE_BUFFER: usize = 64;

/// Buffered operator commands
const COMMAND_BUFFER: usize = 16;

/// Channels to a running sensor link
pub struct SensorLink {
    /// Commands for the sensor
    pub commands: mpsc::Sender<Command>,
    /// Frames from the sensor
    pub messages: mpsc::Receiver<SensorMessage>,
    task: JoinHandle<()>,
}

impl SensorLink {
    /// Start the link selected by `config`
    pub fn spawn(config: &MonitorConfig) -> Self {
        let (msg_tx, messages) = mpsc::channel(MESSAGE_BUFFER);
        let (commands, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

        let task = match config.sensor.source {
            SensorSource::Websocket => {
                let mut client = SensorClient::new(&config.sensor.url);
                client.set_timeout(config.connect_timeout());
                tokio::spawn(websocket_link(client, config.reconnect_delay(), msg_tx, cmd_rx))
            }
            SensorSource::Simulated => {
                let handler = simulated_device(&config.simulation);
                let period = config.simulation.scale.report_interval();
                tokio::spawn(simulated_link(handler, period, msg_tx, cmd_rx))
            }
        };

        Self {
            commands,
            messages,
            task,
        }
    }

    /// Stop the link task
    pub async fn shutdown(self) {
        drop(self.commands);
        self.task.abort();
        let _ = self.task.await;
    }
}

async fn websocket_link(
    client: SensorClient,
    reconnect_delay: Duration,
    msg_tx: mpsc::Sender<SensorMessage>,
    mut cmd_rx: mpsc::Receiver<Command>,
) {
    loop {
        match client.connect().await {
            Ok(connection) => {
                let (mut writer, mut reader) = connection.split();
                // Commands typed while connecting are not replayed
                while let Ok(command) = cmd_rx.try_recv() {
                    warn!("Sensor was offline, dropping {}", command);
                }
                loop {
                    tokio::select! {
                        frame = reader.next_message() => match frame {
                            Some(Ok(message)) => {
                                if msg_tx.send(message).await.is_err() {
                                    return;
                                }
                            }
                            Some(Err(ProtocolError::WebSocket(e))) => {
                                warn!("Sensor connection failed: {}", e);
                                break;
                            }
                            Some(Err(e)) => warn!("Dropping sensor frame: {}", e),
                            None => break,
                        },
                        command = cmd_rx.recv() => match command {
                            Some(command) => {
                                if let Err(e) = writer.send(&command).await {
                                    warn!("Failed to send {}: {}", command, e);
                                    break;
                                }
                            }
                            None => {
                                let _ = writer.close().await;
                                return;
                            }
                        },
                    }
                }
            }
            Err(e) => warn!("{}", e),
        }

        if msg_tx.is_closed() {
            return;
        }
        info!("Reconnecting to {} in {:?}", client.url(), reconnect_delay);
        if !discard_commands_for(reconnect_delay, &mut cmd_rx).await {
            return;
        }
    }
}

/// Drop commands until `delay` elapses; `false` once the sender is gone
async fn discard_commands_for(delay: Duration, cmd_rx: &mut mpsc::Receiver<Command>) -> bool {
    let wait = time::sleep(delay);
    tokio::pin!(wait);
    loop {
        tokio::select! {
            _ = &mut wait => return true,
            command = cmd_rx.recv() => match command {
                Some(command) => warn!("Sensor offline, dropping {}", command),
                None => return false,
            },
        }
    }
}

/// Build the in-process device for a simulated sensor
pub fn simulated_device(
    config: &SimulationConfig,
) -> CommandHandler<SimulatedLoadCell, Box<dyn FactorStore + Send>> {
    let peak = (config.peak_torque_nm * config.counts_per_nm).round() as i64;
    let step = ((config.step_nm * config.counts_per_nm).round() as i64).max(1);
    let cell = SimulatedLoadCell::ramp(0, peak, step);

    let store: Box<dyn FactorStore + Send> = match &config.factor_file {
        Some(path) => Box::new(JsonFactorStore::new(path)),
        None => Box::new(MemoryFactorStore::with_factor(config.counts_per_nm)),
    };

    info!("Simulated sensor sweeping 0..{} Nm", config.peak_torque_nm);
    CommandHandler::new(Scale::new(cell, config.scale.clone()), store)
}

async fn simulated_link<L, S>(
    mut device: CommandHandler<L, S>,
    report_interval: Duration,
    msg_tx: mpsc::Sender<SensorMessage>,
    mut cmd_rx: mpsc::Receiver<Command>,
) where
    L: LoadCell,
    S: FactorStore,
{
    let mut report = time::interval(report_interval);
    report.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let replies = tokio::select! {
            _ = report.tick() => device.report(),
            command = cmd_rx.recv() => match command {
                Some(command) => {
                    debug!("Simulated sensor handling {}", command);
                    device.handle(&command)
                }
                None => return,
            },
        };

        // Single client: sender and broadcast replies go to the same place
        for reply in replies {
            let (Reply::ToSender(message) | Reply::Broadcast(message)) = reply;
            if msg_tx.send(message).await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulated_config() -> MonitorConfig {
        let mut config = MonitorConfig::default();
        config.sensor.source = SensorSource::Simulated;
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_link_reports() {
        let mut link = SensorLink::spawn(&simulated_config());

        let mut measurements = Vec::new();
        let mut factors = Vec::new();
        while measurements.len() < 3 {
            match link.messages.recv().await.unwrap() {
                SensorMessage::Measurement(v) => measurements.push(v),
                SensorMessage::CalibrationFactor(f) => factors.push(f),
                SensorMessage::Status(_) => {}
            }
        }

        assert!(factors.iter().all(|f| *f == 100.0));
        assert!(measurements.windows(2).all(|w| w[1] > w[0]));
        link.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_link_answers_commands() {
        let mut link = SensorLink::spawn(&simulated_config());
        link.commands.send(Command::Tare).await.unwrap();

        loop {
            if let SensorMessage::Status(text) = link.messages.recv().await.unwrap() {
                assert_eq!(text, "Scale tared");
                break;
            }
        }
        link.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_discarded_while_offline() {
        let (tx, mut rx) = mpsc::channel(COMMAND_BUFFER);
        let wait = tokio::spawn(async move {
            let open = discard_commands_for(Duration::from_secs(60), &mut rx).await;
            (open, rx)
        });

        for _ in 0..COMMAND_BUFFER * 2 {
            tx.send(Command::Tare).await.unwrap();
        }
        let (open, mut rx) = wait.await.unwrap();
        assert!(open);
        assert!(rx.try_recv().is_err());

        drop(tx);
        assert!(!discard_commands_for(Duration::from_secs(60), &mut rx).await);
    }

    #[test]
    fn test_simulated_device_uses_counts_per_nm() {
        let mut device = simulated_device(&SimulationConfig::default());
        assert_eq!(device.scale().factor(), 100.0);
        // Sweep starts at zero load
        assert_eq!(
            device.report().first(),
            Some(&Reply::Broadcast(SensorMessage::Measurement(0.2)))
        );
    }
}
