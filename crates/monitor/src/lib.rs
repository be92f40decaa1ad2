//! Torque Monitor
//!
//! Follows live torque readings from the sensor, keeps the alert scheduler
//! fed with the latest measurement and the operator's threshold, and relays
//! calibration commands typed on the console.

mod config;
mod error;
mod link;
mod operator;

pub use config::{LoggingConfig, MonitorConfig, SensorConfig, SensorSource, SimulationConfig};
pub use error::MonitorError;
pub use link::{simulated_device, SensorLink};
pub use operator::{OperatorCommand, HELP};

use alerting::{
    run_scheduler, AlertScheduler, ChannelEmitter, LogEmitter, Reading, Tone, ToneEmitter,
};
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use torque_protocol::{Command, SensorMessage};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), MonitorError> {
    let level = Level::from_str(&config.level)
        .map_err(|_| MonitorError::Logging(format!("unknown level {:?}", config.level)))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.map_err(|e| MonitorError::Logging(e.to_string()))
}

/// Routes sensor frames and operator input to the scheduler and the sensor
pub struct Monitor {
    readings: watch::Sender<Reading>,
    commands: mpsc::Sender<Command>,
    calibration_factor: Option<f64>,
}

impl Monitor {
    /// Create a monitor publishing to `readings` and sending to `commands`
    pub fn new(readings: watch::Sender<Reading>, commands: mpsc::Sender<Command>) -> Self {
        Self {
            readings,
            commands,
            calibration_factor: None,
        }
    }

    /// Latest reading handed to the scheduler
    pub fn reading(&self) -> Reading {
        *self.readings.borrow()
    }

    /// Last calibration factor reported by the sensor
    pub fn calibration_factor(&self) -> Option<f64> {
        self.calibration_factor
    }

    /// Apply one frame from the sensor
    pub fn on_message(&mut self, message: SensorMessage) {
        match message {
            SensorMessage::Measurement(value) => {
                debug!("Torque: {:.2} Nm", value);
                self.readings.send_modify(|r| r.measurement = value);
            }
            SensorMessage::CalibrationFactor(factor) => {
                if self.calibration_factor != Some(factor) {
                    info!("Calibration factor: {}", factor);
                    self.calibration_factor = Some(factor);
                }
            }
            SensorMessage::Status(text) => info!("Sensor: {}", text),
        }
    }

    /// Apply one operator command.
    ///
    /// Device commands never wait: when the link's queue is full the command
    /// is dropped with a warning.
    pub fn on_operator(&mut self, command: OperatorCommand) -> Result<(), MonitorError> {
        match command {
            OperatorCommand::SetThreshold(threshold) => {
                match threshold {
                    Some(t) => info!("Threshold set to {} Nm", t),
                    None => info!("Threshold cleared, alerting off"),
                }
                self.readings.send_modify(|r| r.threshold = threshold);
            }
            OperatorCommand::Device(command) => {
                info!("Sending {}", command);
                match self.commands.try_send(command) {
                    Ok(()) => {}
                    Err(TrySendError::Full(command)) => {
                        warn!("Sensor link busy, dropping {}", command)
                    }
                    Err(TrySendError::Closed(_)) => return Err(MonitorError::LinkClosed),
                }
            }
            OperatorCommand::Status => {
                let reading = self.reading();
                info!(
                    measurement = reading.measurement,
                    threshold = ?reading.threshold,
                    calibration_factor = ?self.calibration_factor,
                    "Status"
                );
            }
        }
        Ok(())
    }
}

/// Stand-in audio backend: logs every tone the scheduler emits
async fn play_tones(mut tones: mpsc::UnboundedReceiver<Tone>) {
    let mut backend = LogEmitter::new();
    while let Some(tone) = tones.recv().await {
        backend.play(&tone);
    }
    debug!("Tone backend stopped after {} tones", backend.played());
}

/// Run the monitor until Ctrl-C or the sensor link ends
pub async fn run(config: MonitorConfig) -> Result<(), MonitorError> {
    config.validate()?;

    let (readings_tx, readings_rx) = watch::channel(Reading::new(0.0, config.threshold));
    let (emitter, tones) = ChannelEmitter::new();
    let scheduler = AlertScheduler::new(config.alert.clone(), emitter);
    let scheduler_task = tokio::spawn(run_scheduler(scheduler, readings_rx));
    let tone_task = tokio::spawn(play_tones(tones));

    let mut link = SensorLink::spawn(&config);
    let mut monitor = Monitor::new(readings_tx, link.commands.clone());

    let mut console = BufReader::new(tokio::io::stdin()).lines();
    let mut console_open = true;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("{}", HELP);

    loop {
        tokio::select! {
            message = link.messages.recv() => match message {
                Some(message) => monitor.on_message(message),
                None => {
                    warn!("Sensor link ended");
                    break;
                }
            },
            line = console.next_line(), if console_open => match line {
                Ok(Some(line)) => match OperatorCommand::parse(&line) {
                    Ok(Some(command)) => monitor.on_operator(command)?,
                    Ok(None) => {}
                    Err(e) => warn!("{}", e),
                },
                Ok(None) => {
                    debug!("Console closed");
                    console_open = false;
                }
                Err(e) => {
                    warn!("Console read failed: {}", e);
                    console_open = false;
                }
            },
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }
    }

    // Dropping the monitor closes the reading channel, which stops the scheduler
    drop(monitor);
    link.shutdown().await;
    if let Ok(scheduler) = scheduler_task.await {
        info!("Final alert state: {:?}", scheduler.state());
    }
    let _ = tone_task.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn monitor() -> (Monitor, watch::Receiver<Reading>, mpsc::Receiver<Command>) {
        let (readings_tx, readings_rx) = watch::channel(Reading::default());
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        (Monitor::new(readings_tx, cmd_tx), readings_rx, cmd_rx)
    }

    #[test]
    fn test_measurement_updates_reading() {
        let (mut monitor, readings, _cmds) = monitor();
        monitor.on_message(SensorMessage::Measurement(12.5));
        monitor.on_message(SensorMessage::Measurement(13.0));
        assert_eq!(readings.borrow().measurement, 13.0);
        assert_eq!(readings.borrow().threshold, None);
    }

    #[test]
    fn test_calibration_factor_tracked() {
        let (mut monitor, _readings, _cmds) = monitor();
        monitor.on_message(SensorMessage::CalibrationFactor(2.0));
        monitor.on_message(SensorMessage::Status("Scale tared".to_string()));
        assert_eq!(monitor.calibration_factor(), Some(2.0));
    }

    #[test]
    fn test_threshold_reaches_scheduler_input() {
        let (mut monitor, readings, _cmds) = monitor();
        monitor.on_message(SensorMessage::Measurement(80.0));
        monitor
            .on_operator(OperatorCommand::SetThreshold(Some(100.0)))
            .unwrap();
        assert_eq!(*readings.borrow(), Reading::new(80.0, Some(100.0)));

        monitor
            .on_operator(OperatorCommand::SetThreshold(None))
            .unwrap();
        assert_eq!(readings.borrow().threshold, None);
    }

    #[tokio::test]
    async fn test_device_command_forwarded() {
        let (mut monitor, _readings, mut cmds) = monitor();
        monitor
            .on_operator(OperatorCommand::Device(Command::Tare))
            .unwrap();
        assert_eq!(cmds.recv().await, Some(Command::Tare));

        drop(cmds);
        assert!(matches!(
            monitor.on_operator(OperatorCommand::Device(Command::Tare)),
            Err(MonitorError::LinkClosed)
        ));
    }

    #[test]
    fn test_full_command_queue_drops_instead_of_waiting() {
        let (mut monitor, _readings, mut cmds) = monitor();
        for _ in 0..10 {
            monitor
                .on_operator(OperatorCommand::Device(Command::Tare))
                .unwrap();
        }
        monitor
            .on_operator(OperatorCommand::Device(Command::ResetScale))
            .unwrap();

        let mut queued = Vec::new();
        while let Ok(command) = cmds.try_recv() {
            queued.push(command);
        }
        assert_eq!(queued, vec![Command::Tare; 4]);
    }

    #[tokio::test]
    async fn test_offline_sensor_does_not_block_commands() {
        let mut config = MonitorConfig::default();
        config.sensor.url = "ws://127.0.0.1:9/".to_string();
        config.sensor.connect_timeout_ms = 500;
        config.sensor.reconnect_delay_ms = 60_000;

        let link = SensorLink::spawn(&config);
        let (readings_tx, _readings_rx) = watch::channel(Reading::default());
        let mut monitor = Monitor::new(readings_tx, link.commands.clone());

        for _ in 0..20 {
            let sent = tokio::time::timeout(Duration::from_secs(2), async {
                monitor.on_operator(OperatorCommand::Device(Command::Tare))
            })
            .await;
            assert!(matches!(sent, Ok(Ok(()))));
        }

        drop(monitor);
        link.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_sweep_triggers_alert() {
        let mut config = MonitorConfig::default();
        config.sensor.source = SensorSource::Simulated;

        let (readings_tx, readings_rx) = watch::channel(Reading::new(0.0, Some(20.0)));
        let (emitter, mut tones) = ChannelEmitter::new();
        let scheduler = tokio::spawn(run_scheduler(
            AlertScheduler::new(config.alert.clone(), emitter),
            readings_rx,
        ));

        let mut link = SensorLink::spawn(&config);
        let mut monitor = Monitor::new(readings_tx, link.commands.clone());

        // Sweep rises 0.5 Nm per report: short beeps from 15 Nm, long beep at 20 Nm
        let mut heard = Vec::new();
        while !heard.contains(&Tone::long_beep()) {
            tokio::select! {
                Some(message) = link.messages.recv() => monitor.on_message(message),
                Some(tone) = tones.recv() => heard.push(tone),
            }
        }
        assert_eq!(heard.first(), Some(&Tone::short_beep()));

        drop(monitor);
        link.shutdown().await;
        scheduler.await.unwrap();
    }
}
