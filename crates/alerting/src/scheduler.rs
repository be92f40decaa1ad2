//! Alert Scheduler Implementation
//!
//! Decides, on every poll tick, whether a repeating beep timer should be
//! armed, and what to play when that timer fires. Each armed timer carries
//! exactly one cadence decision: a firing always clears it, so the next tick
//! re-arms with a freshly computed period and the beeps accelerate as the
//! measurement climbs.

use crate::cadence::{band_floor, cadence_delay, cadence_ms, clamp_to_threshold};
use crate::config::AlertConfig;
use crate::tone::ToneEmitter;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Latest measurement and threshold as seen by the scheduler
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Most recent sensor value
    pub measurement: f64,
    /// Operator threshold (`None` = unset)
    pub threshold: Option<f64>,
}

impl Reading {
    /// Create a reading
    pub fn new(measurement: f64, threshold: Option<f64>) -> Self {
        Self {
            measurement,
            threshold,
        }
    }

    /// Threshold if alerting is enabled for this reading.
    ///
    /// Unset, non-positive or non-finite thresholds and negative or
    /// non-finite measurements all disable alerting.
    pub fn active_threshold(&self) -> Option<f64> {
        let threshold = self.threshold?;
        if !threshold.is_finite() || threshold <= 0.0 {
            return None;
        }
        if !self.measurement.is_finite() || self.measurement < 0.0 {
            return None;
        }
        Some(threshold)
    }
}

/// Logical scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlertState {
    /// No timer running
    #[default]
    Idle,
    /// Beep timer armed
    Ramping,
    /// Long tone just played; back to `Idle` on the next tick
    Terminal,
}

/// Identifies one armed beep timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// An armed repeating beep timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeepTimer {
    /// Handle the runtime passes back on each firing
    pub id: TimerId,
    /// Period fixed at arm time
    pub period: Duration,
}

/// Adaptive audible alert scheduler
pub struct AlertScheduler<E> {
    /// Configuration
    config: AlertConfig,
    /// Tone sink
    emitter: E,
    /// Last observed measurement and threshold
    reading: Reading,
    /// The single live timer, if any
    timer: Option<BeepTimer>,
    /// Set by the long tone, cleared by the following tick
    terminal: bool,
    /// No re-arm until the measurement drops out of the band
    rearm_blocked: bool,
    /// Counter for timer handles
    next_timer_id: u64,
    /// Last logged cadence (ms)
    last_cadence_ms: Option<f64>,
}

impl<E: ToneEmitter> AlertScheduler<E> {
    /// Create a new scheduler in the idle state
    pub fn new(config: AlertConfig, emitter: E) -> Self {
        info!(
            "Creating alert scheduler (poll every {} ms)",
            config.poll_interval_ms
        );
        Self {
            config,
            emitter,
            reading: Reading::default(),
            timer: None,
            terminal: false,
            rearm_blocked: false,
            next_timer_id: 0,
            last_cadence_ms: None,
        }
    }

    /// Replace both inputs; takes effect on the next tick
    pub fn update(&mut self, reading: Reading) {
        self.reading = reading;
    }

    /// Record a new measurement
    pub fn set_measurement(&mut self, measurement: f64) {
        self.reading.measurement = measurement;
    }

    /// Record a new threshold (`None` disables alerting)
    pub fn set_threshold(&mut self, threshold: Option<f64>) {
        self.reading.threshold = threshold;
    }

    /// Evaluate transitions for the current reading
    pub fn on_tick(&mut self) {
        self.terminal = false;

        let Some(threshold) = self.reading.active_threshold() else {
            self.leave_band();
            return;
        };

        let measurement = self.reading.measurement;
        if measurement < band_floor(threshold) {
            self.leave_band();
            return;
        }

        self.log_cadence(clamp_to_threshold(measurement, threshold), threshold);

        if self.timer.is_some() || self.rearm_blocked {
            return;
        }

        if let Some(period) = cadence_delay(measurement, threshold) {
            self.next_timer_id += 1;
            let timer = BeepTimer {
                id: TimerId(self.next_timer_id),
                period,
            };
            debug!("Arming beep timer {:?} with period {:?}", timer.id, period);
            self.timer = Some(timer);
        }
    }

    /// Handle a firing of the timer identified by `id`
    pub fn on_timer_fired(&mut self, id: TimerId) {
        if self.timer.map(|t| t.id) != Some(id) {
            debug!("Ignoring firing of stale timer {:?}", id);
            return;
        }

        let Some(threshold) = self.reading.active_threshold() else {
            return;
        };

        // Terminal compares the raw measurement; only the cadence is clamped
        let measurement = self.reading.measurement;
        if measurement >= threshold {
            info!("Threshold {} reached ({}), long beep", threshold, measurement);
            self.emitter.play(&self.config.long_tone);
            self.stop_timer();
            self.terminal = true;
            self.rearm_blocked = true;
        } else if measurement >= band_floor(threshold) {
            debug!("Beep at {} of {}", measurement, threshold);
            self.emitter.play(&self.config.short_tone);
            self.stop_timer();
        }
    }

    /// Drop the live timer; a no-op when none is armed
    pub fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            debug!("Stopped beep timer {:?}", timer.id);
        }
    }

    /// Current logical state
    pub fn state(&self) -> AlertState {
        if self.terminal {
            AlertState::Terminal
        } else if self.timer.is_some() {
            AlertState::Ramping
        } else {
            AlertState::Idle
        }
    }

    /// The live timer, if any
    pub fn active_timer(&self) -> Option<BeepTimer> {
        self.timer
    }

    /// Last reading passed in
    pub fn reading(&self) -> Reading {
        self.reading
    }

    /// Scheduler configuration
    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Tone sink
    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    fn leave_band(&mut self) {
        self.stop_timer();
        if self.rearm_blocked {
            info!("Measurement left the alert band, re-arming");
            self.rearm_blocked = false;
        }
    }

    fn log_cadence(&mut self, measurement: f64, threshold: f64) {
        let cadence = cadence_ms(measurement, threshold);
        if cadence.is_finite() && self.last_cadence_ms != Some(cadence) {
            debug!("Interval: {:.1} ms", cadence);
            self.last_cadence_ms = Some(cadence);
        }
    }
}
