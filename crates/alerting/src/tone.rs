//! Alert Tones and Emitters
//!
//! A [`Tone`] describes a single fixed-length sound. Emitters are
//! fire-and-forget: the scheduler never waits for a tone to finish.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Frequency shared by both alert presets (Hz)
pub const ALERT_FREQUENCY_HZ: f64 = 2300.0;

/// Periodic waveform of a tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// Amplitude in [-1, 1] at `phase` (cycles, only the fraction is used)
    pub fn sample(&self, phase: f64) -> f64 {
        let p = phase.rem_euclid(1.0);
        match self {
            Waveform::Sine => (2.0 * PI * p).sin(),
            Waveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * p - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (p - 0.5).abs(),
        }
    }
}

/// A single tone request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    /// Length of the tone (ms)
    pub duration_ms: u64,
    /// Pitch (Hz)
    pub frequency_hz: f64,
    /// Gain in [0, 1]
    pub volume: f32,
    /// Waveform
    #[serde(default)]
    pub waveform: Waveform,
}

impl Tone {
    /// Short beep repeated while ramping (100 ms)
    pub fn short_beep() -> Self {
        Self {
            duration_ms: 100,
            frequency_hz: ALERT_FREQUENCY_HZ,
            volume: 1.0,
            waveform: Waveform::Sine,
        }
    }

    /// Sustained tone at or above threshold (2000 ms)
    pub fn long_beep() -> Self {
        Self {
            duration_ms: 2000,
            frequency_hz: ALERT_FREQUENCY_HZ,
            volume: 1.0,
            waveform: Waveform::Sine,
        }
    }

    /// Tone duration
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Check that the tone can be synthesized
    pub fn is_playable(&self) -> bool {
        self.duration_ms > 0
            && self.frequency_hz.is_finite()
            && self.frequency_hz > 0.0
            && (0.0..=1.0).contains(&self.volume)
    }

    /// Render mono PCM samples at `sample_rate` Hz
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        if sample_rate == 0 || !self.is_playable() {
            return Vec::new();
        }

        let count = (self.duration_ms * u64::from(sample_rate) / 1000) as usize;
        let step = self.frequency_hz / f64::from(sample_rate);
        let gain = f64::from(self.volume);

        (0..count)
            .map(|i| (gain * self.waveform.sample(i as f64 * step)) as f32)
            .collect()
    }
}

/// Sink for alert tones
pub trait ToneEmitter {
    /// Start playing `tone` and return immediately
    fn play(&mut self, tone: &Tone);
}

impl<E: ToneEmitter + ?Sized> ToneEmitter for Box<E> {
    fn play(&mut self, tone: &Tone) {
        (**self).play(tone)
    }
}

/// Emitter that only logs each tone
#[derive(Debug, Default)]
pub struct LogEmitter {
    played: usize,
}

impl LogEmitter {
    /// Create a new log emitter
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tones logged so far
    pub fn played(&self) -> usize {
        self.played
    }
}

impl ToneEmitter for LogEmitter {
    fn play(&mut self, tone: &Tone) {
        self.played += 1;
        info!(
            duration_ms = tone.duration_ms,
            frequency_hz = tone.frequency_hz,
            volume = tone.volume,
            waveform = ?tone.waveform,
            "Beep"
        );
    }
}

/// Emitter that hands tones to an audio backend task
#[derive(Debug, Clone)]
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<Tone>,
}

impl ChannelEmitter {
    /// Create an emitter and the receiver the backend reads from
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Tone>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ToneEmitter for ChannelEmitter {
    fn play(&mut self, tone: &Tone) {
        if self.tx.send(tone.clone()).is_err() {
            warn!("Tone backend gone, dropping {} ms tone", tone.duration_ms);
        }
    }
}
