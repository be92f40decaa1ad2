//! Scheduler Runtime
//!
//! Drives an [`AlertScheduler`] from a fixed poll interval and the beep
//! timer it asks for. Both event sources are polled from one task, so ticks
//! and firings never overlap.

use crate::scheduler::{AlertScheduler, Reading, TimerId};
use crate::tone::ToneEmitter;
use tokio::sync::watch;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

/// Timer backing the scheduler's current [`BeepTimer`](crate::BeepTimer)
struct ArmedInterval {
    id: TimerId,
    interval: Interval,
}

impl ArmedInterval {
    fn start(id: TimerId, period: std::time::Duration) -> Self {
        // First firing one full period after arming
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { id, interval }
    }
}

async fn next_firing(armed: &mut Option<ArmedInterval>) -> TimerId {
    match armed {
        Some(armed) => {
            armed.interval.tick().await;
            armed.id
        }
        None => std::future::pending().await,
    }
}

/// Start, replace or drop the tokio timer to match the scheduler
fn sync_timer<E: ToneEmitter>(scheduler: &AlertScheduler<E>, armed: &mut Option<ArmedInterval>) {
    let wanted = scheduler.active_timer();
    if wanted.map(|t| t.id) == armed.as_ref().map(|a| a.id) {
        return;
    }
    *armed = wanted.map(|t| ArmedInterval::start(t.id, t.period));
}

/// Run the scheduler until the reading sender is dropped.
///
/// `readings` is sampled once per poll tick; intermediate values published
/// between ticks are never seen.
pub async fn run_scheduler<E: ToneEmitter>(
    mut scheduler: AlertScheduler<E>,
    readings: watch::Receiver<Reading>,
) -> AlertScheduler<E> {
    let mut poll = time::interval(scheduler.config().poll_interval());
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut armed: Option<ArmedInterval> = None;

    info!("Alert scheduler running");

    loop {
        tokio::select! {
            _ = poll.tick() => {
                if readings.has_changed().is_err() {
                    break;
                }
                let reading = *readings.borrow();
                scheduler.update(reading);
                scheduler.on_tick();
            }
            id = next_firing(&mut armed) => {
                debug!("Beep timer {:?} fired", id);
                scheduler.on_timer_fired(id);
            }
        }
        sync_timer(&scheduler, &mut armed);
    }

    scheduler.stop_timer();
    info!("Alert scheduler stopped");
    scheduler
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlertConfig;
    use crate::scheduler::AlertState;
    use crate::tone::{ChannelEmitter, Tone};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn drain(rx: &mut mpsc::UnboundedReceiver<Tone>) -> Vec<Tone> {
        let mut tones = Vec::new();
        while let Ok(tone) = rx.try_recv() {
            tones.push(tone);
        }
        tones
    }

    fn spawn(
        reading: Reading,
    ) -> (
        watch::Sender<Reading>,
        mpsc::UnboundedReceiver<Tone>,
        tokio::task::JoinHandle<AlertScheduler<ChannelEmitter>>,
    ) {
        let (emitter, tones) = ChannelEmitter::new();
        let (tx, rx) = watch::channel(reading);
        let scheduler = AlertScheduler::new(AlertConfig::default(), emitter);
        let handle = tokio::spawn(run_scheduler(scheduler, rx));
        (tx, tones, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_below_band() {
        let (tx, mut tones, handle) = spawn(Reading::new(0.0, Some(100.0)));
        for m in 0..=74 {
            tx.send_modify(|r| r.measurement = m as f64);
            time::sleep(Duration::from_millis(20)).await;
        }
        assert!(drain(&mut tones).is_empty());

        drop(tx);
        let scheduler = handle.await.unwrap();
        assert_eq!(scheduler.state(), AlertState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_short_beep_after_cadence() {
        let (tx, mut tones, handle) = spawn(Reading::new(76.0, Some(100.0)));

        // Armed at t=0 with a 483 ms period
        time::sleep(Duration::from_millis(400)).await;
        assert!(drain(&mut tones).is_empty());

        time::sleep(Duration::from_millis(300)).await;
        assert_eq!(drain(&mut tones), vec![Tone::short_beep()]);

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_beep_once_while_sustained() {
        let (tx, mut tones, handle) = spawn(Reading::new(100.0, Some(100.0)));

        time::sleep(Duration::from_secs(3)).await;
        assert_eq!(drain(&mut tones), vec![Tone::long_beep()]);

        // Dip below the band and come back
        tx.send_modify(|r| r.measurement = 50.0);
        time::sleep(Duration::from_millis(200)).await;
        tx.send_modify(|r| r.measurement = 120.0);
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(drain(&mut tones), vec![Tone::long_beep()]);

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_cleared_stops_ramping() {
        let (tx, mut tones, handle) = spawn(Reading::new(80.0, Some(100.0)));

        // 415 ms cadence: clear the threshold before the first firing
        time::sleep(Duration::from_millis(100)).await;
        tx.send_modify(|r| r.threshold = Some(0.0));
        time::sleep(Duration::from_secs(2)).await;
        assert!(drain(&mut tones).is_empty());

        drop(tx);
        let scheduler = handle.await.unwrap();
        assert!(scheduler.active_timer().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unvalidated_zero_poll_interval_runs() {
        let config = AlertConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        let (emitter, mut tones) = ChannelEmitter::new();
        let (tx, rx) = watch::channel(Reading::new(100.0, Some(100.0)));
        let handle = tokio::spawn(run_scheduler(AlertScheduler::new(config, emitter), rx));

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(drain(&mut tones), vec![Tone::long_beep()]);

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_beeps_accelerate() {
        let (tx, mut tones, handle) = spawn(Reading::new(76.0, Some(100.0)));
        time::sleep(Duration::from_secs(2)).await;
        let slow = drain(&mut tones).len();

        tx.send_modify(|r| r.measurement = 99.0);
        time::sleep(Duration::from_millis(100)).await;
        drain(&mut tones);
        time::sleep(Duration::from_secs(2)).await;
        let fast = drain(&mut tones).len();
        assert!(fast > slow);

        drop(tx);
        handle.await.unwrap();
    }
}
