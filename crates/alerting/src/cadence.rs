//! Beep Cadence Curve
//!
//! Maps a measurement and its threshold to the delay between short alert
//! tones. The curve starts at 500 ms when the measurement enters the alert
//! band (75% of threshold) and shrinks to 75 ms at the threshold.

use std::time::Duration;

/// Fraction of the threshold at which the alert band starts
pub const ALERT_BAND_RATIO: f64 = 0.75;

/// Delay at the bottom of the alert band (ms)
pub const BAND_FLOOR_DELAY_MS: f64 = 500.0;

/// Span between the band floor delay and the delay at threshold (ms)
pub const DELAY_SPAN_MS: f64 = 425.0;

/// Lowest measurement that still warrants an alert for `threshold`
pub fn band_floor(threshold: f64) -> f64 {
    threshold * ALERT_BAND_RATIO
}

/// Clamp an overshooting measurement to the threshold
pub fn clamp_to_threshold(measurement: f64, threshold: f64) -> f64 {
    if measurement > threshold {
        threshold
    } else {
        measurement
    }
}

/// Raw cadence in milliseconds.
///
/// `measurement` is expected to be clamped already. A zero threshold yields a
/// non-finite value, which callers must read as "alerting disabled".
pub fn cadence_ms(measurement: f64, threshold: f64) -> f64 {
    BAND_FLOOR_DELAY_MS
        - DELAY_SPAN_MS * ((400.0 / threshold) * (measurement - band_floor(threshold)) * 0.01)
}

/// Cadence as a timer period.
///
/// Returns `None` whenever the result could not be handed to a timer: an
/// unset or non-positive threshold, or a non-finite or non-positive delay.
pub fn cadence_delay(measurement: f64, threshold: f64) -> Option<Duration> {
    if !threshold.is_finite() || threshold <= 0.0 {
        return None;
    }

    let delay_ms = cadence_ms(clamp_to_threshold(measurement, threshold), threshold);
    if !delay_ms.is_finite() || delay_ms <= 0.0 {
        return None;
    }

    Some(Duration::from_micros((delay_ms * 1000.0).round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_band_endpoints() {
        assert!((cadence_ms(75.0, 100.0) - 500.0).abs() < 1e-9);
        assert!((cadence_ms(100.0, 100.0) - 75.0).abs() < 1e-9);
        assert!((cadence_ms(76.0, 100.0) - 483.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_threshold_is_not_finite() {
        assert!(!cadence_ms(0.0, 0.0).is_finite());
        assert!(!cadence_ms(10.0, 0.0).is_finite());
        assert!(cadence_delay(10.0, 0.0).is_none());
    }

    #[test]
    fn test_overshoot_is_clamped() {
        assert_eq!(cadence_delay(120.0, 100.0), cadence_delay(100.0, 100.0));
        assert_eq!(cadence_delay(100.0, 100.0), Some(Duration::from_millis(75)));
    }

    #[test]
    fn test_negative_threshold_disabled() {
        assert!(cadence_delay(-80.0, -100.0).is_none());
        assert!(cadence_delay(50.0, f64::NAN).is_none());
    }

    proptest! {
        #[test]
        fn cadence_non_increasing_in_band(
            threshold in 0.1f64..10_000.0,
            a in 0.0f64..=1.0,
            b in 0.0f64..=1.0,
        ) {
            let floor = band_floor(threshold);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let m_lo = floor + lo * (threshold - floor);
            let m_hi = floor + hi * (threshold - floor);
            prop_assert!(cadence_ms(m_hi, threshold) <= cadence_ms(m_lo, threshold) + 1e-9);
        }

        #[test]
        fn cadence_delay_bounded_in_band(threshold in 0.1f64..10_000.0, frac in 0.0f64..=1.0) {
            let m = band_floor(threshold) + frac * threshold;
            let delay = cadence_delay(m, threshold).map(|d| d.as_secs_f64() * 1000.0);
            prop_assert!(matches!(delay, Some(ms) if (75.0 - 1e-6..=500.0 + 1e-6).contains(&ms)));
        }
    }
}
