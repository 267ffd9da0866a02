use serde::{Deserialize, Serialize};

use crate::{config::RhythmConfig, Result};

/// Smallest inter-tap interval accepted, in seconds.
const MIN_TAP_INTERVAL: f32 = 0.0001;

/// Snapshot of the estimator state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RhythmSignal {
    /// Normalised [0, 1] tempo value.
    pub normalized_value: f32,
    /// Smoothed inter-tap period in seconds.
    pub ema_interval: f32,
    pub last_tap_time: Option<f32>,
}

impl RhythmSignal {
    pub fn initialized(&self) -> bool {
        self.last_tap_time.is_some()
    }
}

/// Turns discrete tap timestamps into a smoothed tempo value in [0, 1].
///
/// Inter-tap intervals are folded into an exponential moving average whose
/// implied frequency is mapped linearly between the configured minimum and
/// maximum tap frequencies. Without taps the value decays back towards zero
/// once the idle grace period has elapsed.
#[derive(Debug, Clone)]
pub struct RhythmEstimator {
    config: RhythmConfig,
    signal: RhythmSignal,
}

impl RhythmEstimator {
    pub fn new(config: RhythmConfig) -> Result<Self> {
        config.validate()?;
        let signal = RhythmSignal {
            normalized_value: 0.0,
            // Seeded so the implied frequency starts at the bottom of the range.
            ema_interval: 1.0 / config.min_tap_frequency,
            last_tap_time: None,
        };
        Ok(Self { config, signal })
    }

    pub fn config(&self) -> &RhythmConfig {
        &self.config
    }

    pub fn signal(&self) -> &RhythmSignal {
        &self.signal
    }

    pub fn normalized_value(&self) -> f32 {
        self.signal.normalized_value
    }

    /// Frequency implied by the current smoothed interval, in taps per second.
    pub fn frequency(&self) -> f32 {
        1.0 / self.signal.ema_interval
    }

    /// Registers a tap at `now` seconds.
    ///
    /// The first tap only anchors the timeline; there is no interval to
    /// measure yet, so the value is left untouched.
    pub fn record_tap(&mut self, now: f32) {
        let Some(last) = self.signal.last_tap_time else {
            self.signal.last_tap_time = Some(now);
            tracing::debug!(now, "first tap anchors the rhythm");
            return;
        };

        let delta = (now - last).max(MIN_TAP_INTERVAL);
        self.signal.last_tap_time = Some(now);

        let alpha = self.config.ema_alpha;
        self.signal.ema_interval = self.signal.ema_interval * (1.0 - alpha) + delta * alpha;

        let frequency = self.frequency();
        self.signal.normalized_value = inverse_lerp(
            self.config.min_tap_frequency,
            self.config.max_tap_frequency,
            frequency,
        );

        tracing::debug!(
            now,
            delta,
            frequency,
            normalized = self.signal.normalized_value,
            "tap recorded"
        );
    }

    /// Moves the value towards zero when no tap arrived for longer than the
    /// configured delay. Never undershoots zero.
    pub fn decay(&mut self, now: f32, dt: f32) {
        let Some(last) = self.signal.last_tap_time else {
            return;
        };
        if dt <= 0.0 || now - last <= self.config.decay_delay {
            return;
        }

        let value = self.signal.normalized_value;
        if value <= 0.0 {
            return;
        }

        self.signal.normalized_value = (value - self.config.decay_rate * dt).max(0.0);
    }
}

/// Position of `value` between `from` and `to`, clamped to [0, 1].
fn inverse_lerp(from: f32, to: f32, value: f32) -> f32 {
    if (to - from).abs() <= f32::EPSILON {
        return 0.0;
    }
    let t = (value - from) / (to - from);
    if t.is_nan() {
        0.0
    } else {
        t.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator(alpha: f32) -> RhythmEstimator {
        RhythmEstimator::new(RhythmConfig {
            min_tap_frequency: 0.5,
            max_tap_frequency: 5.0,
            ema_alpha: alpha,
            decay_delay: 0.4,
            decay_rate: 1.0,
        })
        .unwrap()
    }

    #[test]
    fn seeds_interval_at_minimum_frequency() {
        let rhythm = estimator(0.25);
        assert!((rhythm.frequency() - 0.5).abs() < 1e-6);
        assert_eq!(rhythm.normalized_value(), 0.0);
        assert!(!rhythm.signal().initialized());
    }

    #[test]
    fn first_tap_does_not_spike() {
        let mut rhythm = estimator(1.0);
        rhythm.record_tap(10.0);

        assert_eq!(rhythm.normalized_value(), 0.0);
        assert!(rhythm.signal().initialized());
        assert!((rhythm.signal().ema_interval - 2.0).abs() < 1e-6);
    }

    #[test]
    fn maps_interval_into_frequency_range() {
        let mut rhythm = estimator(1.0);
        let interval = 1.0 / 2.75;
        rhythm.record_tap(0.0);
        rhythm.record_tap(interval);

        assert!((rhythm.normalized_value() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn smooths_intervals_with_ema() {
        let mut rhythm = estimator(0.25);
        rhythm.record_tap(0.0);
        rhythm.record_tap(0.2);

        // 2.0 * 0.75 + 0.2 * 0.25
        assert!((rhythm.signal().ema_interval - 1.55).abs() < 1e-5);
    }

    #[test]
    fn value_stays_in_unit_range() {
        let mut rhythm = estimator(0.4);
        let mut now = 0.0;
        for step in 0..200 {
            // Alternate bursts of very fast and very slow tapping.
            now += if (step / 20) % 2 == 0 { 0.0 } else { 3.0 };
            rhythm.record_tap(now);
            let value = rhythm.normalized_value();
            assert!((0.0..=1.0).contains(&value), "value {value} escaped range");
        }
    }

    #[test]
    fn simultaneous_taps_saturate_at_one() {
        let mut rhythm = estimator(1.0);
        rhythm.record_tap(1.0);
        rhythm.record_tap(1.0);
        assert_eq!(rhythm.normalized_value(), 1.0);
    }

    #[test]
    fn decay_waits_for_grace_period() {
        let mut rhythm = estimator(1.0);
        rhythm.record_tap(0.0);
        rhythm.record_tap(0.25);
        let before = rhythm.normalized_value();

        rhythm.decay(0.5, 0.1);
        assert_eq!(rhythm.normalized_value(), before);
    }

    #[test]
    fn decay_converges_to_zero() {
        let mut rhythm = estimator(1.0);
        rhythm.record_tap(0.0);
        rhythm.record_tap(0.25);

        let dt = 0.1;
        let mut now = 0.25;
        let mut previous = rhythm.normalized_value();
        assert!(previous > 0.0);

        for _ in 0..100 {
            now += dt;
            rhythm.decay(now, dt);
            let value = rhythm.normalized_value();
            if now - 0.25 > 0.4 + dt {
                assert!(value < previous || value == 0.0);
            }
            assert!(value <= previous);
            previous = value;
        }
        assert_eq!(rhythm.normalized_value(), 0.0);
    }

    #[test]
    fn decay_before_first_tap_is_a_no_op() {
        let mut rhythm = estimator(1.0);
        rhythm.decay(100.0, 1.0);
        assert_eq!(rhythm.normalized_value(), 0.0);
    }
}
