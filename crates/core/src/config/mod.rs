use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, SprintRhythmError};

/// Top-level configuration for one player session.
///
/// Values are fixed once a session is constructed. Every constructor that
/// accepts a config section validates it first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub rhythm: RhythmConfig,
    pub player: PlayerConfig,
    pub movement: MovementConfig,
}

impl SessionConfig {
    /// Parses a JSON document and validates the result.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        self.rhythm.validate()?;
        self.player.validate()?;
        self.movement.validate()
    }
}

/// Tuning for the tap-tempo estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RhythmConfig {
    /// Tap frequency (taps per second) mapped to a normalized value of 0.
    pub min_tap_frequency: f32,
    /// Tap frequency mapped to a normalized value of 1.
    pub max_tap_frequency: f32,
    /// EMA weight given to the newest inter-tap interval, in (0, 1].
    pub ema_alpha: f32,
    /// Idle seconds after the last tap before the value starts decaying.
    pub decay_delay: f32,
    /// Normalized units per second removed while decaying.
    pub decay_rate: f32,
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self {
            min_tap_frequency: 0.5,
            max_tap_frequency: 5.0,
            ema_alpha: 0.25,
            decay_delay: 0.4,
            decay_rate: 1.0,
        }
    }
}

impl RhythmConfig {
    pub fn validate(&self) -> Result<()> {
        finite("rhythm.min_tap_frequency", self.min_tap_frequency)?;
        finite("rhythm.max_tap_frequency", self.max_tap_frequency)?;
        finite("rhythm.ema_alpha", self.ema_alpha)?;
        finite("rhythm.decay_delay", self.decay_delay)?;
        finite("rhythm.decay_rate", self.decay_rate)?;

        if self.min_tap_frequency <= 0.0 {
            return Err(SprintRhythmError::config(
                "rhythm.min_tap_frequency",
                format!("must be positive, got {}", self.min_tap_frequency),
            ));
        }
        if self.max_tap_frequency <= self.min_tap_frequency {
            return Err(SprintRhythmError::config(
                "rhythm.max_tap_frequency",
                format!(
                    "must exceed min_tap_frequency ({}), got {}",
                    self.min_tap_frequency, self.max_tap_frequency
                ),
            ));
        }
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(SprintRhythmError::config(
                "rhythm.ema_alpha",
                format!("must lie in (0, 1], got {}", self.ema_alpha),
            ));
        }
        non_negative("rhythm.decay_delay", self.decay_delay)?;
        non_negative("rhythm.decay_rate", self.decay_rate)
    }
}

/// Durations of the timed hazard states, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub stumbling_duration: f32,
    pub falling_duration: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            stumbling_duration: 2.0,
            falling_duration: 3.0,
        }
    }
}

impl PlayerConfig {
    pub fn validate(&self) -> Result<()> {
        positive("player.stumbling_duration", self.stumbling_duration)?;
        positive("player.falling_duration", self.falling_duration)
    }
}

/// Mapping from the normalized tempo to a stride speed readout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub base_speed: f32,
    pub max_extra_speed: f32,
    /// Exponential approach rate towards the target speed. Zero snaps.
    pub speed_smoothing: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            base_speed: 2.0,
            max_extra_speed: 8.0,
            speed_smoothing: 8.0,
        }
    }
}

impl MovementConfig {
    pub fn validate(&self) -> Result<()> {
        non_negative("movement.base_speed", self.base_speed)?;
        non_negative("movement.max_extra_speed", self.max_extra_speed)?;
        non_negative("movement.speed_smoothing", self.speed_smoothing)
    }
}

fn finite(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SprintRhythmError::config(field, format!("must be finite, got {value}")))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<()> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(SprintRhythmError::config(
            field,
            format!("must not be negative, got {value}"),
        ));
    }
    Ok(())
}

fn positive(field: &'static str, value: f32) -> Result<()> {
    finite(field, value)?;
    if value <= 0.0 {
        return Err(SprintRhythmError::config(
            field,
            format!("must be positive, got {value}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected_field(config: &SessionConfig) -> &'static str {
        match config.validate() {
            Err(SprintRhythmError::InvalidConfig { field, .. }) => field,
            other => panic!("expected a config error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_frequency_range() {
        let mut config = SessionConfig::default();
        config.rhythm.max_tap_frequency = config.rhythm.min_tap_frequency;
        assert_eq!(rejected_field(&config), "rhythm.max_tap_frequency");
    }

    #[test]
    fn rejects_alpha_outside_unit_interval() {
        let mut config = SessionConfig::default();
        config.rhythm.ema_alpha = 0.0;
        assert_eq!(rejected_field(&config), "rhythm.ema_alpha");

        config.rhythm.ema_alpha = 1.5;
        assert_eq!(rejected_field(&config), "rhythm.ema_alpha");

        config.rhythm.ema_alpha = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_durations() {
        let mut config = SessionConfig::default();
        config.player.falling_duration = -1.0;
        assert_eq!(rejected_field(&config), "player.falling_duration");

        let mut config = SessionConfig::default();
        config.player.stumbling_duration = 0.0;
        assert_eq!(rejected_field(&config), "player.stumbling_duration");
    }

    #[test]
    fn rejects_non_finite_values() {
        let mut config = SessionConfig::default();
        config.rhythm.decay_rate = f32::NAN;
        assert_eq!(rejected_field(&config), "rhythm.decay_rate");
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config =
            SessionConfig::from_json_str(r#"{ "player": { "falling_duration": 4.5 } }"#).unwrap();

        assert_eq!(config.player.falling_duration, 4.5);
        assert_eq!(config.player.stumbling_duration, 2.0);
        assert_eq!(config.rhythm, RhythmConfig::default());
    }

    #[test]
    fn json_loading_validates() {
        let err = SessionConfig::from_json_str(r#"{ "rhythm": { "min_tap_frequency": 0.0 } }"#)
            .unwrap_err();
        assert!(format!("{err}").contains("rhythm.min_tap_frequency"));
    }
}
