use crate::{config::MovementConfig, Result};

/// Stride speed readout derived from the normalised tempo.
///
/// The target speed is `base + tempo * max_extra`; the readout approaches it
/// exponentially so sudden tempo jumps do not produce speed jumps.
#[derive(Debug, Clone)]
pub struct StrideSpeed {
    config: MovementConfig,
    current: f32,
}

impl StrideSpeed {
    pub fn new(config: MovementConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            current: 0.0,
        })
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target_for(&self, normalized: f32) -> f32 {
        self.config.base_speed + normalized.clamp(0.0, 1.0) * self.config.max_extra_speed
    }

    pub fn update(&mut self, normalized: f32, dt: f32) {
        let target = self.target_for(normalized);
        if self.config.speed_smoothing <= 0.0 {
            self.current = target;
            return;
        }
        if dt <= 0.0 {
            return;
        }
        let blend = 1.0 - (-self.config.speed_smoothing * dt).exp();
        self.current += (target - self.current) * blend;
    }
}
