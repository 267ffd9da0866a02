use serde::{Deserialize, Serialize};

/// Discrete classification of the tempo against an obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Zone {
    Safe,
    Warning,
    Danger,
}

/// Thresholds partitioning [0, 1] into safe, warning and danger zones.
///
/// Always satisfies `0 <= safe_end <= warning_end <= danger_start <= 1`.
/// Only serialized: construction must go through [`ZoneBounds::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoneBounds {
    safe_end: f32,
    warning_end: f32,
    danger_start: f32,
}

impl ZoneBounds {
    /// Reported when no obstacle is active.
    pub const NEUTRAL: Self = Self {
        safe_end: 0.0,
        warning_end: 0.0,
        danger_start: 0.0,
    };

    /// Builds bounds, normalizing anything out of order or out of range.
    ///
    /// A warning end below the safe end is raised to it rather than rejected.
    pub fn new(safe_end: f32, warning_end: f32, danger_start: f32) -> Self {
        let safe = unit(safe_end);
        let warning = unit(warning_end).max(safe);
        let danger = unit(danger_start).max(warning);
        let bounds = Self {
            safe_end: safe,
            warning_end: warning,
            danger_start: danger,
        };

        if safe != safe_end || warning != warning_end || danger != danger_start {
            tracing::warn!(
                safe_end,
                warning_end,
                danger_start,
                normalized = ?bounds,
                "zone bounds normalized"
            );
        }
        bounds
    }

    pub fn safe_end(&self) -> f32 {
        self.safe_end
    }

    pub fn warning_end(&self) -> f32 {
        self.warning_end
    }

    pub fn danger_start(&self) -> f32 {
        self.danger_start
    }

    pub fn as_tuple(&self) -> (f32, f32, f32) {
        (self.safe_end, self.warning_end, self.danger_start)
    }

    pub fn classify(&self, value: f32) -> Zone {
        classify(value, self)
    }
}

impl Default for ZoneBounds {
    fn default() -> Self {
        Self::new(0.33, 0.66, 1.0)
    }
}

/// Maps a normalised value onto a zone. Ties go to the safer zone.
pub fn classify(value: f32, bounds: &ZoneBounds) -> Zone {
    if value <= bounds.safe_end {
        Zone::Safe
    } else if value <= bounds.warning_end {
        Zone::Warning
    } else {
        Zone::Danger
    }
}

fn unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_favour_the_safer_zone() {
        let bounds = ZoneBounds::new(0.33, 0.66, 1.0);

        assert_eq!(classify(0.33, &bounds), Zone::Safe);
        assert_eq!(classify(0.330001, &bounds), Zone::Warning);
        assert_eq!(classify(0.66, &bounds), Zone::Warning);
        assert_eq!(classify(0.660001, &bounds), Zone::Danger);
        assert_eq!(classify(1.0, &bounds), Zone::Danger);
        assert_eq!(classify(0.0, &bounds), Zone::Safe);
    }

    #[test]
    fn raises_warning_end_to_safe_end() {
        let bounds = ZoneBounds::new(0.5, 0.2, 1.0);
        assert_eq!(bounds.as_tuple(), (0.5, 0.5, 1.0));
        assert_eq!(bounds.classify(0.5), Zone::Safe);
        assert_eq!(bounds.classify(0.51), Zone::Danger);
    }

    #[test]
    fn clamps_into_unit_range() {
        let bounds = ZoneBounds::new(-0.2, 1.4, 2.0);
        assert_eq!(bounds.as_tuple(), (0.0, 1.0, 1.0));

        let bounds = ZoneBounds::new(f32::NAN, 0.4, 0.1);
        assert_eq!(bounds.as_tuple(), (0.0, 0.4, 0.4));
    }

    #[test]
    fn neutral_bounds_are_all_zero() {
        assert_eq!(ZoneBounds::NEUTRAL.as_tuple(), (0.0, 0.0, 0.0));
    }
}
