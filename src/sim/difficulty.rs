//! Difficulty curve
//!
//! Distance → (speed, density) multipliers. Pure: the same distance always
//! yields the same sample, so tests can pin exact values.

use serde::{Deserialize, Serialize};

use crate::consts::MIN_DURATION;

/// One key of a piecewise-linear curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub t: f32,
    pub value: f32,
}

/// Piecewise-linear response curve over normalized run progress
///
/// Keys must be sorted by `t`. Outside the first/last key the curve holds
/// its end value; an empty curve is the neutral multiplier 1.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseCurve {
    pub keys: Vec<CurveKey>,
}

impl ResponseCurve {
    /// Straight line from (0, start) to (1, end)
    pub fn linear(start: f32, end: f32) -> Self {
        Self {
            keys: vec![CurveKey { t: 0.0, value: start }, CurveKey { t: 1.0, value: end }],
        }
    }

    pub fn is_sorted(&self) -> bool {
        self.keys.windows(2).all(|w| w[0].t <= w[1].t)
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 1.0,
        };

        if t <= first.t {
            return first.value;
        }
        if t >= last.t {
            return last.value;
        }

        for pair in self.keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.t {
                let span = b.t - a.t;
                if span <= 0.0 {
                    return b.value;
                }
                let u = (t - a.t) / span;
                return a.value + (b.value - a.value) * u;
            }
        }

        last.value
    }
}

/// Curve definitions and clamp bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    /// Distance at which both curves reach t = 1 (meters)
    pub distance_for_max: f32,
    pub speed_curve: ResponseCurve,
    pub density_curve: ResponseCurve,
    pub min_speed_multiplier: f32,
    pub max_speed_multiplier: f32,
    pub min_density_multiplier: f32,
    pub max_density_multiplier: f32,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            distance_for_max: 800.0,
            speed_curve: ResponseCurve::linear(1.0, 1.35),
            density_curve: ResponseCurve::linear(1.0, 1.4),
            min_speed_multiplier: 0.8,
            max_speed_multiplier: 2.2,
            min_density_multiplier: 0.6,
            max_density_multiplier: 2.0,
        }
    }
}

/// Multipliers at a given distance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultySample {
    pub speed_multiplier: f32,
    pub density_multiplier: f32,
}

impl Default for DifficultySample {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            density_multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DifficultyCurve {
    config: DifficultyConfig,
}

/// Clamp that tolerates inverted or NaN bounds; the upper bound wins
fn bounded(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

impl DifficultyCurve {
    /// Bounds are expected to be validated (`RunConfig::validate`). Inverted
    /// bounds still evaluate without panicking.
    pub fn new(config: DifficultyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DifficultyConfig {
        &self.config
    }

    /// Normalized progress for a distance, clamped to [0, 1]
    pub fn progress(&self, distance: f32) -> f32 {
        let denom = self.config.distance_for_max.max(MIN_DURATION);
        (distance / denom).clamp(0.0, 1.0)
    }

    pub fn evaluate(&self, distance: f32) -> DifficultySample {
        let t = self.progress(distance);
        let c = &self.config;

        DifficultySample {
            speed_multiplier: bounded(
                c.speed_curve.evaluate(t),
                c.min_speed_multiplier,
                c.max_speed_multiplier,
            ),
            density_multiplier: bounded(
                c.density_curve.evaluate(t),
                c.min_density_multiplier,
                c.max_density_multiplier,
            ),
        }
    }
}
