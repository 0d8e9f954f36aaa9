//! Forward speed composition
//!
//! Forward speed = base × product of every active multiplier source, with each
//! source floored at zero and the product capped.

use serde::{Deserialize, Serialize};

use super::difficulty::DifficultySample;

/// Anything that scales forward speed
pub trait SpeedModifier {
    fn speed_multiplier(&self) -> f32;
}

/// A constant factor
impl SpeedModifier for f32 {
    fn speed_multiplier(&self) -> f32 {
        *self
    }
}

impl SpeedModifier for DifficultySample {
    fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    /// Cap on the combined multiplier
    pub max_speed_multiplier: f32,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            max_speed_multiplier: 3.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpeedCompositor {
    config: SpeedConfig,
}

impl SpeedCompositor {
    pub fn new(config: SpeedConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SpeedConfig {
        &self.config
    }

    /// Combined multiplier of all sources, in [0, max_speed_multiplier]
    pub fn multiplier(&self, sources: &[&dyn SpeedModifier]) -> f32 {
        let product: f32 = sources
            .iter()
            .map(|s| s.speed_multiplier().max(0.0))
            .product();
        product.min(self.config.max_speed_multiplier.max(0.0))
    }

    pub fn compose(&self, base_speed: f32, sources: &[&dyn SpeedModifier]) -> f32 {
        base_speed.max(0.0) * self.multiplier(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_of_sources() {
        let speed = SpeedCompositor::default();
        let difficulty = DifficultySample {
            speed_multiplier: 1.2,
            density_multiplier: 1.0,
        };
        let result = speed.compose(10.0, &[&difficulty, &0.5f32]);
        assert!((result - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_no_sources_is_base() {
        let speed = SpeedCompositor::default();
        assert_eq!(speed.compose(9.0, &[]), 9.0);
    }

    #[test]
    fn test_cap_and_floor() {
        let speed = SpeedCompositor::default();
        assert_eq!(speed.multiplier(&[&2.0f32, &2.0f32]), 3.0);
        assert_eq!(speed.multiplier(&[&-1.0f32, &2.0f32]), 0.0);
        assert_eq!(speed.compose(-5.0, &[&1.0f32]), 0.0);
    }
}
