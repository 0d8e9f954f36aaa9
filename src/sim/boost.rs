//! Zoomies: a timed speed boost granted by pickups

use serde::{Deserialize, Serialize};

use super::speed::SpeedModifier;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostConfig {
    pub speed_multiplier: f32,
    pub duration: f32,
    /// Re-collecting while active restarts the timer
    pub refresh_on_pickup: bool,
    /// When false, pickups collected during a boost are refused
    pub allow_pickup_while_active: bool,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.5,
            duration: 3.0,
            refresh_on_pickup: true,
            allow_pickup_while_active: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Boost {
    config: BoostConfig,
    remaining: f32,
}

impl Boost {
    pub fn new(config: BoostConfig) -> Self {
        Self {
            config,
            remaining: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn tick(&mut self, dt: f32) {
        if self.remaining > 0.0 {
            self.remaining = (self.remaining - dt.max(0.0)).max(0.0);
        }
    }

    /// Returns false when the pickup was refused
    pub fn try_activate(&mut self) -> bool {
        if self.is_active() {
            if !self.config.allow_pickup_while_active {
                return false;
            }
            if self.config.refresh_on_pickup {
                self.remaining = self.config.duration;
            }
            return true;
        }

        self.remaining = self.config.duration;
        log::debug!("Zoomies for {:.1}s", self.remaining);
        true
    }

    pub fn reset(&mut self) {
        self.remaining = 0.0;
    }
}

impl SpeedModifier for Boost {
    fn speed_multiplier(&self) -> f32 {
        if self.is_active() {
            self.config.speed_multiplier
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_and_expiry() {
        let mut boost = Boost::new(BoostConfig::default());
        assert_eq!(boost.speed_multiplier(), 1.0);
        assert!(boost.try_activate());
        assert_eq!(boost.speed_multiplier(), 1.5);

        boost.tick(2.0);
        assert!(boost.is_active());
        boost.tick(1.5);
        assert!(!boost.is_active());
        assert_eq!(boost.remaining(), 0.0);
    }

    #[test]
    fn test_refresh_while_active() {
        let mut boost = Boost::new(BoostConfig::default());
        boost.try_activate();
        boost.tick(2.0);
        assert!(boost.try_activate());
        assert_eq!(boost.remaining(), 3.0);
    }

    #[test]
    fn test_no_refresh_keeps_timer() {
        let mut boost = Boost::new(BoostConfig {
            refresh_on_pickup: false,
            ..Default::default()
        });
        boost.try_activate();
        boost.tick(2.0);
        assert!(boost.try_activate());
        assert!((boost.remaining() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_refused_while_active() {
        let mut boost = Boost::new(BoostConfig {
            allow_pickup_while_active: false,
            ..Default::default()
        });
        assert!(boost.try_activate());
        assert!(!boost.try_activate());
        boost.reset();
        assert!(boost.try_activate());
    }
}
