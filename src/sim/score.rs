//! Distance-based score
//!
//! Whole points are banked each tick; the fractional remainder carries over so
//! slow runs still score.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    pub score_per_meter: f32,
    pub base_multiplier: f32,
    pub max_multiplier: f32,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            score_per_meter: 1.0,
            base_multiplier: 1.0,
            max_multiplier: 30.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Score {
    config: ScoreConfig,
    score: u64,
    remainder: f32,
    multiplier: f32,
}

impl Score {
    pub fn new(config: ScoreConfig) -> Self {
        let mut score = Self {
            config,
            score: 0,
            remainder: 0.0,
            multiplier: 1.0,
        };
        score.multiplier = score.clamp_multiplier(score.config.base_multiplier);
        score
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    pub fn set_multiplier(&mut self, multiplier: f32) {
        self.multiplier = self.clamp_multiplier(multiplier);
    }

    /// Bank the points earned over `distance_delta` meters
    pub fn add_distance(&mut self, distance_delta: f32) {
        if distance_delta <= 0.0 {
            return;
        }
        self.remainder += distance_delta * self.config.score_per_meter * self.multiplier;

        let whole = self.remainder.floor();
        if whole >= 1.0 {
            self.score += whole as u64;
            self.remainder -= whole;
        }
    }

    pub fn reset(&mut self) {
        self.score = 0;
        self.remainder = 0.0;
        self.multiplier = self.clamp_multiplier(self.config.base_multiplier);
    }

    fn clamp_multiplier(&self, multiplier: f32) -> f32 {
        multiplier.max(1.0).min(self.config.max_multiplier.max(1.0))
    }
}
