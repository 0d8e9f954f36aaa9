//! Run configuration
//!
//! One aggregate, loaded and validated once per run. Every section falls back
//! to its defaults, so a JSON file only needs the values it changes.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sim::boost::BoostConfig;
use crate::sim::difficulty::DifficultyConfig;
use crate::sim::hazard::StumblePolicy;
use crate::sim::lane::LaneMask;
use crate::sim::runner::RunnerConfig;
use crate::sim::score::ScoreConfig;
use crate::sim::spawner::{ContentCatalog, ObstacleRow, PatternSet, PickupRow, PickupType};
use crate::sim::speed::SpeedConfig;
use crate::sim::track::{SegmentTemplate, StreamingConfig};

/// Built-in lane-proximity collision probe
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Half the longitudinal extent of the runner's hit box (meters)
    pub half_depth: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self { half_depth: 0.5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub runner: RunnerConfig,
    pub streaming: StreamingConfig,
    pub difficulty: DifficultyConfig,
    pub stumble: StumblePolicy,
    pub speed: SpeedConfig,
    pub boost: BoostConfig,
    pub score: ScoreConfig,
    pub collision: CollisionConfig,
    pub segments: Vec<SegmentTemplate>,
    pub catalog: ContentCatalog,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            runner: RunnerConfig::default(),
            streaming: StreamingConfig::default(),
            difficulty: DifficultyConfig::default(),
            stumble: StumblePolicy::default(),
            speed: SpeedConfig::default(),
            boost: BoostConfig::default(),
            score: ScoreConfig::default(),
            collision: CollisionConfig::default(),
            segments: default_segments(),
            catalog: ContentCatalog::default(),
        }
    }
}

fn obstacle(offset: f32, lanes: LaneMask, id: &str, chance: f32) -> ObstacleRow {
    ObstacleRow {
        offset,
        lanes,
        obstacle_id: id.to_string(),
        chance,
    }
}

fn pickup(offset: f32, lanes: LaneMask, pickup_type: PickupType, amount: u32, chance: f32) -> PickupRow {
    PickupRow {
        offset,
        lanes,
        pickup_type,
        amount,
        chance,
    }
}

/// Stock straight segments, one per obstacle flavour
fn default_segments() -> Vec<SegmentTemplate> {
    vec![
        SegmentTemplate {
            name: "meadow".to_string(),
            pickup_patterns: PatternSet::new(vec![
                pickup(6.0, LaneMask::MIDDLE, PickupType::Treat, 1, 0.8),
                pickup(14.0, LaneMask::LEFT | LaneMask::RIGHT, PickupType::Treat, 1, 0.5),
            ]),
            ..Default::default()
        },
        SegmentTemplate {
            name: "rocks".to_string(),
            obstacle_patterns: PatternSet::new(vec![obstacle(
                10.0,
                LaneMask::LEFT | LaneMask::RIGHT,
                "RockFull",
                0.5,
            )]),
            pickup_patterns: PatternSet::new(vec![pickup(
                10.0,
                LaneMask::MIDDLE,
                PickupType::Treat,
                2,
                0.6,
            )]),
            ..Default::default()
        },
        SegmentTemplate {
            name: "branches".to_string(),
            obstacle_patterns: PatternSet::new(vec![obstacle(12.0, LaneMask::ALL, "BranchLow", 0.35)]),
            pickup_patterns: PatternSet::new(vec![
                pickup(5.0, LaneMask::MIDDLE, PickupType::Zoomies, 1, 0.15),
                pickup(16.0, LaneMask::LEFT, PickupType::BadFood, 1, 0.2),
            ]),
            ..Default::default()
        },
        SegmentTemplate {
            name: "fences".to_string(),
            obstacle_patterns: PatternSet {
                rows: Vec::new(),
                variants: vec![
                    vec![obstacle(8.0, LaneMask::MIDDLE, "FenceHigh", 0.4)],
                    vec![
                        obstacle(8.0, LaneMask::LEFT, "FenceHigh", 0.4),
                        obstacle(14.0, LaneMask::RIGHT, "RockFull", 0.3),
                    ],
                ],
            },
            pickup_patterns: PatternSet {
                rows: Vec::new(),
                variants: vec![
                    vec![pickup(4.0, LaneMask::LEFT, PickupType::Gem, 1, 0.3)],
                    vec![pickup(4.0, LaneMask::RIGHT, PickupType::Treat, 2, 0.7)],
                ],
            },
            ..Default::default()
        },
    ]
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn ordered(field: &'static str, min: f32, max: f32) -> Result<(), ConfigError> {
    if min <= max {
        Ok(())
    } else {
        Err(ConfigError::InvertedBounds { field, min, max })
    }
}

fn in_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            min,
            max,
            value,
        })
    }
}

impl RunConfig {
    /// Parse and validate in one step
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every rule; the first violation wins
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.runner;
        positive("runner.lane_width", r.lane_width)?;
        positive("runner.lane_change_duration", r.lane_change_duration)?;
        positive("runner.jump_height", r.jump_height)?;
        positive("runner.jump_duration", r.jump_duration)?;
        positive("runner.slide_duration", r.slide_duration)?;
        positive("runner.base_forward_speed", r.base_forward_speed)?;

        let s = &self.streaming;
        positive("streaming.spawn_ahead_threshold", s.spawn_ahead_threshold)?;
        positive("streaming.despawn_behind_distance", s.despawn_behind_distance)?;
        if s.max_alive_segments == 0 {
            return Err(ConfigError::ZeroCount {
                field: "streaming.max_alive_segments",
            });
        }

        let d = &self.difficulty;
        positive("difficulty.distance_for_max", d.distance_for_max)?;
        ordered("difficulty.speed_multiplier", d.min_speed_multiplier, d.max_speed_multiplier)?;
        ordered(
            "difficulty.density_multiplier",
            d.min_density_multiplier,
            d.max_density_multiplier,
        )?;
        if !d.speed_curve.is_sorted() {
            return Err(ConfigError::UnsortedCurve {
                field: "difficulty.speed_curve",
            });
        }
        if !d.density_curve.is_sorted() {
            return Err(ConfigError::UnsortedCurve {
                field: "difficulty.density_curve",
            });
        }

        let st = &self.stumble;
        if st.enabled {
            positive("stumble.slow_duration", st.slow_duration)?;
            positive("stumble.invulnerability_duration", st.invulnerability_duration)?;
            in_range("stumble.slow_multiplier", st.slow_multiplier, 0.0, 1.0)?;
            in_range("stumble.min_speed_multiplier", st.min_speed_multiplier, 0.0, 1.0)?;
        }

        positive("speed.max_speed_multiplier", self.speed.max_speed_multiplier)?;
        positive("boost.speed_multiplier", self.boost.speed_multiplier)?;
        positive("boost.duration", self.boost.duration)?;
        positive("score.score_per_meter", self.score.score_per_meter)?;
        ordered("score.multiplier", 1.0, self.score.max_multiplier)?;
        positive("collision.half_depth", self.collision.half_depth)?;

        self.validate_segments()
    }

    fn validate_segments(&self) -> Result<(), ConfigError> {
        if self.segments.is_empty() {
            return Err(ConfigError::NoSegmentTemplates);
        }

        for segment in &self.segments {
            for row in segment.obstacle_patterns.all_rows() {
                if self.catalog.obstacle_id(&row.obstacle_id).is_none() {
                    return Err(ConfigError::UnknownContent {
                        segment: segment.name.clone(),
                        id: row.obstacle_id.clone(),
                    });
                }
            }
            for row in segment.pickup_patterns.all_rows() {
                if self.catalog.pickup_id(row.pickup_type).is_none() {
                    return Err(ConfigError::UnknownContent {
                        segment: segment.name.clone(),
                        id: format!("{:?}", row.pickup_type),
                    });
                }
                if row.amount == 0 {
                    return Err(ConfigError::InvalidAmount {
                        segment: segment.name.clone(),
                        amount: row.amount,
                    });
                }
            }
        }

        Ok(())
    }
}
