//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied `dt` only, no wall clock
//! - Seeded RNG only (one stream per streamer and spawner)
//! - Stable iteration order (alive queue order, pool handle order)
//! - No rendering, physics engine or platform dependencies

pub mod boost;
pub mod difficulty;
pub mod distance;
pub mod hazard;
pub mod lane;
pub mod pool;
pub mod runner;
pub mod score;
pub mod spawner;
pub mod speed;
pub mod tick;
pub mod track;

pub use boost::{Boost, BoostConfig};
pub use difficulty::{CurveKey, DifficultyConfig, DifficultyCurve, DifficultySample, ResponseCurve};
pub use distance::{DistanceProvider, DistanceTracker};
pub use hazard::{
    HazardResolver, HitOutcome, ObstacleContact, Posture, RunFailReason, RunFailSink, RunStatus,
    StumblePolicy, is_safe,
};
pub use lane::{Lane, LaneMask, ObstacleLaneMask, PickupLaneMask};
pub use pool::{Handle, Pool, Poolable, TemplateId};
pub use runner::{
    RunnerCommand, RunnerConfig, RunnerEvent, RunnerEventQueue, RunnerEventSink, RunnerFrame,
    RunnerMotion, RunnerState,
};
pub use score::{Score, ScoreConfig};
pub use spawner::{
    ContentCatalog, Obstacle, ObstacleRow, ObstacleTemplate, ObstacleType, PatternSet, Pickup,
    PickupCollected, PickupRow, PickupTemplate, PickupType, SegmentSpawners,
};
pub use speed::{SpeedCompositor, SpeedConfig, SpeedModifier};
pub use tick::{RunSession, Simulation, TickInput};
pub use track::{
    AliveSegment, Pose, SegmentInstance, SegmentListener, SegmentTemplate, SpawnedSegment,
    StreamingConfig, TrackStreamer,
};
