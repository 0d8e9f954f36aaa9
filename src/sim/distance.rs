//! Distance travelled along the track

use serde::{Deserialize, Serialize};

/// Read-only access to the runner's cumulative distance (meters)
///
/// Guaranteed monotonically non-decreasing over a run.
pub trait DistanceProvider {
    fn distance_travelled_meters(&self) -> f32;
}

/// A fixed distance sample, handy for driving the streamer directly
impl DistanceProvider for f32 {
    fn distance_travelled_meters(&self) -> f32 {
        *self
    }
}

/// Integrates forward speed into meters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DistanceTracker {
    distance: f32,
}

impl DistanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate `speed * dt`; negative speed or time contributes nothing.
    /// Returns the distance covered this tick.
    pub fn tick(&mut self, forward_speed: f32, dt: f32) -> f32 {
        let delta = forward_speed.max(0.0) * dt.max(0.0);
        self.distance += delta;
        delta
    }
}

impl DistanceProvider for DistanceTracker {
    fn distance_travelled_meters(&self) -> f32 {
        self.distance
    }
}
