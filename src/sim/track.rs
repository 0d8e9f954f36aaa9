//! Track segment streaming
//!
//! Keeps a bounded, distance-ordered window of segments around the runner:
//! spawns ahead while the track end is within `spawn_ahead_threshold`, and
//! recycles segments once they are `despawn_behind_distance` behind.
//!
//! Segments are appended in travel order and only ever removed from the front,
//! so the alive queue stays sorted by `end_distance` without any sorting.

use std::collections::VecDeque;

use glam::{Quat, Vec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::distance::DistanceProvider;
use super::pool::{Handle, Pool, Poolable, TemplateId};
use super::spawner::{ObstacleRow, PatternSet, PickupRow};
use crate::consts::MIN_SEGMENT_LENGTH;
use crate::error::ConfigError;

/// Rigid transform (position + rotation)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// World pose of a child given in this pose's local space
    pub fn compose(&self, local: &Pose) -> Pose {
        Pose {
            position: self.transform_point(local.position),
            rotation: self.rotation * local.rotation,
        }
    }

    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// Move/rotate `self` so that its child `local` lands exactly on `target`
    pub fn align_child_to(&mut self, local: &Pose, target: &Pose) {
        let child = self.compose(local);
        let rotation_delta = target.rotation * child.rotation.inverse();
        self.rotation = (rotation_delta * self.rotation).normalize();

        let child = self.compose(local);
        self.position += target.position - child.position;
    }
}

/// A track template: anchors in the segment's local space plus its content patterns
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentTemplate {
    pub name: String,
    pub start_anchor: Pose,
    pub end_anchor: Pose,
    /// Left, Middle, Right lane anchors (local space)
    pub lane_anchors: [Vec3; 3],
    pub obstacle_patterns: PatternSet<ObstacleRow>,
    pub pickup_patterns: PatternSet<PickupRow>,
}

impl Default for SegmentTemplate {
    fn default() -> Self {
        Self {
            name: "straight".to_string(),
            start_anchor: Pose::IDENTITY,
            end_anchor: Pose::from_position(Vec3::new(0.0, 0.0, 20.0)),
            lane_anchors: [
                Vec3::new(-2.2, 0.0, 0.0),
                Vec3::ZERO,
                Vec3::new(2.2, 0.0, 0.0),
            ],
            obstacle_patterns: PatternSet::default(),
            pickup_patterns: PatternSet::default(),
        }
    }
}

impl SegmentTemplate {
    /// Anchor-to-anchor length, floored so no segment is zero-length
    pub fn length(&self) -> f32 {
        self.start_anchor
            .position
            .distance(self.end_anchor.position)
            .max(MIN_SEGMENT_LENGTH)
    }

    /// Local unit direction from the start anchor to the end anchor
    pub fn forward(&self) -> Vec3 {
        let dir = (self.end_anchor.position - self.start_anchor.position).normalize_or_zero();
        if dir == Vec3::ZERO { Vec3::Z } else { dir }
    }

    /// How far along the segment a local point sits, measured from the start anchor
    pub fn distance_along(&self, local: Vec3) -> f32 {
        (local - self.start_anchor.position).dot(self.forward())
    }
}

/// Streaming thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Keep spawning while the track end is closer than this (meters)
    pub spawn_ahead_threshold: f32,
    /// Recycle a segment once its end is this far behind the runner (meters)
    pub despawn_behind_distance: f32,
    pub max_alive_segments: usize,
    /// Segments spawned at run start, before any distance accrues
    pub initial_segments: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            spawn_ahead_threshold: 25.0,
            despawn_behind_distance: 40.0,
            max_alive_segments: 10,
            initial_segments: 8,
        }
    }
}

/// Runtime instance of a segment template
#[derive(Debug, Clone)]
pub struct SegmentInstance {
    pub template: TemplateId,
    /// Root transform in world space
    pub pose: Pose,
}

impl Poolable for SegmentInstance {}

/// Alive-window record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AliveSegment {
    pub template: TemplateId,
    pub handle: Handle,
    pub start_distance: f32,
    pub end_distance: f32,
}

/// Everything a listener needs to populate a freshly spawned segment
#[derive(Debug)]
pub struct SpawnedSegment<'a> {
    pub alive: AliveSegment,
    pub pose: Pose,
    pub template: &'a SegmentTemplate,
}

/// Receives segment activation/deactivation, in spawn/despawn order
pub trait SegmentListener {
    fn on_segment_activated(&mut self, segment: &SpawnedSegment<'_>);
    fn on_segment_deactivated(&mut self, segment: &AliveSegment);
}

impl SegmentListener for () {
    fn on_segment_activated(&mut self, _segment: &SpawnedSegment<'_>) {}
    fn on_segment_deactivated(&mut self, _segment: &AliveSegment) {}
}

pub struct TrackStreamer {
    config: StreamingConfig,
    templates: Vec<SegmentTemplate>,
    pool: Pool<SegmentInstance>,
    alive: VecDeque<AliveSegment>,
    rng: Pcg32,
    last_end_distance: f32,
    last_end_anchor: Option<Pose>,
}

impl TrackStreamer {
    /// Refuses to build without at least one template
    pub fn new(
        config: StreamingConfig,
        templates: Vec<SegmentTemplate>,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        if templates.is_empty() {
            return Err(ConfigError::NoSegmentTemplates);
        }
        if templates.len() > u16::MAX as usize {
            return Err(ConfigError::OutOfRange {
                field: "segments",
                min: 1.0,
                max: u16::MAX as f32,
                value: templates.len() as f32,
            });
        }

        Ok(Self {
            alive: VecDeque::with_capacity(config.max_alive_segments),
            config,
            templates,
            pool: Pool::new(),
            rng: Pcg32::seed_from_u64(seed),
            last_end_distance: 0.0,
            last_end_anchor: None,
        })
    }

    /// Recycle every alive segment, reseed, and pre-spawn the initial window.
    /// The pool survives so a restart reuses the previous run's instances.
    pub fn reset(&mut self, seed: u64, listener: &mut impl SegmentListener) {
        self.clear(listener);
        self.rng = Pcg32::seed_from_u64(seed);
        self.last_end_distance = 0.0;
        self.last_end_anchor = None;

        let initial = self.config.initial_segments.min(self.config.max_alive_segments);
        for _ in 0..initial {
            self.spawn_next(listener);
        }
        log::debug!(
            "Track reset: {} segments, {:.1} m ahead",
            self.alive.len(),
            self.last_end_distance
        );
    }

    /// Return every alive segment to the pool
    pub fn clear(&mut self, listener: &mut impl SegmentListener) {
        while let Some(seg) = self.alive.pop_front() {
            listener.on_segment_deactivated(&seg);
            self.pool.give_back(seg.template, seg.handle);
        }
    }

    /// Spawn ahead / despawn behind for the runner's current distance
    pub fn update(
        &mut self,
        runner: &(impl DistanceProvider + ?Sized),
        listener: &mut impl SegmentListener,
    ) {
        let runner_distance = runner.distance_travelled_meters();

        while self.last_end_distance - runner_distance < self.config.spawn_ahead_threshold
            && self.alive.len() < self.config.max_alive_segments
        {
            self.spawn_next(listener);
        }

        while let Some(front) = self.alive.front().copied() {
            if runner_distance - front.end_distance < self.config.despawn_behind_distance {
                break;
            }
            self.alive.pop_front();
            listener.on_segment_deactivated(&front);
            self.pool.give_back(front.template, front.handle);
            log::debug!(
                "Despawned segment {:?} ending at {:.1} m",
                front.handle,
                front.end_distance
            );
        }
    }

    /// Rent, align and append one segment
    pub fn spawn_next(&mut self, listener: &mut impl SegmentListener) {
        let template_id = self.pick_template();
        let template = &self.templates[template_id.index()];

        let handle = self.pool.rent(template_id, || SegmentInstance {
            template: template_id,
            pose: Pose::IDENTITY,
        });

        let target = self.last_end_anchor.unwrap_or(Pose::IDENTITY);
        let Some(instance) = self.pool.get_mut(handle) else {
            return;
        };
        instance.pose.align_child_to(&template.start_anchor, &target);
        let pose = instance.pose;

        let start = pose.compose(&template.start_anchor);
        let end = pose.compose(&template.end_anchor);
        let length = start.position.distance(end.position).max(MIN_SEGMENT_LENGTH);

        let alive = AliveSegment {
            template: template_id,
            handle,
            start_distance: self.last_end_distance,
            end_distance: self.last_end_distance + length,
        };
        self.alive.push_back(alive);
        self.last_end_anchor = Some(end);
        self.last_end_distance = alive.end_distance;

        log::debug!(
            "Spawned segment `{}` {:?} [{:.1}, {:.1}] m",
            template.name,
            handle,
            alive.start_distance,
            alive.end_distance
        );

        listener.on_segment_activated(&SpawnedSegment {
            alive,
            pose,
            template,
        });
    }

    fn pick_template(&mut self) -> TemplateId {
        let index = self.rng.random_range(0..self.templates.len());
        TemplateId(index as u16)
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    pub fn templates(&self) -> &[SegmentTemplate] {
        &self.templates
    }

    pub fn alive(&self) -> impl Iterator<Item = &AliveSegment> {
        self.alive.iter()
    }

    pub fn alive_count(&self) -> usize {
        self.alive.len()
    }

    pub fn last_end_distance(&self) -> f32 {
        self.last_end_distance
    }

    pub fn last_end_anchor(&self) -> Option<Pose> {
        self.last_end_anchor
    }

    pub fn segment(&self, handle: Handle) -> Option<&SegmentInstance> {
        self.pool.get(handle)
    }

    pub fn pool(&self) -> &Pool<SegmentInstance> {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn template(name: &str, length: f32) -> SegmentTemplate {
        SegmentTemplate {
            name: name.to_string(),
            end_anchor: Pose::from_position(Vec3::new(0.0, 0.0, length)),
            ..Default::default()
        }
    }

    fn streamer(config: StreamingConfig) -> TrackStreamer {
        TrackStreamer::new(config, vec![template("a", 20.0), template("b", 30.0)], 7)
            .unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        activated: Vec<Handle>,
        deactivated: Vec<Handle>,
    }

    impl SegmentListener for Recorder {
        fn on_segment_activated(&mut self, segment: &SpawnedSegment<'_>) {
            self.activated.push(segment.alive.handle);
        }
        fn on_segment_deactivated(&mut self, segment: &AliveSegment) {
            self.deactivated.push(segment.handle);
        }
    }

    #[test]
    fn test_no_templates_is_config_error() {
        let result = TrackStreamer::new(StreamingConfig::default(), Vec::new(), 1);
        assert!(matches!(result, Err(ConfigError::NoSegmentTemplates)));
    }

    #[test]
    fn test_reset_prespawns_initial_segments() {
        let mut track = streamer(StreamingConfig::default());
        let mut rec = Recorder::default();
        track.reset(1, &mut rec);
        assert_eq!(track.alive_count(), 8);
        assert_eq!(rec.activated.len(), 8);
    }

    #[test]
    fn test_initial_segments_respect_max_alive() {
        let config = StreamingConfig {
            initial_segments: 20,
            max_alive_segments: 5,
            ..Default::default()
        };
        let mut track = streamer(config);
        track.reset(1, &mut ());
        assert_eq!(track.alive_count(), 5);
    }

    #[test]
    fn test_segments_chain_end_to_start() {
        let mut track = streamer(StreamingConfig::default());
        track.reset(3, &mut ());

        let segs: Vec<AliveSegment> = track.alive().copied().collect();
        let first = track.segment(segs[0].handle).unwrap();
        let first_template = &track.templates()[first.template.index()];
        let first_start = first.pose.compose(&first_template.start_anchor);
        assert!(first_start.position.length() < 1e-4);

        for pair in segs.windows(2) {
            let a = track.segment(pair[0].handle).unwrap();
            let b = track.segment(pair[1].handle).unwrap();
            let a_end = a.pose.compose(&track.templates()[a.template.index()].end_anchor);
            let b_start = b.pose.compose(&track.templates()[b.template.index()].start_anchor);
            assert!(a_end.position.distance(b_start.position) < 1e-3);
            assert_eq!(pair[0].end_distance, pair[1].start_distance);
            assert!(pair[0].end_distance < pair[1].end_distance);
        }
    }

    #[test]
    fn test_alignment_follows_rotated_anchor() {
        let mut root = Pose::IDENTITY;
        let local = Pose::from_position(Vec3::new(0.0, 0.0, -1.0));
        let target = Pose {
            position: Vec3::new(5.0, 0.0, 5.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        };
        root.align_child_to(&local, &target);
        let child = root.compose(&local);
        assert!(child.position.distance(target.position) < 1e-4);
        assert!(child.rotation.angle_between(target.rotation) < 1e-4);
    }

    #[test]
    fn test_zero_length_segment_is_floored() {
        let tpl = template("flat", 0.0);
        assert_eq!(tpl.length(), MIN_SEGMENT_LENGTH);

        let config = StreamingConfig {
            initial_segments: 3,
            ..Default::default()
        };
        let mut track = TrackStreamer::new(config, vec![tpl], 1).unwrap();
        track.reset(1, &mut ());
        assert!((track.last_end_distance() - 3.0 * MIN_SEGMENT_LENGTH).abs() < 1e-6);
    }

    #[test]
    fn test_distance_along_runs_from_start_anchor() {
        let tpl = SegmentTemplate {
            start_anchor: Pose::from_position(Vec3::new(1.0, 0.0, -10.0)),
            end_anchor: Pose::from_position(Vec3::new(1.0, 0.0, 10.0)),
            ..Default::default()
        };
        assert_eq!(tpl.forward(), Vec3::Z);
        assert!((tpl.distance_along(Vec3::new(-2.2, 0.0, 5.0)) - 15.0).abs() < 1e-5);
        assert!(tpl.distance_along(tpl.start_anchor.position).abs() < 1e-5);

        // Degenerate anchors fall back to local +Z
        assert_eq!(template("flat", 0.0).forward(), Vec3::Z);
    }

    #[test]
    fn test_despawned_segments_return_to_pool() {
        let mut track = streamer(StreamingConfig::default());
        let mut rec = Recorder::default();
        track.reset(1, &mut rec);

        track.update(&500.0f32, &mut rec);
        assert!(!rec.deactivated.is_empty());
        for handle in &rec.deactivated {
            assert!(!track.pool().is_active(*handle));
        }
        assert_eq!(track.pool().active_count(), track.alive_count());
    }

    #[test]
    fn test_restart_reuses_pooled_instances() {
        let mut track = streamer(StreamingConfig::default());
        track.reset(1, &mut ());
        let created = track.pool().created();
        track.reset(1, &mut ());
        assert_eq!(track.pool().created(), created);
        assert_eq!(track.alive_count(), 8);
    }

    #[test]
    fn test_same_seed_same_track() {
        let mut a = streamer(StreamingConfig::default());
        let mut b = streamer(StreamingConfig::default());
        a.reset(42, &mut ());
        b.reset(42, &mut ());
        for d in [10.0f32, 80.0, 200.0, 450.0] {
            a.update(&d, &mut ());
            b.update(&d, &mut ());
        }
        let ta: Vec<_> = a.alive().map(|s| (s.template, s.end_distance)).collect();
        let tb: Vec<_> = b.alive().map(|s| (s.template, s.end_distance)).collect();
        assert_eq!(ta, tb);
    }

    proptest! {
        #[test]
        fn prop_window_bounded(
            seed in any::<u64>(),
            steps in proptest::collection::vec(0.0f32..60.0, 1..120),
        ) {
            let config = StreamingConfig::default();
            let mut track = streamer(config.clone());
            track.reset(seed, &mut ());

            let mut distance = 0.0f32;
            for step in steps {
                distance += step;
                track.update(&distance, &mut ());
                prop_assert!(track.alive_count() <= config.max_alive_segments);
                for seg in track.alive() {
                    prop_assert!(seg.end_distance > distance - config.despawn_behind_distance);
                }
                let ends: Vec<f32> = track.alive().map(|s| s.end_distance).collect();
                prop_assert!(ends.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }
}
