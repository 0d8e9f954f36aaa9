//! Fixed timestep simulation tick
//!
//! `Simulation` owns the long-lived parts (track streamer, content spawners and
//! their pools) and an optional per-run `RunSession`. Each tick runs the
//! components in a fixed order so the same seed and inputs always produce the
//! same run.

use super::boost::Boost;
use super::difficulty::{DifficultyCurve, DifficultySample};
use super::distance::{DistanceProvider, DistanceTracker};
use super::hazard::{
    HazardResolver, HitOutcome, ObstacleContact, Posture, RunFailReason, RunStatus,
};
use super::lane::Lane;
use super::runner::{RunnerCommand, RunnerEvent, RunnerEventQueue, RunnerFrame, RunnerMotion};
use super::score::Score;
use super::spawner::{ObstacleType, PickupCollected, PickupType, SegmentSpawners};
use super::speed::SpeedCompositor;
use super::track::TrackStreamer;
use crate::config::RunConfig;
use crate::error::ConfigError;

/// Spawner RNG stream is split from the track's so the two never correlate
const SPAWNER_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Input commands for a single tick, in arrival order
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub commands: Vec<RunnerCommand>,
}

impl TickInput {
    pub fn command(command: RunnerCommand) -> Self {
        Self {
            commands: vec![command],
        }
    }
}

/// Everything that lives exactly as long as one run
pub struct RunSession {
    seed: u64,
    motion: RunnerMotion<RunnerEventQueue>,
    distance: DistanceTracker,
    difficulty: DifficultySample,
    hazard: HazardResolver<RunStatus>,
    boost: Boost,
    score: Score,
    collected: Vec<PickupCollected>,
    last_frame: RunnerFrame,
    ticks: u64,
}

impl RunSession {
    fn new(config: &RunConfig, seed: u64) -> Self {
        let motion = RunnerMotion::new(config.runner.clone(), RunnerEventQueue::new());
        let last_frame = motion.frame();
        Self {
            seed,
            motion,
            distance: DistanceTracker::new(),
            difficulty: DifficultySample::default(),
            hazard: HazardResolver::new(config.stumble.clone(), RunStatus::new()),
            boost: Boost::new(config.boost.clone()),
            score: Score::new(config.score.clone()),
            collected: Vec::new(),
            last_frame,
            ticks: 0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn motion(&self) -> &RunnerMotion<RunnerEventQueue> {
        &self.motion
    }

    pub fn distance(&self) -> &DistanceTracker {
        &self.distance
    }

    pub fn difficulty(&self) -> DifficultySample {
        self.difficulty
    }

    pub fn hazard(&self) -> &HazardResolver<RunStatus> {
        &self.hazard
    }

    pub fn boost(&self) -> &Boost {
        &self.boost
    }

    pub fn score(&self) -> &Score {
        &self.score
    }

    /// Last frame handed to the presentation layer
    pub fn frame(&self) -> RunnerFrame {
        self.last_frame
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_failed(&self) -> bool {
        self.hazard.has_failed()
    }

    pub fn failure(&self) -> Option<(RunFailReason, Option<ObstacleType>)> {
        self.hazard.sink().failure()
    }

    fn posture(&self) -> Posture {
        let state = self.motion.state();
        Posture {
            is_jumping: state.is_jumping,
            is_sliding: state.is_sliding,
        }
    }

    /// Keep the last pose but stop moving
    fn freeze(&mut self) -> RunnerFrame {
        self.last_frame.forward_speed = 0.0;
        self.last_frame
    }
}

pub struct Simulation {
    config: RunConfig,
    difficulty: DifficultyCurve,
    speed: SpeedCompositor,
    track: TrackStreamer,
    spawners: SegmentSpawners,
    session: Option<RunSession>,
}

impl Simulation {
    /// Validate the config and build the long-lived components. No run is
    /// active until `start_run`.
    pub fn new(config: RunConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let track = TrackStreamer::new(config.streaming.clone(), config.segments.clone(), 0)?;
        let spawners = SegmentSpawners::new(config.catalog.clone(), SPAWNER_SEED_SALT);

        Ok(Self {
            difficulty: DifficultyCurve::new(config.difficulty.clone()),
            speed: SpeedCompositor::new(config.speed.clone()),
            track,
            spawners,
            session: None,
            config,
        })
    }

    /// Begin a fresh run. Any previous run's segments and content go back to
    /// the pools first; the pools themselves carry over.
    pub fn start_run(&mut self, seed: u64) {
        if self.session.is_some() {
            log::debug!("Restarting run");
        }

        let start = self.difficulty.evaluate(0.0);
        self.spawners.reseed(seed ^ SPAWNER_SEED_SALT);
        self.spawners.set_density(start.density_multiplier);
        self.track.reset(seed, &mut self.spawners);

        let mut session = RunSession::new(&self.config, seed);
        session.difficulty = start;
        self.session = Some(session);

        log::info!(
            "Run started (seed {seed}, {} segments ready)",
            self.track.alive_count()
        );
    }

    /// Drop the current run and recycle everything it spawned
    pub fn end_run(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.track.clear(&mut self.spawners);
        log::info!(
            "Run ended after {:.1} m, score {}",
            session.distance.distance_travelled_meters(),
            session.score.score()
        );
    }

    /// Advance the active run by `dt`. Returns `None` when no run is active.
    pub fn tick(&mut self, input: &TickInput, dt: f32) -> Option<RunnerFrame> {
        let session = self.session.as_mut()?;

        if session.is_failed() {
            return Some(session.freeze());
        }

        let dt = dt.max(0.0);
        session.ticks += 1;

        // Timers
        session.hazard.tick(dt);
        session.boost.tick(dt);

        // Forward speed from every active multiplier
        let speed = self.speed.compose(
            self.config.runner.base_forward_speed,
            &[&session.difficulty, &session.hazard, &session.boost],
        );
        session.motion.set_forward_speed(speed);

        // Commands
        if session.hazard.input_locked() {
            if !input.commands.is_empty() {
                log::warn!(
                    "Input locked while stumbling, dropped {} command(s)",
                    input.commands.len()
                );
            }
        } else {
            for &command in &input.commands {
                session.motion.handle_command(command);
            }
        }

        // Motion and distance
        let frame = session.motion.tick(dt);
        let delta = session.distance.tick(frame.forward_speed, dt);
        session.score.add_distance(delta);
        session.last_frame = frame;

        // Difficulty drives the next tick's speed and the density of new segments
        let distance = session.distance.distance_travelled_meters();
        session.difficulty = self.difficulty.evaluate(distance);
        self.spawners.set_density(session.difficulty.density_multiplier);

        // Streaming and content
        self.track.update(&session.distance, &mut self.spawners);
        self.spawners.tick(dt);

        probe_lane(
            &mut self.spawners,
            session,
            self.config.runner.lane_width,
            self.config.collision.half_depth,
        );

        if session.is_failed() {
            return Some(session.freeze());
        }
        Some(frame)
    }

    /// Feed a contact from an external physics layer
    pub fn report_contact(&mut self, contact: ObstacleContact) -> HitOutcome {
        let Some(session) = self.session.as_mut() else {
            return HitOutcome::Ignored;
        };
        let posture = session.posture();
        let outcome = session.hazard.resolve(contact, posture);
        if outcome == HitOutcome::Failed {
            session.freeze();
        }
        outcome
    }

    /// Fail the run from outside the core (e.g. energy depletion)
    pub fn fail_run(&mut self, reason: RunFailReason) {
        if let Some(session) = self.session.as_mut() {
            session.hazard.signal_failure(reason, None);
            session.freeze();
        }
    }

    /// Lifecycle events since the last drain
    pub fn drain_events(&mut self) -> Vec<RunnerEvent> {
        self.session
            .as_mut()
            .map(|s| s.motion.events_mut().drain())
            .unwrap_or_default()
    }

    /// Pickups collected since the last drain
    pub fn drain_pickups(&mut self) -> Vec<PickupCollected> {
        self.session
            .as_mut()
            .map(|s| std::mem::take(&mut s.collected))
            .unwrap_or_default()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&RunSession> {
        self.session.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_failed())
    }

    pub fn track(&self) -> &TrackStreamer {
        &self.track
    }

    pub fn spawners(&self) -> &SegmentSpawners {
        &self.spawners
    }
}

/// Built-in physics stand-in: contacts with content in the runner's lane
/// within `half_depth` meters of its distance
fn probe_lane(
    spawners: &mut SegmentSpawners,
    session: &mut RunSession,
    lane_width: f32,
    half_depth: f32,
) {
    let lane = Lane::nearest(session.last_frame.lateral_offset, lane_width);
    let distance = session.distance.distance_travelled_meters();
    let (from, to) = (distance - half_depth, distance + half_depth);

    for handle in spawners.obstacles_in_lane(lane, from, to) {
        let Some(obstacle) = spawners.obstacle(handle) else {
            continue;
        };
        let contact = ObstacleContact {
            obstacle_type: obstacle.obstacle_type,
            fatal: obstacle.fatal,
            is_trigger: false,
            move_direction_y: 0.0,
        };

        let posture = session.posture();
        match session.hazard.resolve(contact, posture) {
            // Cleared (or harmless) obstacles stay live so landing on one still counts
            HitOutcome::Ignored => {}
            HitOutcome::Stumbled => {
                spawners.mark_obstacle_hit(handle);
            }
            HitOutcome::Failed => {
                spawners.mark_obstacle_hit(handle);
                return;
            }
        }
    }

    for handle in spawners.pickups_in_lane(lane, from, to) {
        let Some(collected) = spawners.collect_pickup(handle) else {
            continue;
        };
        if collected.pickup_type == PickupType::Zoomies && !session.boost.try_activate() {
            log::debug!("Zoomies refused while boost active");
        }
        session.collected.push(collected);
    }
}
