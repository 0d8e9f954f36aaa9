//! Hazard collision resolution
//!
//! Judges each obstacle contact against the runner's posture and turns unsafe
//! hits into a stumble (slow + invulnerability) or a run failure. Stumble and
//! invulnerability are independent countdowns; invulnerability may outlast the
//! slow window.

use serde::{Deserialize, Serialize};

use super::spawner::ObstacleType;
use super::speed::SpeedModifier;
use crate::consts::GROUND_NORMAL_Y;

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunFailReason {
    ObstacleHit,
    /// Raised by the energy system outside this core
    EnergyDepleted,
}

/// Receives the terminal run failure
pub trait RunFailSink {
    fn on_run_failed(&mut self, reason: RunFailReason, obstacle_type: Option<ObstacleType>);
}

/// Production fail sink: records the first failure of a run and ignores the rest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStatus {
    failure: Option<(RunFailReason, Option<ObstacleType>)>,
}

impl RunStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn failure(&self) -> Option<(RunFailReason, Option<ObstacleType>)> {
        self.failure
    }
}

impl RunFailSink for RunStatus {
    fn on_run_failed(&mut self, reason: RunFailReason, obstacle_type: Option<ObstacleType>) {
        if self.failure.is_some() {
            return;
        }
        self.failure = Some((reason, obstacle_type));
        log::info!("Run failed: {reason:?} ({obstacle_type:?})");
    }
}

/// Stumble behaviour for survivable hits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StumblePolicy {
    /// When false every unsafe hit fails the run immediately
    pub enabled: bool,
    /// Forward speed factor while stumbling
    pub slow_multiplier: f32,
    /// Floor for `slow_multiplier`
    pub min_speed_multiplier: f32,
    /// Length of the slow window (seconds)
    pub slow_duration: f32,
    /// Length of the invulnerability window (seconds)
    pub invulnerability_duration: f32,
    /// An unsafe hit during invulnerability ends the run
    pub fail_on_second_hit: bool,
    /// Drop all commands while slowed
    pub lock_input: bool,
}

impl Default for StumblePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            slow_multiplier: 0.55,
            min_speed_multiplier: 0.1,
            slow_duration: 0.75,
            invulnerability_duration: 0.9,
            fail_on_second_hit: true,
            lock_input: true,
        }
    }
}

/// One physics contact between the runner and an obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleContact {
    pub obstacle_type: ObstacleType,
    pub fatal: bool,
    /// Trigger volumes never count as hits
    pub is_trigger: bool,
    /// Vertical component of the runner's move direction at contact
    pub move_direction_y: f32,
}

impl ObstacleContact {
    /// A solid, fatal, head-on contact
    pub fn solid(obstacle_type: ObstacleType) -> Self {
        Self {
            obstacle_type,
            fatal: true,
            is_trigger: false,
            move_direction_y: 0.0,
        }
    }

    /// Whether the resolver should judge this contact at all
    pub fn is_hazard(&self) -> bool {
        self.fatal && !self.is_trigger && self.move_direction_y <= GROUND_NORMAL_Y
    }
}

/// The posture bits that decide safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Posture {
    pub is_jumping: bool,
    pub is_sliding: bool,
}

/// Low obstacles are cleared by jumping, high ones by sliding; full blocks never
pub fn is_safe(obstacle_type: ObstacleType, posture: Posture) -> bool {
    match obstacle_type {
        ObstacleType::Low => posture.is_jumping,
        ObstacleType::High => posture.is_sliding,
        ObstacleType::FullBlock => false,
    }
}

/// Result of judging one contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitOutcome {
    Ignored,
    Stumbled,
    Failed,
}

pub struct HazardResolver<F: RunFailSink> {
    policy: StumblePolicy,
    stumble_remaining: f32,
    invuln_remaining: f32,
    has_failed: bool,
    sink: F,
}

impl<F: RunFailSink> HazardResolver<F> {
    pub fn new(policy: StumblePolicy, sink: F) -> Self {
        Self {
            policy,
            stumble_remaining: 0.0,
            invuln_remaining: 0.0,
            has_failed: false,
            sink,
        }
    }

    pub fn policy(&self) -> &StumblePolicy {
        &self.policy
    }

    pub fn sink(&self) -> &F {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut F {
        &mut self.sink
    }

    pub fn is_stumbling(&self) -> bool {
        self.stumble_remaining > 0.0
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invuln_remaining > 0.0
    }

    pub fn has_failed(&self) -> bool {
        self.has_failed
    }

    pub fn stumble_remaining(&self) -> f32 {
        self.stumble_remaining
    }

    pub fn invuln_remaining(&self) -> f32 {
        self.invuln_remaining
    }

    /// Commands are dropped while the slow window runs, if the policy says so
    pub fn input_locked(&self) -> bool {
        self.policy.enabled && self.policy.lock_input && self.is_stumbling()
    }

    /// Count both windows down, flooring at zero. Frozen once the run failed.
    pub fn tick(&mut self, dt: f32) {
        if self.has_failed {
            return;
        }
        let dt = dt.max(0.0);
        let was_stumbling = self.is_stumbling();

        self.stumble_remaining = (self.stumble_remaining - dt).max(0.0);
        self.invuln_remaining = (self.invuln_remaining - dt).max(0.0);

        if was_stumbling && !self.is_stumbling() {
            log::debug!("Stumble recovered");
        }
    }

    /// Judge one contact. Never fails; always lands on an outcome.
    pub fn resolve(&mut self, contact: ObstacleContact, posture: Posture) -> HitOutcome {
        if self.has_failed || !contact.is_hazard() {
            return HitOutcome::Ignored;
        }

        if is_safe(contact.obstacle_type, posture) {
            return HitOutcome::Ignored;
        }

        if !self.policy.enabled {
            return self.fail(contact.obstacle_type);
        }

        if self.is_invulnerable() && self.policy.fail_on_second_hit {
            return self.fail(contact.obstacle_type);
        }

        self.trigger_stumble();
        HitOutcome::Stumbled
    }

    /// Start or refresh both windows; remaining time takes the max, never the sum.
    /// A failed run keeps its timers frozen.
    pub fn trigger_stumble(&mut self) {
        if self.has_failed || !self.policy.enabled {
            return;
        }
        self.stumble_remaining = self.stumble_remaining.max(self.policy.slow_duration);
        self.invuln_remaining = self
            .invuln_remaining
            .max(self.policy.invulnerability_duration);
        log::debug!(
            "Stumble: slow {:.2}s, invulnerable {:.2}s",
            self.stumble_remaining,
            self.invuln_remaining
        );
    }

    /// Forward a failure to the sink, at most once per resolver
    pub fn signal_failure(&mut self, reason: RunFailReason, obstacle_type: Option<ObstacleType>) {
        if self.has_failed {
            return;
        }
        self.has_failed = true;
        self.sink.on_run_failed(reason, obstacle_type);
    }

    fn fail(&mut self, obstacle_type: ObstacleType) -> HitOutcome {
        self.signal_failure(RunFailReason::ObstacleHit, Some(obstacle_type));
        HitOutcome::Failed
    }
}

/// Forward speed factor contributed by the stumble slow
impl<F: RunFailSink> SpeedModifier for HazardResolver<F> {
    fn speed_multiplier(&self) -> f32 {
        if !self.policy.enabled || !self.is_stumbling() {
            return 1.0;
        }
        let floor = self.policy.min_speed_multiplier.max(0.0).min(1.0);
        self.policy.slow_multiplier.max(floor).min(1.0)
    }
}
