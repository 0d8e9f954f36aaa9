//! Runner motion state machine
//!
//! Converts discrete commands and elapsed time into a `RunnerFrame`. The three
//! axes (lateral, vertical, posture) are independent; the only couplings are
//! the admission rules in `handle_command`.

use serde::{Deserialize, Serialize};

use super::lane::Lane;
use crate::consts::MIN_DURATION;
use crate::{jump_arc, smoothstep};

/// Discrete player command (from the input layer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunnerCommand {
    MoveLeft,
    MoveRight,
    Jump,
    Slide,
}

/// Motion tuning, loaded once per run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Distance between adjacent lane rails (meters)
    pub lane_width: f32,
    /// Time to slide from one lane to the next (seconds)
    pub lane_change_duration: f32,
    /// Apex height of a jump (meters)
    pub jump_height: f32,
    /// Total airtime of a jump (seconds)
    pub jump_duration: f32,
    /// Time spent sliding (seconds)
    pub slide_duration: f32,
    /// Forward speed before any multipliers (m/s)
    pub base_forward_speed: f32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            lane_width: 2.2,
            lane_change_duration: 0.12,
            jump_height: 1.8,
            jump_duration: 0.65,
            slide_duration: 0.75,
            base_forward_speed: 9.0,
        }
    }
}

/// Lifecycle notifications for animation/audio/feedback layers
pub trait RunnerEventSink {
    fn on_lane_change_started(&mut self, from: Lane, to: Lane);
    fn on_jump_started(&mut self);
    fn on_slide_started(&mut self);
    fn on_slide_ended(&mut self);
}

/// A lifecycle notification as a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunnerEvent {
    LaneChangeStarted { from: Lane, to: Lane },
    JumpStarted,
    SlideStarted,
    SlideEnded,
}

/// Production sink: queues events for the host to drain once per frame
#[derive(Debug, Default)]
pub struct RunnerEventQueue {
    events: Vec<RunnerEvent>,
}

impl RunnerEventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every event queued since the last drain, oldest first
    pub fn drain(&mut self) -> Vec<RunnerEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl RunnerEventSink for RunnerEventQueue {
    fn on_lane_change_started(&mut self, from: Lane, to: Lane) {
        self.events.push(RunnerEvent::LaneChangeStarted { from, to });
    }

    fn on_jump_started(&mut self) {
        self.events.push(RunnerEvent::JumpStarted);
    }

    fn on_slide_started(&mut self) {
        self.events.push(RunnerEvent::SlideStarted);
    }

    fn on_slide_ended(&mut self) {
        self.events.push(RunnerEvent::SlideEnded);
    }
}

/// Mutable per-run pose state, owned by `RunnerMotion`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerState {
    pub current_lane: Lane,

    // Lane transition
    pub is_changing_lane: bool,
    pub from_lane: Lane,
    pub to_lane: Lane,
    /// Normalized progress of the lane change (0..1)
    pub lane_change_t: f32,

    // Jump
    pub is_jumping: bool,
    pub jump_elapsed: f32,

    // Slide
    pub is_sliding: bool,
    pub slide_elapsed: f32,
}

/// Immutable per-tick output for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RunnerFrame {
    pub lateral_offset: f32,
    /// Jump height only; sliding changes collision shape, not height
    pub vertical_offset: f32,
    pub forward_speed: f32,
    pub is_sliding: bool,
}

/// Command + time → pose
pub struct RunnerMotion<E: RunnerEventSink> {
    config: RunnerConfig,
    state: RunnerState,
    events: E,
    forward_speed: f32,
    vertical_offset: f32,
}

impl<E: RunnerEventSink> RunnerMotion<E> {
    /// Expects a validated config; durations are floored at `MIN_DURATION`
    /// and a negative base speed is treated as zero, so nothing here panics.
    pub fn new(config: RunnerConfig, events: E) -> Self {
        let forward_speed = config.base_forward_speed.max(0.0);
        Self {
            config,
            state: RunnerState::default(),
            events,
            forward_speed,
            vertical_offset: 0.0,
        }
    }

    pub fn state(&self) -> &RunnerState {
        &self.state
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    pub fn forward_speed(&self) -> f32 {
        self.forward_speed
    }

    /// Externally composed forward speed; negative values clamp to zero
    pub fn set_forward_speed(&mut self, speed: f32) {
        self.forward_speed = speed.max(0.0);
    }

    /// Apply one command. Commands that are not admissible right now are ignored.
    pub fn handle_command(&mut self, command: RunnerCommand) {
        match command {
            RunnerCommand::MoveLeft => self.try_start_lane_change(-1),
            RunnerCommand::MoveRight => self.try_start_lane_change(1),
            RunnerCommand::Jump => self.try_start_jump(),
            RunnerCommand::Slide => self.try_start_slide(),
        }
    }

    /// Advance every active sub-state by `dt` and produce this tick's frame
    pub fn tick(&mut self, dt: f32) -> RunnerFrame {
        let dt = dt.max(0.0);

        if self.state.is_changing_lane {
            let duration = self.config.lane_change_duration.max(MIN_DURATION);
            self.state.lane_change_t += dt / duration;

            if self.state.lane_change_t >= 1.0 {
                self.state.lane_change_t = 1.0;
                self.state.is_changing_lane = false;
                self.state.current_lane = self.state.to_lane;
            }
        }

        self.vertical_offset = 0.0;
        if self.state.is_jumping {
            self.state.jump_elapsed += dt;
            let duration = self.config.jump_duration.max(MIN_DURATION);
            let t = self.state.jump_elapsed / duration;

            if t >= 1.0 {
                self.state.is_jumping = false;
                self.state.jump_elapsed = 0.0;
            } else {
                self.vertical_offset = jump_arc(self.config.jump_height, t);
            }
        }

        if self.state.is_sliding {
            self.state.slide_elapsed += dt;
            let duration = self.config.slide_duration.max(MIN_DURATION);

            if self.state.slide_elapsed >= duration {
                self.state.is_sliding = false;
                self.state.slide_elapsed = 0.0;
                self.events.on_slide_ended();
            }
        }

        self.frame()
    }

    /// Current pose without advancing time
    pub fn frame(&self) -> RunnerFrame {
        RunnerFrame {
            lateral_offset: self.lateral_offset(),
            vertical_offset: self.vertical_offset,
            forward_speed: self.forward_speed,
            is_sliding: self.state.is_sliding,
        }
    }

    fn try_start_lane_change(&mut self, direction: i32) {
        // Lane changes are allowed mid-jump but not mid-slide
        if self.state.is_changing_lane || self.state.is_sliding {
            return;
        }

        let to = self.state.current_lane.step(direction);
        if to == self.state.current_lane {
            return;
        }

        self.state.is_changing_lane = true;
        self.state.from_lane = self.state.current_lane;
        self.state.to_lane = to;
        self.state.lane_change_t = 0.0;

        self.events.on_lane_change_started(self.state.from_lane, to);
    }

    fn try_start_jump(&mut self) {
        if self.state.is_sliding || self.state.is_jumping {
            return;
        }

        self.state.is_jumping = true;
        self.state.jump_elapsed = 0.0;
        self.events.on_jump_started();
    }

    fn try_start_slide(&mut self) {
        if self.state.is_jumping || self.state.is_sliding {
            return;
        }

        self.state.is_sliding = true;
        self.state.slide_elapsed = 0.0;
        self.events.on_slide_started();
    }

    fn lateral_offset(&self) -> f32 {
        let width = self.config.lane_width;

        if !self.state.is_changing_lane {
            return self.state.current_lane.offset(width);
        }

        let from = self.state.from_lane.offset(width);
        let to = self.state.to_lane.offset(width);
        from + (to - from) * smoothstep(self.state.lane_change_t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Test spy recording every event in order
    #[derive(Default)]
    struct SpySink {
        events: Vec<RunnerEvent>,
    }

    impl RunnerEventSink for SpySink {
        fn on_lane_change_started(&mut self, from: Lane, to: Lane) {
            self.events.push(RunnerEvent::LaneChangeStarted { from, to });
        }
        fn on_jump_started(&mut self) {
            self.events.push(RunnerEvent::JumpStarted);
        }
        fn on_slide_started(&mut self) {
            self.events.push(RunnerEvent::SlideStarted);
        }
        fn on_slide_ended(&mut self) {
            self.events.push(RunnerEvent::SlideEnded);
        }
    }

    fn motion() -> RunnerMotion<SpySink> {
        RunnerMotion::new(RunnerConfig::default(), SpySink::default())
    }

    #[test]
    fn test_move_left_at_left_is_noop() {
        let mut m = motion();
        m.handle_command(RunnerCommand::MoveLeft);
        m.tick(1.0);
        assert_eq!(m.state().current_lane, Lane::Left);
        let before = m.state().clone();
        let emitted = m.events().events.len();

        m.handle_command(RunnerCommand::MoveLeft);
        assert_eq!(m.state(), &before);
        assert_eq!(m.events().events.len(), emitted);
    }

    #[test]
    fn test_lane_change_completion() {
        let config = RunnerConfig::default();
        let mut m = motion();
        m.handle_command(RunnerCommand::MoveRight);
        assert_eq!(
            m.events().events,
            vec![RunnerEvent::LaneChangeStarted {
                from: Lane::Middle,
                to: Lane::Right
            }]
        );

        let steps = 10;
        let dt = config.lane_change_duration / steps as f32 * 1.01;
        let mut frame = RunnerFrame::default();
        for _ in 0..steps {
            frame = m.tick(dt);
        }

        assert_eq!(m.state().current_lane, Lane::Right);
        assert!(!m.state().is_changing_lane);
        assert_eq!(frame.lateral_offset, config.lane_width);
    }

    #[test]
    fn test_lane_change_eases_between_rails() {
        let mut m = motion();
        m.handle_command(RunnerCommand::MoveLeft);
        let width = m.config().lane_width;
        let half = m.config().lane_change_duration / 2.0;
        let frame = m.tick(half);
        // Smoothstep is symmetric: halfway in time is halfway in space
        assert!((frame.lateral_offset + width / 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_degenerate_config_does_not_panic() {
        let config = RunnerConfig {
            lane_change_duration: 0.0,
            jump_duration: -1.0,
            slide_duration: 0.0,
            base_forward_speed: -4.0,
            ..Default::default()
        };
        let mut m = RunnerMotion::new(config, SpySink::default());
        m.handle_command(RunnerCommand::MoveRight);
        let frame = m.tick(0.01);
        assert_eq!(m.state().current_lane, Lane::Right);
        assert_eq!(frame.lateral_offset, m.config().lane_width);
        assert_eq!(frame.forward_speed, 0.0);

        m.handle_command(RunnerCommand::Jump);
        let frame = m.tick(0.01);
        assert!(!m.state().is_jumping);
        assert_eq!(frame.vertical_offset, 0.0);
    }

    #[test]
    fn test_lane_change_rejected_while_changing_or_sliding() {
        let mut m = motion();
        m.handle_command(RunnerCommand::MoveRight);
        m.handle_command(RunnerCommand::MoveLeft);
        assert_eq!(m.state().to_lane, Lane::Right);
        assert_eq!(m.events().events.len(), 1);

        let mut m = motion();
        m.handle_command(RunnerCommand::Slide);
        m.handle_command(RunnerCommand::MoveRight);
        assert!(!m.state().is_changing_lane);
    }

    #[test]
    fn test_lane_change_allowed_mid_jump() {
        let mut m = motion();
        m.handle_command(RunnerCommand::Jump);
        m.handle_command(RunnerCommand::MoveLeft);
        assert!(m.state().is_jumping);
        assert!(m.state().is_changing_lane);
    }

    #[test]
    fn test_jump_and_slide_are_mutually_exclusive() {
        let mut m = motion();
        m.handle_command(RunnerCommand::Slide);
        m.handle_command(RunnerCommand::Jump);
        assert!(m.state().is_sliding);
        assert!(!m.state().is_jumping);

        let mut m = motion();
        m.handle_command(RunnerCommand::Jump);
        m.handle_command(RunnerCommand::Slide);
        assert!(m.state().is_jumping);
        assert!(!m.state().is_sliding);
        assert_eq!(m.events().events, vec![RunnerEvent::JumpStarted]);
    }

    #[test]
    fn test_jump_parabola() {
        let config = RunnerConfig::default();
        let mut m = motion();
        m.handle_command(RunnerCommand::Jump);

        let apex = m.tick(config.jump_duration / 2.0);
        assert!((apex.vertical_offset - config.jump_height).abs() < 1e-4);

        let near_end = m.tick(config.jump_duration / 2.0 - 0.001);
        assert!(near_end.vertical_offset < 0.02);

        let landed = m.tick(0.01);
        assert_eq!(landed.vertical_offset, 0.0);
        assert!(!m.state().is_jumping);
    }

    #[test]
    fn test_slide_ends_with_event() {
        let config = RunnerConfig::default();
        let mut m = motion();
        m.handle_command(RunnerCommand::Slide);

        let frame = m.tick(config.slide_duration / 2.0);
        assert!(frame.is_sliding);
        assert_eq!(frame.vertical_offset, 0.0);

        let frame = m.tick(config.slide_duration);
        assert!(!frame.is_sliding);
        assert_eq!(
            m.events().events,
            vec![RunnerEvent::SlideStarted, RunnerEvent::SlideEnded]
        );

        // No second end event
        m.tick(1.0);
        assert_eq!(m.events().events.len(), 2);
    }

    #[test]
    fn test_forward_speed_is_external() {
        let mut m = motion();
        assert_eq!(m.tick(0.1).forward_speed, 9.0);
        m.set_forward_speed(-3.0);
        assert_eq!(m.tick(0.1).forward_speed, 0.0);
        m.set_forward_speed(12.5);
        assert_eq!(m.tick(0.1).forward_speed, 12.5);
    }

    #[test]
    fn test_event_queue_drains() {
        let mut m = RunnerMotion::new(RunnerConfig::default(), RunnerEventQueue::new());
        m.handle_command(RunnerCommand::Jump);
        m.handle_command(RunnerCommand::MoveRight);
        let drained = m.events_mut().drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0], RunnerEvent::JumpStarted);
        assert!(m.events().is_empty());
    }

    fn command() -> impl Strategy<Value = RunnerCommand> {
        prop_oneof![
            Just(RunnerCommand::MoveLeft),
            Just(RunnerCommand::MoveRight),
            Just(RunnerCommand::Jump),
            Just(RunnerCommand::Slide),
        ]
    }

    proptest! {
        #[test]
        fn prop_lane_stays_on_track(
            steps in proptest::collection::vec((command(), 0.0f32..0.2), 0..200)
        ) {
            let mut m = motion();
            let width = m.config().lane_width;
            for (cmd, dt) in steps {
                m.handle_command(cmd);
                let frame = m.tick(dt);
                let state = m.state();
                prop_assert!(Lane::ALL.contains(&state.current_lane));
                prop_assert!(!(state.is_jumping && state.is_sliding));
                prop_assert!(frame.lateral_offset >= -width - 1e-4);
                prop_assert!(frame.lateral_offset <= width + 1e-4);
            }
        }
    }
}
