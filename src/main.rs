//! Lane Runner headless driver
//!
//! Runs one seeded session at the fixed timestep with a simple autopilot and
//! logs a summary. Usage: `lane-runner [config.json] [seed]`.

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::path::Path;

    use lane_runner::RunConfig;
    use lane_runner::consts::{MAX_SUBSTEPS, SIM_DT};
    use lane_runner::sim::{
        DistanceProvider, Lane, ObstacleType, RunnerCommand, RunnerEvent, Simulation, TickInput,
    };

    /// Frame time of the pretend display loop
    const FRAME_DT: f32 = 1.0 / 30.0;
    /// Longest run the driver will simulate (seconds)
    const MAX_RUN_SECONDS: f32 = 180.0;
    /// How far ahead the autopilot looks (meters)
    const LOOKAHEAD: f32 = 7.0;

    fn load_config(path: Option<&str>) -> Result<RunConfig, Box<dyn std::error::Error>> {
        match path {
            Some(path) => {
                let json = std::fs::read_to_string(Path::new(path))?;
                Ok(RunConfig::from_json(&json)?)
            }
            None => Ok(RunConfig::default()),
        }
    }

    /// React to the nearest obstacle ahead in the runner's lane
    fn autopilot(sim: &Simulation) -> Option<RunnerCommand> {
        let session = sim.session()?;
        let state = session.motion().state();
        if state.is_changing_lane || state.is_jumping || state.is_sliding {
            return None;
        }

        let lane = state.current_lane;
        let distance = session.distance().distance_travelled_meters();
        let lane_clear = |lane: Lane| {
            sim.spawners().obstacles().all(|(_, o)| {
                o.lane != lane || o.track_distance < distance || o.track_distance > distance + LOOKAHEAD
            })
        };

        let (_, threat) = sim
            .spawners()
            .obstacles()
            .filter(|(_, o)| o.lane == lane && !o.hit)
            .filter(|(_, o)| o.track_distance >= distance && o.track_distance <= distance + LOOKAHEAD)
            .min_by(|(_, a), (_, b)| a.track_distance.total_cmp(&b.track_distance))?;

        let command = match threat.obstacle_type {
            ObstacleType::Low => RunnerCommand::Jump,
            ObstacleType::High => RunnerCommand::Slide,
            ObstacleType::FullBlock => {
                if lane != Lane::Left && lane_clear(lane.step(-1)) {
                    RunnerCommand::MoveLeft
                } else {
                    RunnerCommand::MoveRight
                }
            }
        };

        // Jumps and slides only pay off close to the obstacle
        let gap = threat.track_distance - distance;
        let speed = session.frame().forward_speed.max(1.0);
        let lead = match command {
            RunnerCommand::Jump => session.motion().config().jump_duration * 0.5 * speed,
            RunnerCommand::Slide => session.motion().config().slide_duration * 0.5 * speed,
            _ => LOOKAHEAD,
        };
        (gap <= lead).then_some(command)
    }

    pub fn run() -> Result<(), Box<dyn std::error::Error>> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let config = load_config(args.first().map(String::as_str))?;
        let seed = match args.get(1) {
            Some(seed) => seed.parse::<u64>()?,
            None => 42,
        };

        let mut sim = Simulation::new(config)?;
        sim.start_run(seed);

        let mut accumulator = 0.0f32;
        let mut elapsed = 0.0f32;
        let mut events = 0usize;
        let mut pickups = 0u32;

        while elapsed < MAX_RUN_SECONDS && sim.is_running() {
            accumulator += FRAME_DT;
            elapsed += FRAME_DT;

            let mut substeps = 0;
            while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                let input = match autopilot(&sim) {
                    Some(command) => TickInput::command(command),
                    None => TickInput::default(),
                };
                sim.tick(&input, SIM_DT);
                accumulator -= SIM_DT;
                substeps += 1;
            }

            for event in sim.drain_events() {
                if let RunnerEvent::LaneChangeStarted { from, to } = event {
                    log::trace!("Lane change {from:?} -> {to:?}");
                }
                events += 1;
            }
            for collected in sim.drain_pickups() {
                log::debug!("Picked up {:?} x{}", collected.pickup_type, collected.amount);
                pickups += collected.amount;
            }
        }

        if let Some(session) = sim.session() {
            let distance = session.distance().distance_travelled_meters();
            log::info!(
                "Seed {seed}: {:.1} m in {:.1}s, score {}, {} pickups, {} events, failure {:?}",
                distance,
                elapsed,
                session.score().score(),
                pickups,
                events,
                session.failure()
            );
        }
        sim.end_run();
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Lane Runner (headless) starting...");

    if let Err(e) = headless::run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is the product on the web; there is no headless driver there
}
