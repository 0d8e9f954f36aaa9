//! Lane Runner - simulation core of a three-lane endless runner
//!
//! Core modules:
//! - `sim`: Deterministic simulation (runner motion, track streaming, spawning, hazards)
//! - `config`: Data-driven run configuration, validated once at startup
//! - `error`: Configuration errors

pub mod config;
pub mod error;
pub mod sim;

pub use config::RunConfig;
pub use error::ConfigError;

/// Simulation constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Floor applied to every configured duration before dividing by it
    pub const MIN_DURATION: f32 = 0.0001;
    /// Shortest segment the streamer will ever account for (meters)
    pub const MIN_SEGMENT_LENGTH: f32 = 0.01;
    /// Contacts whose move direction points this far up are ground contacts
    pub const GROUND_NORMAL_Y: f32 = 0.5;
}

/// Smoothstep easing on [0, 1]: `t²(3 − 2t)`
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Parabolic jump height at normalized time `t`; peaks at `height` when t = 0.5
#[inline]
pub fn jump_arc(height: f32, t: f32) -> f32 {
    4.0 * height * t * (1.0 - t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoothstep_endpoints() {
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert!((smoothstep(0.5) - 0.5).abs() < 1e-6);
        // Clamped outside the unit interval
        assert_eq!(smoothstep(-2.0), 0.0);
        assert_eq!(smoothstep(3.0), 1.0);
    }

    #[test]
    fn test_jump_arc_peak() {
        assert!((jump_arc(1.8, 0.5) - 1.8).abs() < 1e-6);
        assert_eq!(jump_arc(1.8, 0.0), 0.0);
        assert!(jump_arc(1.8, 0.999) < 0.01);
    }
}
