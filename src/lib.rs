//! Copter Sim - perception and simulation engine for a side-scrolling copter
//! and a roster of enemies flying through a terrain corridor
//!
//! Core modules:
//! - `sim`: Deterministic simulation (radars, physics, collisions, roster, termination)
//! - `config`: Run configuration with the classic tuning as defaults
//! - `level`: Seeded corridor and enemy placement generator
//! - `error`: Setup and controller contract errors

pub mod config;
pub mod error;
pub mod level;
pub mod sim;

pub use config::SimConfig;
pub use error::{ConfigError, StepError};

/// Simulation constants (defaults for [`SimConfig`])
pub mod consts {
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 0.25;

    /// Downward gravity (screen y grows downwards)
    pub const GRAVITY: f32 = 0.4 * 9.8;
    /// Upward thrust while firing the rotor
    pub const THRUST: f32 = 0.4 * -20.0;

    /// Copter and enemy box side length
    pub const CRAFT_SIZE: f32 = 20.0;
    /// Horizontal launch speed of the copter
    pub const COPTER_START_SPEED: f32 = 10.0;

    /// Velocity multiplier applied every tick to an exploded body
    pub const EXPLODED_DAMPING: f32 = 0.97;

    /// Enemies are activated once they are this close ahead of the copter
    pub const ENEMY_INTRO_DIST: f32 = 1050.0;
    /// Enemies are retired once the copter is this far past them
    pub const ENEMY_PASSED_DIST: f32 = 400.0;

    /// Ticks between two sputter events of the same agent
    pub const SPUTTER_INTERVAL: u32 = 10;

    /// Boolean action threshold for controller outputs
    pub const ACTION_THRESHOLD: f32 = 0.5;
}

/// Bucket index for an angle in `[0, span]` split into `buckets` slices.
///
/// Angles landing exactly on `span` fold into the last bucket.
#[inline]
pub fn bucket_index(angle: f32, slice: f32, buckets: usize) -> usize {
    let raw = (angle / slice).max(0.0) as usize;
    raw.min(buckets.saturating_sub(1))
}

/// Angle of a screen-space displacement, counter-clockwise from `+x`, in `[-π, π]`
#[inline]
pub fn screen_angle(dx: f32, dy: f32) -> f32 {
    (-dy).atan2(dx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{PI, TAU};

    #[test]
    fn test_bucket_index_clamps_upper_edge() {
        assert_eq!(bucket_index(TAU, TAU / 8.0, 8), 7);
        assert_eq!(bucket_index(PI, PI / 4.0, 4), 3);
        assert_eq!(bucket_index(0.0, TAU / 8.0, 8), 0);
    }

    #[test]
    fn test_screen_angle_is_upwards_positive() {
        assert!((screen_angle(0.0, -1.0) - PI / 2.0).abs() < 1e-6);
        assert!((screen_angle(0.0, 1.0) + PI / 2.0).abs() < 1e-6);
        assert!(screen_angle(1.0, 0.0).abs() < 1e-6);
    }
}
