//! Error types
//!
//! Setup problems are fatal and reported as [`ConfigError`] before a run
//! starts. The only error a tick can raise is a controller breaking its
//! declared contract ([`StepError`]).

use thiserror::Error;

use crate::sim::Role;

/// Fatal configuration errors, raised while building a run
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("terrain has no bars")]
    EmptyTerrain,
    #[error("terrain bar width must be positive, got {0}")]
    BarWidth(f32),
    #[error("{sensor}: step size must be positive, got {value}")]
    StepSize { sensor: &'static str, value: f32 },
    #[error("{sensor}: step count must be at least 1")]
    ZeroSteps { sensor: &'static str },
    #[error("{sensor}: bucket count must be at least 1")]
    ZeroBuckets { sensor: &'static str },
    #[error("{sensor}: maximum distance must be positive, got {value}")]
    MaxDist { sensor: &'static str, value: f32 },
    #[error("ray direction {0} rad has no horizontal component")]
    VerticalRay(f32),
    #[error("timestep must be positive, got {0}")]
    Timestep(f32),
    #[error("{field} must be {rule}, got {value}")]
    InvalidValue {
        field: &'static str,
        rule: &'static str,
        value: f32,
    },
    #[error("{role} controller expects {actual} features, sensor bundle produces {expected}")]
    FeatureLength {
        role: Role,
        expected: usize,
        actual: usize,
    },
    #[error("{role} controller produces {actual} actions, {expected} are required")]
    ActionLength {
        role: Role,
        expected: usize,
        actual: usize,
    },
    #[error("at most one agent may be under manual control")]
    MultipleManualAgents,
    #[error("invalid level: {0}")]
    Level(&'static str),
    #[error("could not place {count} enemies {spacing} px apart in [{min_x}, {max_x}]")]
    EnemyPlacement {
        count: usize,
        spacing: f32,
        min_x: f32,
        max_x: f32,
    },
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Controller contract violations detected while stepping
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("{role} controller returned {actual} actions, expected {expected}")]
    ActionLength {
        role: Role,
        expected: usize,
        actual: usize,
    },
    #[error("{role} controller returned hidden state of length {actual}, expected {expected}")]
    HiddenStateLength {
        role: Role,
        expected: usize,
        actual: usize,
    },
}
