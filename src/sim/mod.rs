//! Deterministic simulation module
//!
//! All flight logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - No hidden randomness (levels are generated outside, from a seed)
//! - Stable iteration order (roster order for enemies)
//! - No rendering or platform dependencies

pub mod collision;
pub mod controller;
pub mod entity;
pub mod radar;
pub mod radar_system;
pub mod state;
pub mod termination;
pub mod terrain;
pub mod tick;

pub use collision::{Overlap, bodies_collide, body_hits_terrain, box_overlap};
pub use controller::{ControlSource, Controller, ControllerAdapter, FnController, HiddenState};
pub use entity::{Body, Copter, Enemy, Locatable, Role, Shot};
pub use radar::{
    AttributeReading, BinaryRadar, Facing, Field, ObjectAttributeRadar, ObjectRadar, RayRadar,
    RayReading,
};
pub use radar_system::{ObjectAttribute, ObjectTarget, Perception, SensorBundle, Surroundings};
pub use state::{EnemyId, EnemySlot, ManualAgent, PendingEnemy, RunStats, SimState, Snapshot};
pub use termination::{EndConditions, Fitness};
pub use terrain::{Bar, Terrain};
pub use tick::{Agent, ExplosionCause, SimEvent, TickInput, TickOutcome, run, run_headless, tick};
