//! Physical entities: the copter, enemies and shots
//!
//! All three share [`Body`], an axis-aligned box with a velocity and a
//! one-way `exploded` flag. Role-specific intent flags live on the wrappers
//! and are rewritten every tick by whoever controls the agent.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::terrain::Terrain;

/// Which kind of agent a controller or sensor bundle serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Copter,
    Enemy,
}

impl Role {
    /// Length of the action vector a controller must produce for this role.
    ///
    /// Copter: `[thrust, shoot]`. Enemy: `[thrust, move_left, dive]`.
    pub const fn action_len(self) -> usize {
        match self {
            Role::Copter => 2,
            Role::Enemy => 3,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Copter => write!(f, "copter"),
            Role::Enemy => write!(f, "enemy"),
        }
    }
}

/// Anything a radar can detect
pub trait Locatable {
    fn position(&self) -> Vec2;
}

impl Locatable for Vec2 {
    fn position(&self) -> Vec2 {
        *self
    }
}

/// Shared physical representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Box center
    pub pos: Vec2,
    pub vel: Vec2,
    pub half_extent: Vec2,
    /// Terminal: never resets once set
    pub exploded: bool,
}

impl Body {
    pub fn new(pos: Vec2, size: f32) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            half_extent: Vec2::splat(size / 2.0),
            exploded: false,
        }
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        self.pos - self.half_extent
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.pos + self.half_extent
    }

    /// Semi-implicit Euler step under gravity plus the role force.
    ///
    /// Exploded bodies ignore `role_force` and lose speed every tick.
    pub fn integrate(&mut self, gravity: Vec2, role_force: Vec2, dt: f32, damping: f32) {
        let force = if self.exploded { Vec2::ZERO } else { role_force };
        self.vel += (gravity + force) * dt;
        self.pos += self.vel * dt;
        if self.exploded {
            self.vel *= damping;
        }
    }

    /// Mark as exploded. Returns true only on the live -> exploded edge.
    pub fn explode(&mut self) -> bool {
        let edge = !self.exploded;
        self.exploded = true;
        edge
    }
}

impl Locatable for Body {
    fn position(&self) -> Vec2 {
        self.pos
    }
}

/// The controllable agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Copter {
    pub body: Body,
    /// Rotor thrust is on this tick
    pub firing: bool,
}

impl Copter {
    pub fn new(pos: Vec2, size: f32, start_speed: f32) -> Self {
        let mut body = Body::new(pos, size);
        body.vel = Vec2::new(start_speed, 0.0);
        Self {
            body,
            firing: false,
        }
    }

    /// Force from the current action flags
    pub fn role_force(&self, thrust: Vec2) -> Vec2 {
        if self.firing { thrust } else { Vec2::ZERO }
    }

    /// Kick backwards after firing a shot
    pub fn recoil(&mut self, amount: f32) {
        self.body.vel.x -= amount;
    }

    pub fn clear_intents(&mut self) {
        self.firing = false;
    }
}

/// An adversary agent. Enemies fly towards `-x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub body: Body,
    pub firing: bool,
    pub moving_left: bool,
    pub diving: bool,
}

impl Enemy {
    pub fn new(pos: Vec2, size: f32) -> Self {
        Self {
            body: Body::new(pos, size),
            firing: false,
            moving_left: false,
            diving: false,
        }
    }

    pub fn role_force(&self, thrust: Vec2, left_force: Vec2) -> Vec2 {
        let mut force = Vec2::ZERO;
        if self.firing {
            force += thrust;
        }
        if self.moving_left {
            force += left_force;
        }
        force
    }

    /// Downward velocity kick
    pub fn dive(&mut self, impulse: f32) {
        self.diving = true;
        self.body.vel.y += impulse;
    }

    pub fn clear_intents(&mut self) {
        self.firing = false;
        self.moving_left = false;
        self.diving = false;
    }
}

impl Locatable for Enemy {
    fn position(&self) -> Vec2 {
        self.body.pos
    }
}

/// A projectile fired by the copter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    pub body: Body,
    /// Ticks since the shot was fired
    pub age: u32,
}

impl Shot {
    pub fn new(pos: Vec2, vel: Vec2, size: f32) -> Self {
        let mut body = Body::new(pos, size);
        body.vel = vel;
        Self { body, age: 0 }
    }

    /// Advance one tick. Returns false once the shot has left the corridor,
    /// entered rock or outlived `max_ticks`.
    pub fn step(&mut self, terrain: &Terrain, gravity: Vec2, dt: f32, max_ticks: u32) -> bool {
        self.body.integrate(gravity, Vec2::ZERO, dt, 1.0);
        self.age += 1;
        terrain.contains_x(self.body.pos.x)
            && !terrain.is_solid(self.body.pos)
            && self.age <= max_ticks
    }
}

impl Locatable for Shot {
    fn position(&self) -> Vec2 {
        self.body.pos
    }
}
