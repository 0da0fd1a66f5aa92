//! Simulation state
//!
//! [`SimState`] owns everything one run touches: the terrain, the copter,
//! the enemy roster (pending queue and active slots), shots in flight and
//! the counters. Nothing is shared between runs.

use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::controller::{ControlSource, Controller, ControllerAdapter, HiddenState};
use super::entity::{Body, Copter, Enemy, Role, Shot};
use super::radar::RayReading;
use super::radar_system::{SensorBundle, Surroundings};
use super::terrain::Terrain;
use crate::config::SimConfig;
use crate::error::ConfigError;

/// Stable enemy identifier, assigned at creation
pub type EnemyId = u32;

/// The agent currently flown by hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManualAgent {
    Copter,
    Enemy(EnemyId),
}

/// An enemy waiting ahead of the activation window
#[derive(Debug, Clone)]
pub struct PendingEnemy {
    pub id: EnemyId,
    pub enemy: Enemy,
    pub control: ControlSource,
}

/// An active enemy together with its carried controller state
#[derive(Debug, Clone)]
pub struct EnemySlot {
    pub id: EnemyId,
    pub enemy: Enemy,
    pub control: ControlSource,
    /// Controller memory, lives exactly as long as the slot
    pub hidden: Option<HiddenState>,
    /// Ticks since this enemy last sputtered
    pub sputter_ticks: u32,
    /// Overlapped the copter on the previous tick
    pub touching_copter: bool,
    /// Ray readings from the last time this enemy was sensed
    pub last_rays: Vec<RayReading>,
}

impl EnemySlot {
    pub(crate) fn activate(pending: PendingEnemy) -> Self {
        let hidden = pending.control.initial_state();
        Self {
            id: pending.id,
            enemy: pending.enemy,
            control: pending.control,
            hidden,
            sputter_ticks: 0,
            touching_copter: false,
            last_rays: Vec::new(),
        }
    }
}

/// Scoring counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Sum over ticks of living active enemies
    pub enemy_living_time: u64,
    pub shots_fired: u32,
    pub shots_hit: u32,
    pub enemies_activated: u32,
    pub enemies_retired: u32,
    pub enemies_exploded: u32,
}

/// Complete run state
#[derive(Debug, Clone)]
pub struct SimState {
    pub config: SimConfig,
    pub terrain: Terrain,
    pub copter: Copter,
    pub copter_control: ControlSource,
    pub copter_hidden: Option<HiddenState>,
    /// Ray readings from the last time the copter was sensed
    pub copter_rays: Vec<RayReading>,
    pub copter_sputter_ticks: u32,
    /// Not yet simulated, in insertion order
    pub pending: Vec<PendingEnemy>,
    /// Simulated, in activation order (roster order)
    pub active: Vec<EnemySlot>,
    pub shots: Vec<Shot>,
    /// Simulation tick counter
    pub ticks: u64,
    pub stats: RunStats,
    pub(crate) copter_bundle: SensorBundle,
    pub(crate) enemy_bundle: SensorBundle,
    next_id: EnemyId,
}

impl SimState {
    /// New run with the copter at `copter_pos` under scripted control
    pub fn new(config: SimConfig, terrain: Terrain, copter_pos: Vec2) -> Result<Self, ConfigError> {
        config.validate()?;
        let copter_bundle = SensorBundle::new(Role::Copter, &config.copter_sensors)?;
        let enemy_bundle = SensorBundle::new(Role::Enemy, &config.enemy_sensors)?;
        let copter = Copter::new(
            copter_pos,
            config.physics.copter_size,
            config.physics.copter_start_speed,
        );
        Ok(Self {
            config,
            terrain,
            copter,
            copter_control: ControlSource::Scripted,
            copter_hidden: None,
            copter_rays: Vec::new(),
            copter_sputter_ticks: 0,
            pending: Vec::new(),
            active: Vec::new(),
            shots: Vec::new(),
            ticks: 0,
            stats: RunStats::default(),
            copter_bundle,
            enemy_bundle,
            next_id: 1,
        })
    }

    /// Copter starting at `x`, vertically centred in the corridor
    pub fn centered(config: SimConfig, terrain: Terrain, x: f32) -> Result<Self, ConfigError> {
        let y = terrain.y_center(x);
        Self::new(config, terrain, Vec2::new(x, y))
    }

    /// Feature vector length produced for `role`
    pub fn feature_len(&self, role: Role) -> usize {
        self.bundle(role).feature_len()
    }

    pub(crate) fn bundle(&self, role: Role) -> &SensorBundle {
        match role {
            Role::Copter => &self.copter_bundle,
            Role::Enemy => &self.enemy_bundle,
        }
    }

    /// Wrap `controller` as a learned control source for `role`
    pub fn learned(&self, role: Role, controller: Arc<dyn Controller>) -> Result<ControlSource, ConfigError> {
        let adapter = ControllerAdapter::new(role, controller, self.feature_len(role))?;
        Ok(ControlSource::Learned(adapter))
    }

    fn check_control(&self, role: Role, control: &ControlSource) -> Result<(), ConfigError> {
        match control {
            ControlSource::Manual => {
                let other_manual = match role {
                    Role::Copter => self.enemy_manual().is_some(),
                    Role::Enemy => self.manual_agent().is_some(),
                };
                if other_manual {
                    return Err(ConfigError::MultipleManualAgents);
                }
            }
            ControlSource::Learned(adapter) => {
                if adapter.role() != role {
                    return Err(ConfigError::ActionLength {
                        role,
                        expected: role.action_len(),
                        actual: adapter.role().action_len(),
                    });
                }
                if adapter.feature_len() != self.feature_len(role) {
                    return Err(ConfigError::FeatureLength {
                        role,
                        expected: self.feature_len(role),
                        actual: adapter.feature_len(),
                    });
                }
            }
            ControlSource::Scripted => {}
        }
        Ok(())
    }

    /// Choose who flies the copter. Resets its hidden state.
    pub fn set_copter_control(&mut self, control: ControlSource) -> Result<(), ConfigError> {
        self.check_control(Role::Copter, &control)?;
        self.copter_hidden = control.initial_state();
        self.copter_control = control;
        Ok(())
    }

    /// Queue an enemy. It stays pending until the copter comes within the
    /// intro distance.
    pub fn add_enemy(&mut self, pos: Vec2, control: ControlSource) -> Result<EnemyId, ConfigError> {
        self.check_control(Role::Enemy, &control)?;
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push(PendingEnemy {
            id,
            enemy: Enemy::new(pos, self.config.physics.enemy_size),
            control,
        });
        Ok(id)
    }

    fn enemy_manual(&self) -> Option<EnemyId> {
        let active = self
            .active
            .iter()
            .find(|slot| slot.control.is_manual())
            .map(|slot| slot.id);
        active.or_else(|| {
            self.pending
                .iter()
                .find(|p| p.control.is_manual())
                .map(|p| p.id)
        })
    }

    /// The externally controlled agent, if any
    pub fn manual_agent(&self) -> Option<ManualAgent> {
        if self.copter_control.is_manual() {
            Some(ManualAgent::Copter)
        } else {
            self.enemy_manual().map(ManualAgent::Enemy)
        }
    }

    /// Active slot by id
    pub fn slot(&self, id: EnemyId) -> Option<&EnemySlot> {
        self.active.iter().find(|slot| slot.id == id)
    }

    /// Active enemies that have not exploded
    pub fn living_enemies(&self) -> impl Iterator<Item = &EnemySlot> {
        self.active.iter().filter(|slot| !slot.enemy.body.exploded)
    }

    /// What an observer may sense. `observer` excludes that enemy from the
    /// enemy list.
    pub(crate) fn surroundings(&self, observer: Option<EnemyId>) -> Surroundings<'_> {
        Surroundings {
            enemies: self
                .living_enemies()
                .filter(|slot| Some(slot.id) != observer)
                .map(|slot| &slot.enemy.body)
                .collect(),
            shots: self.shots.iter().map(|shot| &shot.body).collect(),
            copter: (!self.copter.body.exploded).then_some(&self.copter.body),
        }
    }

    /// Read-only view for presentation and diagnostics
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            ticks: self.ticks,
            copter: AgentSnapshot::from_body(&self.copter.body, self.copter.firing),
            enemies: self
                .active
                .iter()
                .map(|slot| EnemySnapshot {
                    id: slot.id,
                    agent: AgentSnapshot::from_body(&slot.enemy.body, slot.enemy.firing),
                    moving_left: slot.enemy.moving_left,
                    diving: slot.enemy.diving,
                    last_rays: slot.last_rays.clone(),
                })
                .collect(),
            pending: self.pending.len(),
            shots: self.shots.iter().map(|shot| shot.body.pos).collect(),
            copter_rays: self.copter_rays.clone(),
            stats: self.stats.clone(),
        }
    }
}

/// Position and state of one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub pos: Vec2,
    pub vel: Vec2,
    pub exploded: bool,
    pub firing: bool,
}

impl AgentSnapshot {
    fn from_body(body: &Body, firing: bool) -> Self {
        Self {
            pos: body.pos,
            vel: body.vel,
            exploded: body.exploded,
            firing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    pub id: EnemyId,
    #[serde(flatten)]
    pub agent: AgentSnapshot,
    pub moving_left: bool,
    pub diving: bool,
    /// Ray readings from the last time this enemy was sensed
    pub last_rays: Vec<RayReading>,
}

/// Serializable picture of a run after a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub ticks: u64,
    pub copter: AgentSnapshot,
    pub enemies: Vec<EnemySnapshot>,
    pub pending: usize,
    pub shots: Vec<Vec2>,
    pub copter_rays: Vec<RayReading>,
    pub stats: RunStats,
}
