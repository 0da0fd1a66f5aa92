//! Fixed timestep simulation tick
//!
//! One tick runs, in order: manual input, controller dispatch, physics,
//! roster window update, shots, pairwise collisions, end conditions.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{bodies_collide, body_hits_terrain};
use super::controller::ControlSource;
use super::entity::{Copter, Shot};
use super::state::{EnemyId, EnemySlot, SimState};
use super::termination::Fitness;
use crate::config::PhysicsConfig;
use crate::consts::ACTION_THRESHOLD;
use crate::error::StepError;

/// Input commands for a single tick, applied to the manually flown agent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Rotor held down
    pub thrust: bool,
    /// Fire pressed this tick (edge, not held): copter shoots, enemy dives
    pub fire: bool,
    /// Move left held down (enemies only)
    pub left: bool,
}

/// Agent reference used in events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Agent {
    Copter,
    Enemy(EnemyId),
}

/// What turned a body into a wreck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplosionCause {
    Terrain,
    Collision,
    Shot,
}

/// Edge-triggered events for presentation (sound, smoke, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimEvent {
    CopterExploded { cause: ExplosionCause },
    EnemyExploded { id: EnemyId, cause: ExplosionCause },
    ShotFired,
    EnemyDived { id: EnemyId },
    EnemyActivated { id: EnemyId },
    EnemyRetired { id: EnemyId },
    /// Rotor sputter, throttled per agent
    Sputter { agent: Agent },
}

/// Result of one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub events: Vec<SimEvent>,
    /// Set once an end condition fires
    pub finished: Option<Fitness>,
}

/// Explosion causes collected during a tick, applied once at the end.
/// The first cause recorded for a body wins.
#[derive(Debug, Default)]
struct Explosions {
    copter: Option<ExplosionCause>,
    enemies: Vec<(EnemyId, ExplosionCause)>,
}

impl Explosions {
    fn copter(&mut self, cause: ExplosionCause) {
        self.copter.get_or_insert(cause);
    }

    fn enemy(&mut self, id: EnemyId, cause: ExplosionCause) {
        if !self.enemies.iter().any(|(other, _)| *other == id) {
            self.enemies.push((id, cause));
        }
    }
}

#[inline]
fn pressed(value: f32) -> bool {
    value > ACTION_THRESHOLD
}

/// Advance the simulation by one fixed timestep
pub fn tick(state: &mut SimState, input: &TickInput) -> Result<TickOutcome, StepError> {
    let mut events = Vec::new();
    let mut explosions = Explosions::default();
    let physics = state.config.physics.clone();

    // Input and controller dispatch
    control_copter(state, input, &physics, &mut events)?;
    control_enemies(state, input, &physics, &mut events)?;
    state.stats.enemy_living_time += state.living_enemies().count() as u64;

    // Physics
    let force = state.copter.role_force(physics.thrust);
    state
        .copter
        .body
        .integrate(physics.gravity, force, physics.dt, physics.exploded_damping);
    if body_hits_terrain(&state.terrain, &state.copter.body) {
        explosions.copter(ExplosionCause::Terrain);
    }
    for slot in &mut state.active {
        let force = slot
            .enemy
            .role_force(physics.enemy_thrust, physics.enemy_left_force);
        slot.enemy
            .body
            .integrate(physics.gravity, force, physics.dt, physics.exploded_damping);
        if body_hits_terrain(&state.terrain, &slot.enemy.body) {
            explosions.enemy(slot.id, ExplosionCause::Terrain);
        }
    }

    update_roster(state, &mut events);
    step_shots(state, &physics, &mut explosions);
    resolve_collisions(state, &physics, &mut explosions);
    apply_explosions(state, explosions, &mut events);
    update_sputter(state, &mut events);

    state.ticks += 1;
    let finished = state.config.end.evaluate(state);
    if let Some(fitness) = finished {
        log::debug!("Run finished at tick {}: {:?}", state.ticks, fitness);
    }

    Ok(TickOutcome { events, finished })
}

/// Tick until an end condition fires. `input` is polled once per tick.
///
/// Without an end condition that eventually fires this never returns.
pub fn run<F>(state: &mut SimState, mut input: F) -> Result<Fitness, StepError>
where
    F: FnMut(&SimState) -> TickInput,
{
    log::info!(
        "Run starting: {} pending enemies, copter at x={}",
        state.pending.len(),
        state.copter.body.pos.x
    );
    loop {
        let tick_input = input(state);
        let outcome = tick(state, &tick_input)?;
        if let Some(fitness) = outcome.finished {
            log::info!(
                "Run ended after {} ticks with fitness {}",
                state.ticks,
                fitness.as_f64()
            );
            return Ok(fitness);
        }
    }
}

/// [`run`] with no manual input
pub fn run_headless(state: &mut SimState) -> Result<Fitness, StepError> {
    run(state, |_| TickInput::default())
}

fn shoot(state: &mut SimState, physics: &PhysicsConfig, events: &mut Vec<SimEvent>) {
    let vel = state.copter.body.vel + Vec2::new(physics.shot_speed, 0.0);
    state
        .shots
        .push(Shot::new(state.copter.body.pos, vel, physics.shot_size));
    state.copter.recoil(physics.recoil);
    state.stats.shots_fired += 1;
    events.push(SimEvent::ShotFired);
}

fn control_copter(
    state: &mut SimState,
    input: &TickInput,
    physics: &PhysicsConfig,
    events: &mut Vec<SimEvent>,
) -> Result<(), StepError> {
    if state.copter.body.exploded {
        state.copter.clear_intents();
        return Ok(());
    }
    match state.copter_control.clone() {
        ControlSource::Manual => {
            state.copter.firing = input.thrust;
            if input.fire {
                shoot(state, physics, events);
            }
        }
        ControlSource::Scripted => state.copter.clear_intents(),
        ControlSource::Learned(adapter) => {
            let perception = state.copter_bundle.sense(
                &state.copter.body,
                physics.copter_max_velocity,
                &state.terrain,
                &state.surroundings(None),
            );
            let hidden = state
                .copter_hidden
                .get_or_insert_with(|| adapter.initial_state());
            let actions = adapter.evaluate(&perception.features, hidden)?;
            state.copter_rays = perception.rays;
            state.copter.firing = pressed(actions[0]);
            if pressed(actions[1]) {
                shoot(state, physics, events);
            }
            log::trace!("copter actions {:?}", actions);
        }
    }
    Ok(())
}

fn control_enemies(
    state: &mut SimState,
    input: &TickInput,
    physics: &PhysicsConfig,
    events: &mut Vec<SimEvent>,
) -> Result<(), StepError> {
    for i in 0..state.active.len() {
        if state.active[i].enemy.body.exploded {
            state.active[i].enemy.clear_intents();
            continue;
        }
        let id = state.active[i].id;
        match state.active[i].control.clone() {
            ControlSource::Manual => {
                let enemy = &mut state.active[i].enemy;
                enemy.firing = input.thrust;
                enemy.moving_left = input.left;
                enemy.diving = false;
                if input.fire {
                    enemy.dive(physics.dive_impulse);
                    events.push(SimEvent::EnemyDived { id });
                }
            }
            ControlSource::Scripted => state.active[i].enemy.clear_intents(),
            ControlSource::Learned(adapter) => {
                let perception = state.enemy_bundle.sense(
                    &state.active[i].enemy.body,
                    physics.enemy_max_velocity,
                    &state.terrain,
                    &state.surroundings(Some(id)),
                );
                let slot = &mut state.active[i];
                let hidden = slot.hidden.get_or_insert_with(|| adapter.initial_state());
                let actions = adapter.evaluate(&perception.features, hidden)?;
                slot.last_rays = perception.rays;
                slot.enemy.firing = pressed(actions[0]);
                slot.enemy.moving_left = pressed(actions[1]);
                slot.enemy.diving = false;
                if pressed(actions[2]) {
                    slot.enemy.dive(physics.dive_impulse);
                    events.push(SimEvent::EnemyDived { id });
                }
            }
        }
    }
    Ok(())
}

/// Slide the activation window: promote pending enemies that came within the
/// intro distance, then retire active ones the copter has left behind.
fn update_roster(state: &mut SimState, events: &mut Vec<SimEvent>) {
    let copter_x = state.copter.body.pos.x;
    let intro = state.config.roster.intro_distance;
    let passed = state.config.roster.passed_distance;

    let (arriving, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending)
        .into_iter()
        .partition(|p| p.enemy.body.pos.x - copter_x < intro);
    state.pending = waiting;
    for pending in arriving {
        log::debug!("Enemy {} activated at x={}", pending.id, pending.enemy.body.pos.x);
        events.push(SimEvent::EnemyActivated { id: pending.id });
        state.stats.enemies_activated += 1;
        state.active.push(EnemySlot::activate(pending));
    }

    let retired: Vec<EnemyId> = state
        .active
        .iter()
        .filter(|slot| copter_x - slot.enemy.body.pos.x > passed)
        .map(|slot| slot.id)
        .collect();
    if retired.is_empty() {
        return;
    }
    state.active.retain(|slot| !retired.contains(&slot.id));
    for id in retired {
        log::debug!("Enemy {} retired", id);
        events.push(SimEvent::EnemyRetired { id });
        state.stats.enemies_retired += 1;
    }
}

/// Move shots; drop those that left the corridor or hit the first live enemy
/// in roster order.
fn step_shots(state: &mut SimState, physics: &PhysicsConfig, explosions: &mut Explosions) {
    let shots = std::mem::take(&mut state.shots);
    let mut kept = Vec::with_capacity(shots.len());
    for mut shot in shots {
        if !shot.step(&state.terrain, physics.gravity, physics.dt, physics.shot_max_ticks) {
            continue;
        }
        let target = state
            .active
            .iter()
            .find(|slot| !slot.enemy.body.exploded && bodies_collide(&slot.enemy.body, &shot.body));
        match target {
            Some(slot) => {
                explosions.enemy(slot.id, ExplosionCause::Shot);
                state.stats.shots_hit += 1;
            }
            None => kept.push(shot),
        }
    }
    state.shots = kept;
}

/// Copter against every active enemy, then every unordered enemy pair once
fn resolve_collisions(state: &mut SimState, physics: &PhysicsConfig, explosions: &mut Explosions) {
    let copter: &Copter = &state.copter;
    let copter_live = !copter.body.exploded;
    for slot in &mut state.active {
        let touching = copter_live && bodies_collide(&copter.body, &slot.enemy.body);
        if touching {
            if !slot.enemy.body.exploded {
                explosions.copter(ExplosionCause::Collision);
                explosions.enemy(slot.id, ExplosionCause::Collision);
                slot.enemy.body.vel *= physics.collision_friction;
            } else if !slot.touching_copter {
                // Wrecks only slow down when the contact starts
                slot.enemy.body.vel *= physics.collision_friction;
            }
        }
        slot.touching_copter = touching;
    }

    let active = &state.active;
    for (i, a) in active.iter().enumerate() {
        if a.enemy.body.exploded {
            continue;
        }
        for b in &active[i + 1..] {
            if !b.enemy.body.exploded && bodies_collide(&a.enemy.body, &b.enemy.body) {
                explosions.enemy(a.id, ExplosionCause::Collision);
                explosions.enemy(b.id, ExplosionCause::Collision);
            }
        }
    }
}

fn apply_explosions(state: &mut SimState, explosions: Explosions, events: &mut Vec<SimEvent>) {
    if let Some(cause) = explosions.copter {
        if state.copter.body.explode() {
            state.copter.clear_intents();
            log::debug!("Copter exploded ({:?}) at x={}", cause, state.copter.body.pos.x);
            events.push(SimEvent::CopterExploded { cause });
        }
    }
    for (id, cause) in explosions.enemies {
        let Some(slot) = state.active.iter_mut().find(|slot| slot.id == id) else {
            continue;
        };
        if slot.enemy.body.explode() {
            slot.enemy.clear_intents();
            state.stats.enemies_exploded += 1;
            log::debug!("Enemy {} exploded ({:?})", id, cause);
            events.push(SimEvent::EnemyExploded { id, cause });
        }
    }
}

/// Throttled rotor sputter events for agents with the rotor on
fn update_sputter(state: &mut SimState, events: &mut Vec<SimEvent>) {
    let interval = state.config.sputter_interval;
    state.copter_sputter_ticks = state.copter_sputter_ticks.saturating_add(1);
    if state.copter.firing && state.copter_sputter_ticks >= interval {
        state.copter_sputter_ticks = 0;
        events.push(SimEvent::Sputter {
            agent: Agent::Copter,
        });
    }
    for slot in &mut state.active {
        slot.sputter_ticks = slot.sputter_ticks.saturating_add(1);
        if slot.enemy.firing && slot.sputter_ticks >= interval {
            slot.sputter_ticks = 0;
            events.push(SimEvent::Sputter {
                agent: Agent::Enemy(slot.id),
            });
        }
    }
}
