//! End conditions and the fitness a finished run reports

use serde::{Deserialize, Serialize};

use super::state::{ManualAgent, SimState};

/// Stop rules, checked once per tick in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndConditions {
    /// Stop once this many ticks have run
    pub max_ticks: Option<u64>,
    /// Stop when any active enemy has exploded
    pub enemy_exploded: bool,
    /// Stop when every remaining enemy (active or pending) has exploded
    pub all_enemies_exploded: bool,
    /// Stop when the copter has exploded
    pub copter_exploded: bool,
    /// Stop when the manually flown agent has crashed and drifted to a halt
    pub manual_at_rest: bool,
}

impl Default for EndConditions {
    fn default() -> Self {
        Self {
            max_ticks: None,
            enemy_exploded: false,
            all_enemies_exploded: false,
            copter_exploded: true,
            manual_at_rest: false,
        }
    }
}

/// Horizontal speed under which a wreck counts as resting
const REST_SPEED: f32 = 0.1;

/// Scalar result of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Fitness {
    /// Number of ticks simulated
    Ticks(u64),
    /// Horizontal position of the agent that ended the run
    Distance(f32),
}

impl Fitness {
    pub fn as_f64(self) -> f64 {
        match self {
            Fitness::Ticks(ticks) => ticks as f64,
            Fitness::Distance(x) => f64::from(x),
        }
    }
}

impl EndConditions {
    /// End condition only on a tick budget
    pub fn ticks(max_ticks: u64) -> Self {
        Self {
            max_ticks: Some(max_ticks),
            copter_exploded: false,
            ..Self::default()
        }
    }

    /// First matching rule, if any
    pub fn evaluate(&self, state: &SimState) -> Option<Fitness> {
        if let Some(max) = self.max_ticks {
            if state.ticks >= max {
                return Some(Fitness::Ticks(state.ticks));
            }
        }
        if self.enemy_exploded {
            if let Some(slot) = state.active.iter().find(|slot| slot.enemy.body.exploded) {
                return Some(Fitness::Distance(slot.enemy.body.pos.x));
            }
        }
        if self.all_enemies_exploded
            && state
                .active
                .iter()
                .map(|slot| &slot.enemy)
                .chain(state.pending.iter().map(|pending| &pending.enemy))
                .all(|enemy| enemy.body.exploded)
        {
            return Some(Fitness::Ticks(state.ticks));
        }
        if self.copter_exploded && state.copter.body.exploded {
            return Some(Fitness::Distance(state.copter.body.pos.x));
        }
        if self.manual_at_rest {
            let body = match state.manual_agent() {
                Some(ManualAgent::Copter) => Some(&state.copter.body),
                Some(ManualAgent::Enemy(id)) => state.slot(id).map(|slot| &slot.enemy.body),
                None => None,
            };
            if let Some(body) = body {
                if body.exploded && body.vel.x.abs() < REST_SPEED {
                    return Some(Fitness::Distance(body.pos.x));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::sim::controller::ControlSource;
    use crate::sim::terrain::Terrain;

    fn state(end: EndConditions) -> SimState {
        let config = SimConfig {
            end,
            ..SimConfig::default()
        };
        let terrain = Terrain::flat(10.0, 100, 0.0, 400.0).unwrap();
        SimState::centered(config, terrain, 50.0).unwrap()
    }

    #[test]
    fn test_tick_budget_wins_over_crash() {
        let mut state = state(EndConditions {
            max_ticks: Some(3),
            ..Default::default()
        });
        state.copter.body.exploded = true;
        assert_eq!(state.config.end.evaluate(&state), Some(Fitness::Distance(50.0)));
        state.ticks = 3;
        assert_eq!(state.config.end.evaluate(&state), Some(Fitness::Ticks(3)));
    }

    #[test]
    fn test_no_condition_keeps_running() {
        let mut state = state(EndConditions {
            copter_exploded: false,
            ..Default::default()
        });
        state.copter.body.exploded = true;
        state.ticks = 1_000_000;
        assert_eq!(state.config.end.evaluate(&state), None);
    }

    #[test]
    fn test_manual_wreck_at_rest() {
        let mut state = state(EndConditions {
            copter_exploded: false,
            manual_at_rest: true,
            ..Default::default()
        });
        state.set_copter_control(ControlSource::Manual).unwrap();
        state.copter.body.exploded = true;
        assert_eq!(state.config.end.evaluate(&state), None);

        state.copter.body.vel.x = 0.05;
        assert_eq!(state.config.end.evaluate(&state), Some(Fitness::Distance(50.0)));
        assert_eq!(Fitness::Distance(50.0).as_f64(), 50.0);
    }

    #[test]
    fn test_all_enemies_exploded_vacuous() {
        let state = state(EndConditions {
            all_enemies_exploded: true,
            copter_exploded: false,
            ..Default::default()
        });
        assert_eq!(state.config.end.evaluate(&state), Some(Fitness::Ticks(0)));
    }
}
