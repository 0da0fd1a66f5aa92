//! Controller boundary
//!
//! A learned controller is an opaque function: features in, actions out, with
//! a hidden state carried from one tick to the next. The simulation never
//! looks inside the state; it only stores it per agent and hands it back.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::entity::Role;
use crate::error::{ConfigError, StepError};

/// Opaque per-agent state carried between evaluations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HiddenState(Vec<f32>);

impl HiddenState {
    pub fn zeros(len: usize) -> Self {
        Self(vec![0.0; len])
    }

    pub fn from_vec(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Shared interface implemented by every learned controller.
///
/// Implementations are shared between agents (one network drives every
/// enemy), so evaluation takes `&self` and all per-agent memory goes through
/// the [`HiddenState`].
pub trait Controller: Send + Sync {
    /// Identifier for logs
    fn kind(&self) -> &'static str {
        "controller"
    }

    fn input_len(&self) -> usize;

    fn output_len(&self) -> usize;

    /// State a freshly spawned agent starts with
    fn initial_state(&self) -> HiddenState {
        HiddenState::default()
    }

    /// Evaluate outputs for one agent and return its next hidden state
    fn evaluate(&self, features: &[f32], state: &HiddenState) -> (Vec<f32>, HiddenState);
}

/// Stateless controller backed by a closure
pub struct FnController<F> {
    input_len: usize,
    output_len: usize,
    func: F,
}

impl<F> FnController<F>
where
    F: Fn(&[f32]) -> Vec<f32> + Send + Sync,
{
    pub fn new(input_len: usize, output_len: usize, func: F) -> Self {
        Self {
            input_len,
            output_len,
            func,
        }
    }
}

impl<F> Controller for FnController<F>
where
    F: Fn(&[f32]) -> Vec<f32> + Send + Sync,
{
    fn kind(&self) -> &'static str {
        "fn"
    }

    fn input_len(&self) -> usize {
        self.input_len
    }

    fn output_len(&self) -> usize {
        self.output_len
    }

    fn evaluate(&self, features: &[f32], state: &HiddenState) -> (Vec<f32>, HiddenState) {
        ((self.func)(features), state.clone())
    }
}

/// Validated binding of a controller to one agent role
#[derive(Clone)]
pub struct ControllerAdapter {
    role: Role,
    controller: Arc<dyn Controller>,
    feature_len: usize,
    state_len: usize,
}

impl ControllerAdapter {
    /// Bind `controller` to `role`. Feature and action lengths must match
    /// what the role's sensor bundle produces and what the role consumes.
    pub fn new(
        role: Role,
        controller: Arc<dyn Controller>,
        feature_len: usize,
    ) -> Result<Self, ConfigError> {
        if controller.input_len() != feature_len {
            return Err(ConfigError::FeatureLength {
                role,
                expected: feature_len,
                actual: controller.input_len(),
            });
        }
        if controller.output_len() != role.action_len() {
            return Err(ConfigError::ActionLength {
                role,
                expected: role.action_len(),
                actual: controller.output_len(),
            });
        }
        let state_len = controller.initial_state().len();
        Ok(Self {
            role,
            controller,
            feature_len,
            state_len,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn feature_len(&self) -> usize {
        self.feature_len
    }

    pub fn initial_state(&self) -> HiddenState {
        self.controller.initial_state()
    }

    /// Run the controller and replace `state` with its successor
    pub fn evaluate(&self, features: &[f32], state: &mut HiddenState) -> Result<Vec<f32>, StepError> {
        let (actions, next) = self.controller.evaluate(features, state);
        if actions.len() != self.role.action_len() {
            return Err(StepError::ActionLength {
                role: self.role,
                expected: self.role.action_len(),
                actual: actions.len(),
            });
        }
        if next.len() != self.state_len {
            return Err(StepError::HiddenStateLength {
                role: self.role,
                expected: self.state_len,
                actual: next.len(),
            });
        }
        *state = next;
        Ok(actions)
    }
}

impl fmt::Debug for ControllerAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerAdapter")
            .field("role", &self.role)
            .field("kind", &self.controller.kind())
            .field("feature_len", &self.feature_len)
            .field("state_len", &self.state_len)
            .finish()
    }
}

/// Who drives an agent, fixed when the run is configured
#[derive(Debug, Clone)]
pub enum ControlSource {
    /// Externally polled input
    Manual,
    /// Built-in fallback: no thrust, no actions
    Scripted,
    Learned(ControllerAdapter),
}

impl ControlSource {
    pub fn is_manual(&self) -> bool {
        matches!(self, ControlSource::Manual)
    }

    /// Fresh hidden state for a newly created agent, if learned
    pub fn initial_state(&self) -> Option<HiddenState> {
        match self {
            ControlSource::Learned(adapter) => Some(adapter.initial_state()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts its own invocations in the hidden state
    struct Counter;

    impl Controller for Counter {
        fn input_len(&self) -> usize {
            1
        }
        fn output_len(&self) -> usize {
            2
        }
        fn initial_state(&self) -> HiddenState {
            HiddenState::zeros(1)
        }
        fn evaluate(&self, _features: &[f32], state: &HiddenState) -> (Vec<f32>, HiddenState) {
            let n = state.as_slice()[0] + 1.0;
            (vec![n, 0.0], HiddenState::from_vec(vec![n]))
        }
    }

    struct Leaky;

    impl Controller for Leaky {
        fn input_len(&self) -> usize {
            1
        }
        fn output_len(&self) -> usize {
            2
        }
        fn evaluate(&self, _features: &[f32], state: &HiddenState) -> (Vec<f32>, HiddenState) {
            let mut grown = state.as_slice().to_vec();
            grown.push(1.0);
            (vec![0.0, 0.0], HiddenState::from_vec(grown))
        }
    }

    #[test]
    fn test_adapter_validates_lengths() {
        let err = ControllerAdapter::new(Role::Copter, Arc::new(Counter), 3).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::FeatureLength {
                expected: 3,
                actual: 1,
                ..
            }
        ));

        let err = ControllerAdapter::new(Role::Enemy, Arc::new(Counter), 1).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ActionLength {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_adapter_threads_hidden_state() {
        let adapter = ControllerAdapter::new(Role::Copter, Arc::new(Counter), 1).unwrap();
        let mut state = adapter.initial_state();
        for _ in 0..3 {
            adapter.evaluate(&[0.0], &mut state).unwrap();
        }
        assert_eq!(state.as_slice(), &[3.0]);
    }

    #[test]
    fn test_adapter_rejects_growing_state() {
        let adapter = ControllerAdapter::new(Role::Copter, Arc::new(Leaky), 1).unwrap();
        let mut state = adapter.initial_state();
        let err = adapter.evaluate(&[0.0], &mut state).unwrap_err();
        assert_eq!(
            err,
            StepError::HiddenStateLength {
                role: Role::Copter,
                expected: 0,
                actual: 1
            }
        );
        assert!(state.is_empty());
    }

    #[test]
    fn test_fn_controller_is_stateless() {
        let controller = FnController::new(2, 2, |f: &[f32]| vec![f[0], f[1]]);
        let (out, next) = controller.evaluate(&[0.25, 0.75], &HiddenState::zeros(4));
        assert_eq!(out, vec![0.25, 0.75]);
        assert_eq!(next, HiddenState::zeros(4));
        assert!(ControlSource::Manual.is_manual());
        assert!(ControlSource::Scripted.initial_state().is_none());
    }
}
