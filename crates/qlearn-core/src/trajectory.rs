//! Transitions handed from the training loop to an agent

use serde::{Deserialize, Serialize};

use crate::{DiscreteAction, Reward, Step};

/// Single `(s, a, r, s', done)` transition
///
/// Built right after an environment step and consumed by one
/// [`Agent::update`](crate::Agent::update) call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition<O> {
    /// Observation the action was chosen in
    pub observation: O,
    /// Action taken
    pub action: DiscreteAction,
    /// Reward received
    pub reward: Reward,
    /// Observation after the step
    pub next_observation: O,
    /// Whether the next observation is terminal
    pub done: bool,
}

impl<O: Clone> Transition<O> {
    /// Pair the pre-step observation and action with the environment's answer
    ///
    /// `done` is taken verbatim from the step, so a time limit that reports
    /// `done` also cuts the bootstrap.
    pub fn from_step(observation: O, action: DiscreteAction, step: &Step<O>) -> Self {
        Self {
            observation,
            action,
            reward: step.reward,
            next_observation: step.observation.clone(),
            done: step.done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_step_copies_outcome() {
        let step = Step::running(5_usize, 0.5).with_done(true);
        let transition = Transition::from_step(4_usize, DiscreteAction(2), &step);
        assert_eq!(transition.observation, 4);
        assert_eq!(transition.next_observation, 5);
        assert_eq!(transition.reward, Reward(0.5));
        assert!(transition.done);
    }

    #[test]
    fn test_truncated_without_done_keeps_bootstrapping() {
        let mut step = Step::running(1_usize, 1.0);
        step.truncated = true;
        let transition = Transition::from_step(0_usize, DiscreteAction(0), &step);
        assert!(!transition.done);
    }
}
