//! Action-value functions and the one-step Bellman target

use crate::{DiscreteAction, Observation};

/// Index of the largest value, first index on ties
///
/// NaN entries never win unless every entry is NaN, in which case index 0 is
/// returned. `None` only for an empty slice.
#[must_use]
pub fn argmax(values: &[f64]) -> Option<usize> {
    if values.is_empty() {
        return None;
    }
    let mut best = 0;
    let mut best_value = f64::NAN;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        if best_value.is_nan() || v > best_value {
            best = i;
            best_value = v;
        }
    }
    Some(best)
}

/// Largest non-NaN value, `None` for an empty slice
#[must_use]
pub fn max_value(values: &[f64]) -> Option<f64> {
    argmax(values).map(|i| values[i])
}

/// One-step Bellman target
///
/// `reward` when `done`, otherwise `reward + gamma * max(next_values)`.
/// `next_values` is not read in the terminal case.
pub fn bellman_target(
    reward: f64,
    gamma: f64,
    next_values: &[f64],
    done: bool,
) -> crate::Result<f64> {
    if done {
        return Ok(reward);
    }
    let best_next = max_value(next_values).ok_or_else(|| {
        crate::RLError::Computation("Bellman target needs at least one next-state value".into())
    })?;
    Ok(reward + gamma * best_next)
}

/// Action value function Q(s, ·)
pub trait ActionValueFunction {
    /// Observation type
    type Observation: Observation;

    /// Number of actions, i.e. the length of every [`q_values`](Self::q_values) vector
    fn num_actions(&self) -> usize;

    /// Get Q-values for all actions
    fn q_values(&self, observation: &Self::Observation) -> crate::Result<Vec<f64>>;

    /// Estimate the value of taking an action in a given state
    fn q_value(
        &self,
        observation: &Self::Observation,
        action: DiscreteAction,
    ) -> crate::Result<f64> {
        let values = self.q_values(observation)?;
        values
            .get(action.0)
            .copied()
            .ok_or(crate::RLError::InvalidAction {
                action: action.0,
                n: values.len(),
            })
    }

    /// Get the greedy action and its value
    fn best_action_value(
        &self,
        observation: &Self::Observation,
    ) -> crate::Result<(DiscreteAction, f64)> {
        let values = self.q_values(observation)?;
        let best = argmax(&values)
            .ok_or_else(|| crate::RLError::Computation("empty Q-value vector".into()))?;
        Ok((DiscreteAction(best), values[best]))
    }
}
