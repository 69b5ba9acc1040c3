//! Epsilon-greedy action selection over Q-value estimates

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::value::argmax;
use crate::DiscreteAction;

/// Outcome of one epsilon-greedy draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// Uniformly random action
    Explore(DiscreteAction),
    /// Greedy action
    Exploit(DiscreteAction),
}

impl Choice {
    /// The selected action
    #[must_use]
    pub fn action(self) -> DiscreteAction {
        match self {
            Self::Explore(a) | Self::Exploit(a) => a,
        }
    }

    /// Whether the action came from the exploration branch
    #[must_use]
    pub fn is_exploration(self) -> bool {
        matches!(self, Self::Explore(_))
    }
}

/// Epsilon-greedy selector
///
/// With probability `epsilon` an action is drawn uniformly from all actions,
/// otherwise the action with the largest estimate is taken (first index on ties).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EpsilonGreedy {
    /// Scale of uniform noise added to the estimates before the greedy argmax.
    /// Lets an untrained, all-equal table pick varied greedy actions.
    pub tie_noise: Option<f64>,
}

impl EpsilonGreedy {
    /// Plain epsilon-greedy with first-index tie breaking
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Epsilon-greedy that perturbs estimates with `U[0, scale)` noise before the argmax
    #[must_use]
    pub fn with_tie_noise(scale: f64) -> Self {
        Self {
            tie_noise: Some(scale),
        }
    }

    /// Pick an action for the given estimates
    pub fn select(
        &self,
        q_values: &[f64],
        epsilon: f64,
        rng: &mut dyn rand::RngCore,
    ) -> crate::Result<Choice> {
        if q_values.is_empty() {
            return Err(crate::RLError::Agent(
                "cannot select an action from an empty Q-value vector".into(),
            ));
        }
        if epsilon.is_nan() {
            return Err(crate::RLError::InvalidConfig("epsilon is NaN".into()));
        }
        let epsilon = epsilon.clamp(0.0, 1.0);

        if rng.gen::<f64>() < epsilon {
            return Ok(Choice::Explore(DiscreteAction(rng.gen_range(0..q_values.len()))));
        }

        let best = match self.tie_noise {
            Some(scale) if scale > 0.0 => {
                let noisy: Vec<f64> = q_values
                    .iter()
                    .map(|q| q + rng.gen::<f64>() * scale)
                    .collect();
                argmax(&noisy)
            }
            _ => argmax(q_values),
        };
        // non-empty checked above
        Ok(Choice::Exploit(DiscreteAction(best.unwrap_or(0))))
    }
}
