//! Tabular Q-learning over discrete states

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use qlearn_core::{
    bellman_target, seeded_rng, ActionValueFunction, Agent, AgentConfig, AgentMetrics,
    DiscreteAction, DiscreteObservation, EpsilonGreedy, RLError, Result, Transition,
};

/// How a Bellman target is written into the table
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum UpdateRule {
    /// `Q[s][a] = target`
    #[default]
    Overwrite,
    /// `Q[s][a] += alpha * (target - Q[s][a])`
    Blend {
        /// Step size, in `(0, 1]`
        alpha: f64,
    },
}

/// Tabular agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularConfig {
    /// Base agent configuration
    #[serde(flatten)]
    pub base: AgentConfig,
    /// Write rule for targets
    pub update_rule: UpdateRule,
    /// Scale of the noise used to break greedy ties, off when `None`
    pub tie_noise: Option<f64>,
}

impl Default for TabularConfig {
    fn default() -> Self {
        Self {
            base: AgentConfig::new(0.9, 1e-2),
            update_rule: UpdateRule::Overwrite,
            tie_noise: None,
        }
    }
}

impl TabularConfig {
    /// Validate the base config and the update rule
    pub fn validate(&self) -> Result<()> {
        self.base.validate()?;
        if let UpdateRule::Blend { alpha } = self.update_rule {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(RLError::InvalidConfig(format!(
                    "blend alpha must be in (0, 1], got {alpha}"
                )));
            }
        }
        if let Some(scale) = self.tie_noise {
            if !scale.is_finite() || scale < 0.0 {
                return Err(RLError::InvalidConfig(format!(
                    "tie noise must be non-negative, got {scale}"
                )));
            }
        }
        Ok(())
    }
}

/// Dense `states x actions` table of action values, zero initialised
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QTable {
    values: Array2<f64>,
}

impl QTable {
    /// Zero table
    pub fn new(num_states: usize, num_actions: usize) -> Result<Self> {
        if num_states == 0 || num_actions == 0 {
            return Err(RLError::InvalidConfig(format!(
                "Q-table needs at least one state and one action, got {num_states}x{num_actions}"
            )));
        }
        Ok(Self {
            values: Array2::zeros((num_states, num_actions)),
        })
    }

    /// Number of states
    #[must_use]
    pub fn num_states(&self) -> usize {
        self.values.nrows()
    }

    /// Number of actions
    #[must_use]
    pub fn num_actions(&self) -> usize {
        self.values.ncols()
    }

    /// Estimates for every action in `state`
    pub fn row(&self, state: usize) -> Result<ArrayView1<'_, f64>> {
        if state >= self.num_states() {
            return Err(RLError::InvalidState(format!(
                "state {state} outside table of {} states",
                self.num_states()
            )));
        }
        Ok(self.values.row(state))
    }

    /// Single entry
    pub fn get(&self, state: usize, action: usize) -> Result<f64> {
        let row = self.row(state)?;
        row.get(action).copied().ok_or(RLError::InvalidAction {
            action,
            n: self.num_actions(),
        })
    }

    /// Overwrite a single entry
    pub fn set(&mut self, state: usize, action: usize, value: f64) -> Result<()> {
        let n = self.num_actions();
        let entry = self
            .values
            .get_mut((state, action))
            .ok_or_else(|| {
                if action >= n {
                    RLError::InvalidAction { action, n }
                } else {
                    RLError::InvalidState(format!("state {state} outside table"))
                }
            })?;
        *entry = value;
        Ok(())
    }

    /// Whole table
    #[must_use]
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }
}

/// Q-learning agent backed by a [`QTable`]
pub struct TabularAgent {
    config: TabularConfig,
    table: QTable,
    selector: EpsilonGreedy,
    rng: StdRng,
    metrics: AgentMetrics,
}

impl TabularAgent {
    /// Create an agent with a zeroed table
    pub fn new(num_states: usize, num_actions: usize, config: TabularConfig) -> Result<Self> {
        config.validate()?;
        let selector = match config.tie_noise {
            Some(scale) => EpsilonGreedy::with_tie_noise(scale),
            None => EpsilonGreedy::new(),
        };
        Ok(Self {
            table: QTable::new(num_states, num_actions)?,
            rng: seeded_rng(config.base.seed),
            selector,
            config,
            metrics: AgentMetrics::default(),
        })
    }

    /// Current table
    #[must_use]
    pub fn table(&self) -> &QTable {
        &self.table
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &TabularConfig {
        &self.config
    }

    /// Greedy action for every state, first index on ties
    #[must_use]
    pub fn greedy_policy(&self) -> Vec<DiscreteAction> {
        self.table
            .values()
            .rows()
            .into_iter()
            .map(|row| {
                let values = row.to_vec();
                DiscreteAction(qlearn_core::argmax(&values).unwrap_or(0))
            })
            .collect()
    }
}

impl Agent for TabularAgent {
    type Observation = DiscreteObservation;

    fn select_action(
        &mut self,
        observation: &DiscreteObservation,
        epsilon: f64,
    ) -> Result<DiscreteAction> {
        let values = self.table.row(observation.index())?.to_vec();
        let choice = self.selector.select(&values, epsilon, &mut self.rng)?;

        self.metrics.total_actions += 1;
        if choice.is_exploration() {
            self.metrics.exploration_actions += 1;
        }
        Ok(choice.action())
    }

    fn update(&mut self, transition: &Transition<DiscreteObservation>) -> Result<f64> {
        let state = transition.observation.index();
        let action = transition.action.index();
        let current = self.table.get(state, action)?;

        let next_values = if transition.done {
            Vec::new()
        } else {
            self.table.row(transition.next_observation.index())?.to_vec()
        };
        let target = bellman_target(
            transition.reward.value(),
            self.config.base.gamma,
            &next_values,
            transition.done,
        )?;

        let td_error = target - current;
        let updated = match self.config.update_rule {
            UpdateRule::Overwrite => target,
            UpdateRule::Blend { alpha } => current + alpha * td_error,
        };
        self.table.set(state, action, updated)?;
        trace!(state, action, target, "tabular update");

        let loss = td_error * td_error;
        self.metrics.total_updates += 1;
        self.metrics.loss = Some(loss);
        Ok(loss)
    }

    fn metrics(&self) -> AgentMetrics {
        self.metrics.clone()
    }
}

impl ActionValueFunction for TabularAgent {
    type Observation = DiscreteObservation;

    fn num_actions(&self) -> usize {
        self.table.num_actions()
    }

    fn q_values(&self, observation: &DiscreteObservation) -> Result<Vec<f64>> {
        Ok(self.table.row(observation.index())?.to_vec())
    }
}
