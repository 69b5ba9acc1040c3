//! Agent traits and types

use serde::{Deserialize, Serialize};

use crate::{DiscreteAction, Observation, Transition};

/// Hyperparameters every value-based agent shares
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Learning rate (ignored by the overwriting tabular update)
    pub learning_rate: f64,
    /// Discount factor, in `[0, 1)`
    pub gamma: f64,
    /// Seed for the agent's exploration RNG; `None` seeds from OS entropy
    pub seed: Option<u64>,
    /// Additional parameters
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-2,
            gamma: 0.9,
            seed: None,
            params: serde_json::Map::new(),
        }
    }
}

impl AgentConfig {
    /// Config with the given discount factor and learning rate
    #[must_use]
    pub fn new(gamma: f64, learning_rate: f64) -> Self {
        Self {
            gamma,
            learning_rate,
            ..Self::default()
        }
    }

    /// Builder-style setter for the seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Reject values the update rules cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        if !(0.0..1.0).contains(&self.gamma) {
            return Err(crate::RLError::InvalidConfig(format!(
                "gamma must be in [0, 1), got {}",
                self.gamma
            )));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(crate::RLError::InvalidConfig(format!(
                "learning_rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Core agent trait
pub trait Agent {
    /// Observation type
    type Observation: Observation;

    /// Select an action given an observation and exploration rate
    fn select_action(
        &mut self,
        observation: &Self::Observation,
        epsilon: f64,
    ) -> crate::Result<DiscreteAction>;

    /// Learn from one transition, returning the loss of the update
    fn update(&mut self, transition: &Transition<Self::Observation>) -> crate::Result<f64>;

    /// Get agent metrics
    fn metrics(&self) -> AgentMetrics {
        AgentMetrics::default()
    }
}

impl<A: Agent + ?Sized> Agent for Box<A> {
    type Observation = A::Observation;

    fn select_action(
        &mut self,
        observation: &Self::Observation,
        epsilon: f64,
    ) -> crate::Result<DiscreteAction> {
        (**self).select_action(observation, epsilon)
    }

    fn update(&mut self, transition: &Transition<Self::Observation>) -> crate::Result<f64> {
        (**self).update(transition)
    }

    fn metrics(&self) -> AgentMetrics {
        (**self).metrics()
    }
}

/// Agent metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    /// Actions selected
    pub total_actions: u64,
    /// Actions drawn by the exploration branch
    pub exploration_actions: u64,
    /// Updates applied
    pub total_updates: u64,
    /// Loss of the latest update
    pub loss: Option<f64>,
    /// Additional metrics
    #[serde(flatten)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

impl AgentMetrics {
    /// Share of selections that explored
    #[must_use]
    pub fn exploration_rate(&self) -> f64 {
        if self.total_actions == 0 {
            0.0
        } else {
            self.exploration_actions as f64 / self.total_actions as f64
        }
    }
}
