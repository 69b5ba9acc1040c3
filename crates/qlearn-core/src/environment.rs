//! Environment traits and types

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::{DiscreteAction, DiscreteSpace, Observation, ObservationSpace, Reward};

/// Result of a single environment step
#[derive(Debug, Clone)]
pub struct Step<O> {
    /// Observation from the environment
    pub observation: O,
    /// Reward signal
    pub reward: Reward,
    /// Whether the episode reached a terminal state
    pub done: bool,
    /// Whether the episode was cut short (e.g., time limit)
    pub truncated: bool,
    /// Additional info from the environment
    pub info: StepInfo,
}

impl<O> Step<O> {
    /// Step that continues the episode
    pub fn running(observation: O, reward: impl Into<Reward>) -> Self {
        Self {
            observation,
            reward: reward.into(),
            done: false,
            truncated: false,
            info: StepInfo::default(),
        }
    }

    /// Builder-style setter for the terminal flag
    #[must_use]
    pub fn with_done(mut self, done: bool) -> Self {
        self.done = done;
        self
    }

    /// Builder-style setter for the info map
    #[must_use]
    pub fn with_info(mut self, info: StepInfo) -> Self {
        self.info = info;
        self
    }

    /// True once the episode must not be stepped any further
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.done || self.truncated
    }
}

/// Additional information from a step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Custom fields
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl StepInfo {
    /// Insert a field, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Builder-style variant of [`StepInfo::insert`]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Read a numeric field
    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(serde_json::Value::as_f64)
    }

    /// Whether the map holds no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Configuration shared by all environments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Random seed; `None` seeds from OS entropy
    pub seed: Option<u64>,
    /// Maximum episode steps
    pub max_steps: Option<usize>,
    /// Additional parameters
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl EnvironmentConfig {
    /// Config with a fixed seed
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// RNG for the environment's own randomness
    #[must_use]
    pub fn rng(&self) -> StdRng {
        seeded_rng(self.seed)
    }

    /// A step limit of zero would end every episode before it starts
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_steps == Some(0) {
            return Err(crate::RLError::InvalidConfig(
                "max_steps must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Build a [`StdRng`] from an optional seed
#[must_use]
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

/// Core environment trait
///
/// Actions are always indices into a finite [`DiscreteSpace`]. Environments own
/// whatever randomness they need, seeded from [`EnvironmentConfig`].
pub trait Environment {
    /// Observation type
    type Observation: Observation;

    /// Get the observation space
    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>>;

    /// Get the action space
    fn action_space(&self) -> DiscreteSpace;

    /// Reset the environment and return the first observation
    fn reset(&mut self) -> crate::Result<Self::Observation>;

    /// Take a step in the environment
    fn step(&mut self, action: DiscreteAction) -> crate::Result<Step<Self::Observation>>;

    /// Close the environment
    fn close(&mut self) -> crate::Result<()> {
        Ok(())
    }
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    type Observation = E::Observation;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        (**self).observation_space()
    }

    fn action_space(&self) -> DiscreteSpace {
        (**self).action_space()
    }

    fn reset(&mut self) -> crate::Result<Self::Observation> {
        (**self).reset()
    }

    fn step(&mut self, action: DiscreteAction) -> crate::Result<Step<Self::Observation>> {
        (**self).step(action)
    }

    fn close(&mut self) -> crate::Result<()> {
        (**self).close()
    }
}
