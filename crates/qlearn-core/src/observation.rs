//! Observation representations and observation spaces

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for observations from an environment
pub trait Observation: Clone + Debug + Send + Sync {
    /// Convert observation to a feature vector
    fn to_vec(&self) -> Vec<f64>;

    /// Get the shape of the observation
    fn shape(&self) -> Vec<usize>;
}

/// Trait for defining observation spaces
pub trait ObservationSpace: Send + Sync {
    /// The type of observations in this space
    type Observation: Observation;

    /// Check if an observation is valid within this space
    fn contains(&self, obs: &Self::Observation) -> bool;

    /// Get the shape of observations in this space
    fn shape(&self) -> Vec<usize>;
}

/// Observation that is a single state index (grid worlds, tabular methods)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscreteObservation(pub usize);

impl DiscreteObservation {
    /// The state index
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Observation for DiscreteObservation {
    fn to_vec(&self) -> Vec<f64> {
        vec![self.0 as f64]
    }

    fn shape(&self) -> Vec<usize> {
        vec![1]
    }
}

/// Vector observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorObservation {
    /// The observation data
    pub data: Vec<f64>,
}

impl VectorObservation {
    /// Wrap a feature vector
    #[must_use]
    pub fn new(data: Vec<f64>) -> Self {
        Self { data }
    }

    /// Number of features
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }
}

impl From<Vec<f64>> for VectorObservation {
    fn from(data: Vec<f64>) -> Self {
        Self { data }
    }
}

impl Observation for VectorObservation {
    fn to_vec(&self) -> Vec<f64> {
        self.data.clone()
    }

    fn shape(&self) -> Vec<usize> {
        vec![self.data.len()]
    }
}

/// Finite set of `n` state indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscreteObservationSpace {
    /// Number of states
    pub n: usize,
}

impl DiscreteObservationSpace {
    /// Create a space of `n` states
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl ObservationSpace for DiscreteObservationSpace {
    type Observation = DiscreteObservation;

    fn contains(&self, obs: &Self::Observation) -> bool {
        obs.0 < self.n
    }

    fn shape(&self) -> Vec<usize> {
        vec![self.n]
    }
}

/// Box observation space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxObservationSpace {
    /// Lower bounds
    pub low: Vec<f64>,
    /// Upper bounds
    pub high: Vec<f64>,
}

impl BoxObservationSpace {
    /// Create a new box observation space
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> crate::Result<Self> {
        if low.len() != high.len() {
            return Err(crate::RLError::DimensionMismatch {
                expected: low.len(),
                actual: high.len(),
            });
        }
        Ok(Self { low, high })
    }

    /// Unbounded space of the given dimension
    #[must_use]
    pub fn unbounded(dim: usize) -> Self {
        Self {
            low: vec![f64::NEG_INFINITY; dim],
            high: vec![f64::INFINITY; dim],
        }
    }

    /// Number of dimensions
    #[must_use]
    pub fn dim(&self) -> usize {
        self.low.len()
    }
}

impl ObservationSpace for BoxObservationSpace {
    type Observation = VectorObservation;

    fn contains(&self, obs: &Self::Observation) -> bool {
        obs.data.len() == self.low.len()
            && obs
                .data
                .iter()
                .zip(&self.low)
                .zip(&self.high)
                .all(|((x, l), h)| x >= l && x <= h)
    }

    fn shape(&self) -> Vec<usize> {
        vec![self.low.len()]
    }
}
