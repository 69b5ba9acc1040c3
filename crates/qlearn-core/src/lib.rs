//! Core reinforcement learning traits and types for qlearn
//!
//! This crate provides the abstractions shared by every agent and environment
//! in the workspace: the environment contract, discrete actions, observation
//! types, the epsilon-greedy selector and the one-step Bellman target.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod action;
pub mod agent;
pub mod environment;
pub mod error;
pub mod observation;
pub mod policy;
pub mod reward;
pub mod trajectory;
pub mod value;

// Re-export core traits and types
pub use action::{Action, ActionSpace, DiscreteAction, DiscreteSpace};
pub use agent::{Agent, AgentConfig, AgentMetrics};
pub use environment::{seeded_rng, Environment, EnvironmentConfig, Step, StepInfo};
pub use error::{RLError, Result};
pub use observation::{
    BoxObservationSpace, DiscreteObservation, DiscreteObservationSpace, Observation,
    ObservationSpace, VectorObservation,
};
pub use policy::{Choice, EpsilonGreedy};
pub use reward::Reward;
pub use trajectory::Transition;
pub use value::{argmax, bellman_target, max_value, ActionValueFunction};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Agent, DiscreteAction, DiscreteObservation, Environment, EpsilonGreedy, Observation,
        Result, Reward, Step, Transition, VectorObservation,
    };
}
