//! Reinforcement learning environments for qlearn
//!
//! This crate provides the simulated environments the agents train against:
//! - FrozenLake grid world (tabular)
//! - CartPole classic control (continuous observations)
//! - A multi-stock trading market with a combinatorial action space
//!
//! plus the observation scaler and wrappers used around them.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod classic;
pub mod frozen_lake;
pub mod scaler;
pub mod trading;
pub mod wrappers;

// Re-export environments
pub use classic::{CartPoleConfig, CartPoleEnv};
pub use frozen_lake::{FrozenLakeConfig, FrozenLakeEnv, FrozenLakeMap, Tile};
pub use scaler::StandardScaler;
pub use trading::{
    enumerate_actions, MultiStockEnv, PriceTable, TradeAction, TradingConfig, PORTFOLIO_VALUE_KEY,
};
pub use wrappers::{Normalize, TimeLimit};

// Re-export core types
pub use qlearn_core::{
    DiscreteAction, DiscreteObservation, Environment, EnvironmentConfig, Step, StepInfo,
    VectorObservation,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        CartPoleEnv, FrozenLakeEnv, MultiStockEnv, Normalize, PriceTable, StandardScaler,
        TimeLimit, TradingConfig,
    };
    pub use qlearn_core::prelude::*;
}
