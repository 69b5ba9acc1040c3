//! Value-based reinforcement learning agents for qlearn
//!
//! This crate provides:
//! - Tabular Q-learning over a dense Q-table
//! - Q-learning with a linear function approximator (Adam or momentum SGD)
//! - Epsilon schedules
//! - The episode training loop and its report

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod linear;
pub mod model;
pub mod schedule;
pub mod tabular;
pub mod trainer;

// Re-export agents
pub use linear::{LinearConfig, LinearQAgent};
pub use tabular::{QTable, TabularAgent, TabularConfig, UpdateRule};

// Re-export models and schedules
pub use model::{LinearModel, Loss, Optimizer};
pub use schedule::{
    ConstantSchedule, EpsilonSchedule, ExponentialDecay, LinearSchedule, MultiplicativeDecay,
    Schedule,
};

// Re-export training loop
pub use trainer::{EpisodeRecord, RewardSummary, Trainer, TrainingConfig, TrainingReport};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        EpsilonSchedule, LinearConfig, LinearQAgent, Loss, Optimizer, Schedule, TabularAgent,
        TabularConfig, Trainer, TrainingConfig, TrainingReport, UpdateRule,
    };
    pub use qlearn_core::prelude::*;
}
