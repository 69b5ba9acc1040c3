//! Example: linear Q-learning trader on three assets
//!
//! Trains on the first half of a synthetic price table and evaluates on the
//! second half with learning switched off.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use statrs::statistics::Statistics;
use tracing::info;
use tracing_subscriber::EnvFilter;

use qlearn_agent::{
    EpsilonSchedule, LinearConfig, LinearQAgent, Loss, Optimizer, Trainer, TrainingConfig,
};
use qlearn_core::{AgentConfig, Environment};
use qlearn_env::{
    MultiStockEnv, Normalize, PriceTable, StandardScaler, TradingConfig, PORTFOLIO_VALUE_KEY,
};

const EPISODES: usize = 2000;

fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut rng = StdRng::seed_from_u64(0);
    // about five years of daily closes for three assets
    let prices = PriceTable::synthetic(1259, 3, 0.0003, 0.015, &mut rng)?;
    let (train, test) = prices.split_half()?;
    let trading = TradingConfig::default();

    let mut train_env = MultiStockEnv::new(train, &trading)?;
    let max_steps = train_env.n_steps();
    let scaler = StandardScaler::fit_random_play(&mut train_env, &mut rng, max_steps)?;
    let state_dim = train_env.state_dim();
    let n_actions = train_env.action_space().n;

    let agent_config = LinearConfig {
        base: AgentConfig::new(0.95, 0.01).with_seed(0),
        optimizer: Optimizer::sgd(0.9),
        loss: Loss::Mse,
    };
    let agent = LinearQAgent::new(state_dim, n_actions, agent_config)?;

    let train_config = TrainingConfig {
        report_interval: 100,
        ..TrainingConfig::new(EPISODES, EpsilonSchedule::multiplicative(1.0, 0.01, 0.995))
    };
    let mut trainer = Trainer::new(Normalize::new(train_env, scaler.clone()), agent, train_config)?;
    let train_report = trainer.run()?;
    let train_values = train_report.final_info(PORTFOLIO_VALUE_KEY);
    info!(
        episodes = train_values.len(),
        mean_value = train_values.iter().mean(),
        "training finished"
    );

    // Same agent, held-out prices, no updates
    let (_, agent) = trainer.into_parts();
    let test_env = Normalize::new(MultiStockEnv::new(test, &trading)?, scaler);
    let test_config = TrainingConfig {
        report_interval: 100,
        ..TrainingConfig::new(EPISODES, EpsilonSchedule::constant(0.01)).evaluation()
    };
    let mut evaluation = Trainer::new(test_env, agent, test_config)?;
    let test_report = evaluation.run()?;

    let values = test_report.final_info(PORTFOLIO_VALUE_KEY);
    info!(
        mean = values.iter().mean(),
        std_dev = values.iter().std_dev(),
        min = Statistics::min(values.iter()),
        max = Statistics::max(values.iter()),
        initial = trading.initial_investment,
        "test portfolio values"
    );

    Ok(())
}
