//! Example: linear Q-function on CartPole with Adam and exponential epsilon decay

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use qlearn_agent::{
    EpsilonSchedule, LinearConfig, LinearQAgent, Loss, Optimizer, Trainer, TrainingConfig,
};
use qlearn_core::{AgentConfig, EnvironmentConfig};
use qlearn_env::{CartPoleEnv, TimeLimit};

fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // CartPole-v0 episode length
    let env_config = EnvironmentConfig {
        max_steps: Some(200),
        ..EnvironmentConfig::seeded(23)
    };
    let env = TimeLimit::from_config(CartPoleEnv::new(&env_config), &env_config);

    let agent_config = LinearConfig {
        base: AgentConfig::new(0.85, 0.01).with_seed(23),
        optimizer: Optimizer::adam(),
        loss: Loss::Mse,
    };
    let agent = LinearQAgent::new(4, 2, agent_config)?;

    let config = TrainingConfig {
        report_interval: 10,
        score_to_solve: Some(195.0),
        ..TrainingConfig::new(2000, EpsilonSchedule::exponential(0.9, 0.02, 500.0))
    };
    let mut trainer = Trainer::new(env, agent, config)?;
    let report = trainer.run()?;

    match report.solved_after {
        Some(episode) => info!(episode, "solved"),
        None => info!("not solved"),
    }
    if let Some(summary) = report.summary() {
        info!(
            mean = summary.mean,
            std_dev = summary.std_dev,
            max = summary.max,
            last_100 = report.solve_score(),
            "episode rewards"
        );
    }

    Ok(())
}
