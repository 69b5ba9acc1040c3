//! Example: tabular Q-learning on the 4x4 FrozenLake
//!
//! Run with `RUST_LOG=debug` to see every episode.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use qlearn_agent::{EpsilonSchedule, TabularAgent, TabularConfig, Trainer, TrainingConfig};
use qlearn_core::{AgentConfig, EnvironmentConfig};
use qlearn_env::{FrozenLakeEnv, TimeLimit};

fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let lake = FrozenLakeEnv::not_slippery(&EnvironmentConfig::seeded(0));
    let map = lake.map().clone();
    let env = TimeLimit::new(lake, 100);

    let agent_config = TabularConfig {
        base: AgentConfig::new(0.9, 1e-2).with_seed(0),
        tie_noise: Some(1e-3),
        ..TabularConfig::default()
    };
    let agent = TabularAgent::new(map.num_states(), 4, agent_config)?;

    let config = TrainingConfig::new(1000, EpsilonSchedule::constant(0.1));
    let mut trainer = Trainer::new(env, agent, config)?;
    let report = trainer.run()?;

    let wins = report.records.iter().filter(|r| r.final_reward > 0.0).count();
    info!(
        run_id = %report.run_id,
        wins,
        episodes = report.records.len(),
        frames = report.frames_total,
        "training finished"
    );

    // Greedy policy, one arrow per cell
    let arrows = ['<', 'v', '>', '^'];
    let policy = trainer.agent().greedy_policy();
    for row in policy.chunks(map.width()) {
        let line: String = row.iter().map(|a| arrows[a.index()]).collect();
        info!("{line}");
    }

    Ok(())
}
