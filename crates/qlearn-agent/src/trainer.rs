//! Episode loop shared by every agent/environment pairing

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram, increment_counter};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::{debug, info};
use uuid::Uuid;

use qlearn_core::{Agent, Environment, RLError, Result, StepInfo, Transition};

use crate::schedule::{EpsilonSchedule, Schedule};

/// Window used for the "solved" criterion and the trailing progress mean
pub const SOLVE_WINDOW: usize = 100;

/// Training loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Episodes to run
    pub episodes: usize,
    /// Exploration rate as a function of frames seen
    pub epsilon: EpsilonSchedule,
    /// Log a progress summary every this many episodes
    pub report_interval: usize,
    /// Trailing-100 score (see [`TrainingReport::solve_score`]) that counts as solved
    pub score_to_solve: Option<f64>,
    /// Whether the agent is updated after each step
    pub learn: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 1000,
            epsilon: EpsilonSchedule::default(),
            report_interval: 100,
            score_to_solve: None,
            learn: true,
        }
    }
}

impl TrainingConfig {
    /// Config running `episodes` episodes with a fixed epsilon
    #[must_use]
    pub fn new(episodes: usize, epsilon: EpsilonSchedule) -> Self {
        Self {
            episodes,
            epsilon,
            ..Self::default()
        }
    }

    /// Same config without parameter updates
    #[must_use]
    pub fn evaluation(mut self) -> Self {
        self.learn = false;
        self
    }

    /// Validate the loop settings and the schedule
    pub fn validate(&self) -> Result<()> {
        if self.report_interval == 0 {
            return Err(RLError::InvalidConfig(
                "report_interval must be at least 1".into(),
            ));
        }
        if let Some(score) = self.score_to_solve {
            if !score.is_finite() {
                return Err(RLError::InvalidConfig(format!(
                    "score_to_solve must be finite, got {score}"
                )));
            }
        }
        self.epsilon.validate()
    }
}

/// Metrics of one finished episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// Zero-based episode index within the run
    pub index: usize,
    /// Steps taken
    pub steps: usize,
    /// Sum of rewards
    pub total_reward: f64,
    /// Reward of the last step
    pub final_reward: f64,
    /// Epsilon used for the last step
    pub epsilon: f64,
    /// Info of the last step
    pub info: StepInfo,
    /// Mean update loss, `None` when nothing was learned
    pub mean_loss: Option<f64>,
    /// When the episode started
    pub started_at: DateTime<Utc>,
    /// When the episode finished
    pub finished_at: DateTime<Utc>,
}

/// Summary statistics over a set of episode rewards
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardSummary {
    /// Mean
    pub mean: f64,
    /// Sample standard deviation
    pub std_dev: f64,
    /// Minimum
    pub min: f64,
    /// Maximum
    pub max: f64,
}

/// Outcome of a [`Trainer::run`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Identifier of this run
    pub run_id: Uuid,
    /// Episode records in order
    pub records: Vec<EpisodeRecord>,
    /// Environment steps across all episodes
    pub frames_total: usize,
    /// First episode whose trailing mean exceeded the configured score
    pub solved_after: Option<usize>,
}

impl TrainingReport {
    /// Total reward per episode
    #[must_use]
    pub fn rewards(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.total_reward).collect()
    }

    /// Mean total reward of the last `n` episodes (all if fewer)
    #[must_use]
    pub fn mean_reward_last(&self, n: usize) -> f64 {
        let start = self.records.len().saturating_sub(n);
        self.records[start..].iter().map(|r| r.total_reward).mean()
    }

    /// Sum of the last [`SOLVE_WINDOW`] total rewards divided by the full window
    ///
    /// Missing episodes count as zero, so a short run cannot look solved.
    #[must_use]
    pub fn solve_score(&self) -> f64 {
        let start = self.records.len().saturating_sub(SOLVE_WINDOW);
        let sum: f64 = self.records[start..].iter().map(|r| r.total_reward).sum();
        sum / SOLVE_WINDOW as f64
    }

    /// Statistics over all episode rewards, `None` for an empty run
    #[must_use]
    pub fn summary(&self) -> Option<RewardSummary> {
        if self.records.is_empty() {
            return None;
        }
        let rewards = self.rewards();
        Some(RewardSummary {
            mean: rewards.iter().mean(),
            std_dev: if rewards.len() > 1 {
                rewards.iter().std_dev()
            } else {
                0.0
            },
            min: Statistics::min(rewards.iter()),
            max: Statistics::max(rewards.iter()),
        })
    }

    /// Final info values stored under `key`, one per episode that had it
    #[must_use]
    pub fn final_info(&self, key: &str) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|r| r.info.get_f64(key))
            .collect()
    }
}

/// Runs episodes of an agent against an environment
pub struct Trainer<E, A> {
    env: E,
    agent: A,
    config: TrainingConfig,
    frames: usize,
    episodes: usize,
}

impl<E, A> Trainer<E, A>
where
    E: Environment,
    A: Agent<Observation = E::Observation>,
{
    /// Create a trainer, validating the config
    pub fn new(env: E, agent: A, config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            env,
            agent,
            config,
            frames: 0,
            episodes: 0,
        })
    }

    /// Environment
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Agent
    pub fn agent(&self) -> &A {
        &self.agent
    }

    /// Mutable agent
    pub fn agent_mut(&mut self) -> &mut A {
        &mut self.agent
    }

    /// Frames seen so far
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Episodes finished so far
    pub fn episodes(&self) -> usize {
        self.episodes
    }

    /// Take the environment and agent back
    pub fn into_parts(self) -> (E, A) {
        (self.env, self.agent)
    }

    /// Play one episode to the end
    pub fn run_episode(&mut self) -> Result<EpisodeRecord> {
        let started_at = Utc::now();
        let mut observation = self.env.reset()?;
        let mut steps = 0;
        let mut total_reward = 0.0;
        let mut losses = Vec::new();

        let (epsilon, final_reward, info) = loop {
            self.frames += 1;
            let epsilon = self.config.epsilon.value(self.frames);
            let action = self.agent.select_action(&observation, epsilon)?;
            let step = self.env.step(action)?;
            steps += 1;
            total_reward += step.reward.value();

            if self.config.learn {
                let transition = Transition::from_step(observation, action, &step);
                losses.push(self.agent.update(&transition)?);
            }

            if step.is_finished() {
                break (epsilon, step.reward.value(), step.info);
            }
            observation = step.observation;
        };

        let mean_loss = if losses.is_empty() {
            None
        } else {
            Some(losses.iter().mean())
        };
        let record = EpisodeRecord {
            index: self.episodes,
            steps,
            total_reward,
            final_reward,
            epsilon,
            info,
            mean_loss,
            started_at,
            finished_at: Utc::now(),
        };
        self.episodes += 1;

        debug!(
            episode = record.index,
            steps,
            total_reward,
            epsilon,
            "episode finished"
        );
        increment_counter!("qlearn_episodes_total");
        counter!("qlearn_frames_total", steps as u64);
        gauge!("qlearn_epsilon", epsilon);
        histogram!("qlearn_episode_reward", total_reward);
        if let Some(loss) = mean_loss {
            histogram!("qlearn_episode_loss", loss);
        }

        Ok(record)
    }

    /// Run the configured number of episodes
    pub fn run(&mut self) -> Result<TrainingReport> {
        let mut report = TrainingReport {
            run_id: Uuid::new_v4(),
            records: Vec::with_capacity(self.config.episodes),
            frames_total: 0,
            solved_after: None,
        };
        let frames_before = self.frames;
        info!(
            run_id = %report.run_id,
            episodes = self.config.episodes,
            learn = self.config.learn,
            "starting run"
        );

        for _ in 0..self.config.episodes {
            let record = self.run_episode()?;
            let index = report.records.len();
            report.records.push(record);

            if let (Some(score), None) = (self.config.score_to_solve, report.solved_after) {
                if report.solve_score() > score {
                    info!(episode = index, score, "solved");
                    report.solved_after = Some(index);
                }
            }

            if (index + 1) % self.config.report_interval == 0 {
                info!(
                    episode = index + 1,
                    frames = self.frames,
                    interval_mean = report.mean_reward_last(self.config.report_interval),
                    last_100_mean = report.solve_score(),
                    overall_mean = report.mean_reward_last(report.records.len()),
                    epsilon = report.records[index].epsilon,
                    "training progress"
                );
            }
        }

        report.frames_total = self.frames - frames_before;
        Ok(report)
    }
}
