//! Q-learning with a linear function approximator

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use qlearn_core::{
    bellman_target, seeded_rng, ActionValueFunction, Agent, AgentConfig, AgentMetrics,
    DiscreteAction, EpsilonGreedy, Result, Transition, VectorObservation,
};

use crate::model::{LinearModel, Loss, Optimizer};

/// Linear agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearConfig {
    /// Base agent configuration
    #[serde(flatten)]
    pub base: AgentConfig,
    /// Optimizer for the model parameters
    pub optimizer: Optimizer,
    /// Regression loss on the chosen action's value
    pub loss: Loss,
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            base: AgentConfig::new(0.85, 1e-2),
            optimizer: Optimizer::adam(),
            loss: Loss::Mse,
        }
    }
}

impl LinearConfig {
    /// Validate base config and optimizer coefficients
    pub fn validate(&self) -> Result<()> {
        self.base.validate()?;
        self.optimizer.validate()
    }
}

/// Epsilon-greedy Q-learning agent over a [`LinearModel`]
pub struct LinearQAgent {
    config: LinearConfig,
    model: LinearModel,
    selector: EpsilonGreedy,
    rng: StdRng,
    metrics: AgentMetrics,
}

impl LinearQAgent {
    /// Create an agent for `input_dim`-dimensional observations and `num_actions` actions
    pub fn new(input_dim: usize, num_actions: usize, config: LinearConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = seeded_rng(config.base.seed);
        let model = LinearModel::new(
            input_dim,
            num_actions,
            config.optimizer,
            config.base.learning_rate,
            &mut rng,
        )?;
        Ok(Self {
            config,
            model,
            selector: EpsilonGreedy::new(),
            rng,
            metrics: AgentMetrics::default(),
        })
    }

    /// Underlying model
    #[must_use]
    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &LinearConfig {
        &self.config
    }
}

impl Agent for LinearQAgent {
    type Observation = VectorObservation;

    fn select_action(
        &mut self,
        observation: &VectorObservation,
        epsilon: f64,
    ) -> Result<DiscreteAction> {
        let values = self.model.predict(&observation.data)?.to_vec();
        let choice = self.selector.select(&values, epsilon, &mut self.rng)?;

        self.metrics.total_actions += 1;
        if choice.is_exploration() {
            self.metrics.exploration_actions += 1;
        }
        Ok(choice.action())
    }

    fn update(&mut self, transition: &Transition<VectorObservation>) -> Result<f64> {
        // the target is a constant for this step
        let next_values = if transition.done {
            Vec::new()
        } else {
            self.model.predict(&transition.next_observation.data)?.to_vec()
        };
        let target = bellman_target(
            transition.reward.value(),
            self.config.base.gamma,
            &next_values,
            transition.done,
        )?;

        let loss = self.model.train_step(
            &transition.observation.data,
            transition.action.index(),
            target,
            self.config.loss,
        )?;

        self.metrics.total_updates += 1;
        self.metrics.loss = Some(loss);
        Ok(loss)
    }

    fn metrics(&self) -> AgentMetrics {
        self.metrics.clone()
    }
}

impl ActionValueFunction for LinearQAgent {
    type Observation = VectorObservation;

    fn num_actions(&self) -> usize {
        self.model.outputs()
    }

    fn q_values(&self, observation: &VectorObservation) -> Result<Vec<f64>> {
        Ok(self.model.predict(&observation.data)?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use qlearn_core::{RLError, Reward};

    fn agent(optimizer: Optimizer) -> LinearQAgent {
        let config = LinearConfig {
            base: AgentConfig::new(0.9, 0.01).with_seed(3),
            optimizer,
            loss: Loss::Mse,
        };
        LinearQAgent::new(4, 2, config).unwrap()
    }

    fn transition(done: bool) -> Transition<VectorObservation> {
        Transition {
            observation: VectorObservation::new(vec![0.1, -0.2, 0.3, 0.05]),
            action: DiscreteAction(1),
            reward: Reward(1.0),
            next_observation: VectorObservation::new(vec![0.2, 0.1, -0.1, 0.0]),
            done,
        }
    }

    #[test]
    fn test_update_moves_prediction_towards_target() {
        let mut agent = agent(Optimizer::sgd(0.0));
        let t = transition(true);
        let before = agent.q_values(&t.observation).unwrap();
        let loss = agent.update(&t).unwrap();
        let after = agent.q_values(&t.observation).unwrap();

        assert_relative_eq!(loss, (before[1] - 1.0).powi(2), epsilon = 1e-12);
        assert!((after[1] - 1.0).abs() < (before[1] - 1.0).abs());
        assert_relative_eq!(after[0], before[0], epsilon = 1e-12);
        assert_eq!(agent.model().losses().len(), 1);
    }

    #[test]
    fn test_bootstrapped_target_uses_next_state() {
        let mut agent = agent(Optimizer::sgd(0.0));
        let t = transition(false);
        let next_best = agent
            .q_values(&t.next_observation)
            .unwrap()
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max);
        let before = agent.q_value(&t.observation, DiscreteAction(1)).unwrap();
        let loss = agent.update(&t).unwrap();
        assert_relative_eq!(loss, (before - (1.0 + 0.9 * next_best)).powi(2), epsilon = 1e-12);
    }

    #[test]
    fn test_repeated_updates_converge_with_adam() {
        let mut agent = agent(Optimizer::adam());
        let t = transition(true);
        for _ in 0..2000 {
            agent.update(&t).unwrap();
        }
        assert_relative_eq!(
            agent.q_value(&t.observation, DiscreteAction(1)).unwrap(),
            1.0,
            epsilon = 5e-2
        );
        assert_eq!(agent.metrics().total_updates, 2000);
    }

    #[test]
    fn test_selection_is_greedy_at_zero_epsilon() {
        let mut agent = agent(Optimizer::adam());
        let obs = VectorObservation::new(vec![1.0, 0.0, 0.0, 0.0]);
        let (best, _) = agent.best_action_value(&obs).unwrap();
        for _ in 0..10 {
            assert_eq!(agent.select_action(&obs, 0.0).unwrap(), best);
        }
        assert_eq!(agent.metrics().exploration_actions, 0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut agent = agent(Optimizer::adam());
        let obs = VectorObservation::new(vec![1.0, 2.0]);
        assert!(matches!(
            agent.select_action(&obs, 0.0),
            Err(RLError::DimensionMismatch { expected: 4, actual: 2 })
        ));
    }

    #[test]
    fn test_same_seed_same_weights() {
        let a = agent(Optimizer::adam());
        let b = agent(Optimizer::adam());
        assert_eq!(a.model().weights(), b.model().weights());
    }
}
