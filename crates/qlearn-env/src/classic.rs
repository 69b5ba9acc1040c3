//! Classic control environments

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use qlearn_core::{
    BoxObservationSpace, DiscreteAction, DiscreteSpace, Environment, EnvironmentConfig,
    ObservationSpace, RLError, Result, Step, VectorObservation,
};

/// CartPole environment
///
/// A pole hinged on a cart; push the cart left (0) or right (1) to keep the
/// pole upright. Reward 1 for every step, including the one that ends the
/// episode. Wrap in [`TimeLimit`](crate::TimeLimit) for the usual 200 or 500
/// step cap.
pub struct CartPoleEnv {
    state: CartPoleState,
    config: CartPoleConfig,
    steps: usize,
    finished: bool,
    rng: StdRng,
}

#[derive(Debug, Clone, Default)]
struct CartPoleState {
    x: f64,         // Cart position
    x_dot: f64,     // Cart velocity
    theta: f64,     // Pole angle
    theta_dot: f64, // Pole angular velocity
}

/// CartPole physics constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartPoleConfig {
    /// Gravitational acceleration
    pub gravity: f64,
    /// Cart mass
    pub mass_cart: f64,
    /// Pole mass
    pub mass_pole: f64,
    /// Half the pole length
    pub length: f64,
    /// Magnitude of the push
    pub force_mag: f64,
    /// Seconds between state updates
    pub tau: f64,
    /// Cart position beyond which the episode fails
    pub x_threshold: f64,
    /// Pole angle (radians) beyond which the episode fails
    pub theta_threshold: f64,
}

impl Default for CartPoleConfig {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            mass_cart: 1.0,
            mass_pole: 0.1,
            length: 0.5,
            force_mag: 10.0,
            tau: 0.02,
            x_threshold: 2.4,
            theta_threshold: 12.0_f64.to_radians(),
        }
    }
}

impl CartPoleEnv {
    /// Create a new CartPole environment with the standard physics
    #[must_use]
    pub fn new(env_config: &EnvironmentConfig) -> Self {
        Self::with_physics(CartPoleConfig::default(), env_config)
    }

    /// Create a CartPole environment with custom physics
    #[must_use]
    pub fn with_physics(config: CartPoleConfig, env_config: &EnvironmentConfig) -> Self {
        Self {
            state: CartPoleState::default(),
            config,
            steps: 0,
            finished: true,
            rng: env_config.rng(),
        }
    }

    /// Steps taken since the last reset
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }

    fn get_observation(&self) -> VectorObservation {
        VectorObservation {
            data: vec![
                self.state.x,
                self.state.x_dot,
                self.state.theta,
                self.state.theta_dot,
            ],
        }
    }

    fn is_done(&self) -> bool {
        self.state.x.abs() > self.config.x_threshold
            || self.state.theta.abs() > self.config.theta_threshold
    }
}

impl Environment for CartPoleEnv {
    type Observation = VectorObservation;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        let high = [
            self.config.x_threshold * 2.0,
            f64::INFINITY,
            self.config.theta_threshold * 2.0,
            f64::INFINITY,
        ];
        Box::new(BoxObservationSpace {
            low: high.iter().map(|&x| -x).collect(),
            high: high.to_vec(),
        })
    }

    fn action_space(&self) -> DiscreteSpace {
        DiscreteSpace::new(2) // 0: push left, 1: push right
    }

    fn reset(&mut self) -> Result<Self::Observation> {
        let mut noise = || self.rng.gen_range(-0.05..0.05);
        self.state = CartPoleState {
            x: noise(),
            x_dot: noise(),
            theta: noise(),
            theta_dot: noise(),
        };
        self.steps = 0;
        self.finished = false;

        Ok(self.get_observation())
    }

    fn step(&mut self, action: DiscreteAction) -> Result<Step<Self::Observation>> {
        let action = self.action_space().check(action)?;
        if self.finished {
            return Err(RLError::Environment(
                "CartPole stepped after the episode finished; call reset".into(),
            ));
        }

        let force = if action.0 == 1 {
            self.config.force_mag
        } else {
            -self.config.force_mag
        };

        let cos_theta = self.state.theta.cos();
        let sin_theta = self.state.theta.sin();

        let total_mass = self.config.mass_cart + self.config.mass_pole;
        let pole_mass_length = self.config.mass_pole * self.config.length;

        let temp =
            (force + pole_mass_length * self.state.theta_dot.powi(2) * sin_theta) / total_mass;
        let theta_acc = (self.config.gravity * sin_theta - cos_theta * temp)
            / (self.config.length
                * (4.0 / 3.0 - self.config.mass_pole * cos_theta.powi(2) / total_mass));
        let x_acc = temp - pole_mass_length * theta_acc * cos_theta / total_mass;

        // Explicit Euler
        let dt = self.config.tau;
        self.state.x += dt * self.state.x_dot;
        self.state.x_dot += dt * x_acc;
        self.state.theta += dt * self.state.theta_dot;
        self.state.theta_dot += dt * theta_acc;

        self.steps += 1;
        self.finished = self.is_done();

        Ok(Step::running(self.get_observation(), 1.0).with_done(self.finished))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reset_noise_is_small_and_seeded() {
        let mut a = CartPoleEnv::new(&EnvironmentConfig::seeded(23));
        let mut b = CartPoleEnv::new(&EnvironmentConfig::seeded(23));
        let obs_a = a.reset().unwrap();
        let obs_b = b.reset().unwrap();
        assert_eq!(obs_a, obs_b);
        assert!(obs_a.data.iter().all(|v| v.abs() < 0.05));
    }

    #[test]
    fn test_push_moves_cart() {
        let mut env = CartPoleEnv::new(&EnvironmentConfig::seeded(1));
        let start = env.reset().unwrap();
        let step = env.step(DiscreteAction(1)).unwrap();
        // velocity increases when pushed right
        assert!(step.observation.data[1] > start.data[1]);
        assert_relative_eq!(step.reward.value(), 1.0);
        // position integrates the previous velocity
        assert_relative_eq!(step.observation.data[0], start.data[0] + 0.02 * start.data[1]);
    }

    #[test]
    fn test_constant_push_eventually_fails() {
        let mut env = CartPoleEnv::new(&EnvironmentConfig::seeded(2));
        env.reset().unwrap();
        let mut steps = 0;
        loop {
            let step = env.step(DiscreteAction(0)).unwrap();
            steps += 1;
            if step.done {
                break;
            }
            assert!(steps < 500, "pole should fall under a constant push");
        }
        assert_eq!(env.steps(), steps);
        assert!(env.step(DiscreteAction(0)).is_err());
    }

    #[test]
    fn test_step_before_reset_is_an_error() {
        let mut env = CartPoleEnv::new(&EnvironmentConfig::default());
        assert!(env.step(DiscreteAction(0)).is_err());
    }

    #[test]
    fn test_invalid_action() {
        let mut env = CartPoleEnv::new(&EnvironmentConfig::seeded(0));
        env.reset().unwrap();
        assert!(env.step(DiscreteAction(2)).is_err());
    }
}
