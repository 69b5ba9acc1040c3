//! Environment wrappers for common transformations

use qlearn_core::{
    BoxObservationSpace, DiscreteAction, DiscreteSpace, Environment, EnvironmentConfig,
    ObservationSpace, Result, Step, VectorObservation,
};

use crate::StandardScaler;

/// Time limit wrapper
///
/// After `max_steps` steps the episode is reported as both truncated and done.
pub struct TimeLimit<E> {
    /// Inner environment
    pub env: E,
    /// Maximum steps
    pub max_steps: usize,
    /// Current step count
    pub steps: usize,
}

impl<E> TimeLimit<E> {
    /// Create a new time limit wrapper
    pub fn new(env: E, max_steps: usize) -> Self {
        Self {
            env,
            max_steps,
            steps: 0,
        }
    }

    /// Limit taken from `config.max_steps`, unlimited when unset
    pub fn from_config(env: E, config: &EnvironmentConfig) -> Self {
        Self::new(env, config.max_steps.unwrap_or(usize::MAX))
    }

    /// Unwrap the inner environment
    pub fn into_inner(self) -> E {
        self.env
    }
}

impl<E> Environment for TimeLimit<E>
where
    E: Environment,
{
    type Observation = E::Observation;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        self.env.observation_space()
    }

    fn action_space(&self) -> DiscreteSpace {
        self.env.action_space()
    }

    fn reset(&mut self) -> Result<Self::Observation> {
        self.steps = 0;
        self.env.reset()
    }

    fn step(&mut self, action: DiscreteAction) -> Result<Step<Self::Observation>> {
        self.steps += 1;
        let mut step = self.env.step(action)?;

        if self.steps >= self.max_steps && !step.done {
            step.truncated = true;
            step.done = true;
        }

        Ok(step)
    }

    fn close(&mut self) -> Result<()> {
        self.env.close()
    }
}

/// Observation normalization wrapper
///
/// Applies a fitted [`StandardScaler`] to every observation coming out of
/// `reset` and `step`.
pub struct Normalize<E> {
    /// Inner environment
    pub env: E,
    /// Fitted scaler
    pub scaler: StandardScaler,
    /// Clip range applied after scaling
    pub clip_range: Option<(f64, f64)>,
}

impl<E> Normalize<E> {
    /// Create a new normalization wrapper
    pub fn new(env: E, scaler: StandardScaler) -> Self {
        Self {
            env,
            scaler,
            clip_range: None,
        }
    }

    /// Builder-style setter for the clip range
    #[must_use]
    pub fn with_clip(mut self, min: f64, max: f64) -> Self {
        self.clip_range = Some((min, max));
        self
    }

    /// Unwrap the inner environment
    pub fn into_inner(self) -> E {
        self.env
    }

    /// Normalize observation
    pub fn normalize(&self, obs: &VectorObservation) -> Result<VectorObservation> {
        let mut data = self.scaler.transform(&obs.data)?;
        if let Some((min, max)) = self.clip_range {
            data.iter_mut().for_each(|z| *z = z.clamp(min, max));
        }
        Ok(VectorObservation { data })
    }
}

impl<E> Environment for Normalize<E>
where
    E: Environment<Observation = VectorObservation>,
{
    type Observation = VectorObservation;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        let (low, high) = self.clip_range.unwrap_or((f64::NEG_INFINITY, f64::INFINITY));
        Box::new(BoxObservationSpace {
            low: vec![low; self.scaler.dim()],
            high: vec![high; self.scaler.dim()],
        })
    }

    fn action_space(&self) -> DiscreteSpace {
        self.env.action_space()
    }

    fn reset(&mut self) -> Result<Self::Observation> {
        let obs = self.env.reset()?;
        self.normalize(&obs)
    }

    fn step(&mut self, action: DiscreteAction) -> Result<Step<Self::Observation>> {
        let mut step = self.env.step(action)?;
        step.observation = self.normalize(&step.observation)?;
        Ok(step)
    }

    fn close(&mut self) -> Result<()> {
        self.env.close()
    }
}
