//! Per-feature standardization of vector observations

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use qlearn_core::{ActionSpace, Environment, RLError, Result, VectorObservation};

/// Removes the mean and divides by the population standard deviation, per feature
///
/// Features with zero variance keep a scale of 1 so they pass through centred
/// instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    /// Fit on a set of equally sized samples
    pub fn fit(samples: &[Vec<f64>]) -> Result<Self> {
        let dim = samples
            .first()
            .map(Vec::len)
            .ok_or_else(|| RLError::Computation("cannot fit a scaler on zero samples".into()))?;
        if let Some(bad) = samples.iter().find(|s| s.len() != dim) {
            return Err(RLError::DimensionMismatch {
                expected: dim,
                actual: bad.len(),
            });
        }

        let flat: Vec<f64> = samples.iter().flatten().copied().collect();
        let data = Array2::from_shape_vec((samples.len(), dim), flat)
            .map_err(|e| RLError::Computation(e.to_string()))?;

        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| RLError::Computation("empty sample matrix".into()))?;
        let scale = data
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });

        Ok(Self { mean, scale })
    }

    /// Play one episode of uniformly random actions and fit on every observation
    /// the environment returned after a step
    ///
    /// Stops at the end of the episode or after `max_steps` steps.
    pub fn fit_random_play<E>(
        env: &mut E,
        rng: &mut dyn rand::RngCore,
        max_steps: usize,
    ) -> Result<Self>
    where
        E: Environment<Observation = VectorObservation> + ?Sized,
    {
        let action_space = env.action_space();
        env.reset()?;

        let mut states = Vec::new();
        for _ in 0..max_steps {
            let step = env.step(action_space.sample(rng))?;
            let finished = step.is_finished();
            states.push(step.observation.data);
            if finished {
                break;
            }
        }
        debug!(samples = states.len(), "fitting scaler on random play");
        Self::fit(&states)
    }

    /// Number of features
    #[must_use]
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Per-feature means
    #[must_use]
    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.mean.view()
    }

    /// Per-feature scales
    #[must_use]
    pub fn scale(&self) -> ArrayView1<'_, f64> {
        self.scale.view()
    }

    /// Standardize one sample
    pub fn transform(&self, sample: &[f64]) -> Result<Vec<f64>> {
        if sample.len() != self.dim() {
            return Err(RLError::DimensionMismatch {
                expected: self.dim(),
                actual: sample.len(),
            });
        }
        Ok(sample
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }

    /// Undo [`transform`](Self::transform)
    pub fn inverse_transform(&self, sample: &[f64]) -> Result<Vec<f64>> {
        if sample.len() != self.dim() {
            return Err(RLError::DimensionMismatch {
                expected: self.dim(),
                actual: sample.len(),
            });
        }
        Ok(sample
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(z, (m, s))| z * s + m)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fit_and_transform() {
        let samples = vec![vec![1.0, 10.0], vec![3.0, 10.0], vec![5.0, 10.0]];
        let scaler = StandardScaler::fit(&samples).unwrap();
        assert_relative_eq!(scaler.mean()[0], 3.0);
        assert_relative_eq!(scaler.scale()[0], (8.0_f64 / 3.0).sqrt());
        // constant feature keeps unit scale
        assert_relative_eq!(scaler.scale()[1], 1.0);

        let transformed: Vec<Vec<f64>> = samples
            .iter()
            .map(|s| scaler.transform(s).unwrap())
            .collect();
        let column_mean: f64 = transformed.iter().map(|t| t[0]).sum::<f64>() / 3.0;
        assert_relative_eq!(column_mean, 0.0, epsilon = 1e-12);
        assert_relative_eq!(transformed[1][1], 0.0);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let scaler = StandardScaler::fit(&[vec![2.0, -1.0], vec![4.0, 5.0]]).unwrap();
        let x = [3.5, 0.25];
        let back = scaler
            .inverse_transform(&scaler.transform(&x).unwrap())
            .unwrap();
        assert_relative_eq!(back[0], x[0], epsilon = 1e-12);
        assert_relative_eq!(back[1], x[1], epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(StandardScaler::fit(&[]).is_err());
        assert!(StandardScaler::fit(&[vec![1.0], vec![1.0, 2.0]]).is_err());
        let scaler = StandardScaler::fit(&[vec![1.0, 2.0]]).unwrap();
        assert!(scaler.transform(&[1.0]).is_err());
    }
}
