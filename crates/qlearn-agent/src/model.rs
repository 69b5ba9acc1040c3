//! Linear action-value model trained one sample at a time
//!
//! `Q(x) = x · W + b` with `W` shaped `inputs x outputs`. A training step
//! pushes a single output towards a target; the other outputs receive a zero
//! gradient (momentum and moment estimates still decay for them).

use ndarray::{Array1, Array2, ArrayView1, Zip};
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use tracing::warn;

use qlearn_core::{RLError, Result};

/// Regression loss between one prediction and its target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    /// `(y - t)^2`
    #[default]
    Mse,
    /// Huber loss with `delta = 1`
    SmoothL1,
}

impl Loss {
    /// Loss value
    #[must_use]
    pub fn value(self, prediction: f64, target: f64) -> f64 {
        let diff = prediction - target;
        match self {
            Self::Mse => diff * diff,
            Self::SmoothL1 if diff.abs() < 1.0 => 0.5 * diff * diff,
            Self::SmoothL1 => diff.abs() - 0.5,
        }
    }

    /// Derivative with respect to the prediction
    #[must_use]
    pub fn gradient(self, prediction: f64, target: f64) -> f64 {
        let diff = prediction - target;
        match self {
            Self::Mse => 2.0 * diff,
            Self::SmoothL1 => diff.clamp(-1.0, 1.0),
        }
    }
}

/// First-order optimizer applied to the weights and bias
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Optimizer {
    /// `v = momentum * v - lr * g; p += v`
    Sgd {
        /// Momentum coefficient, in `[0, 1)`
        momentum: f64,
    },
    /// Adam with bias-corrected moment estimates
    Adam {
        /// First moment decay
        beta1: f64,
        /// Second moment decay
        beta2: f64,
        /// Denominator fuzz
        eps: f64,
    },
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::adam()
    }
}

impl Optimizer {
    /// Adam with the usual `0.9 / 0.999 / 1e-8`
    #[must_use]
    pub fn adam() -> Self {
        Self::Adam {
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
        }
    }

    /// Plain or momentum SGD
    #[must_use]
    pub fn sgd(momentum: f64) -> Self {
        Self::Sgd { momentum }
    }

    /// Check the coefficients
    pub fn validate(&self) -> Result<()> {
        let ok = match *self {
            Self::Sgd { momentum } => (0.0..1.0).contains(&momentum),
            Self::Adam { beta1, beta2, eps } => {
                (0.0..1.0).contains(&beta1) && (0.0..1.0).contains(&beta2) && eps > 0.0
            }
        };
        if ok {
            Ok(())
        } else {
            Err(RLError::InvalidConfig(format!(
                "optimizer coefficients out of range: {self:?}"
            )))
        }
    }
}

/// Per-parameter optimizer state
///
/// SGD keeps its velocity in `m_*`; Adam uses both moments and the step count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Moments {
    m_weights: Array2<f64>,
    m_bias: Array1<f64>,
    v_weights: Array2<f64>,
    v_bias: Array1<f64>,
    t: i32,
}

impl Moments {
    fn zeros(inputs: usize, outputs: usize) -> Self {
        Self {
            m_weights: Array2::zeros((inputs, outputs)),
            m_bias: Array1::zeros(outputs),
            v_weights: Array2::zeros((inputs, outputs)),
            v_bias: Array1::zeros(outputs),
            t: 0,
        }
    }
}

/// Linear model `x · W + b`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    weights: Array2<f64>,
    bias: Array1<f64>,
    optimizer: Optimizer,
    learning_rate: f64,
    moments: Moments,
    losses: Vec<f64>,
}

impl LinearModel {
    /// Weights drawn from `N(0, 1) / sqrt(inputs)`, zero bias
    pub fn new(
        inputs: usize,
        outputs: usize,
        optimizer: Optimizer,
        learning_rate: f64,
        rng: &mut dyn rand::RngCore,
    ) -> Result<Self> {
        if inputs == 0 || outputs == 0 {
            return Err(RLError::InvalidConfig(format!(
                "linear model needs non-empty input and output, got {inputs}x{outputs}"
            )));
        }
        optimizer.validate()?;

        let norm = (inputs as f64).sqrt();
        let weights = Array2::from_shape_fn((inputs, outputs), |_| {
            let z: f64 = StandardNormal.sample(&mut *rng);
            z / norm
        });

        Ok(Self {
            weights,
            bias: Array1::zeros(outputs),
            optimizer,
            learning_rate,
            moments: Moments::zeros(inputs, outputs),
            losses: Vec::new(),
        })
    }

    /// Input dimension
    #[must_use]
    pub fn inputs(&self) -> usize {
        self.weights.nrows()
    }

    /// Output dimension
    #[must_use]
    pub fn outputs(&self) -> usize {
        self.weights.ncols()
    }

    /// Weight matrix
    #[must_use]
    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    /// Bias vector
    #[must_use]
    pub fn bias(&self) -> &Array1<f64> {
        &self.bias
    }

    /// Loss of every training step so far
    #[must_use]
    pub fn losses(&self) -> &[f64] {
        &self.losses
    }

    /// Output for one input vector
    pub fn predict(&self, x: &[f64]) -> Result<Array1<f64>> {
        if x.len() != self.inputs() {
            return Err(RLError::DimensionMismatch {
                expected: self.inputs(),
                actual: x.len(),
            });
        }
        Ok(ArrayView1::from(x).dot(&self.weights) + &self.bias)
    }

    /// One optimizer step on `loss(Q(x)[output], target)`
    ///
    /// Returns the loss before the step. A non-finite loss is recorded but the
    /// parameters are left untouched.
    pub fn train_step(&mut self, x: &[f64], output: usize, target: f64, loss: Loss) -> Result<f64> {
        if output >= self.outputs() {
            return Err(RLError::InvalidAction {
                action: output,
                n: self.outputs(),
            });
        }
        let prediction = self.predict(x)?[output];
        let value = loss.value(prediction, target);
        self.losses.push(value);

        if !value.is_finite() {
            warn!(prediction, target, "non-finite loss, skipping parameter update");
            return Ok(value);
        }

        let g = loss.gradient(prediction, target);
        let mut grad_weights = Array2::<f64>::zeros(self.weights.raw_dim());
        grad_weights
            .column_mut(output)
            .assign(&ArrayView1::from(x).mapv(|xi| xi * g));
        let mut grad_bias = Array1::<f64>::zeros(self.outputs());
        grad_bias[output] = g;

        self.apply(&grad_weights, &grad_bias);
        Ok(value)
    }

    fn apply(&mut self, grad_weights: &Array2<f64>, grad_bias: &Array1<f64>) {
        let lr = self.learning_rate;
        let m = &mut self.moments;
        match self.optimizer {
            Optimizer::Sgd { momentum } => {
                m.m_weights = &m.m_weights * momentum - grad_weights * lr;
                m.m_bias = &m.m_bias * momentum - grad_bias * lr;
                self.weights += &m.m_weights;
                self.bias += &m.m_bias;
            }
            Optimizer::Adam { beta1, beta2, eps } => {
                m.t = m.t.saturating_add(1);
                m.m_weights = &m.m_weights * beta1 + grad_weights * (1.0 - beta1);
                m.m_bias = &m.m_bias * beta1 + grad_bias * (1.0 - beta1);
                m.v_weights = &m.v_weights * beta2 + grad_weights.mapv(|g| g * g) * (1.0 - beta2);
                m.v_bias = &m.v_bias * beta2 + grad_bias.mapv(|g| g * g) * (1.0 - beta2);

                let c1 = 1.0 - beta1.powi(m.t);
                let c2 = 1.0 - beta2.powi(m.t);
                let step = |mean: &f64, var: &f64| lr * (mean / c1) / ((var / c2).sqrt() + eps);

                let weight_step = Zip::from(&m.m_weights).and(&m.v_weights).map_collect(step);
                let bias_step = Zip::from(&m.m_bias).and(&m.v_bias).map_collect(step);
                self.weights -= &weight_step;
                self.bias -= &bias_step;
            }
        }
    }
}
