//! Exploration-rate schedules
//!
//! Every schedule maps the number of frames (environment steps) seen so far
//! to an epsilon in `[0, 1]`. The trainer counts the step about to be taken,
//! so the first step of a run reads `value(1)`.

use serde::{Deserialize, Serialize};

/// Trait for schedules (e.g., for epsilon decay)
pub trait Schedule {
    /// Get value at step t
    fn value(&self, t: usize) -> f64;
}

/// Constant schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantSchedule {
    /// Constant value
    pub value: f64,
}

impl Schedule for ConstantSchedule {
    fn value(&self, _t: usize) -> f64 {
        self.value
    }
}

/// Linear schedule that decays from start to end over steps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearSchedule {
    /// Starting value
    pub start: f64,
    /// Ending value
    pub end: f64,
    /// Number of steps for decay
    pub steps: usize,
}

impl Schedule for LinearSchedule {
    fn value(&self, t: usize) -> f64 {
        if t >= self.steps {
            self.end
        } else {
            let progress = t as f64 / self.steps as f64;
            self.start + (self.end - self.start) * progress
        }
    }
}

/// `end + (start - end) * exp(-t / decay)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialDecay {
    /// Value at `t = 0`
    pub start: f64,
    /// Asymptote
    pub end: f64,
    /// Frames for the gap to shrink by a factor of e
    pub decay: f64,
}

impl Schedule for ExponentialDecay {
    fn value(&self, t: usize) -> f64 {
        self.end + (self.start - self.end) * (-(t as f64) / self.decay).exp()
    }
}

/// `max(start * factor^t, min)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplicativeDecay {
    /// Value at `t = 0`
    pub start: f64,
    /// Floor
    pub min: f64,
    /// Per-frame multiplier
    pub factor: f64,
}

impl Schedule for MultiplicativeDecay {
    fn value(&self, t: usize) -> f64 {
        let exponent = i32::try_from(t).unwrap_or(i32::MAX);
        (self.start * self.factor.powi(exponent)).max(self.min)
    }
}

/// Serializable choice of schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EpsilonSchedule {
    /// See [`ConstantSchedule`]
    Constant(ConstantSchedule),
    /// See [`LinearSchedule`]
    Linear(LinearSchedule),
    /// See [`ExponentialDecay`]
    Exponential(ExponentialDecay),
    /// See [`MultiplicativeDecay`]
    Multiplicative(MultiplicativeDecay),
}

impl EpsilonSchedule {
    /// Fixed epsilon
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self::Constant(ConstantSchedule { value })
    }

    /// Exponential approach from `start` to `end`
    #[must_use]
    pub fn exponential(start: f64, end: f64, decay: f64) -> Self {
        Self::Exponential(ExponentialDecay { start, end, decay })
    }

    /// Geometric decay floored at `min`
    #[must_use]
    pub fn multiplicative(start: f64, min: f64, factor: f64) -> Self {
        Self::Multiplicative(MultiplicativeDecay { start, min, factor })
    }

    /// Check the schedule stays inside `[0, 1]` and is well defined
    pub fn validate(&self) -> qlearn_core::Result<()> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        let ok = match *self {
            Self::Constant(s) => in_unit(s.value),
            Self::Linear(s) => in_unit(s.start) && in_unit(s.end),
            Self::Exponential(s) => in_unit(s.start) && in_unit(s.end) && s.decay > 0.0,
            Self::Multiplicative(s) => {
                in_unit(s.start) && in_unit(s.min) && (0.0..=1.0).contains(&s.factor)
            }
        };
        if ok {
            Ok(())
        } else {
            Err(qlearn_core::RLError::InvalidConfig(format!(
                "epsilon schedule out of range: {self:?}"
            )))
        }
    }
}

impl Default for EpsilonSchedule {
    fn default() -> Self {
        Self::constant(0.1)
    }
}

impl Schedule for EpsilonSchedule {
    fn value(&self, t: usize) -> f64 {
        match self {
            Self::Constant(s) => s.value(t),
            Self::Linear(s) => s.value(t),
            Self::Exponential(s) => s.value(t),
            Self::Multiplicative(s) => s.value(t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exponential_decay() {
        let s = ExponentialDecay {
            start: 0.9,
            end: 0.02,
            decay: 500.0,
        };
        assert_relative_eq!(s.value(0), 0.9);
        assert_relative_eq!(s.value(500), 0.02 + 0.88 * (-1.0_f64).exp());
        assert!(s.value(100_000) - 0.02 < 1e-12);
    }

    #[test]
    fn test_multiplicative_decay() {
        let s = MultiplicativeDecay {
            start: 1.0,
            min: 0.01,
            factor: 0.995,
        };
        assert_relative_eq!(s.value(0), 1.0);
        assert_relative_eq!(s.value(2), 0.995 * 0.995);
        assert_relative_eq!(s.value(10_000), 0.01);
        assert_relative_eq!(s.value(usize::MAX), 0.01);
    }

    #[test]
    fn test_linear_schedule() {
        let s = LinearSchedule {
            start: 1.0,
            end: 0.0,
            steps: 10,
        };
        assert_relative_eq!(s.value(5), 0.5);
        assert_relative_eq!(s.value(50), 0.0);
    }

    #[test]
    fn test_constant_and_enum_dispatch() {
        let s = EpsilonSchedule::constant(0.1);
        assert_relative_eq!(s.value(0), 0.1);
        assert_relative_eq!(s.value(1_000_000), 0.1);
        let e = EpsilonSchedule::exponential(0.9, 0.02, 500.0);
        assert_relative_eq!(e.value(0), 0.9);
    }

    #[test]
    fn test_validation() {
        assert!(EpsilonSchedule::constant(0.1).validate().is_ok());
        assert!(EpsilonSchedule::constant(1.5).validate().is_err());
        assert!(EpsilonSchedule::exponential(0.9, 0.02, 0.0).validate().is_err());
        assert!(EpsilonSchedule::multiplicative(1.0, 0.01, 1.2).validate().is_err());
    }

    proptest::proptest! {
        #[test]
        fn prop_decays_stay_between_bounds(
            t in 0usize..1_000_000,
            start in 0.5f64..1.0,
            floor in 0.0f64..0.5,
            factor in 0.9f64..1.0,
        ) {
            let exp = EpsilonSchedule::exponential(start, floor, 500.0).value(t);
            proptest::prop_assert!(exp >= floor && exp <= start + 1e-12);
            let mul = EpsilonSchedule::multiplicative(start, floor, factor).value(t);
            proptest::prop_assert!(mul >= floor && mul <= start);
        }
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_string(&EpsilonSchedule::constant(0.1)).unwrap();
        assert_eq!(json, r#"{"kind":"constant","value":0.1}"#);
        let back: EpsilonSchedule =
            serde_json::from_str(r#"{"kind":"exponential","start":0.9,"end":0.02,"decay":500.0}"#)
                .unwrap();
        assert_eq!(back, EpsilonSchedule::exponential(0.9, 0.02, 500.0));
    }
}
