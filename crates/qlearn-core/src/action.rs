//! Action representations and action spaces

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for actions in an RL environment
pub trait Action: Clone + Debug + Send + Sync {
    /// Convert action to a vector representation
    fn to_vec(&self) -> Vec<f64>;
}

/// Trait for defining action spaces
pub trait ActionSpace: Send + Sync {
    /// The type of actions in this space
    type Action: Action;

    /// Sample a random action from the space using the caller's RNG
    fn sample(&self, rng: &mut dyn rand::RngCore) -> Self::Action;

    /// Check if an action is valid within this space
    fn contains(&self, action: &Self::Action) -> bool;

    /// Number of actions, if the space is finite
    fn size(&self) -> Option<usize>;
}

/// Discrete action: an index into a finite action set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiscreteAction(pub usize);

impl DiscreteAction {
    /// The action index
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Action for DiscreteAction {
    fn to_vec(&self) -> Vec<f64> {
        vec![self.0 as f64]
    }
}

impl From<usize> for DiscreteAction {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

/// Discrete action space `{0, .., n - 1}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscreteSpace {
    /// Number of discrete actions
    pub n: usize,
}

impl DiscreteSpace {
    /// Create a new discrete action space
    ///
    /// An empty space (`n == 0`) contains no action; use [`DiscreteSpace::try_new`] to reject it.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    /// Create a space holding at least one action
    pub fn try_new(n: usize) -> crate::Result<Self> {
        if n == 0 {
            return Err(crate::RLError::InvalidConfig(
                "action space needs at least one action".into(),
            ));
        }
        Ok(Self { n })
    }

    /// Whether the space holds no actions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Validate an action, returning it unchanged when it is in range
    pub fn check(&self, action: DiscreteAction) -> crate::Result<DiscreteAction> {
        if action.0 < self.n {
            Ok(action)
        } else {
            Err(crate::RLError::InvalidAction {
                action: action.0,
                n: self.n,
            })
        }
    }
}

impl ActionSpace for DiscreteSpace {
    type Action = DiscreteAction;

    /// On an empty space this returns `DiscreteAction(0)`, which [`DiscreteSpace::check`] rejects
    fn sample(&self, rng: &mut dyn rand::RngCore) -> Self::Action {
        if self.is_empty() {
            return DiscreteAction(0);
        }
        DiscreteAction(rng.gen_range(0..self.n))
    }

    fn contains(&self, action: &Self::Action) -> bool {
        action.0 < self.n
    }

    fn size(&self) -> Option<usize> {
        Some(self.n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sample_stays_in_space() {
        let space = DiscreteSpace::new(4);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let action = space.sample(&mut rng);
            assert!(space.contains(&action));
        }
    }

    #[test]
    fn test_check_rejects_out_of_range() {
        let space = DiscreteSpace::new(2);
        assert_eq!(space.check(DiscreteAction(1)).unwrap(), DiscreteAction(1));
        assert!(matches!(
            space.check(DiscreteAction(2)),
            Err(crate::RLError::InvalidAction { action: 2, n: 2 })
        ));
    }

    #[test]
    fn test_empty_space() {
        assert!(DiscreteSpace::try_new(0).is_err());
        assert_eq!(DiscreteSpace::try_new(3).unwrap(), DiscreteSpace::new(3));

        let space = DiscreteSpace::new(0);
        assert!(space.is_empty());
        let mut rng = StdRng::seed_from_u64(0);
        let action = space.sample(&mut rng);
        assert!(!space.contains(&action));
        assert!(space.check(action).is_err());
    }
}
