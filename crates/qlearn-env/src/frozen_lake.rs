//! FrozenLake grid world

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use qlearn_core::{
    DiscreteAction, DiscreteObservation, DiscreteObservationSpace, DiscreteSpace, Environment,
    EnvironmentConfig, ObservationSpace, RLError, Result, Step, StepInfo,
};

/// Move left
pub const LEFT: DiscreteAction = DiscreteAction(0);
/// Move down
pub const DOWN: DiscreteAction = DiscreteAction(1);
/// Move right
pub const RIGHT: DiscreteAction = DiscreteAction(2);
/// Move up
pub const UP: DiscreteAction = DiscreteAction(3);

/// One cell of the lake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tile {
    /// Starting cell
    Start,
    /// Safe ice
    Frozen,
    /// Ends the episode with no reward
    Hole,
    /// Ends the episode with reward 1
    Goal,
}

impl Tile {
    fn parse(c: char) -> Option<Self> {
        match c {
            'S' => Some(Self::Start),
            'F' => Some(Self::Frozen),
            'H' => Some(Self::Hole),
            'G' => Some(Self::Goal),
            _ => None,
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, Self::Hole | Self::Goal)
    }
}

/// Rectangular lake layout, row-major
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrozenLakeMap {
    rows: usize,
    cols: usize,
    tiles: Vec<Tile>,
    start: usize,
}

impl FrozenLakeMap {
    /// The standard 4x4 lake
    #[must_use]
    pub fn four_by_four() -> Self {
        Self::builtin(&["SFFF", "FHFH", "FFFH", "HFFG"])
    }

    /// The standard 8x8 lake
    #[must_use]
    pub fn eight_by_eight() -> Self {
        Self::builtin(&[
            "SFFFFFFF", "FFFFFFFF", "FFFHFFFF", "FFFFFHFF", "FFFHFFFF", "FHHFFFHF", "FHFFHFHF",
            "FFFHFFFG",
        ])
    }

    // Bundled layouts are square with the start in the top-left corner
    fn builtin(rows: &[&str]) -> Self {
        let tiles: Vec<Tile> = rows
            .iter()
            .flat_map(|r| r.chars().filter_map(Tile::parse))
            .collect();
        Self {
            rows: rows.len(),
            cols: rows.len(),
            tiles,
            start: 0,
        }
    }

    /// Parse rows of `S`, `F`, `H`, `G`
    ///
    /// The map must be rectangular, hold exactly one `S` and at least one `G`.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.as_ref().chars().count());
        if cols == 0 {
            return Err(RLError::InvalidConfig("FrozenLake map is empty".into()));
        }

        let mut tiles = Vec::with_capacity(rows.len() * cols);
        for (r, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() != cols {
                return Err(RLError::InvalidConfig(format!(
                    "FrozenLake row {r} has {} cells, expected {cols}",
                    row.chars().count()
                )));
            }
            for c in row.chars() {
                let tile = Tile::parse(c).ok_or_else(|| {
                    RLError::InvalidConfig(format!("unknown FrozenLake tile {c:?} in row {r}"))
                })?;
                tiles.push(tile);
            }
        }

        let starts: Vec<usize> = tiles
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == Tile::Start)
            .map(|(i, _)| i)
            .collect();
        let &[start] = starts.as_slice() else {
            return Err(RLError::InvalidConfig(format!(
                "FrozenLake map needs exactly one start tile, found {}",
                starts.len()
            )));
        };
        if !tiles.contains(&Tile::Goal) {
            return Err(RLError::InvalidConfig("FrozenLake map has no goal tile".into()));
        }

        Ok(Self {
            rows: rows.len(),
            cols,
            tiles,
            start,
        })
    }

    /// Number of cells
    #[must_use]
    pub fn num_states(&self) -> usize {
        self.tiles.len()
    }

    /// Cells per row
    #[must_use]
    pub fn width(&self) -> usize {
        self.cols
    }

    /// Tile at a state index
    #[must_use]
    pub fn tile(&self, state: usize) -> Option<Tile> {
        self.tiles.get(state).copied()
    }

    /// State index of the start tile
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// State reached by moving from `state` in `direction`, staying put at the edges
    fn neighbour(&self, state: usize, direction: usize) -> usize {
        let (row, col) = (state / self.cols, state % self.cols);
        let (row, col) = match direction {
            0 => (row, col.saturating_sub(1)),
            1 => ((row + 1).min(self.rows - 1), col),
            2 => (row, (col + 1).min(self.cols - 1)),
            _ => (row.saturating_sub(1), col),
        };
        row * self.cols + col
    }
}

impl Default for FrozenLakeMap {
    fn default() -> Self {
        Self::four_by_four()
    }
}

/// FrozenLake configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrozenLakeConfig {
    /// Lake layout
    pub map: FrozenLakeMap,
    /// When set, the agent moves in the intended direction or either
    /// perpendicular one, each with probability 1/3
    pub is_slippery: bool,
}

/// FrozenLake environment
///
/// Observations are cell indices, actions are 0 left, 1 down, 2 right, 3 up.
pub struct FrozenLakeEnv {
    config: FrozenLakeConfig,
    position: usize,
    finished: bool,
    rng: StdRng,
}

impl FrozenLakeEnv {
    /// Create a new FrozenLake environment
    #[must_use]
    pub fn new(config: FrozenLakeConfig, env_config: &EnvironmentConfig) -> Self {
        let position = config.map.start();
        Self {
            config,
            position,
            finished: false,
            rng: env_config.rng(),
        }
    }

    /// Deterministic 4x4 lake
    #[must_use]
    pub fn not_slippery(env_config: &EnvironmentConfig) -> Self {
        Self::new(FrozenLakeConfig::default(), env_config)
    }

    /// The layout this environment plays on
    #[must_use]
    pub fn map(&self) -> &FrozenLakeMap {
        &self.config.map
    }

    /// Current cell index
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }
}

impl Environment for FrozenLakeEnv {
    type Observation = DiscreteObservation;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        Box::new(DiscreteObservationSpace::new(self.config.map.num_states()))
    }

    fn action_space(&self) -> DiscreteSpace {
        DiscreteSpace::new(4)
    }

    fn reset(&mut self) -> Result<Self::Observation> {
        self.position = self.config.map.start();
        self.finished = false;
        Ok(DiscreteObservation(self.position))
    }

    fn step(&mut self, action: DiscreteAction) -> Result<Step<Self::Observation>> {
        let action = self.action_space().check(action)?;
        if self.finished {
            return Err(RLError::Environment(
                "FrozenLake stepped after the episode finished; call reset".into(),
            ));
        }

        let direction = if self.config.is_slippery {
            (action.0 + 3 + self.rng.gen_range(0..3)) % 4
        } else {
            action.0
        };
        self.position = self.config.map.neighbour(self.position, direction);

        let tile = self
            .config
            .map
            .tile(self.position)
            .ok_or_else(|| RLError::InvalidState(format!("cell {} off the map", self.position)))?;
        let reward = if tile == Tile::Goal { 1.0 } else { 0.0 };
        self.finished = tile.is_terminal();

        Ok(Step::running(DiscreteObservation(self.position), reward)
            .with_done(self.finished)
            .with_info(StepInfo::default().with("direction", direction)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> FrozenLakeEnv {
        FrozenLakeEnv::not_slippery(&EnvironmentConfig::seeded(0))
    }

    #[test]
    fn test_reset_returns_start() {
        let mut env = env();
        assert_eq!(env.reset().unwrap(), DiscreteObservation(0));
        assert_eq!(env.observation_space().shape(), vec![16]);
        assert_eq!(env.action_space().n, 4);
    }

    #[test]
    fn test_walls_keep_agent_in_place() {
        let mut env = env();
        env.reset().unwrap();
        let step = env.step(LEFT).unwrap();
        assert_eq!(step.observation, DiscreteObservation(0));
        let step = env.step(UP).unwrap();
        assert_eq!(step.observation, DiscreteObservation(0));
        assert!(!step.done);
    }

    #[test]
    fn test_hole_ends_episode_without_reward() {
        let mut env = env();
        env.reset().unwrap();
        // 0 -> 4 -> 5 (hole)
        env.step(DOWN).unwrap();
        let step = env.step(RIGHT).unwrap();
        assert_eq!(step.observation, DiscreteObservation(5));
        assert!(step.done);
        assert_eq!(step.reward.value(), 0.0);
        assert!(env.step(RIGHT).is_err());
    }

    #[test]
    fn test_shortest_path_reaches_goal() {
        let mut env = env();
        env.reset().unwrap();
        let path = [DOWN, DOWN, RIGHT, RIGHT, DOWN, RIGHT];
        let mut last = None;
        for action in path {
            last = Some(env.step(action).unwrap());
        }
        let last = last.unwrap();
        assert_eq!(last.observation, DiscreteObservation(15));
        assert!(last.done);
        assert_eq!(last.reward.value(), 1.0);
    }

    #[test]
    fn test_invalid_action_rejected() {
        let mut env = env();
        env.reset().unwrap();
        assert!(matches!(
            env.step(DiscreteAction(4)),
            Err(RLError::InvalidAction { action: 4, n: 4 })
        ));
    }

    #[test]
    fn test_slippery_moves_stay_perpendicular() {
        let config = FrozenLakeConfig {
            map: FrozenLakeMap::from_rows(&["FFF", "FSF", "FFG"]).unwrap(),
            is_slippery: true,
        };
        let mut env = FrozenLakeEnv::new(config, &EnvironmentConfig::seeded(5));
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            env.reset().unwrap();
            // intended up from the centre: up, left or right, never down
            let step = env.step(UP).unwrap();
            seen.insert(step.observation.0);
        }
        assert_eq!(seen, [1, 3, 5].into_iter().collect());
    }

    #[test]
    fn test_map_validation() {
        assert!(FrozenLakeMap::from_rows(&["SFG", "FF"]).is_err());
        assert!(FrozenLakeMap::from_rows(&["SFF", "FFF"]).is_err());
        assert!(FrozenLakeMap::from_rows(&["SFS", "FFG"]).is_err());
        assert!(FrozenLakeMap::from_rows(&["SXG"]).is_err());
        let empty: [&str; 0] = [];
        assert!(FrozenLakeMap::from_rows(&empty).is_err());
        assert_eq!(FrozenLakeMap::eight_by_eight().num_states(), 64);
        assert_eq!(FrozenLakeMap::eight_by_eight().width(), 8);
    }

    #[test]
    fn test_bundled_maps_match_parsed() {
        let parsed = FrozenLakeMap::from_rows(&["SFFF", "FHFH", "FFFH", "HFFG"]).unwrap();
        assert_eq!(FrozenLakeMap::four_by_four(), parsed);
        let big = FrozenLakeMap::eight_by_eight();
        assert_eq!(big.tiles.len(), 64);
        assert_eq!(big.tiles[63], Tile::Goal);
        assert_eq!(big.tiles[0], Tile::Start);
    }
}
