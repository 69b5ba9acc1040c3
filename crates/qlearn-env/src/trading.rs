//! Multi-stock trading environment
//!
//! A deliberately coarse market: every step the agent picks, for each asset,
//! whether to sell its whole position, hold, or buy as many whole shares as
//! cash allows. The joint action is one index into the `3^n` combinations.

use std::io::Read;

use ndarray::{Array2, ArrayView1, Axis};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use qlearn_core::{
    BoxObservationSpace, DiscreteAction, DiscreteSpace, Environment, ObservationSpace, RLError,
    Result, Step, StepInfo, VectorObservation,
};

/// Info key holding the portfolio value after a step
pub const PORTFOLIO_VALUE_KEY: &str = "cur_val";

/// Largest asset count accepted (3^10 = 59049 joint actions)
pub const MAX_ASSETS: usize = 10;

/// Per-asset decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeAction {
    /// Sell the whole position
    Sell = 0,
    /// Do nothing
    Hold = 1,
    /// Buy whole shares while cash lasts
    Buy = 2,
}

impl TradeAction {
    const ALL: [Self; 3] = [Self::Sell, Self::Hold, Self::Buy];
}

/// Every combination of per-asset decisions, first asset varying slowest
///
/// Index `i` maps to the base-3 digits of `i`, most significant digit first,
/// so `[Sell, Sell, .., Sell]` is index 0 and `[Buy, .., Buy]` is `3^n - 1`.
pub fn enumerate_actions(n_assets: usize) -> Result<Vec<Vec<TradeAction>>> {
    let total = u32::try_from(n_assets)
        .ok()
        .filter(|&n| n as usize <= MAX_ASSETS)
        .and_then(|n| 3_usize.checked_pow(n))
        .ok_or_else(|| {
            RLError::InvalidConfig(format!(
                "{n_assets} assets exceeds the supported maximum of {MAX_ASSETS}"
            ))
        })?;

    Ok((0..total)
        .map(|index| {
            let mut combo = vec![TradeAction::Hold; n_assets];
            let mut rest = index;
            for slot in combo.iter_mut().rev() {
                *slot = TradeAction::ALL[rest % 3];
                rest /= 3;
            }
            combo
        })
        .collect())
}

/// Close prices, one row per time step and one column per asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    prices: Array2<f64>,
}

impl PriceTable {
    /// Wrap a `T x n` price matrix
    ///
    /// Needs at least two rows, at least one column, and strictly positive
    /// finite prices.
    pub fn new(prices: Array2<f64>) -> Result<Self> {
        let (rows, cols) = prices.dim();
        if rows < 2 {
            return Err(RLError::InvalidConfig(format!(
                "price table needs at least 2 time steps, got {rows}"
            )));
        }
        if cols == 0 {
            return Err(RLError::InvalidConfig("price table has no assets".into()));
        }
        if let Some(((t, i), p)) = prices
            .indexed_iter()
            .find(|(_, p)| !p.is_finite() || **p <= 0.0)
        {
            return Err(RLError::InvalidConfig(format!(
                "price at step {t}, asset {i} must be positive and finite, got {p}"
            )));
        }
        Ok(Self { prices })
    }

    /// Build from row vectors
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(RLError::DimensionMismatch {
                expected: cols,
                actual: bad.len(),
            });
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let prices = Array2::from_shape_vec((rows.len(), cols), flat)
            .map_err(|e| RLError::Computation(e.to_string()))?;
        Self::new(prices)
    }

    /// Parse a CSV with one header line followed by numeric rows
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rows_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let rows = rows_reader
            .deserialize::<Vec<f64>>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Self::from_rows(&rows)
    }

    /// Geometric random walk with daily drift `mu` and volatility `sigma`
    pub fn synthetic(
        steps: usize,
        assets: usize,
        mu: f64,
        sigma: f64,
        rng: &mut dyn rand::RngCore,
    ) -> Result<Self> {
        let mut prices = Array2::zeros((steps, assets));
        for asset in 0..assets {
            let mut price: f64 = rng.gen_range(20.0..200.0);
            for t in 0..steps {
                prices[[t, asset]] = price;
                let z: f64 = rng.sample(StandardNormal);
                price *= (mu - 0.5 * sigma * sigma + sigma * z).exp();
            }
        }
        Self::new(prices)
    }

    /// Split at `T / 2` into a training and a test table
    pub fn split_half(&self) -> Result<(Self, Self)> {
        let half = self.n_steps() / 2;
        let (train, test) = self.prices.view().split_at(Axis(0), half);
        Ok((Self::new(train.to_owned())?, Self::new(test.to_owned())?))
    }

    /// Number of time steps
    #[must_use]
    pub fn n_steps(&self) -> usize {
        self.prices.nrows()
    }

    /// Number of assets
    #[must_use]
    pub fn n_assets(&self) -> usize {
        self.prices.ncols()
    }

    /// Prices at time step `t`
    #[must_use]
    pub fn row(&self, t: usize) -> ArrayView1<'_, f64> {
        self.prices.row(t)
    }
}

/// Trading environment parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Cash at the start of every episode
    pub initial_investment: f64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            initial_investment: 20_000.0,
        }
    }
}

impl TradingConfig {
    /// Reject negative or non-finite starting cash
    pub fn validate(&self) -> Result<()> {
        if !self.initial_investment.is_finite() || self.initial_investment < 0.0 {
            return Err(RLError::InvalidConfig(format!(
                "initial investment must be non-negative and finite, got {}",
                self.initial_investment
            )));
        }
        Ok(())
    }
}

/// Multi-stock trading environment
///
/// Observation is `[shares_0..n, prices_0..n, cash]`. Reward is the change in
/// portfolio value over the step. The episode ends on the last price row.
pub struct MultiStockEnv {
    prices: PriceTable,
    initial_investment: f64,
    action_list: Vec<Vec<TradeAction>>,
    cur_step: usize,
    shares: Vec<u64>,
    price: Vec<f64>,
    cash: f64,
    finished: bool,
}

impl MultiStockEnv {
    /// Create a new trading environment and reset it
    pub fn new(prices: PriceTable, config: &TradingConfig) -> Result<Self> {
        config.validate()?;
        let n = prices.n_assets();
        let action_list = enumerate_actions(n)?;
        let mut env = Self {
            price: prices.row(0).to_vec(),
            prices,
            initial_investment: config.initial_investment,
            action_list,
            cur_step: 0,
            shares: vec![0; n],
            cash: config.initial_investment,
            finished: false,
        };
        env.reset()?;
        Ok(env)
    }

    /// Number of assets
    #[must_use]
    pub fn n_assets(&self) -> usize {
        self.shares.len()
    }

    /// Observation dimension, `2n + 1`
    #[must_use]
    pub fn state_dim(&self) -> usize {
        2 * self.n_assets() + 1
    }

    /// Number of price rows in one episode
    #[must_use]
    pub fn n_steps(&self) -> usize {
        self.prices.n_steps()
    }

    /// Per-asset decisions behind a joint action
    pub fn decode(&self, action: DiscreteAction) -> Result<&[TradeAction]> {
        self.action_list
            .get(action.0)
            .map(Vec::as_slice)
            .ok_or(RLError::InvalidAction {
                action: action.0,
                n: self.action_list.len(),
            })
    }

    /// Joint action index for a list of per-asset decisions
    #[must_use]
    pub fn encode(&self, decisions: &[TradeAction]) -> Option<DiscreteAction> {
        self.action_list
            .iter()
            .position(|combo| combo == decisions)
            .map(DiscreteAction)
    }

    /// Cash plus the market value of all holdings
    #[must_use]
    pub fn portfolio_value(&self) -> f64 {
        self.cash
            + self
                .shares
                .iter()
                .zip(&self.price)
                .map(|(&s, p)| s as f64 * p)
                .sum::<f64>()
    }

    /// Uninvested cash
    #[must_use]
    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Shares held per asset
    #[must_use]
    pub fn shares(&self) -> &[u64] {
        &self.shares
    }

    fn observation(&self) -> VectorObservation {
        let mut data = Vec::with_capacity(self.state_dim());
        data.extend(self.shares.iter().map(|&s| s as f64));
        data.extend_from_slice(&self.price);
        data.push(self.cash);
        VectorObservation { data }
    }

    /// Apply sells first, then buy round-robin one share at a time
    fn trade(&mut self, decisions: &[TradeAction]) {
        for (i, decision) in decisions.iter().enumerate() {
            if *decision == TradeAction::Sell {
                self.cash += self.price[i] * self.shares[i] as f64;
                self.shares[i] = 0;
            }
        }

        let buy_index: Vec<usize> = decisions
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == TradeAction::Buy)
            .map(|(i, _)| i)
            .collect();
        if buy_index.is_empty() {
            return;
        }

        let mut can_buy = true;
        while can_buy {
            for &i in &buy_index {
                if self.cash >= self.price[i] {
                    self.shares[i] += 1;
                    self.cash -= self.price[i];
                } else {
                    can_buy = false;
                }
            }
        }
    }
}

impl Environment for MultiStockEnv {
    type Observation = VectorObservation;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        let dim = self.state_dim();
        Box::new(BoxObservationSpace {
            low: vec![0.0; dim],
            high: vec![f64::INFINITY; dim],
        })
    }

    fn action_space(&self) -> DiscreteSpace {
        DiscreteSpace::new(self.action_list.len())
    }

    fn reset(&mut self) -> Result<Self::Observation> {
        self.cur_step = 0;
        self.shares.iter_mut().for_each(|s| *s = 0);
        self.price = self.prices.row(0).to_vec();
        self.cash = self.initial_investment;
        self.finished = false;
        Ok(self.observation())
    }

    fn step(&mut self, action: DiscreteAction) -> Result<Step<Self::Observation>> {
        let decisions = self.decode(action)?.to_vec();
        if self.finished {
            return Err(RLError::Environment(
                "MultiStockEnv stepped past the last price row; call reset".into(),
            ));
        }

        let prev_val = self.portfolio_value();

        self.cur_step += 1;
        self.price = self.prices.row(self.cur_step).to_vec();
        self.trade(&decisions);

        let cur_val = self.portfolio_value();
        self.finished = self.cur_step == self.n_steps() - 1;

        Ok(Step::running(self.observation(), cur_val - prev_val)
            .with_done(self.finished)
            .with_info(StepInfo::default().with(PORTFOLIO_VALUE_KEY, cur_val)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use TradeAction::{Buy, Hold, Sell};

    fn three_asset_prices() -> PriceTable {
        PriceTable::new(array![
            [100.0, 50.0, 25.0],
            [110.0, 45.0, 30.0],
            [120.0, 40.0, 20.0],
            [90.0, 60.0, 35.0],
        ])
        .unwrap()
    }

    fn env() -> MultiStockEnv {
        MultiStockEnv::new(three_asset_prices(), &TradingConfig::default()).unwrap()
    }

    #[test]
    fn test_action_space_size() {
        assert_eq!(enumerate_actions(3).unwrap().len(), 27);
        assert_eq!(env().action_space().n, 27);
        assert_eq!(enumerate_actions(1).unwrap(), vec![vec![Sell], vec![Hold], vec![Buy]]);
        assert!(enumerate_actions(MAX_ASSETS + 1).is_err());
    }

    #[test]
    fn test_enumeration_order() {
        let actions = enumerate_actions(2).unwrap();
        assert_eq!(actions[0], vec![Sell, Sell]);
        assert_eq!(actions[1], vec![Sell, Hold]);
        assert_eq!(actions[3], vec![Hold, Sell]);
        assert_eq!(actions[8], vec![Buy, Buy]);
    }

    #[test]
    fn test_encode_decode() {
        let env = env();
        let action = env.encode(&[Buy, Hold, Sell]).unwrap();
        assert_eq!(env.decode(action).unwrap(), &[Buy, Hold, Sell]);
        assert!(env.decode(DiscreteAction(27)).is_err());
    }

    #[test]
    fn test_reset_state() {
        let mut env = env();
        let obs = env.reset().unwrap();
        assert_eq!(obs.data, vec![0.0, 0.0, 0.0, 100.0, 50.0, 25.0, 20_000.0]);
        assert_eq!(env.state_dim(), 7);
        assert_relative_eq!(env.portfolio_value(), 20_000.0);
    }

    #[test]
    fn test_all_sell_keeps_cash_only_value() {
        let mut env = env();
        env.reset().unwrap();
        let sell_all = env.encode(&[Sell, Sell, Sell]).unwrap();
        let step = env.step(sell_all).unwrap();
        assert_relative_eq!(step.reward.value(), 0.0);
        assert_relative_eq!(env.portfolio_value(), 20_000.0);
        assert_relative_eq!(env.cash(), 20_000.0);
        assert_eq!(step.info.get_f64(PORTFOLIO_VALUE_KEY), Some(20_000.0));
    }

    #[test]
    fn test_buy_spends_whole_shares_only() {
        let prices = PriceTable::new(array![[300.0], [300.0]]).unwrap();
        let config = TradingConfig {
            initial_investment: 1000.0,
        };
        let mut env = MultiStockEnv::new(prices, &config).unwrap();
        env.reset().unwrap();
        env.step(DiscreteAction(2)).unwrap();
        assert_eq!(env.shares(), &[3]);
        assert_relative_eq!(env.cash(), 100.0);
        assert!(env.cash() >= 0.0);
    }

    #[test]
    fn test_buy_round_robin_across_assets() {
        let mut env = env();
        env.reset().unwrap();
        let buy_all = env.encode(&[Buy, Buy, Buy]).unwrap();
        env.step(buy_all).unwrap();
        // prices at step 1: 110, 45, 30 -> 185 per round, 108 full rounds
        assert_eq!(env.shares(), &[108, 108, 108]);
        assert_relative_eq!(env.cash(), 20.0, epsilon = 1e-9);
        assert_relative_eq!(env.portfolio_value(), 20_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_sells_fund_buys_in_same_step() {
        let prices = PriceTable::new(array![[10.0, 10.0], [10.0, 10.0], [10.0, 20.0]]).unwrap();
        let config = TradingConfig {
            initial_investment: 100.0,
        };
        let mut env = MultiStockEnv::new(prices, &config).unwrap();
        env.reset().unwrap();
        env.step(env.encode(&[Buy, Hold]).unwrap()).unwrap();
        assert_eq!(env.shares(), &[10, 0]);

        let step = env.step(env.encode(&[Sell, Buy]).unwrap()).unwrap();
        assert_eq!(env.shares(), &[0, 5]);
        assert_relative_eq!(env.cash(), 0.0);
        assert!(step.done);
    }

    #[test]
    fn test_reward_tracks_value_change() {
        let mut env = env();
        env.reset().unwrap();
        env.step(env.encode(&[Buy, Hold, Hold]).unwrap()).unwrap();
        let before = env.portfolio_value();
        let step = env.step(env.encode(&[Hold, Hold, Hold]).unwrap()).unwrap();
        assert_relative_eq!(step.reward.value(), env.portfolio_value() - before);
        assert!(!step.done);
    }

    #[test]
    fn test_episode_ends_on_last_row() {
        let mut env = env();
        env.reset().unwrap();
        let hold = env.encode(&[Hold, Hold, Hold]).unwrap();
        assert!(!env.step(hold).unwrap().done);
        assert!(!env.step(hold).unwrap().done);
        assert!(env.step(hold).unwrap().done);
        assert!(env.step(hold).is_err());
    }

    #[test]
    fn test_trading_config_validation() {
        assert!(TradingConfig::default().validate().is_ok());
        let negative = TradingConfig { initial_investment: -1.0 };
        assert!(negative.validate().is_err());
        let prices = PriceTable::new(array![[1.0], [2.0]]).unwrap();
        let nan = TradingConfig { initial_investment: f64::NAN };
        assert!(MultiStockEnv::new(prices, &nan).is_err());
    }

    #[test]
    fn test_price_table_validation() {
        assert!(PriceTable::new(array![[1.0, 2.0]]).is_err());
        assert!(PriceTable::new(array![[1.0], [0.0]]).is_err());
        assert!(PriceTable::new(array![[1.0], [f64::NAN]]).is_err());
        assert!(PriceTable::from_rows(&[vec![1.0, 2.0], vec![1.0]]).is_err());
    }

    #[test]
    fn test_csv_parsing() {
        let csv = "AAPL,MSI,SBUX\n67.85,60.3,28.185\n68.38,60.9,28.07\n\n69.1,61.0,28.13\n";
        let table = PriceTable::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.n_steps(), 3);
        assert_eq!(table.n_assets(), 3);
        assert_relative_eq!(table.row(1)[2], 28.07);

        let bad = "A\n1.0\nabc\n";
        let err = PriceTable::from_csv_reader(bad.as_bytes()).unwrap_err();
        assert!(matches!(err, RLError::Csv(_)));

        let ragged = "A,B\n1.0,2.0\n3.0\n";
        assert!(PriceTable::from_csv_reader(ragged.as_bytes()).is_err());
    }

    #[test]
    fn test_csv_quoted_fields() {
        let csv = "\"AAPL\",\"MSI\"\n\"67.85\",\"60.3\"\n\"68.38\", 60.9\n";
        let table = PriceTable::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.n_steps(), 2);
        assert_eq!(table.n_assets(), 2);
        assert_relative_eq!(table.row(0)[0], 67.85);
        assert_relative_eq!(table.row(1)[1], 60.9);
    }

    proptest::proptest! {
        #[test]
        fn prop_cash_never_negative(
            seed in 0u64..1000,
            actions in proptest::collection::vec(0usize..9, 1..40),
            investment in 0.0f64..50_000.0,
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let prices = PriceTable::synthetic(actions.len() + 1, 2, 0.0, 0.05, &mut rng).unwrap();
            let config = TradingConfig { initial_investment: investment };
            let mut env = MultiStockEnv::new(prices, &config).unwrap();
            env.reset().unwrap();
            for a in actions {
                let before = env.portfolio_value();
                let step = env.step(DiscreteAction(a)).unwrap();
                proptest::prop_assert!(env.cash() >= 0.0);
                let after = step.info.get_f64(PORTFOLIO_VALUE_KEY).unwrap();
                proptest::prop_assert!((step.reward.value() - (after - before)).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_split_half() {
        let mut rng = StdRng::seed_from_u64(11);
        let table = PriceTable::synthetic(101, 3, 0.0005, 0.01, &mut rng).unwrap();
        let (train, test) = table.split_half().unwrap();
        assert_eq!(train.n_steps(), 50);
        assert_eq!(test.n_steps(), 51);
        assert_eq!(test.row(0), table.row(50));
    }
}
