//! Core simulation components.
//!
//! This module provides the fundamental types for backtesting:
//! - `Candle`: OHLCV data for one trading day.
//! - `MovingAverageSeries`: fast and slow simple moving averages and their crossovers.
//! - `Trade`: a completed round trip.
//! - `Backtest`: the engine walking the series.
//!
//! ### Timing
//! Both moving averages include the close of the candle being evaluated, and a crossover
//! is executed at that same close. This is simple but optimistic: in live trading the
//! signal is only known once the close is printed.

mod average;
mod candle;
mod position;
mod wallet;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::StrategyConfig;
use crate::errors::{Error, Result};
use crate::metrics::{BacktestResult, EquityPoint, Metrics};

pub use average::*;
pub use candle::*;
pub use position::{ExitReason, Trade};
pub(crate) use position::Position;
pub(crate) use wallet::*;

#[cfg(test)]
pub(crate) use position::create_trade;

/// State of the single-position strategy.
#[derive(Debug, Clone, Copy)]
enum MarketState {
    Flat,
    Long(Position),
}

impl MarketState {
    fn position(&self) -> Option<&Position> {
        match self {
            Self::Flat => None,
            Self::Long(position) => Some(position),
        }
    }
}

/// Backtesting engine for the moving-average crossover strategy.
///
/// The candles and the configuration are checked once in [`Backtest::new`]; [`Backtest::run`]
/// is then a pure function of them.
#[derive(Debug, Clone)]
pub struct Backtest {
    data: Arc<[Candle]>,
    config: StrategyConfig,
}

impl Backtest {
    /// Creates a new backtest instance.
    ///
    /// ### Arguments
    /// * `data` - Candles, strictly ascending by date.
    /// * `config` - A normalized strategy configuration.
    ///
    /// ### Returns
    /// The new backtest instance, or:
    /// - [`Error::EmptySeries`] when `data` is empty,
    /// - [`Error::InsufficientData`] when there are fewer candles than the slow length,
    /// - [`Error::InvalidCandle`] or [`Error::UnorderedCandles`] for malformed data.
    ///
    /// ### Example
    /// ```rust
    /// use macross::prelude::*;
    /// use chrono::NaiveDate;
    ///
    /// let candle = CandleBuilder::builder()
    ///     .date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
    ///     .open(100.0)
    ///     .high(110.0)
    ///     .low(95.0)
    ///     .close(105.0)
    ///     .volume(1.0)
    ///     .build()
    ///     .unwrap();
    /// let config = StrategyConfig::builder().symbol("AAPL").build().unwrap();
    ///
    /// let err = Backtest::new(vec![candle], config).unwrap_err();
    /// assert_eq!(err.kind(), ErrorKind::InsufficientData);
    /// ```
    pub fn new(data: impl Into<Arc<[Candle]>>, config: StrategyConfig) -> Result<Self> {
        let data = data.into();
        check_series(&data, &config)?;
        Ok(Self { data, config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Returns an iterator over the data.
    pub fn candles(&self) -> std::slice::Iter<'_, Candle> {
        self.data.iter()
    }

    /// Computes the fast and slow moving averages of the series.
    pub fn moving_averages(&self) -> MovingAverageSeries {
        MovingAverageSeries::new(&self.data, self.config.fast_length(), self.config.slow_length())
    }

    /// Runs the backtest.
    ///
    /// Walks the series once, opening on golden crosses and closing on death crosses, and
    /// force-closes a position still open on the last candle.
    pub fn run(&self) -> BacktestResult {
        simulate(&self.data, &self.config)
    }
}

/// Checks `candles` against `config` and runs the backtest.
///
/// Same as [`Backtest::new`] followed by [`Backtest::run`], without taking ownership of the data.
pub fn run_backtest(candles: &[Candle], config: &StrategyConfig) -> Result<BacktestResult> {
    check_series(candles, config)?;
    Ok(simulate(candles, config))
}

fn check_series(candles: &[Candle], config: &StrategyConfig) -> Result<()> {
    if candles.is_empty() {
        return Err(Error::EmptySeries);
    }
    if candles.len() < config.slow_length() {
        return Err(Error::InsufficientData {
            candles: candles.len(),
            required: config.slow_length(),
        });
    }
    for candle in candles {
        candle.validate()?;
    }
    if let Some(index) = candles.windows(2).position(|pair| pair[1].date() <= pair[0].date()) {
        return Err(Error::UnorderedCandles { index: index + 1 });
    }
    Ok(())
}

/// The simulation walk. `candles` must have passed `check_series`.
fn simulate(candles: &[Candle], config: &StrategyConfig) -> BacktestResult {
    let averages = MovingAverageSeries::new(candles, config.fast_length(), config.slow_length());
    let last = candles.len() - 1;

    let mut wallet = Wallet::new(config);
    let mut state = MarketState::Flat;
    let mut trades = Vec::new();
    let mut equity_curve = Vec::with_capacity(candles.len());

    info!(
        symbol = %config.symbol(),
        candles = candles.len(),
        fast = config.fast_length(),
        slow = config.slow_length(),
        capital = config.initial_capital(),
        "Starting backtest"
    );

    for (index, candle) in candles.iter().enumerate() {
        state = match (state, averages.signal(index)) {
            (MarketState::Flat, Some(Signal::GoldenCross)) if index < last => {
                wallet.open(candle).map_or(MarketState::Flat, MarketState::Long)
            }
            (MarketState::Flat, Some(Signal::GoldenCross)) => {
                warn!(date = %candle.date(), "Golden cross on the final candle ignored");
                MarketState::Flat
            }
            (MarketState::Long(position), Some(Signal::DeathCross)) => {
                trades.push(wallet.close(position, candle, ExitReason::Crossover));
                MarketState::Flat
            }
            (MarketState::Long(position), _) if index == last => {
                trades.push(wallet.close(position, candle, ExitReason::EndOfData));
                MarketState::Flat
            }
            (state, _) => state,
        };

        equity_curve.push(EquityPoint::new(
            candle.date(),
            wallet.equity(state.position(), candle.close()),
            candle.close(),
            averages.fast(index),
            averages.slow(index),
        ));
    }

    let metrics = Metrics::new(
        wallet.initial_capital(),
        wallet.capital(),
        &trades,
        &equity_curve,
        wallet.fees_paid(),
    );

    info!(
        symbol = %config.symbol(),
        trades = trades.len(),
        equity = metrics.compounded_equity(),
        total_return_pct = metrics.total_return_pct(),
        "Backtest complete"
    );

    BacktestResult::new(
        config.symbol().to_string(),
        candles[0].date(),
        candles[last].date(),
        trades,
        equity_curve,
        metrics,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::metrics::ProfitFactor;

    use chrono::{Duration, NaiveDate};
    use rand::{Rng, SeedableRng, rngs::StdRng};

    const FIXTURE: [f64; 10] = [10.0, 10.0, 10.0, 12.0, 14.0, 16.0, 14.0, 12.0, 10.0, 8.0];

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                CandleBuilder::builder()
                    .date(start() + Duration::days(i as i64))
                    .open(close)
                    .high(close)
                    .low(close)
                    .close(close)
                    .volume(1_000.0)
                    .build()
                    .unwrap()
            })
            .collect()
    }

    fn random_walk(seed: u64, len: usize) -> Vec<Candle> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut close = 100.0;
        (0..len)
            .map(|i| {
                let open = close;
                close *= 1.0 + rng.random_range(-0.05..0.05);
                CandleBuilder::builder()
                    .date(start() + Duration::days(i as i64))
                    .open(open)
                    .high(open.max(close) * 1.01)
                    .low(open.min(close) * 0.99)
                    .close(close)
                    .volume(rng.random_range(0.0..10_000.0))
                    .build()
                    .unwrap()
            })
            .collect()
    }

    fn config(fast: i64, slow: i64, fee_bps: f64, slippage_bps: f64) -> StrategyConfig {
        StrategyConfig::builder()
            .symbol("test")
            .fast_length(fast)
            .slow_length(slow)
            .initial_capital(1_000.0)
            .fee_bps(fee_bps)
            .slippage_bps(slippage_bps)
            .build()
            .unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn scenario_two_trade_fixture() {
        let result = run_backtest(&candles(&FIXTURE), &config(2, 3, 0.0, 0.0)).unwrap();

        assert_eq!(result.symbol(), "TEST");
        assert_eq!(result.start_date(), start());
        assert_eq!(result.end_date(), start() + Duration::days(9));

        // golden cross at index 3 (close 12), death cross at index 7 (close 12)
        assert_eq!(result.trades().len(), 1);
        let trade = result.trades()[0];
        assert_eq!(trade.entry_date(), start() + Duration::days(3));
        assert_eq!(trade.exit_date(), start() + Duration::days(7));
        assert_eq!(trade.entry_price(), 12.0);
        assert_eq!(trade.exit_price(), 12.0);
        assert_eq!(trade.profit(), 0.0);
        assert_eq!(trade.return_pct(), 0.0);
        assert_eq!(trade.exit_reason(), ExitReason::Crossover);

        assert_eq!(result.win_rate_pct(), 0.0);
        assert_eq!(result.profit_factor(), ProfitFactor::Infinite);
        assert_eq!(result.average_trade_pct(), 0.0);
        assert!(approx(result.compounded_equity(), 1_000.0));
        assert!(approx(result.total_return_pct(), 0.0));
        assert!(approx(result.annualized_return_pct(), 0.0));

        let equities = result.equity_curve().iter().map(|p| p.equity()).collect::<Vec<_>>();
        let quantity = 1_000.0 / 12.0;
        let expected = [
            1_000.0,
            1_000.0,
            1_000.0,
            quantity * 12.0,
            quantity * 14.0,
            quantity * 16.0,
            quantity * 14.0,
            1_000.0,
            1_000.0,
            1_000.0,
        ];
        assert_eq!(equities.len(), expected.len());
        for (got, want) in equities.iter().zip(expected) {
            assert!(approx(*got, want), "{got} != {want}");
        }
        // peak 1333.33 down to 1000.0
        assert!((result.max_drawdown_pct() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn scenario_equity_curve_carries_averages() {
        let result = run_backtest(&candles(&FIXTURE), &config(2, 3, 0.0, 0.0)).unwrap();
        let curve = result.equity_curve();
        assert_eq!(curve[0].fast_ma(), None);
        assert_eq!(curve[0].slow_ma(), None);
        assert_eq!(curve[1].fast_ma(), Some(10.0));
        assert_eq!(curve[1].slow_ma(), None);
        assert_eq!(curve[4].fast_ma(), Some(13.0));
        assert_eq!(curve[4].slow_ma(), Some(12.0));
        assert_eq!(curve[9].close(), 8.0);
    }

    #[test]
    fn scenario_forced_close_at_end() {
        let result = run_backtest(&candles(&[10.0, 10.0, 10.0, 12.0, 14.0, 16.0]), &config(2, 3, 0.0, 0.0)).unwrap();

        assert_eq!(result.trades().len(), 1);
        let trade = result.trades()[0];
        assert_eq!(trade.exit_reason(), ExitReason::EndOfData);
        assert_eq!(trade.exit_date(), start() + Duration::days(5));
        assert_eq!(trade.exit_price(), 16.0);
        assert!(approx(trade.profit(), 1_000.0 / 12.0 * 16.0 - 1_000.0));
        assert_eq!(result.win_rate_pct(), 100.0);
        assert_eq!(result.profit_factor(), ProfitFactor::Infinite);

        let last = result.equity_curve().last().unwrap();
        assert_eq!(last.equity(), result.compounded_equity());
        assert!(approx(result.compounded_equity(), 1_000.0 + trade.profit()));
    }

    #[test]
    fn scenario_compounding_trades() {
        let closes = [10.0, 10.0, 10.0, 12.0, 14.0, 12.0, 10.0, 10.0, 12.0, 14.0, 12.0, 10.0];
        let result = run_backtest(&candles(&closes), &config(2, 3, 0.0, 0.0)).unwrap();

        let trades = result.trades();
        assert_eq!(trades.len(), 2);
        // each round trip buys at 12 and sells at 10
        let after_first = 1_000.0 * 10.0 / 12.0;
        assert!(approx(trades[0].profit(), after_first - 1_000.0));
        assert!(approx(trades[1].quantity(), after_first / 12.0));
        assert!(approx(result.compounded_equity(), after_first * 10.0 / 12.0));

        assert!(trades[0].entry_date() < trades[1].entry_date());
        assert_eq!(result.win_rate_pct(), 0.0);
        assert_eq!(result.profit_factor(), ProfitFactor::Finite(0.0));
        assert!((result.average_trade_pct() - (10.0 / 12.0 - 1.0) * 100.0).abs() < 1e-9);
    }

    #[test]
    fn scenario_fee_slippage_erosion() {
        let data = candles(&FIXTURE);
        let free = run_backtest(&data, &config(2, 3, 0.0, 0.0)).unwrap();
        let costly = run_backtest(&data, &config(2, 3, 50.0, 50.0)).unwrap();

        assert_eq!(costly.trades().len(), 1);
        assert!(costly.compounded_equity() < free.compounded_equity());

        let trade = costly.trades()[0];
        assert!(approx(trade.entry_price(), 12.0 * 1.005));
        assert!(approx(trade.exit_price(), 12.0 * 0.995));
        assert!(trade.fees() > 0.0);
        assert!(approx(costly.fees_paid(), trade.fees()));
        assert!(trade.profit() < 0.0);
        assert!(approx(costly.compounded_equity(), 1_000.0 + trade.profit()));
    }

    #[test]
    fn scenario_ledger_matches_equity_under_extreme_costs() {
        let result = run_backtest(&candles(&FIXTURE), &config(2, 3, 9_999.0, 9_999.0)).unwrap();

        assert_eq!(result.trades().len(), 1);
        let trade = result.trades()[0];
        assert_eq!(trade.profit(), -1_000.0);
        assert!(approx(trade.return_pct(), -100.0));
        assert_eq!(result.compounded_equity(), 0.0);
        assert_eq!(result.total_return_pct(), -100.0);
        assert!(approx(result.average_trade_pct(), -100.0));
    }

    #[test]
    fn scenario_hold_marks_at_unadjusted_close() {
        let result = run_backtest(&candles(&FIXTURE), &config(2, 3, 0.0, 100.0)).unwrap();
        let trade = result.trades()[0];
        assert!(approx(trade.entry_price(), 12.12));
        // day 5 closes at 16
        let point = result.equity_curve()[5];
        assert!(approx(point.equity(), trade.quantity() * 16.0));
    }

    #[test]
    fn scenario_golden_cross_on_last_candle() {
        let result = run_backtest(&candles(&[10.0, 10.0, 10.0, 12.0]), &config(2, 3, 0.0, 0.0)).unwrap();
        assert!(result.trades().is_empty());
        assert_eq!(result.compounded_equity(), 1_000.0);
    }

    #[test]
    fn scenario_no_signal_on_rising_prices() {
        let closes = (1..=60).map(|i| i as f64).collect::<Vec<_>>();
        let result = run_backtest(&candles(&closes), &config(10, 30, 5.0, 5.0)).unwrap();

        assert!(result.trades().is_empty());
        assert_eq!(result.compounded_equity(), 1_000.0);
        assert_eq!(result.total_return_pct(), 0.0);
        assert_eq!(result.win_rate_pct(), 0.0);
        assert_eq!(result.max_drawdown_pct(), 0.0);
        assert!(result.equity_curve().iter().all(|p| p.equity() == 1_000.0));
    }

    #[test]
    fn scenario_insufficient_data() {
        let config = StrategyConfig::builder().symbol("AAPL").slow_length(30).build().unwrap();
        let err = run_backtest(&candles(&[1.0, 2.0, 3.0, 4.0, 5.0]), &config).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientData {
                candles: 5,
                required: 30
            }
        ));
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
    }

    #[test]
    fn scenario_empty_series() {
        let err = Backtest::new(Vec::<Candle>::new(), config(2, 3, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, Error::EmptySeries));
    }

    #[test]
    fn scenario_unordered_dates() {
        let mut data = candles(&FIXTURE);
        data.swap(4, 5);
        let err = run_backtest(&data, &config(2, 3, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, Error::UnorderedCandles { index: 5 }));

        let mut data = candles(&FIXTURE);
        data[6] = data[5];
        let err = run_backtest(&data, &config(2, 3, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, Error::UnorderedCandles { index: 6 }));
    }

    #[test]
    fn scenario_exact_slow_length_has_no_trades() {
        let result = run_backtest(&candles(&[10.0, 12.0, 8.0]), &config(2, 3, 0.0, 0.0)).unwrap();
        assert!(result.trades().is_empty());
        assert_eq!(result.equity_curve().len(), 3);
    }

    #[test]
    fn backtest_owns_series() {
        let bt = Backtest::new(candles(&FIXTURE), config(2, 3, 0.0, 0.0)).unwrap();
        assert_eq!(bt.candles().count(), 10);
        assert_eq!(bt.config().fast_length(), 2);
        assert_eq!(bt.moving_averages().len(), 10);
        assert_eq!(bt.run(), run_backtest(&candles(&FIXTURE), bt.config()).unwrap());
    }

    #[test]
    fn random_walk_invariants() {
        let configs = [
            config(2, 3, 0.0, 0.0),
            config(5, 20, 5.0, 5.0),
            config(10, 30, 50.0, 50.0),
            config(3, 8, 500.0, 900.0),
        ];

        for seed in 0..20 {
            let data = random_walk(seed, 250);
            for config in &configs {
                let result = run_backtest(&data, config).unwrap();

                // determinism
                assert_eq!(result, run_backtest(&data, config).unwrap());

                assert_eq!(result.equity_curve().len(), data.len());
                assert!(result.equity_curve().iter().all(|p| p.equity() >= 0.0));
                assert!((0.0..=100.0).contains(&result.max_drawdown_pct()));
                assert!((0.0..=100.0).contains(&result.win_rate_pct()));
                assert_eq!(
                    result.equity_curve().last().map(|p| p.equity()),
                    Some(result.compounded_equity())
                );

                for trade in result.trades() {
                    assert!(trade.entry_date() < trade.exit_date());
                }
                for pair in result.trades().windows(2) {
                    assert!(pair[0].exit_date() <= pair[1].entry_date());
                    assert!(pair[0].entry_date() < pair[1].entry_date());
                }
            }
        }
    }

    #[test]
    fn random_walk_costs_never_help() {
        for seed in 100..120 {
            let data = random_walk(seed, 200);
            let free = run_backtest(&data, &config(5, 20, 0.0, 0.0)).unwrap();
            let costly = run_backtest(&data, &config(5, 20, 50.0, 50.0)).unwrap();
            assert_eq!(free.trades().len(), costly.trades().len());
            if !free.trades().is_empty() {
                assert!(costly.compounded_equity() < free.compounded_equity());
            }
        }
    }
}
