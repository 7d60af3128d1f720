//! Performance metrics for backtesting.
//!
//! This module provides the result of a run ([`BacktestResult`]) and the statistics
//! derived from its trade ledger and equity curve:
//! - Total and annualized return
//! - Win rate
//! - Max drawdown
//! - Profit factor
//! - Average trade return

use std::fmt;

use chrono::NaiveDate;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::BasisPointCalculus;
use crate::engine::Trade;

/// One day's mark-to-market snapshot.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    date: NaiveDate,
    equity: f64,
    close: f64,
    fast_ma: Option<f64>,
    slow_ma: Option<f64>,
}

impl EquityPoint {
    /// Creates a new snapshot.
    pub fn new(date: NaiveDate, equity: f64, close: f64, fast_ma: Option<f64>, slow_ma: Option<f64>) -> Self {
        Self {
            date,
            equity,
            close,
            fast_ma,
            slow_ma,
        }
    }

    /// Returns the day.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Returns the strategy's total value: idle cash plus the open position at the close.
    pub fn equity(&self) -> f64 {
        self.equity
    }

    /// Returns the underlying close.
    pub fn close(&self) -> f64 {
        self.close
    }

    /// Returns the fast moving average, if already available.
    pub fn fast_ma(&self) -> Option<f64> {
        self.fast_ma
    }

    /// Returns the slow moving average, if already available.
    pub fn slow_ma(&self) -> Option<f64> {
        self.slow_ma
    }
}

/// Gross profit over gross loss.
///
/// Without any losing trade the ratio is unbounded and reported as [`ProfitFactor::Infinite`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfitFactor {
    /// A finite, non-negative ratio.
    Finite(f64),
    /// No losing trades.
    Infinite,
}

impl ProfitFactor {
    /// Returns the ratio, or `None` when infinite.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Finite(value) => Some(*value),
            Self::Infinite => None,
        }
    }

    /// Returns `true` when there were no losing trades.
    pub fn is_infinite(&self) -> bool {
        matches!(self, Self::Infinite)
    }
}

impl fmt::Display for ProfitFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(value) => write!(f, "{value:.2}"),
            Self::Infinite => write!(f, "∞"),
        }
    }
}

/// Aggregate statistics of a run.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    initial_capital: f64,
    compounded_equity: f64,
    total_return_pct: f64,
    annualized_return_pct: f64,
    win_rate_pct: f64,
    max_drawdown_pct: f64,
    profit_factor: ProfitFactor,
    average_trade_pct: f64,
    fees_paid: f64,
}

impl Metrics {
    /// Computes every statistic from the ledger and the equity curve.
    ///
    /// ### Arguments
    /// * `initial_capital` - Capital at the start of the run.
    /// * `compounded_equity` - Capital at the end of the run.
    /// * `trades` - Completed trades, in order.
    /// * `equity_curve` - One point per candle, in order.
    /// * `fees_paid` - Total fees charged.
    pub fn new(
        initial_capital: f64,
        compounded_equity: f64,
        trades: &[Trade],
        equity_curve: &[EquityPoint],
        fees_paid: f64,
    ) -> Self {
        let total_return_pct = total_return(initial_capital, compounded_equity);
        let day_span = match (equity_curve.first(), equity_curve.last()) {
            (Some(first), Some(last)) => (last.date() - first.date()).num_days(),
            _ => 0,
        };

        Self {
            initial_capital,
            compounded_equity,
            total_return_pct,
            annualized_return_pct: annualized_return(initial_capital, compounded_equity, day_span),
            win_rate_pct: win_rate(trades),
            max_drawdown_pct: max_drawdown(equity_curve),
            profit_factor: profit_factor(trades),
            average_trade_pct: average_trade(trades),
            fees_paid,
        }
    }

    /// Returns the starting capital.
    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    /// Returns the final capital, all trades realized.
    pub fn compounded_equity(&self) -> f64 {
        self.compounded_equity
    }

    /// Returns the total return as a percentage.
    pub fn total_return_pct(&self) -> f64 {
        self.total_return_pct
    }

    /// Returns the compound annual return as a percentage.
    pub fn annualized_return_pct(&self) -> f64 {
        self.annualized_return_pct
    }

    /// Returns the share of strictly profitable trades, in percent.
    pub fn win_rate_pct(&self) -> f64 {
        self.win_rate_pct
    }

    /// Returns the largest peak-to-trough equity decline, in percent.
    pub fn max_drawdown_pct(&self) -> f64 {
        self.max_drawdown_pct
    }

    /// Returns the profit factor.
    pub fn profit_factor(&self) -> ProfitFactor {
        self.profit_factor
    }

    /// Returns the mean trade return, in percent.
    pub fn average_trade_pct(&self) -> f64 {
        self.average_trade_pct
    }

    /// Returns the total fees paid.
    pub fn fees_paid(&self) -> f64 {
        self.fees_paid
    }
}

/// Percentage change from the initial capital to the compounded equity.
pub fn total_return(initial_capital: f64, compounded_equity: f64) -> f64 {
    initial_capital.change(compounded_equity)
}

/// Compound annual growth over `day_span` calendar days, in percent.
///
/// Spans shorter than one day fall back to the total return.
pub fn annualized_return(initial_capital: f64, compounded_equity: f64, day_span: i64) -> f64 {
    if day_span < 1 {
        return total_return(initial_capital, compounded_equity);
    }
    let growth = compounded_equity / initial_capital;
    (growth.powf(365.0 / day_span as f64) - 1.0) * 100.0
}

/// Share of trades with a strictly positive profit; 0 without trades.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winning_trades = trades.iter().filter(|t| t.is_win()).count();
    (winning_trades as f64 / trades.len() as f64) * 100.0
}

/// Largest decline from the running equity peak, in percent.
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let mut max_peak = f64::NEG_INFINITY;
    let mut max_drawdown = 0.0;

    for point in equity_curve {
        let equity = point.equity();
        if equity > max_peak {
            max_peak = equity;
        }
        if max_peak > 0.0 {
            let drawdown = (max_peak - equity) / max_peak;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }
    }

    max_drawdown * 100.0
}

/// Gross winning profit over the magnitude of gross losses.
pub fn profit_factor(trades: &[Trade]) -> ProfitFactor {
    let mut total_gains = 0.0;
    let mut total_losses = 0.0;

    for trade in trades {
        if trade.is_win() {
            total_gains += trade.profit();
        } else if trade.is_loss() {
            total_losses += trade.profit().abs();
        }
    }

    if total_losses == 0.0 {
        return ProfitFactor::Infinite;
    }

    ProfitFactor::Finite(total_gains / total_losses)
}

/// Mean of the trades' percentage returns; 0 without trades.
pub fn average_trade(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.return_pct()).sum::<f64>() / trades.len() as f64
}

/// The single output of a backtest run.
///
/// It dereferences to its [`Metrics`], so `result.win_rate_pct()` reads directly.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    symbol: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
    #[cfg_attr(feature = "serde", serde(flatten))]
    metrics: Metrics,
}

impl std::ops::Deref for BacktestResult {
    type Target = Metrics;

    fn deref(&self) -> &Self::Target {
        &self.metrics
    }
}

impl BacktestResult {
    pub(crate) fn new(
        symbol: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
        trades: Vec<Trade>,
        equity_curve: Vec<EquityPoint>,
        metrics: Metrics,
    ) -> Self {
        Self {
            symbol,
            start_date,
            end_date,
            trades,
            equity_curve,
            metrics,
        }
    }

    /// Returns the instrument identifier.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Returns the first day of the series.
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Returns the last day of the series.
    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Returns the trade ledger, ordered by entry date.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Returns the equity curve, one point per candle.
    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// Returns the statistics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

fn signed(value: f64) -> String {
    if value > 0.0 {
        format!("+{value:.2}%")
    } else {
        format!("{value:.2}%")
    }
}

impl fmt::Display for BacktestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Backtest Metrics ===")?;
        writeln!(f, "Symbol: {}", self.symbol)?;
        writeln!(f, "Period: {} -> {}", self.start_date, self.end_date)?;
        writeln!(f, "Initial Capital: {:.2}", self.initial_capital())?;
        writeln!(f, "Ending Equity: {:.2}", self.compounded_equity())?;
        writeln!(f, "Fees paid: {:.2}", self.fees_paid())?;
        #[allow(clippy::writeln_empty_string)]
        writeln!(f, "")?;
        writeln!(f, "Total Return: {}", signed(self.total_return_pct()))?;
        writeln!(f, "Annualized: {}", signed(self.annualized_return_pct()))?;
        writeln!(f, "Win Rate: {:.2}%", self.win_rate_pct())?;
        writeln!(f, "Max Drawdown: {:.2}%", self.max_drawdown_pct())?;
        writeln!(f, "Profit Factor: {}", self.profit_factor())?;
        writeln!(f, "Average Trade: {}", signed(self.average_trade_pct()))?;
        write!(f, "# of Trades: {}", self.trades.len())
    }
}
