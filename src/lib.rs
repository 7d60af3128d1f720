//! # MACross: Moving-Average Crossover Backtester
//!
//! **MACross** evaluates a systematic trend-following rule (a simple moving-average crossover)
//! against a historical daily price series and reports how it would have performed.
//!
//! It turns a candle series and a handful of strategy parameters into a simulated sequence of
//! trades, a day-by-day equity curve and aggregate performance statistics. Identical inputs
//! always produce an identical result.
//!
//! ## Core Components
//! | Component            | Description                                                                   |
//! |----------------------|-------------------------------------------------------------------------------|
//! | **`Candle`**         | One trading day of OHLCV data.                                                |
//! | **`StrategyConfig`** | Normalized parameters: symbol, MA lengths, capital, fees and slippage.        |
//! | **`Backtest`**       | The engine that walks the series, opens and closes the single long position. |
//! | **`BacktestResult`** | Trades, equity curve and statistics (drawdown, profit factor, win rate...).  |
//!
//! ## Strategy
//! - A position is opened on a **golden cross** (fast MA moves from at-or-below to above the slow MA).
//! - It is closed on a **death cross** (fast MA moves from at-or-above to below the slow MA).
//! - A position still open on the last candle is closed at that candle's close.
//! - All available capital is committed on entry; profits and losses compound trade after trade.
//! - Slippage moves each execution price against the trader; fees are charged on both legs.
//!
//! ## Getting Started
//! ```rust
//! use macross::prelude::*;
//! use chrono::{Duration, NaiveDate};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let closes = [10.0, 10.0, 10.0, 12.0, 14.0, 16.0, 14.0, 12.0, 10.0, 8.0];
//! let candles = closes
//!     .iter()
//!     .enumerate()
//!     .map(|(i, &close)| {
//!         CandleBuilder::builder()
//!             .date(start + Duration::days(i as i64))
//!             .open(close)
//!             .high(close)
//!             .low(close)
//!             .close(close)
//!             .volume(1_000.0)
//!             .build()
//!     })
//!     .collect::<Result<Vec<_>>>()
//!     .unwrap();
//!
//! let config = StrategyConfig::builder()
//!     .symbol("demo")
//!     .fast_length(2)
//!     .slow_length(3)
//!     .initial_capital(1_000.0)
//!     .fee_bps(0.0)
//!     .slippage_bps(0.0)
//!     .build()
//!     .unwrap();
//!
//! let result = Backtest::new(candles, config).unwrap().run();
//! assert_eq!(result.trades().len(), 1);
//! assert_eq!(result.equity_curve().len(), 10);
//! println!("{result}");
//! ```
//!
//! ## Error Handling
//! Configuration problems surface as [`Error::Validation`](errors::Error::Validation) from the
//! normalizer; the engine rejects empty series, series shorter than the slow length and
//! malformed candles before simulating anything.
//!
//! ```rust
//! use macross::prelude::*;
//!
//! let err = StrategyConfig::builder()
//!     .symbol("AAPL")
//!     .fast_length(30)
//!     .slow_length(10)
//!     .build()
//!     .unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Validation);
//! assert_eq!(err.field(), Some("slowLength"));
//! ```
//!
//! ## Integrations
//! | Crate          | Purpose                                                                |
//! |----------------|------------------------------------------------------------------------|
//! | [`serde`](https://crates.io/crates/serde) | Load candles and configurations, serialize results.        |
//! | [`rayon`](https://crates.io/crates/rayon) | Run independent backtests in parallel (`parallel` feature). |
//! | [`plotters`](https://crates.io/crates/plotters) | Draw price, moving averages and equity (`draws` feature). |
//!
//! ## License
//! MIT
#![warn(missing_docs)]

/// Core simulation components: candles, moving averages, signals, positions and the engine.
pub mod engine;

/// Strategy configuration and its normalizer.
pub mod config;

/// Backtest results and performance statistics.
pub mod metrics;

/// Error types for the library.
pub mod errors;

/// Candle provider boundary: JSON files and range handling.
#[cfg(feature = "serde")]
pub mod data;

/// Parallel execution of independent backtests.
#[cfg(feature = "parallel")]
pub mod batch;

/// Draw graphics with svg and png backends.
#[cfg(feature = "draws")]
pub mod draws;

/// Re-exports of commonly used types and traits for convenience.
pub mod prelude {
    pub use super::*;
    pub use crate::config::*;
    pub use crate::engine::*;
    pub use crate::errors::*;
    pub use crate::metrics::*;

    #[cfg(feature = "serde")]
    pub use crate::data::*;

    #[cfg(feature = "parallel")]
    pub use crate::batch::*;

    #[cfg(feature = "draws")]
    pub use crate::draws::*;
}

use std::ops::{Add, Div, Mul, Sub};

/// One basis point as a fraction of notional.
pub const BPS: f64 = 10_000.0;

/// Trait for basis-point and percentage calculations on prices and notionals.
pub trait BasisPointCalculus<Rhs = Self> {
    /// Adds a basis-point rate to the value.
    ///
    /// ### Arguments
    /// * `rhs` - The rate to add (e.g., 50.0 for 50 bps, i.e. 0.5%).
    ///
    /// ### Returns
    /// The value increased by the given rate.
    fn addbps(self, rhs: Rhs) -> Self;

    /// Subtracts a basis-point rate from the value.
    ///
    /// ### Returns
    /// The value decreased by the given rate.
    fn subbps(self, rhs: Rhs) -> Self;

    /// Calculates the amount that a basis-point rate represents on this notional.
    fn how_many(self, bps: Self) -> Self;

    /// Calculates the percentage change between two values.
    ///
    /// ### Arguments
    /// * `new` - The new value to compare with.
    ///
    /// ### Returns
    /// The percentage change from the original value to the new value.
    fn change(self, new: Self) -> Self;
}

impl BasisPointCalculus for f64 {
    fn addbps(self, bps: Self) -> Self {
        self.add(self.mul(bps.div(BPS)))
    }

    fn subbps(self, bps: Self) -> Self {
        self.sub(self.mul(bps.div(BPS)))
    }

    fn how_many(self, bps: Self) -> Self {
        bps.mul(self.div(BPS))
    }

    fn change(self, new: Self) -> Self {
        new.sub(self).div(self).mul(100.0)
    }
}
