//! Strategy configuration.
//!
//! Raw input arrives as a [`PartialConfig`] where every field is optional. The normalizer
//! ([`normalize_config`]) fills the gaps with the documented defaults and rejects anything
//! the engine cannot work with, so a [`StrategyConfig`] is always valid once it exists.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::BPS;
use crate::errors::{Error, Result};

/// Default fast moving-average length.
pub const DEFAULT_FAST_LENGTH: usize = 10;
/// Default slow moving-average length.
pub const DEFAULT_SLOW_LENGTH: usize = 30;
/// Default starting capital.
pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;
/// Default fee, in basis points of notional, charged on each leg.
pub const DEFAULT_FEE_BPS: f64 = 5.0;
/// Default slippage, in basis points of the close price.
pub const DEFAULT_SLIPPAGE_BPS: f64 = 5.0;

/// Smallest accepted fast moving-average length.
pub const MIN_FAST_LENGTH: usize = 2;
/// Smallest accepted slow moving-average length.
pub const MIN_SLOW_LENGTH: usize = 3;

/// A loosely-typed strategy configuration. Only `symbol` is mandatory.
///
/// It deserializes from the camelCase record sent by clients
/// (`{"symbol": "AAPL", "fastLength": 10, ...}`) and doubles as the builder of
/// [`StrategyConfig`].
///
/// ### Example
/// ```rust
/// use macross::prelude::*;
///
/// let config = StrategyConfig::builder().symbol(" msft ").fast_length(5).build().unwrap();
/// assert_eq!(config.symbol(), "MSFT");
/// assert_eq!(config.fast_length(), 5);
/// assert_eq!(config.slow_length(), DEFAULT_SLOW_LENGTH);
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialConfig {
    /// Instrument identifier.
    pub symbol: Option<String>,
    /// Fast moving-average length.
    pub fast_length: Option<i64>,
    /// Slow moving-average length.
    pub slow_length: Option<i64>,
    /// Starting capital.
    pub initial_capital: Option<f64>,
    /// Fee in basis points.
    pub fee_bps: Option<f64>,
    /// Slippage in basis points.
    pub slippage_bps: Option<f64>,
}

impl PartialConfig {
    /// Sets the instrument identifier.
    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Sets the fast moving-average length.
    pub fn fast_length(mut self, length: i64) -> Self {
        self.fast_length = Some(length);
        self
    }

    /// Sets the slow moving-average length.
    pub fn slow_length(mut self, length: i64) -> Self {
        self.slow_length = Some(length);
        self
    }

    /// Sets the starting capital.
    pub fn initial_capital(mut self, capital: f64) -> Self {
        self.initial_capital = Some(capital);
        self
    }

    /// Sets the fee in basis points.
    pub fn fee_bps(mut self, bps: f64) -> Self {
        self.fee_bps = Some(bps);
        self
    }

    /// Sets the slippage in basis points.
    pub fn slippage_bps(mut self, bps: f64) -> Self {
        self.slippage_bps = Some(bps);
        self
    }

    /// Normalizes into a [`StrategyConfig`]. See [`normalize_config`].
    pub fn build(self) -> Result<StrategyConfig> {
        normalize_config(self)
    }
}

/// Fully resolved simulation parameters.
///
/// Only [`normalize_config`] creates it, so `slow_length > fast_length >= 2`, the capital is
/// positive and both cost rates lie in `[0, 10_000)` basis points.
#[cfg_attr(feature = "serde", derive(Serialize), serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    symbol: String,
    fast_length: usize,
    slow_length: usize,
    initial_capital: f64,
    fee_bps: f64,
    slippage_bps: f64,
}

impl StrategyConfig {
    /// Starts a configuration; unset fields take their defaults.
    pub fn builder() -> PartialConfig {
        PartialConfig::default()
    }

    /// Returns the instrument identifier (trimmed, upper case).
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Returns the fast moving-average length.
    pub fn fast_length(&self) -> usize {
        self.fast_length
    }

    /// Returns the slow moving-average length.
    pub fn slow_length(&self) -> usize {
        self.slow_length
    }

    /// Returns the starting capital.
    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    /// Returns the fee in basis points.
    pub fn fee_bps(&self) -> f64 {
        self.fee_bps
    }

    /// Returns the slippage in basis points.
    pub fn slippage_bps(&self) -> f64 {
        self.slippage_bps
    }
}

impl TryFrom<PartialConfig> for StrategyConfig {
    type Error = Error;

    fn try_from(value: PartialConfig) -> Result<Self> {
        normalize_config(value)
    }
}

impl fmt::Display for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} SMA({}/{}) capital {:.2} fee {} bps slippage {} bps",
            self.symbol, self.fast_length, self.slow_length, self.initial_capital, self.fee_bps, self.slippage_bps
        )
    }
}

/// Fills missing fields with defaults and validates the result.
///
/// ### Defaults
/// | Field            | Default   |
/// |------------------|-----------|
/// | `fastLength`     | 10        |
/// | `slowLength`     | 30        |
/// | `initialCapital` | 100 000   |
/// | `feeBps`         | 5         |
/// | `slippageBps`    | 5         |
///
/// ### Errors
/// [`Error::Validation`] naming the offending field when:
/// - `symbol` is missing or blank,
/// - `fastLength < 2`, `slowLength < 3` or `slowLength <= fastLength`,
/// - `initialCapital` is not a positive finite number,
/// - `feeBps` or `slippageBps` is negative, non-finite or not below 10 000.
pub fn normalize_config(partial: PartialConfig) -> Result<StrategyConfig> {
    let symbol = partial
        .symbol
        .as_deref()
        .map(str::trim)
        .filter(|symbol| !symbol.is_empty())
        .ok_or_else(|| Error::validation("symbol", "is required"))?
        .to_uppercase();

    let fast_length = length(
        "fastLength",
        or_default("fastLength", partial.fast_length, DEFAULT_FAST_LENGTH as i64),
        MIN_FAST_LENGTH,
    )?;
    let slow_length = length(
        "slowLength",
        or_default("slowLength", partial.slow_length, DEFAULT_SLOW_LENGTH as i64),
        MIN_SLOW_LENGTH,
    )?;
    if slow_length <= fast_length {
        return Err(Error::validation(
            "slowLength",
            format!("must be greater than fastLength ({fast_length}), got {slow_length}"),
        ));
    }

    let initial_capital = or_default("initialCapital", partial.initial_capital, DEFAULT_INITIAL_CAPITAL);
    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return Err(Error::validation(
            "initialCapital",
            format!("must be positive, got {initial_capital}"),
        ));
    }

    let fee_bps = basis_points("feeBps", or_default("feeBps", partial.fee_bps, DEFAULT_FEE_BPS))?;
    let slippage_bps = basis_points(
        "slippageBps",
        or_default("slippageBps", partial.slippage_bps, DEFAULT_SLIPPAGE_BPS),
    )?;

    Ok(StrategyConfig {
        symbol,
        fast_length,
        slow_length,
        initial_capital,
        fee_bps,
        slippage_bps,
    })
}

fn or_default<T: Copy + fmt::Display>(field: &'static str, value: Option<T>, default: T) -> T {
    value.unwrap_or_else(|| {
        debug!(field, %default, "Using default");
        default
    })
}

fn length(field: &'static str, value: i64, min: usize) -> Result<usize> {
    let length = usize::try_from(value).map_err(|_| Error::validation(field, format!("must be at least {min}, got {value}")))?;
    if length < min {
        return Err(Error::validation(field, format!("must be at least {min}, got {value}")));
    }
    Ok(length)
}

fn basis_points(field: &'static str, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::validation(field, format!("must not be negative, got {value}")));
    }
    if value >= BPS {
        return Err(Error::validation(field, format!("must be below {BPS}, got {value}")));
    }
    Ok(value)
}
