//! Historical candle sources.
//!
//! The engine never fetches data itself: a [`CandleProvider`] is asked for a symbol over a
//! [`RangeSpec`] and an interval, and the candles it returns are handed to the engine.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Datelike, Duration, Months, NaiveDate};
use tracing::debug;

use crate::engine::Candle;
use crate::errors::{Error, Result};

/// Range used when the market view is requested without one.
pub const DEFAULT_MARKET_RANGE: RangeSpec = RangeSpec::Months(6);
/// Range a backtest is run over when none is requested.
pub const DEFAULT_BACKTEST_RANGE: RangeSpec = RangeSpec::Years(1);
/// The only interval supported by the file provider.
pub const DEFAULT_INTERVAL: &str = "1d";

/// How far back from the latest candle to look, in the `6mo`/`1y` notation of market data APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `Nd`
    Days(u32),
    /// `Nwk`
    Weeks(u32),
    /// `Nmo`
    Months(u32),
    /// `Ny`
    Years(u32),
    /// `ytd`: since January 1st of the latest candle's year.
    YearToDate,
    /// `max`: everything available.
    Max,
}

impl RangeSpec {
    /// Parses `input`, falling back to `default` when it is blank.
    ///
    /// ```rust
    /// use macross::data::{DEFAULT_BACKTEST_RANGE, RangeSpec};
    ///
    /// assert_eq!(RangeSpec::parse_or("  ", DEFAULT_BACKTEST_RANGE).unwrap(), RangeSpec::Years(1));
    /// assert_eq!(RangeSpec::parse_or(" 3mo ", DEFAULT_BACKTEST_RANGE).unwrap(), RangeSpec::Months(3));
    /// ```
    pub fn parse_or(input: &str, default: RangeSpec) -> Result<Self> {
        match input.trim() {
            "" => Ok(default),
            value => value.parse(),
        }
    }

    /// First date included in the range ending at `end`, `None` when unbounded.
    pub fn start(&self, end: NaiveDate) -> Option<NaiveDate> {
        match *self {
            Self::Days(n) => end.checked_sub_signed(Duration::days(n as i64)),
            Self::Weeks(n) => end.checked_sub_signed(Duration::weeks(n as i64)),
            Self::Months(n) => end.checked_sub_months(Months::new(n)),
            Self::Years(n) => end.checked_sub_months(Months::new(n.saturating_mul(12))),
            Self::YearToDate => NaiveDate::from_ymd_opt(end.year(), 1, 1),
            Self::Max => None,
        }
    }
}

impl FromStr for RangeSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim().to_ascii_lowercase();
        match value.as_str() {
            "ytd" => return Ok(Self::YearToDate),
            "max" => return Ok(Self::Max),
            _ => {}
        }

        let split = value.find(|c: char| !c.is_ascii_digit()).unwrap_or(value.len());
        let (count, unit) = value.split_at(split);
        let count = count
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| Error::InvalidRange(s.to_string()))?;

        match unit {
            "d" => Ok(Self::Days(count)),
            "wk" => Ok(Self::Weeks(count)),
            "mo" => Ok(Self::Months(count)),
            "y" => Ok(Self::Years(count)),
            _ => Err(Error::InvalidRange(s.to_string())),
        }
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Days(n) => write!(f, "{n}d"),
            Self::Weeks(n) => write!(f, "{n}wk"),
            Self::Months(n) => write!(f, "{n}mo"),
            Self::Years(n) => write!(f, "{n}y"),
            Self::YearToDate => f.write_str("ytd"),
            Self::Max => f.write_str("max"),
        }
    }
}

/// A source of daily candles.
pub trait CandleProvider {
    /// Returns the candles of `symbol` over `range`, ascending by date.
    fn fetch(&self, symbol: &str, range: RangeSpec, interval: &str) -> Result<Vec<Candle>>;
}

/// Serves `<dir>/<SYMBOL>.json` files, each holding an array of daily candles.
///
/// The range is anchored on the latest candle of the file, so a snapshot always yields the
/// same series.
#[derive(Debug, Clone)]
pub struct JsonDirectory {
    root: PathBuf,
}

impl JsonDirectory {
    /// Creates a provider reading from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the file backing `symbol`.
    pub fn path(&self, symbol: &str) -> PathBuf {
        self.root.join(format!("{}.json", symbol.trim().to_uppercase()))
    }
}

impl CandleProvider for JsonDirectory {
    fn fetch(&self, symbol: &str, range: RangeSpec, interval: &str) -> Result<Vec<Candle>> {
        if symbol.trim().is_empty() {
            return Err(Error::validation("symbol", "is required"));
        }
        let interval = match interval.trim() {
            "" => DEFAULT_INTERVAL,
            value => value,
        };
        if interval != DEFAULT_INTERVAL {
            return Err(Error::UnsupportedInterval(interval.to_string()));
        }

        let path = self.path(symbol);
        let candles = sanitize(load_candles(&path)?);
        let total = candles.len();
        let candles = trim_to_range(candles, range);

        debug!(path = %path.display(), %range, total, kept = candles.len(), "Loaded candles");
        Ok(candles)
    }
}

/// Candles for the market view of `symbol`.
///
/// A blank `range` means [`DEFAULT_MARKET_RANGE`], a blank `interval` means [`DEFAULT_INTERVAL`].
pub fn market_candles<P>(provider: &P, symbol: &str, range: &str, interval: &str) -> Result<Vec<Candle>>
where
    P: CandleProvider + ?Sized,
{
    let range = RangeSpec::parse_or(range, DEFAULT_MARKET_RANGE)?;
    provider.fetch(symbol, range, interval)
}

/// Reads the JSON array of candles stored at `path`, as is.
pub fn load_candles(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(Error::from)
}

/// Sorts by date; of several candles sharing a date, the last one in the file wins.
fn sanitize(mut candles: Vec<Candle>) -> Vec<Candle> {
    candles.sort_by_key(|c| c.date());
    let mut unique: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match unique.last_mut() {
            Some(last) if last.date() == candle.date() => *last = candle,
            _ => unique.push(candle),
        }
    }
    unique
}

fn trim_to_range(candles: Vec<Candle>, range: RangeSpec) -> Vec<Candle> {
    let Some(start) = candles.last().and_then(|last| range.start(last.date())) else {
        return candles;
    };
    candles.into_iter().filter(|c| c.date() >= start).collect()
}
