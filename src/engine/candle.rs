use chrono::NaiveDate;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// One trading day of OHLCV data.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl Candle {
    /// Returns the trading day.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Returns the open price.
    pub fn open(&self) -> f64 {
        self.open
    }

    /// Returns the highest price.
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Returns the lowest price.
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Returns the close price.
    pub fn close(&self) -> f64 {
        self.close
    }

    /// Returns the traded volume.
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Checks that prices are positive and finite, `low <= open, close <= high`
    /// and the volume is not negative.
    pub fn validate(&self) -> Result<()> {
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (name, price) in prices {
            if !price.is_finite() || price <= 0.0 {
                return Err(Error::InvalidCandle(format!("{}: {name} must be positive (got: {price})", self.date)));
            }
        }
        if self.low > self.open.min(self.close) || self.high < self.open.max(self.close) {
            return Err(Error::InvalidCandle(format!(
                "{}: low/high ({}, {}) do not bracket open/close ({}, {})",
                self.date, self.low, self.high, self.open, self.close
            )));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(Error::InvalidCandle(format!(
                "{}: volume must not be negative (got: {})",
                self.date, self.volume
            )));
        }
        Ok(())
    }
}

/// Builder for [`Candle`]. Every field is required; `build` validates the prices.
#[derive(Debug, Default)]
pub struct CandleBuilder {
    date: Option<NaiveDate>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

impl CandleBuilder {
    /// Creates an empty builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets the trading day.
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Sets the open price.
    pub fn open(mut self, open: f64) -> Self {
        self.open = Some(open);
        self
    }

    /// Sets the highest price.
    pub fn high(mut self, high: f64) -> Self {
        self.high = Some(high);
        self
    }

    /// Sets the lowest price.
    pub fn low(mut self, low: f64) -> Self {
        self.low = Some(low);
        self
    }

    /// Sets the close price.
    pub fn close(mut self, close: f64) -> Self {
        self.close = Some(close);
        self
    }

    /// Sets the traded volume.
    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Builds the candle.
    ///
    /// ### Returns
    /// The candle, or an error if a field is missing or the prices are inconsistent.
    pub fn build(self) -> Result<Candle> {
        let missing = |name: &str| Error::InvalidCandle(format!("missing {name}"));
        let candle = Candle {
            date: self.date.ok_or_else(|| missing("date"))?,
            open: self.open.ok_or_else(|| missing("open"))?,
            high: self.high.ok_or_else(|| missing("high"))?,
            low: self.low.ok_or_else(|| missing("low"))?,
            close: self.close.ok_or_else(|| missing("close"))?,
            volume: self.volume.ok_or_else(|| missing("volume"))?,
        };
        candle.validate()?;
        Ok(candle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn build_valid_candle() {
        let candle = CandleBuilder::builder()
            .date(day())
            .open(100.0)
            .high(110.0)
            .low(95.0)
            .close(105.0)
            .volume(1.0)
            .build()
            .unwrap();
        assert_eq!(candle.date(), day());
        assert_eq!(candle.close(), 105.0);
        assert_eq!(candle.volume(), 1.0);
    }

    #[test]
    fn build_missing_field() {
        let result = CandleBuilder::builder().date(day()).open(1.0).high(1.0).low(1.0).volume(0.0).build();
        assert!(matches!(result, Err(Error::InvalidCandle(reason)) if reason == "missing close"));
    }

    #[test]
    fn build_rejects_unbracketed_close() {
        let result = CandleBuilder::builder()
            .date(day())
            .open(100.0)
            .high(104.0)
            .low(95.0)
            .close(105.0)
            .volume(1.0)
            .build();
        assert!(matches!(result, Err(Error::InvalidCandle(_))));
    }

    #[test]
    fn build_rejects_non_positive_price() {
        let result = CandleBuilder::builder()
            .date(day())
            .open(0.0)
            .high(1.0)
            .low(0.0)
            .close(1.0)
            .volume(1.0)
            .build();
        assert!(matches!(result, Err(Error::InvalidCandle(_))));

        let result = CandleBuilder::builder()
            .date(day())
            .open(1.0)
            .high(f64::NAN)
            .low(1.0)
            .close(1.0)
            .volume(1.0)
            .build();
        assert!(matches!(result, Err(Error::InvalidCandle(_))));
    }

    #[test]
    fn build_rejects_negative_volume() {
        let result = CandleBuilder::builder()
            .date(day())
            .open(1.0)
            .high(1.0)
            .low(1.0)
            .close(1.0)
            .volume(-1.0)
            .build();
        assert!(matches!(result, Err(Error::InvalidCandle(_))));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_candle() {
        let json = r#"{"date":"2024-03-01","open":1.0,"high":2.0,"low":0.5,"close":1.5,"volume":10.0}"#;
        let candle: Candle = serde_json::from_str(json).unwrap();
        assert_eq!(candle.date(), day());
        assert!(candle.validate().is_ok());
    }
}
