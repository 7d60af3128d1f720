use super::Candle;

/// Crossover event between the fast and slow moving averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The fast MA moved from at-or-below to strictly above the slow MA.
    GoldenCross,
    /// The fast MA moved from at-or-above to strictly below the slow MA.
    DeathCross,
}

/// Simple moving average of `values` over `length` periods.
///
/// The output is aligned with the input; entries before index `length - 1` are `None`.
pub fn simple_moving_average(values: &[f64], length: usize) -> Vec<Option<f64>> {
    if length == 0 {
        return vec![None; values.len()];
    }
    let mut averages = vec![None; (length - 1).min(values.len())];
    averages.extend(
        values
            .windows(length)
            .map(|window| Some(window.iter().sum::<f64>() / length as f64)),
    );
    averages
}

/// Fast and slow simple moving averages of the close, aligned to the candle series by index.
#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverageSeries {
    fast: Vec<Option<f64>>,
    slow: Vec<Option<f64>>,
}

impl MovingAverageSeries {
    /// Computes both averages over the candle closes.
    pub fn new(candles: &[Candle], fast_length: usize, slow_length: usize) -> Self {
        let closes = candles.iter().map(|c| c.close()).collect::<Vec<_>>();
        Self {
            fast: simple_moving_average(&closes, fast_length),
            slow: simple_moving_average(&closes, slow_length),
        }
    }

    /// Returns the number of aligned values.
    pub fn len(&self) -> usize {
        self.fast.len()
    }

    /// Returns `true` if the series holds no values.
    pub fn is_empty(&self) -> bool {
        self.fast.is_empty()
    }

    /// Returns the fast average at `index`, if already available.
    pub fn fast(&self, index: usize) -> Option<f64> {
        self.fast.get(index).copied().flatten()
    }

    /// Returns the slow average at `index`, if already available.
    pub fn slow(&self, index: usize) -> Option<f64> {
        self.slow.get(index).copied().flatten()
    }

    /// Returns the crossover occurring at `index`, if any.
    ///
    /// Both averages must be defined at `index - 1` and `index`; touching without crossing
    /// is not a signal.
    pub fn signal(&self, index: usize) -> Option<Signal> {
        let previous = index.checked_sub(1)?;
        let (Some(prev_fast), Some(prev_slow), Some(fast), Some(slow)) =
            (self.fast(previous), self.slow(previous), self.fast(index), self.slow(index))
        else {
            return None;
        };

        if prev_fast <= prev_slow && fast > slow {
            Some(Signal::GoldenCross)
        } else if prev_fast >= prev_slow && fast < slow {
            Some(Signal::DeathCross)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CandleBuilder;

    use chrono::{Duration, NaiveDate};
    use ta::{Next, indicators::SimpleMovingAverage};

    fn candles(closes: &[f64]) -> Vec<Candle> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                CandleBuilder::builder()
                    .date(start + Duration::days(i as i64))
                    .open(close)
                    .high(close)
                    .low(close)
                    .close(close)
                    .volume(1.0)
                    .build()
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn warm_up_is_undefined() {
        let sma = simple_moving_average(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(sma, vec![None, None, Some(2.0), Some(3.0)]);
    }

    #[test]
    fn length_longer_than_series() {
        let sma = simple_moving_average(&[1.0, 2.0], 5);
        assert_eq!(sma, vec![None, None]);
        assert!(simple_moving_average(&[], 3).is_empty());
    }

    #[test]
    fn matches_ta_sma() {
        let closes = (0..120)
            .map(|i| 100.0 + 10.0 * (i as f64 * 0.37).sin() + 0.25 * i as f64)
            .collect::<Vec<_>>();
        let length = 14;
        let mut reference = SimpleMovingAverage::new(length).unwrap();
        let sma = simple_moving_average(&closes, length);

        for (i, &close) in closes.iter().enumerate() {
            let expected = reference.next(close);
            match sma[i] {
                Some(value) => assert!((value - expected).abs() < 1e-9, "index {i}: {value} != {expected}"),
                None => assert!(i < length - 1),
            }
        }
    }

    #[test]
    fn two_trade_fixture_signals() {
        let data = candles(&[10.0, 10.0, 10.0, 12.0, 14.0, 16.0, 14.0, 12.0, 10.0, 8.0]);
        let averages = MovingAverageSeries::new(&data, 2, 3);
        assert_eq!(averages.len(), 10);
        assert_eq!(averages.fast(0), None);
        assert_eq!(averages.fast(1), Some(10.0));
        assert_eq!(averages.slow(1), None);
        assert_eq!(averages.slow(2), Some(10.0));

        let signals = (0..data.len()).map(|i| averages.signal(i)).collect::<Vec<_>>();
        assert_eq!(signals[3], Some(Signal::GoldenCross));
        assert_eq!(signals[7], Some(Signal::DeathCross));
        assert_eq!(signals.iter().flatten().count(), 2);
    }

    #[test]
    fn touching_is_not_a_cross() {
        let averages = MovingAverageSeries {
            fast: vec![None, Some(1.0), Some(2.0), Some(1.5), Some(2.0)],
            slow: vec![None, None, Some(1.5), Some(1.5), Some(1.5)],
        };
        // fast comes down to meet slow without going below
        assert_eq!(averages.signal(3), None);
        // rising away from an equal reading is a golden cross
        assert_eq!(averages.signal(4), Some(Signal::GoldenCross));
    }

    #[test]
    fn no_signal_without_previous_values() {
        let data = candles(&[10.0, 9.0, 12.0]);
        let averages = MovingAverageSeries::new(&data, 2, 3);
        assert_eq!(averages.signal(0), None);
        // slow is first defined at index 2, so no crossover can be formed yet
        assert_eq!(averages.signal(2), None);
    }
}
