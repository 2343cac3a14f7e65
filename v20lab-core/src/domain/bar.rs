//! One daily OHLC observation for an instrument.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLC bar with the trailing moving average of close attached.
///
/// `moving_average` is `None` until the series has enough history for the
/// configured window (see [`PriceSeries::with_moving_average`]).
///
/// [`PriceSeries::with_moving_average`]: super::PriceSeries::with_moving_average
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub moving_average: Option<f64>,
}

impl Bar {
    pub fn new(timestamp: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            moving_average: None,
        }
    }

    /// A bar closing above its open. Runs of these form v20 setups.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Basic OHLC sanity check: positive prices, high >= low, and the body
    /// inside the range.
    pub fn is_sane(&self) -> bool {
        let finite = self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite();
        finite
            && self.low > 0.0
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}
