//! PriceSeries — the time-ordered bars of one instrument.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::bar::Bar;
use crate::indicators::Sma;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("bars for '{symbol}' are not strictly increasing in time at index {index} ({previous} then {current})")]
    NonMonotonic {
        symbol: String,
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("moving average period must be >= 1")]
    InvalidPeriod,
}

/// Ordered daily bars for a single instrument.
///
/// Construction enforces strictly increasing timestamps. An empty series is
/// valid and simulates to no trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        for (index, pair) in bars.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(SeriesError::NonMonotonic {
                    symbol,
                    index: index + 1,
                    previous: pair[0].timestamp,
                    current: pair[1].timestamp,
                });
            }
        }
        Ok(Self { symbol, bars })
    }

    /// Attach the trailing SMA of close to every bar, replacing any value
    /// already present.
    pub fn with_moving_average(mut self, period: usize) -> Result<Self, SeriesError> {
        let sma = Sma::new(period).ok_or(SeriesError::InvalidPeriod)?;
        let values = sma.compute(&self.bars);
        for (bar, value) in self.bars.iter_mut().zip(values) {
            bar.moving_average = value;
        }
        Ok(self)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.timestamp)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.timestamp)
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }
}
