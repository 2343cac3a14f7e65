//! Strategy configuration — the parameters the scanner and simulator read.
//!
//! Passed explicitly into every call so tests can vary parameters without
//! shared state. Validated once before any simulation starts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_THRESHOLD_PCT: f64 = 0.20;
pub const DEFAULT_MOVING_AVERAGE_PERIOD: usize = 200;
pub const DEFAULT_CAPITAL_PER_TRADE: f64 = 100_000.0;
pub const DEFAULT_REINVESTMENT_GROWTH_FACTOR: f64 = 1.03;

/// Configuration errors. These are the only fatal conditions of a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("threshold_pct must be a finite, non-negative fraction (got {0})")]
    InvalidThreshold(f64),

    #[error("moving_average_period must be >= 1")]
    InvalidMovingAveragePeriod,

    #[error("capital_per_trade must be finite and positive (got {0})")]
    InvalidCapital(f64),

    #[error("reinvestment_growth_factor must be finite and positive (got {0})")]
    InvalidGrowthFactor(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Minimum (high - low) / low range of a bullish run, as a fraction.
    /// A run exactly at the threshold does not qualify.
    pub threshold_pct: f64,
    /// Window of the trailing SMA used by the V200 entry filter.
    pub moving_average_period: usize,
    /// Capital committed to each trade before compounding.
    pub capital_per_trade: f64,
    /// Multiplier applied to capital for a non-V200 instrument's second trade.
    pub reinvestment_growth_factor: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            threshold_pct: DEFAULT_THRESHOLD_PCT,
            moving_average_period: DEFAULT_MOVING_AVERAGE_PERIOD,
            capital_per_trade: DEFAULT_CAPITAL_PER_TRADE,
            reinvestment_growth_factor: DEFAULT_REINVESTMENT_GROWTH_FACTOR,
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold_pct.is_finite() || self.threshold_pct < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.threshold_pct));
        }
        if self.moving_average_period == 0 {
            return Err(ConfigError::InvalidMovingAveragePeriod);
        }
        if !self.capital_per_trade.is_finite() || self.capital_per_trade <= 0.0 {
            return Err(ConfigError::InvalidCapital(self.capital_per_trade));
        }
        if !self.reinvestment_growth_factor.is_finite() || self.reinvestment_growth_factor <= 0.0
        {
            return Err(ConfigError::InvalidGrowthFactor(
                self.reinvestment_growth_factor,
            ));
        }
        Ok(())
    }
}
