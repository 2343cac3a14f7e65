//! A qualifying run of consecutive bullish bars.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A maximal run of `close > open` bars whose low-to-high range clears the
/// threshold. Recomputed on every scan, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setup {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_index: usize,
    pub end_index: usize,
    /// Minimum low over the run; the buy trigger price.
    pub lowest_low: f64,
    /// Maximum high over the run; the sell target price.
    pub highest_high: f64,
    /// Index immediately after the run.
    pub next_scan_position: usize,
}

impl Setup {
    /// (highest_high - lowest_low) / lowest_low
    pub fn range_pct(&self) -> f64 {
        (self.highest_high - self.lowest_low) / self.lowest_low
    }

    pub fn bar_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }
}
