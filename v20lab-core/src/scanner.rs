//! Setup scanner — enumerates v20 setups from a start position onward.
//!
//! A run is a maximal stretch of consecutive bullish bars (`close > open`).
//! Each bar is examined once: the bar that breaks a run is where scanning
//! resumes. A run qualifies when its low-to-high range strictly exceeds the
//! threshold. Non-qualifying runs are consumed whole.
//!
//! Pure function of (series, threshold, start index). Restarting from any
//! position yields the same setups that a full scan would from that point.

use tracing::trace;

use crate::domain::{Bar, PriceSeries, Setup};

/// Lazy iterator over the setups of a series.
#[derive(Debug, Clone)]
pub struct SetupScan<'a> {
    bars: &'a [Bar],
    threshold_pct: f64,
    position: usize,
}

impl<'a> SetupScan<'a> {
    pub fn new(series: &'a PriceSeries, threshold_pct: f64, start_index: usize) -> Self {
        Self {
            bars: series.bars(),
            threshold_pct,
            position: start_index,
        }
    }

    /// Index the next call to `next()` starts examining from.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl Iterator for SetupScan<'_> {
    type Item = Setup;

    fn next(&mut self) -> Option<Setup> {
        let n = self.bars.len();
        while self.position < n {
            let start = self.position;
            if !self.bars[start].is_bullish() {
                self.position += 1;
                continue;
            }

            let mut end = start;
            while end + 1 < n && self.bars[end + 1].is_bullish() {
                end += 1;
            }
            self.position = end + 1;

            let run = &self.bars[start..=end];
            let lowest_low = run.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
            let highest_high = run
                .iter()
                .map(|b| b.high)
                .fold(f64::NEG_INFINITY, f64::max);

            // A non-positive low has no meaningful percentage range.
            if lowest_low.is_nan() || lowest_low <= 0.0 {
                trace!(start, end, lowest_low, "degenerate run skipped");
                continue;
            }

            let range_pct = (highest_high - lowest_low) / lowest_low;
            if range_pct > self.threshold_pct {
                return Some(Setup {
                    start_date: run[0].timestamp,
                    end_date: run[run.len() - 1].timestamp,
                    start_index: start,
                    end_index: end,
                    lowest_low,
                    highest_high,
                    next_scan_position: end + 1,
                });
            }
            trace!(start, end, range_pct, "run below threshold");
        }
        None
    }
}

/// Collect every qualifying setup from `start_index` to the end of the series.
pub fn find_setups(series: &PriceSeries, threshold_pct: f64, start_index: usize) -> Vec<Setup> {
    SetupScan::new(series, threshold_pct, start_index).collect()
}
