//! Trade records — completed round trips and positions still open at the
//! end of the data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::category::SourceCategory;

/// A round trip whose sell target was reached: entry → exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTrade {
    // ── Identification ──
    pub instrument: String,
    pub source_category: SourceCategory,

    // ── Entry ──
    pub entry_bar: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_date: NaiveDate,
    pub exit_price: f64,

    // ── Size ──
    pub share_count: u64,
    pub investment: f64,
    pub sale_value: f64,

    // ── PnL ──
    pub profit: f64,
    /// Profit as a percentage of investment (5.0 = 5%).
    pub profit_pct: f64,

    // ── Setup traceability ──
    pub setup_start: NaiveDate,
    pub setup_end: NaiveDate,
}

impl CompletedTrade {
    pub fn is_winner(&self) -> bool {
        self.profit > 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar - self.entry_bar
    }
}

/// A filled entry whose sell target was never reached before the data ended.
///
/// Marked to the instrument's final bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenTrade {
    pub instrument: String,
    pub source_category: SourceCategory,

    pub entry_bar: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub target_exit_price: f64,

    pub share_count: u64,
    pub investment: f64,

    pub last_known_date: NaiveDate,
    pub last_price: f64,
    pub unrealized_pnl: f64,
    /// Unrealized P/L as a percentage of investment.
    pub unrealized_pnl_pct: f64,

    pub setup_start: NaiveDate,
    pub setup_end: NaiveDate,
}

/// `numerator / investment * 100`, or zero for a zero investment.
pub(crate) fn pct_of(numerator: f64, investment: f64) -> f64 {
    if investment > 0.0 {
        numerator / investment * 100.0
    } else {
        0.0
    }
}
