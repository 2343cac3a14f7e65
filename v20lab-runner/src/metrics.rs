//! Aggregate trade statistics — pure functions over trade lists.
//!
//! No dependencies on the runner or the data layer: trades in, numbers out.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use v20lab_core::{CompletedTrade, OpenTrade};

/// Statistics over round trips that reached their target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletedMetrics {
    pub trade_count: usize,
    pub winning_trades: usize,
    /// Fraction of trades with positive profit (0.0 – 1.0).
    pub win_rate: f64,
    pub total_profit: f64,
    pub total_investment: f64,
    /// `total_profit / total_investment`, zero when nothing was invested.
    pub roi: f64,
    pub avg_bars_held: f64,
}

/// Statistics over positions still open at the end of the data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenMetrics {
    pub open_count: usize,
    pub total_investment: f64,
    pub total_unrealized_pnl: f64,
    /// Latest last-known date across the open positions.
    pub as_of: Option<NaiveDate>,
}

/// Everything the console summary and JSON report show.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub completed: CompletedMetrics,
    pub open: OpenMetrics,
    /// Completed-trade statistics per source category label.
    pub by_category: BTreeMap<String, CompletedMetrics>,
}

impl CompletedMetrics {
    pub fn compute(trades: &[CompletedTrade]) -> Self {
        let total_profit = total_profit(trades);
        let total_investment = total_investment(trades);
        Self {
            trade_count: trades.len(),
            winning_trades: trades.iter().filter(|t| t.is_winner()).count(),
            win_rate: win_rate(trades),
            total_profit,
            total_investment,
            roi: roi(total_profit, total_investment),
            avg_bars_held: avg_bars_held(trades),
        }
    }
}

impl OpenMetrics {
    pub fn compute(trades: &[OpenTrade]) -> Self {
        Self {
            open_count: trades.len(),
            total_investment: trades.iter().map(|t| t.investment).sum(),
            total_unrealized_pnl: total_unrealized_pnl(trades),
            as_of: trades.iter().map(|t| t.last_known_date).max(),
        }
    }
}

impl SummaryMetrics {
    pub fn compute(completed: &[CompletedTrade], open: &[OpenTrade]) -> Self {
        let mut grouped: BTreeMap<String, Vec<CompletedTrade>> = BTreeMap::new();
        for trade in completed {
            grouped
                .entry(trade.source_category.label().to_string())
                .or_default()
                .push(trade.clone());
        }
        Self {
            completed: CompletedMetrics::compute(completed),
            open: OpenMetrics::compute(open),
            by_category: grouped
                .into_iter()
                .map(|(label, trades)| (label, CompletedMetrics::compute(&trades)))
                .collect(),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Fraction of winning trades. Zero for no trades.
pub fn win_rate(trades: &[CompletedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

pub fn total_profit(trades: &[CompletedTrade]) -> f64 {
    trades.iter().map(|t| t.profit).sum()
}

pub fn total_investment(trades: &[CompletedTrade]) -> f64 {
    trades.iter().map(|t| t.investment).sum()
}

/// Return on deployed capital as a fraction.
pub fn roi(total_profit: f64, total_investment: f64) -> f64 {
    if total_investment > 0.0 {
        total_profit / total_investment
    } else {
        0.0
    }
}

pub fn avg_bars_held(trades: &[CompletedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let total: usize = trades.iter().map(|t| t.bars_held()).sum();
    total as f64 / trades.len() as f64
}

pub fn total_unrealized_pnl(trades: &[OpenTrade]) -> f64 {
    trades.iter().map(|t| t.unrealized_pnl).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use v20lab_core::SourceCategory;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn completed(category: SourceCategory, investment: f64, profit: f64, bars: usize) -> CompletedTrade {
        CompletedTrade {
            instrument: "X".into(),
            source_category: category,
            entry_bar: 1,
            entry_date: d(1),
            entry_price: 100.0,
            exit_bar: 1 + bars,
            exit_date: d(1 + bars as u32),
            exit_price: 100.0,
            share_count: 1,
            investment,
            sale_value: investment + profit,
            profit,
            profit_pct: profit / investment * 100.0,
            setup_start: d(1),
            setup_end: d(1),
        }
    }

    fn open(last_known: NaiveDate, investment: f64, pnl: f64) -> OpenTrade {
        OpenTrade {
            instrument: "Y".into(),
            source_category: SourceCategory::V40,
            entry_bar: 0,
            entry_date: d(1),
            entry_price: 100.0,
            target_exit_price: 130.0,
            share_count: 1,
            investment,
            last_known_date: last_known,
            last_price: 100.0,
            unrealized_pnl: pnl,
            unrealized_pnl_pct: 0.0,
            setup_start: d(1),
            setup_end: d(1),
        }
    }

    #[test]
    fn empty_inputs_are_all_zero() {
        let summary = SummaryMetrics::compute(&[], &[]);
        assert_eq!(summary, SummaryMetrics::default());
        assert_eq!(summary.open.as_of, None);
    }

    #[test]
    fn completed_metrics() {
        let trades = vec![
            completed(SourceCategory::V40, 100_000.0, 30_000.0, 2),
            completed(SourceCategory::V40, 103_000.0, -3_000.0, 4),
            completed(SourceCategory::V200, 100_000.0, 0.0, 6),
        ];
        let m = CompletedMetrics::compute(&trades);
        assert_eq!(m.trade_count, 3);
        // Zero profit is not a win.
        assert_eq!(m.winning_trades, 1);
        assert!((m.win_rate - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(m.total_profit, 27_000.0);
        assert_eq!(m.total_investment, 303_000.0);
        assert!((m.roi - 27_000.0 / 303_000.0).abs() < 1e-12);
        assert_eq!(m.avg_bars_held, 4.0);
    }

    #[test]
    fn roi_zero_without_investment() {
        assert_eq!(roi(500.0, 0.0), 0.0);
    }

    #[test]
    fn open_metrics_as_of_latest_date() {
        let trades = vec![open(d(10), 50_000.0, 1_000.0), open(d(12), 50_000.0, -250.0)];
        let m = OpenMetrics::compute(&trades);
        assert_eq!(m.open_count, 2);
        assert_eq!(m.total_investment, 100_000.0);
        assert_eq!(m.total_unrealized_pnl, 750.0);
        assert_eq!(m.as_of, Some(d(12)));
    }

    #[test]
    fn grouped_by_category_label() {
        let trades = vec![
            completed(SourceCategory::V40, 100.0, 10.0, 1),
            completed(SourceCategory::Custom("Midcap".into()), 100.0, 5.0, 1),
            completed(SourceCategory::V40, 100.0, 20.0, 1),
        ];
        let summary = SummaryMetrics::compute(&trades, &[]);
        assert_eq!(summary.by_category.len(), 2);
        assert_eq!(summary.by_category["V40"].trade_count, 2);
        assert_eq!(summary.by_category["V40"].total_profit, 30.0);
        assert_eq!(summary.by_category["Midcap"].total_profit, 5.0);
    }
}
