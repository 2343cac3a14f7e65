//! Trade simulator — turns setups into fills for one instrument.
//!
//! Per-instrument state is a scan cursor and a trade counter. Each iteration
//! rescans setups from the cursor and takes the first one that fills:
//!
//! - entry: first bar at or after `next_scan_position` with `low <= lowest_low`
//! - V200 only: the entry bar's moving average must be defined and above the
//!   buy price
//! - size: `floor(capital / buy price)` shares, at least one
//! - exit: first bar strictly after entry with `high >= highest_high`
//!
//! A completed trade moves the cursor past its exit bar. A trade whose exit
//! never fills stays open, marked to the final bar, and ends the instrument:
//! its capital is committed, so no later setup can be taken.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::StrategyConfig;
use crate::domain::trade::pct_of;
use crate::domain::{CompletedTrade, OpenTrade, PriceSeries, Setup, SourceCategory};
use crate::scanner::SetupScan;

/// A filled entry, with its exit bar if the target was reached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub entry_bar: usize,
    pub entry_price: f64,
    pub share_count: u64,
    pub investment: f64,
    pub exit_bar: Option<usize>,
}

/// What happened when one setup was tried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetupOutcome {
    /// Price never came back down to the setup's lowest low.
    NoTrigger,
    /// V200 moving-average filter rejected the entry.
    FilteredOut,
    /// Capital buys less than one share at the trigger price.
    Unaffordable,
    Filled(Fill),
}

/// Completed and open trades produced for one instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub completed: Vec<CompletedTrade>,
    pub open: Vec<OpenTrade>,
}

impl SimulationResult {
    pub fn trade_count(&self) -> usize {
        self.completed.len() + self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trade_count() == 0
    }
}

/// Capital for the trade about to be taken.
///
/// The second trade of a non-V200 instrument invests base capital grown by
/// the reinvestment factor; every other trade uses base capital.
pub fn capital_for_trade(
    config: &StrategyConfig,
    category: &SourceCategory,
    trades_taken: usize,
) -> f64 {
    if trades_taken == 1 && !category.is_v200() {
        config.capital_per_trade * config.reinvestment_growth_factor
    } else {
        config.capital_per_trade
    }
}

/// Try one setup against the bars that follow it.
pub fn evaluate_setup(
    series: &PriceSeries,
    setup: &Setup,
    category: &SourceCategory,
    capital: f64,
) -> SetupOutcome {
    let bars = series.bars();
    let buy_price = setup.lowest_low;

    let Some(entry_bar) =
        (setup.next_scan_position..bars.len()).find(|&i| bars[i].low <= buy_price)
    else {
        return SetupOutcome::NoTrigger;
    };

    if category.is_v200() {
        match bars[entry_bar].moving_average {
            Some(ma) if buy_price < ma => {}
            _ => return SetupOutcome::FilteredOut,
        }
    }

    let shares = (capital / buy_price).floor();
    if shares.is_nan() || shares < 1.0 {
        return SetupOutcome::Unaffordable;
    }
    let share_count = shares as u64;

    let exit_bar =
        (entry_bar + 1..bars.len()).find(|&i| bars[i].high >= setup.highest_high);

    SetupOutcome::Filled(Fill {
        entry_bar,
        entry_price: buy_price,
        share_count,
        investment: share_count as f64 * buy_price,
        exit_bar,
    })
}

/// Stateful walk over one instrument's setups.
pub struct TradeSimulator<'a> {
    series: &'a PriceSeries,
    instrument: &'a str,
    category: &'a SourceCategory,
    config: &'a StrategyConfig,
}

impl<'a> TradeSimulator<'a> {
    pub fn new(
        series: &'a PriceSeries,
        instrument: &'a str,
        category: &'a SourceCategory,
        config: &'a StrategyConfig,
    ) -> Self {
        Self {
            series,
            instrument,
            category,
            config,
        }
    }

    pub fn run(&self) -> SimulationResult {
        let mut result = SimulationResult::default();

        // Open positions are marked to the instrument's final bar, whatever
        // iteration they were entered in.
        let Some(last) = self.series.last() else {
            debug!(instrument = self.instrument, "empty series, no trades");
            return result;
        };
        let mark = (last.timestamp, last.close);

        let cap = self.category.trade_cap();
        let end = self.series.len();
        let mut cursor = 0usize;
        let mut trades_taken = 0usize;

        while trades_taken < cap && cursor < end {
            let capital = capital_for_trade(self.config, self.category, trades_taken);

            let Some((setup, fill)) = self.first_fill(cursor, capital) else {
                debug!(
                    instrument = self.instrument,
                    cursor, "no actionable setup remains"
                );
                break;
            };

            match fill.exit_bar {
                Some(exit_bar) => {
                    result
                        .completed
                        .push(self.completed_trade(&setup, &fill, exit_bar));
                    cursor = exit_bar + 1;
                }
                None => {
                    result.open.push(self.open_trade(&setup, &fill, mark));
                    cursor = end;
                }
            }
            trades_taken += 1;
        }

        result
    }

    /// Scan from `cursor` and return the first setup that fills.
    fn first_fill(&self, cursor: usize, capital: f64) -> Option<(Setup, Fill)> {
        SetupScan::new(self.series, self.config.threshold_pct, cursor).find_map(|setup| {
            match evaluate_setup(self.series, &setup, self.category, capital) {
                SetupOutcome::Filled(fill) => Some((setup, fill)),
                outcome => {
                    debug!(
                        instrument = self.instrument,
                        setup_start = %setup.start_date,
                        ?outcome,
                        "setup skipped"
                    );
                    None
                }
            }
        })
    }

    fn completed_trade(&self, setup: &Setup, fill: &Fill, exit_bar: usize) -> CompletedTrade {
        let bars = self.series.bars();
        let sale_value = fill.share_count as f64 * setup.highest_high;
        let profit = sale_value - fill.investment;
        CompletedTrade {
            instrument: self.instrument.to_string(),
            source_category: self.category.clone(),
            entry_bar: fill.entry_bar,
            entry_date: bars[fill.entry_bar].timestamp,
            entry_price: fill.entry_price,
            exit_bar,
            exit_date: bars[exit_bar].timestamp,
            exit_price: setup.highest_high,
            share_count: fill.share_count,
            investment: fill.investment,
            sale_value,
            profit,
            profit_pct: pct_of(profit, fill.investment),
            setup_start: setup.start_date,
            setup_end: setup.end_date,
        }
    }

    fn open_trade(&self, setup: &Setup, fill: &Fill, mark: (NaiveDate, f64)) -> OpenTrade {
        let (last_known_date, last_price) = mark;
        let unrealized_pnl = (last_price - fill.entry_price) * fill.share_count as f64;
        OpenTrade {
            instrument: self.instrument.to_string(),
            source_category: self.category.clone(),
            entry_bar: fill.entry_bar,
            entry_date: self.series.bars()[fill.entry_bar].timestamp,
            entry_price: fill.entry_price,
            target_exit_price: setup.highest_high,
            share_count: fill.share_count,
            investment: fill.investment,
            last_known_date,
            last_price,
            unrealized_pnl,
            unrealized_pnl_pct: pct_of(unrealized_pnl, fill.investment),
            setup_start: setup.start_date,
            setup_end: setup.end_date,
        }
    }
}

/// Simulate one instrument with base capital `config.capital_per_trade`.
pub fn simulate(
    series: &PriceSeries,
    instrument: &str,
    category: &SourceCategory,
    config: &StrategyConfig,
) -> SimulationResult {
    TradeSimulator::new(series, instrument, category, config).run()
}
