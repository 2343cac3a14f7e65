//! V20Lab Core — price series, setup scanner, trade simulator.
//!
//! This crate contains the deterministic heart of the backtester:
//! - Domain types (bars, price series, setups, trades, source categories)
//! - Trailing SMA used by the V200 entry filter
//! - Setup scanner over runs of bullish bars
//! - Per-instrument trade simulator with trade caps and reinvestment
//!
//! No I/O happens here: series arrive fully materialized and results are
//! returned as plain values.

pub mod config;
pub mod domain;
pub mod indicators;
pub mod scanner;
pub mod simulator;

pub use config::{ConfigError, StrategyConfig};
pub use domain::{
    Bar, CompletedTrade, OpenTrade, PriceSeries, SeriesError, Setup, SourceCategory,
};
pub use scanner::{find_setups, SetupScan};
pub use simulator::{
    capital_for_trade, evaluate_setup, simulate, Fill, SetupOutcome, SimulationResult,
    TradeSimulator,
};
