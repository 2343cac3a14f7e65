//! V20Lab Runner — run configuration, data loading, orchestration, export.
//!
//! This crate builds on `v20lab-core` to provide:
//! - TOML run configuration with content-addressed run ids
//! - Ticker-list and price CSV loading with a synthetic fallback
//! - Multi-list backtest runner with per-instrument failure isolation
//! - Aggregate trade metrics
//! - CSV / JSON / console output

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::{BacktestConfig, ConfigError, DataConfig, OutputConfig, RunId, StockListConfig};
pub use data_loader::{
    generate_synthetic_bars, parse_timestamp, read_price_bars, read_tickers, CsvSeriesProvider,
    DataSource, LoadError, LoadOptions, LoadedSeries, SeriesProvider,
};
pub use export::{
    export_completed_csv, export_json, export_open_csv, format_summary, import_json,
    load_report, write_results,
};
pub use metrics::{CompletedMetrics, OpenMetrics, SummaryMetrics};
pub use runner::{
    run_backtest, run_lists, BacktestReport, InstrumentFailure, InstrumentSummary, ResolvedList,
    RunError, RunOptions, UniverseResult, SCHEMA_VERSION,
};
