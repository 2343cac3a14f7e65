//! Backtest runner — stock lists in, aggregated trades out.
//!
//! Two entry points:
//! - `run_backtest()`: reads ticker lists and price files from disk. Used by the CLI.
//! - `run_lists()`: takes resolved lists and any `SeriesProvider`. No ticker-list I/O.
//!
//! Instruments are independent. A list's tickers may be simulated on rayon
//! workers; results are collected in ticker order, so output is identical
//! with or without parallelism. Load failures are recorded per instrument and
//! never abort the run.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use v20lab_core::{
    simulate, CompletedTrade, OpenTrade, SimulationResult, SourceCategory, StrategyConfig,
};

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{
    read_tickers, series_digest, CsvSeriesProvider, DataSource, LoadError, LoadOptions,
    SeriesProvider,
};
use crate::metrics::SummaryMetrics;

/// Errors that stop a run before any instrument is simulated.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub load: LoadOptions,
    /// Simulate a list's tickers on the rayon pool.
    pub parallel: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            load: LoadOptions::default(),
            parallel: true,
        }
    }
}

/// A stock list with its tickers already read.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedList {
    pub name: String,
    pub category: SourceCategory,
    pub tickers: Vec<String>,
}

/// A list or instrument that was skipped, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentFailure {
    pub list: String,
    /// `None` when the whole list could not be read.
    pub ticker: Option<String>,
    pub reason: String,
}

/// Per-instrument bookkeeping for the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSummary {
    pub ticker: String,
    pub list: String,
    pub category: SourceCategory,
    pub bar_count: usize,
    pub source: DataSource,
    pub completed_trades: usize,
    pub open_trades: usize,
}

/// Output of `run_lists`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniverseResult {
    pub completed: Vec<CompletedTrade>,
    pub open: Vec<OpenTrade>,
    pub instruments: Vec<InstrumentSummary>,
    pub failures: Vec<InstrumentFailure>,
    /// BLAKE3 over every loaded series, in processing order.
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

/// Complete result of one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub config: BacktestConfig,
    pub metrics: SummaryMetrics,
    pub completed: Vec<CompletedTrade>,
    pub open: Vec<OpenTrade>,
    pub instruments: Vec<InstrumentSummary>,
    pub failures: Vec<InstrumentFailure>,
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run every configured stock list against the price files on disk.
///
/// Only an invalid config is fatal. Unreadable ticker lists and price files
/// end up in `failures`.
pub fn run_backtest(config: &BacktestConfig, opts: &RunOptions) -> Result<BacktestReport, RunError> {
    config.validate()?;

    let mut list_failures = Vec::new();
    let mut lists = Vec::with_capacity(config.stock_lists.len());
    for list in &config.stock_lists {
        let path = config.stock_list_path(list);
        match read_tickers(&path, &config.data.ticker_column) {
            Ok(tickers) => {
                info!(list = %list.file, category = %list.category, tickers = tickers.len(), "loaded stock list");
                lists.push(ResolvedList {
                    name: list.file.clone(),
                    category: list.category.clone(),
                    tickers,
                });
            }
            Err(e) => {
                warn!(list = %list.file, error = %e, "skipping stock list");
                list_failures.push(InstrumentFailure {
                    list: list.file.clone(),
                    ticker: None,
                    reason: e.to_string(),
                });
            }
        }
    }

    let provider = CsvSeriesProvider::new(
        config.price_dir(),
        config.strategy.moving_average_period,
        opts.load.clone(),
    );
    let mut universe = run_lists(&lists, &provider, &config.strategy, opts.parallel);
    list_failures.append(&mut universe.failures);

    let metrics = SummaryMetrics::compute(&universe.completed, &universe.open);
    info!(
        completed = universe.completed.len(),
        open = universe.open.len(),
        failures = list_failures.len(),
        "backtest finished"
    );

    Ok(BacktestReport {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        config: config.clone(),
        metrics,
        completed: universe.completed,
        open: universe.open,
        instruments: universe.instruments,
        failures: list_failures,
        dataset_hash: universe.dataset_hash,
        has_synthetic: universe.has_synthetic,
    })
}

/// Simulate every ticker of every list. Performs no ticker-list I/O.
///
/// Results follow list order, then ticker order within each list.
pub fn run_lists(
    lists: &[ResolvedList],
    provider: &dyn SeriesProvider,
    strategy: &StrategyConfig,
    parallel: bool,
) -> UniverseResult {
    let mut out = UniverseResult::default();
    let mut hasher = blake3::Hasher::new();

    for list in lists {
        let runs: Vec<Result<InstrumentRun, LoadError>> = if parallel {
            list.tickers
                .par_iter()
                .map(|t| run_instrument(t, list, provider, strategy))
                .collect()
        } else {
            list.tickers
                .iter()
                .map(|t| run_instrument(t, list, provider, strategy))
                .collect()
        };

        for (ticker, run) in list.tickers.iter().zip(runs) {
            match run {
                Ok(run) => {
                    hasher.update(run.digest.as_bytes());
                    out.has_synthetic |= run.summary.source == DataSource::Synthetic;
                    out.completed.extend(run.result.completed);
                    out.open.extend(run.result.open);
                    out.instruments.push(run.summary);
                }
                Err(e) => {
                    warn!(list = %list.name, ticker = %ticker, error = %e, "skipping instrument");
                    out.failures.push(InstrumentFailure {
                        list: list.name.clone(),
                        ticker: Some(ticker.clone()),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    out.dataset_hash = hasher.finalize().to_hex().to_string();
    out
}

struct InstrumentRun {
    summary: InstrumentSummary,
    result: SimulationResult,
    digest: blake3::Hash,
}

fn run_instrument(
    ticker: &str,
    list: &ResolvedList,
    provider: &dyn SeriesProvider,
    strategy: &StrategyConfig,
) -> Result<InstrumentRun, LoadError> {
    let loaded = provider.load(ticker)?;
    let result = simulate(&loaded.series, ticker, &list.category, strategy);
    info!(
        ticker,
        list = %list.name,
        completed = result.completed.len(),
        open = result.open.len(),
        "simulated instrument"
    );
    Ok(InstrumentRun {
        summary: InstrumentSummary {
            ticker: ticker.to_string(),
            list: list.name.clone(),
            category: list.category.clone(),
            bar_count: loaded.series.len(),
            source: loaded.source,
            completed_trades: result.completed.len(),
            open_trades: result.open.len(),
        },
        digest: series_digest(&loaded.series),
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::LoadedSeries;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use v20lab_core::{Bar, PriceSeries};

    /// In-memory provider keyed by ticker.
    struct MapProvider(HashMap<String, PriceSeries>);

    impl SeriesProvider for MapProvider {
        fn load(&self, ticker: &str) -> Result<LoadedSeries, LoadError> {
            self.0
                .get(ticker)
                .cloned()
                .map(|series| LoadedSeries {
                    series,
                    source: DataSource::CsvFile,
                })
                .ok_or_else(|| LoadError::NotFound {
                    symbol: ticker.to_string(),
                    path: format!("{ticker}.csv").into(),
                })
        }
    }

    fn date(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64)
    }

    /// Setup (100..130), trigger at 100, exit at 130.
    fn winner(ticker: &str) -> PriceSeries {
        let bars = vec![
            Bar::new(date(0), 100.5, 130.0, 100.0, 129.5),
            Bar::new(date(1), 119.5, 120.0, 99.0, 99.5),
            Bar::new(date(2), 130.5, 131.0, 110.0, 110.5),
        ];
        PriceSeries::new(ticker, bars).unwrap()
    }

    /// Setup, trigger, never reaches target.
    fn stuck(ticker: &str) -> PriceSeries {
        let bars = vec![
            Bar::new(date(0), 100.5, 130.0, 100.0, 129.5),
            Bar::new(date(1), 109.5, 110.0, 95.0, 95.5),
            Bar::new(date(2), 111.5, 112.0, 96.0, 96.5),
        ];
        PriceSeries::new(ticker, bars).unwrap()
    }

    fn provider() -> MapProvider {
        let mut map = HashMap::new();
        for t in ["AAA", "CCC"] {
            map.insert(t.to_string(), winner(t));
        }
        map.insert("BBB".to_string(), stuck("BBB"));
        MapProvider(map)
    }

    fn lists() -> Vec<ResolvedList> {
        vec![
            ResolvedList {
                name: "v40_token.csv".into(),
                category: SourceCategory::V40,
                tickers: vec!["AAA".into(), "MISSING".into(), "BBB".into()],
            },
            ResolvedList {
                name: "v40next_token.csv".into(),
                category: SourceCategory::V40Next,
                tickers: vec!["CCC".into()],
            },
        ]
    }

    #[test]
    fn aggregates_in_list_then_ticker_order() {
        let out = run_lists(&lists(), &provider(), &StrategyConfig::default(), false);

        let completed: Vec<_> = out.completed.iter().map(|t| t.instrument.as_str()).collect();
        assert_eq!(completed, vec!["AAA", "CCC"]);
        assert_eq!(out.completed[1].source_category, SourceCategory::V40Next);
        assert_eq!(out.open.len(), 1);
        assert_eq!(out.open[0].instrument, "BBB");
        assert_eq!(out.instruments.len(), 3);
        assert!(!out.has_synthetic);
    }

    #[test]
    fn missing_instrument_is_isolated() {
        let out = run_lists(&lists(), &provider(), &StrategyConfig::default(), false);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].ticker.as_deref(), Some("MISSING"));
        assert_eq!(out.failures[0].list, "v40_token.csv");
    }

    #[test]
    fn parallel_matches_sequential() {
        let p = provider();
        let config = StrategyConfig::default();
        let seq = run_lists(&lists(), &p, &config, false);
        let par = run_lists(&lists(), &p, &config, true);
        assert_eq!(seq, par);
    }

    #[test]
    fn dataset_hash_depends_on_data() {
        let config = StrategyConfig::default();
        let a = run_lists(&lists(), &provider(), &config, false);
        let mut other = provider();
        other.0.insert("AAA".to_string(), stuck("AAA"));
        let b = run_lists(&lists(), &other, &config, false);
        assert_ne!(a.dataset_hash, b.dataset_hash);
        assert_eq!(a.dataset_hash, run_lists(&lists(), &provider(), &config, false).dataset_hash);
    }

    #[test]
    fn empty_universe() {
        let out = run_lists(&[], &provider(), &StrategyConfig::default(), true);
        assert!(out.completed.is_empty());
        assert!(out.failures.is_empty());
    }

    #[test]
    fn invalid_config_is_fatal() {
        let mut config = BacktestConfig::default();
        config.strategy.capital_per_trade = 0.0;
        assert!(matches!(
            run_backtest(&config, &RunOptions::default()),
            Err(RunError::Config(_))
        ));
    }
}
