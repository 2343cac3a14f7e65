//! Ticker-list and price-file loading for the runner.
//!
//! Ticker lists are CSV files with a named ticker column. Price files are
//! one CSV per ticker with `timestamp, open, high, low, close` columns
//! (header match is case-insensitive, extra columns are ignored). Rows are
//! sorted by date before the moving average is attached.
//!
//! When a price file is missing and `--synthetic` is set, a deterministic
//! random walk stands in for the ticker. Results built on synthetic data are
//! tagged in the report.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use v20lab_core::{Bar, PriceSeries, SeriesError};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no data file for '{symbol}' at {path} (use --synthetic for synthetic data)")]
    NotFound { symbol: String, path: PathBuf },

    #[error("file not found: {path}")]
    MissingFile { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path} row {row}: cannot parse {field} from '{value}'")]
    Parse {
        path: PathBuf,
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// Where an instrument's bars came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    CsvFile,
    Synthetic,
}

/// Options controlling how bars are loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Drop bars before this date. The moving average still sees them.
    pub start: Option<NaiveDate>,
    /// Drop bars after this date.
    pub end: Option<NaiveDate>,
    /// If true, generate synthetic bars when a price file is missing.
    pub synthetic: bool,
}

/// One instrument's series with provenance.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub series: PriceSeries,
    pub source: DataSource,
}

/// Supplies a ready-to-simulate series per ticker.
///
/// Implementations must be shareable across rayon workers.
pub trait SeriesProvider: Sync {
    fn load(&self, ticker: &str) -> Result<LoadedSeries, LoadError>;
}

// ─── CSV provider ────────────────────────────────────────────────────

/// Reads `<dir>/<TICKER>.csv` and attaches the trailing moving average.
#[derive(Debug, Clone)]
pub struct CsvSeriesProvider {
    dir: PathBuf,
    moving_average_period: usize,
    opts: LoadOptions,
}

impl CsvSeriesProvider {
    pub fn new(dir: impl Into<PathBuf>, moving_average_period: usize, opts: LoadOptions) -> Self {
        Self {
            dir: dir.into(),
            moving_average_period,
            opts,
        }
    }

    pub fn price_path(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.csv"))
    }
}

impl SeriesProvider for CsvSeriesProvider {
    fn load(&self, ticker: &str) -> Result<LoadedSeries, LoadError> {
        let path = self.price_path(ticker);
        let (bars, source) = if path.is_file() {
            (read_price_bars(&path)?, DataSource::CsvFile)
        } else if self.opts.synthetic {
            warn!(ticker, "generating synthetic data; results will be tagged as synthetic");
            let (default_start, default_end) = synthetic_default_range();
            let start = self.opts.start.unwrap_or(default_start);
            let end = self.opts.end.unwrap_or(default_end);
            (
                generate_synthetic_bars(ticker, start, end),
                DataSource::Synthetic,
            )
        } else {
            return Err(LoadError::NotFound {
                symbol: ticker.to_string(),
                path,
            });
        };

        let series =
            PriceSeries::new(ticker, bars)?.with_moving_average(self.moving_average_period)?;
        let series = restrict_to_window(series, self.opts.start, self.opts.end)?;
        debug!(ticker, bars = series.len(), ?source, "loaded series");
        Ok(LoadedSeries { series, source })
    }
}

fn restrict_to_window(
    series: PriceSeries,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<PriceSeries, SeriesError> {
    if start.is_none() && end.is_none() {
        return Ok(series);
    }
    let symbol = series.symbol().to_string();
    let bars = series
        .into_bars()
        .into_iter()
        .filter(|b| start.map_or(true, |s| b.timestamp >= s))
        .filter(|b| end.map_or(true, |e| b.timestamp <= e))
        .collect();
    PriceSeries::new(symbol, bars)
}

// ─── CSV parsing ─────────────────────────────────────────────────────

fn open_csv(path: &Path) -> Result<csv::Reader<std::fs::File>, LoadError> {
    if !path.is_file() {
        return Err(LoadError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

fn column_index(
    headers: &csv::StringRecord,
    path: &Path,
    column: &str,
) -> Result<usize, LoadError> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(column))
        .ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        })
}

/// Read a ticker list: non-empty values of `column`, first occurrence kept.
pub fn read_tickers(path: &Path, column: &str) -> Result<Vec<String>, LoadError> {
    let mut reader = open_csv(path)?;
    let headers = reader
        .headers()
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    let idx = column_index(&headers, path, column)?;

    let mut seen = HashSet::new();
    let mut tickers = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let Some(ticker) = record.get(idx).filter(|t| !t.is_empty()) else {
            continue;
        };
        if seen.insert(ticker.to_string()) {
            tickers.push(ticker.to_string());
        }
    }
    Ok(tickers)
}

/// Read one price file into date-sorted bars.
pub fn read_price_bars(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let mut reader = open_csv(path)?;
    let headers = reader
        .headers()
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    let cols = [
        column_index(&headers, path, "timestamp")?,
        column_index(&headers, path, "open")?,
        column_index(&headers, path, "high")?,
        column_index(&headers, path, "low")?,
        column_index(&headers, path, "close")?,
    ];

    let mut bars = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        // Header is line 1.
        let row = i + 2;
        let field = |idx: usize| record.get(idx).unwrap_or("");
        let parse_err = |name: &'static str, value: &str| LoadError::Parse {
            path: path.to_path_buf(),
            row,
            field: name,
            value: value.to_string(),
        };

        let raw_ts = field(cols[0]);
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| parse_err("timestamp", raw_ts))?;
        let mut prices = [0.0_f64; 4];
        for (slot, (name, &idx)) in prices
            .iter_mut()
            .zip(["open", "high", "low", "close"].into_iter().zip(&cols[1..]))
        {
            let raw = field(idx);
            *slot = raw.parse().map_err(|_| parse_err(name, raw))?;
        }
        let [open, high, low, close] = prices;
        bars.push(Bar::new(timestamp, open, high, low, close));
    }

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

/// Parse a bar timestamp into its calendar date.
///
/// Offset-bearing stamps keep their own local date, so
/// `2024-01-02 00:00:00+05:30` is 2024-01-02.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.date_naive());
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

// ─── Fingerprinting ──────────────────────────────────────────────────

/// BLAKE3 digest over one series' dates and prices.
pub fn series_digest(series: &PriceSeries) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(series.symbol().as_bytes());
    for bar in series.bars() {
        hasher.update(bar.timestamp.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
    }
    hasher.finalize()
}

// ─── Synthetic data ──────────────────────────────────────────────────

/// Default span for synthetic bars when no window is given.
fn synthetic_default_range() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or(NaiveDate::MIN),
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or(NaiveDate::MAX),
    )
}

/// Deterministic random-walk bars for a symbol, weekdays only.
pub fn generate_synthetic_bars(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        bars.push(Bar::new(current, open, high, low, close));

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}
