//! Serializable backtest configuration.
//!
//! A run is described by a TOML file with four sections: where the data
//! lives, which stock lists to trade (and under which category), the
//! strategy parameters, and where results go. Every field has a default, so
//! an empty file describes the stock V20 setup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use v20lab_core::{SourceCategory, StrategyConfig};

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid strategy parameters: {0}")]
    Strategy(#[from] v20lab_core::ConfigError),

    #[error("no stock lists configured")]
    NoStockLists,

    #[error("ticker column name must not be empty")]
    EmptyTickerColumn,

    #[error("stock list entry {index} has an empty file name")]
    EmptyStockListFile { index: usize },
}

/// Complete configuration of one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub data: DataConfig,
    pub stock_lists: Vec<StockListConfig>,
    pub strategy: StrategyConfig,
    pub output: OutputConfig,
}

/// Location of ticker lists and per-ticker price files.
///
/// Ticker lists live in `base_dir`; price files in
/// `base_dir/folder_date/<TICKER>.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub base_dir: PathBuf,
    pub folder_date: String,
    pub ticker_column: String,
}

/// One stock list and the category its tickers trade under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockListConfig {
    pub file: String,
    pub category: SourceCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Defaults to `data.base_dir` when unset.
    pub dir: Option<PathBuf>,
    pub completed_trades_file: String,
    pub open_trades_file: String,
    pub write_json_report: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("stock_data"),
            folder_date: "2025-06-17".into(),
            ticker_column: "ticker".into(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            completed_trades_file: "completed_trades_summary_v20.csv".into(),
            open_trades_file: "open_trades_summary_v20.csv".into(),
            write_json_report: false,
        }
    }
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            stock_lists: vec![
                StockListConfig {
                    file: "v40_token.csv".into(),
                    category: SourceCategory::V40,
                },
                StockListConfig {
                    file: "v40next_token.csv".into(),
                    category: SourceCategory::V40Next,
                },
                StockListConfig {
                    file: "v200_token.csv".into(),
                    category: SourceCategory::V200,
                },
            ],
            strategy: StrategyConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl BacktestConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject configurations that would make the whole run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy.validate()?;
        if self.stock_lists.is_empty() {
            return Err(ConfigError::NoStockLists);
        }
        if let Some(index) = self
            .stock_lists
            .iter()
            .position(|l| l.file.trim().is_empty())
        {
            return Err(ConfigError::EmptyStockListFile { index });
        }
        if self.data.ticker_column.trim().is_empty() {
            return Err(ConfigError::EmptyTickerColumn);
        }
        Ok(())
    }

    /// Deterministic hash of this configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> RunId {
        // Serializing plain structs with string keys cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn stock_list_path(&self, list: &StockListConfig) -> PathBuf {
        self.data.base_dir.join(&list.file)
    }

    pub fn price_dir(&self) -> PathBuf {
        self.data.base_dir.join(&self.data.folder_date)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output
            .dir
            .clone()
            .unwrap_or_else(|| self.data.base_dir.clone())
    }
}
