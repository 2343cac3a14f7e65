//! V20Lab CLI — run, scan, and config commands.
//!
//! Commands:
//! - `run` — backtest every configured stock list and write the trade summaries
//! - `scan` — list the setups (and optionally the trades) in one price file
//! - `init-config` — write the default TOML config to disk

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use v20lab_core::{find_setups, simulate, PriceSeries, SourceCategory, StrategyConfig};
use v20lab_runner::{
    format_summary, read_price_bars, run_backtest, write_results, BacktestConfig, LoadOptions,
    RunOptions,
};

#[derive(Parser)]
#[command(name = "v20lab", about = "V20Lab CLI — V20 swing-trading backtester")]
struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest all configured stock lists.
    Run {
        /// Path to a TOML config file. Defaults to the built-in setup.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override `data.base_dir`.
        #[arg(long)]
        base_dir: Option<PathBuf>,

        /// Override `data.folder_date`.
        #[arg(long)]
        folder_date: Option<String>,

        /// Override `output.dir`.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Ignore bars before this date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// Ignore bars after this date (YYYY-MM-DD).
        #[arg(long)]
        end: Option<String>,

        /// Generate synthetic bars for tickers without a price file.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Simulate instruments one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Also write the JSON report.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List setups found in a single price file.
    Scan {
        /// Price CSV with timestamp, open, high, low, close columns.
        #[arg(long)]
        file: PathBuf,

        /// Instrument name. Defaults to the file stem.
        #[arg(long)]
        symbol: Option<String>,

        /// Minimum (high - low) / low for a run to qualify.
        #[arg(long, default_value_t = v20lab_core::config::DEFAULT_THRESHOLD_PCT)]
        threshold: f64,

        /// Also simulate trades under this category (V40, V40Next, V200, ...).
        #[arg(long)]
        category: Option<SourceCategory>,

        /// Moving-average period for the V200 filter.
        #[arg(long, default_value_t = v20lab_core::config::DEFAULT_MOVING_AVERAGE_PERIOD)]
        ma_period: usize,
    },
    /// Write the default configuration as TOML.
    InitConfig {
        /// Destination file.
        #[arg(long, default_value = "v20lab.toml")]
        output: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            base_dir,
            folder_date,
            output_dir,
            start,
            end,
            synthetic,
            sequential,
            json,
        } => {
            let mut backtest_config = match config {
                Some(path) => BacktestConfig::from_file(&path)?,
                None => BacktestConfig::default(),
            };
            if let Some(dir) = base_dir {
                backtest_config.data.base_dir = dir;
            }
            if let Some(date) = folder_date {
                backtest_config.data.folder_date = date;
            }
            if let Some(dir) = output_dir {
                backtest_config.output.dir = Some(dir);
            }
            if json {
                backtest_config.output.write_json_report = true;
            }

            let opts = RunOptions {
                load: LoadOptions {
                    start: parse_date_arg(start.as_deref(), "--start")?,
                    end: parse_date_arg(end.as_deref(), "--end")?,
                    synthetic,
                },
                parallel: !sequential,
            };
            if let (Some(s), Some(e)) = (opts.load.start, opts.load.end) {
                if s > e {
                    bail!("--start {s} is after --end {e}");
                }
            }
            run_cmd(&backtest_config, &opts)
        }
        Commands::Scan {
            file,
            symbol,
            threshold,
            category,
            ma_period,
        } => scan_cmd(&file, symbol, threshold, category, ma_period),
        Commands::InitConfig { output, force } => init_config_cmd(&output, force),
    }
}

/// `RUST_LOG` wins; otherwise info (or debug with `--verbose`) for `v20lab*` targets.
fn setup_logging(verbose: bool) {
    let default = if verbose { "v20lab=debug" } else { "v20lab=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_date_arg(value: Option<&str>, flag: &str) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("{flag} expects YYYY-MM-DD, got '{s}'"))
        })
        .transpose()
}

fn run_cmd(config: &BacktestConfig, opts: &RunOptions) -> Result<()> {
    tracing::info!(
        base_dir = %config.data.base_dir.display(),
        folder_date = %config.data.folder_date,
        lists = config.stock_lists.len(),
        "starting V20 backtest"
    );
    let report = run_backtest(config, opts)?;

    print!("{}", format_summary(&report));

    let written = write_results(&report, &config.output_dir(), &config.output)?;
    if written.is_empty() {
        println!("No trades; nothing written.");
    }
    for path in &written {
        println!("Saved: {}", path.display());
    }
    Ok(())
}

fn scan_cmd(
    file: &Path,
    symbol: Option<String>,
    threshold: f64,
    category: Option<SourceCategory>,
    ma_period: usize,
) -> Result<()> {
    let config = StrategyConfig {
        threshold_pct: threshold,
        moving_average_period: ma_period,
        ..StrategyConfig::default()
    };
    config.validate()?;

    let symbol = match symbol {
        Some(s) => s,
        None => file
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .with_context(|| format!("cannot derive a symbol from {}", file.display()))?,
    };
    let bars = read_price_bars(file)?;
    let series = PriceSeries::new(symbol.as_str(), bars)?.with_moving_average(ma_period)?;

    let setups = find_setups(&series, threshold, 0);
    println!(
        "{symbol}: {} bars, {} setups above {:.1}%",
        series.len(),
        setups.len(),
        threshold * 100.0
    );
    for s in &setups {
        println!(
            "  {} .. {}  low {:>10.2}  high {:>10.2}  range {:>6.2}%  ({} bars)",
            s.start_date,
            s.end_date,
            s.lowest_low,
            s.highest_high,
            s.range_pct() * 100.0,
            s.bar_count()
        );
    }

    if let Some(category) = category {
        let result = simulate(&series, &symbol, &category, &config);
        println!("\nTrades as {category}:");
        if result.is_empty() {
            println!("  none");
        }
        for t in &result.completed {
            println!(
                "  {} -> {}  buy {:.2}  sell {:.2}  x{}  profit {:.2} ({:.2}%)",
                t.entry_date, t.exit_date, t.entry_price, t.exit_price, t.share_count, t.profit, t.profit_pct
            );
        }
        for t in &result.open {
            println!(
                "  {} -> open  buy {:.2}  target {:.2}  x{}  unrealized {:.2} as of {}",
                t.entry_date,
                t.entry_price,
                t.target_exit_price,
                t.share_count,
                t.unrealized_pnl,
                t.last_known_date
            );
        }
    }
    Ok(())
}

fn init_config_cmd(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", output.display());
    }
    let toml = BacktestConfig::default().to_toml()?;
    std::fs::write(output, toml).with_context(|| format!("failed to write {}", output.display()))?;
    println!("Wrote default config to {}", output.display());
    Ok(())
}
