//! Reporting and export — trade CSVs, JSON report, console summary.
//!
//! - **CSV**: one file of completed trades, one of open trades, with money
//!   fields rounded to two decimals. An empty collection writes no file.
//! - **JSON**: full round-trip serialization of the `BacktestReport`.
//! - **Text**: the end-of-run summary printed by the CLI.
//!
//! Persisted reports carry a `schema_version`. Newer versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use v20lab_core::{CompletedTrade, OpenTrade};

use crate::config::OutputConfig;
use crate::runner::{BacktestReport, SCHEMA_VERSION};

/// File name of the JSON report inside the output directory.
pub const REPORT_FILE: &str = "backtest_report_v20.json";

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a `BacktestReport`, rejecting newer schema versions.
pub fn import_json(json: &str) -> Result<BacktestReport> {
    let report: BacktestReport =
        serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

pub fn load_report(path: &Path) -> Result<BacktestReport> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn money(value: f64) -> String {
    format!("{value:.2}")
}

/// Completed trades, one row per round trip.
pub fn export_completed_csv(trades: &[CompletedTrade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "Stock",
        "Source File",
        "Entry Date",
        "Exit Date",
        "Entry Price",
        "Exit Price",
        "Investment",
        "Sale Value",
        "Profit",
        "Profit %",
        "Setup Start",
        "Setup End",
        "Shares",
    ])?;

    for t in trades {
        wtr.write_record([
            t.instrument.as_str(),
            t.source_category.label(),
            &t.entry_date.to_string(),
            &t.exit_date.to_string(),
            &t.entry_price.to_string(),
            &t.exit_price.to_string(),
            &money(t.investment),
            &money(t.sale_value),
            &money(t.profit),
            &money(t.profit_pct),
            &t.setup_start.to_string(),
            &t.setup_end.to_string(),
            &t.share_count.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Open positions marked to their last known close.
pub fn export_open_csv(trades: &[OpenTrade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "Stock",
        "Source File",
        "Status",
        "Entry Date",
        "Entry Price",
        "Target Exit Price",
        "Investment",
        "Last Known Date",
        "Last Price",
        "Unrealized P/L",
        "Unrealized P/L %",
        "Shares",
    ])?;

    for t in trades {
        wtr.write_record([
            t.instrument.as_str(),
            t.source_category.label(),
            "Open",
            &t.entry_date.to_string(),
            &t.entry_price.to_string(),
            &t.target_exit_price.to_string(),
            &money(t.investment),
            &t.last_known_date.to_string(),
            &money(t.last_price),
            &money(t.unrealized_pnl),
            &money(t.unrealized_pnl_pct),
            &t.share_count.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Output bundle ──────────────────────────────────────────────────

/// Write the run's output files into `dir`.
///
/// Returns the paths written, in order: completed CSV, open CSV, JSON report.
pub fn write_results(report: &BacktestReport, dir: &Path, output: &OutputConfig) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir: {}", dir.display()))?;
    let mut written = Vec::new();

    if !report.completed.is_empty() {
        let path = dir.join(&output.completed_trades_file);
        std::fs::write(&path, export_completed_csv(&report.completed)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }

    if !report.open.is_empty() {
        let path = dir.join(&output.open_trades_file);
        std::fs::write(&path, export_open_csv(&report.open)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }

    if output.write_json_report {
        let path = dir.join(REPORT_FILE);
        std::fs::write(&path, export_json(report)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }

    Ok(written)
}

// ─── Console summary ────────────────────────────────────────────────

/// End-of-run summary text.
pub fn format_summary(report: &BacktestReport) -> String {
    let mut out = String::with_capacity(1024);
    let rule = "=".repeat(60);

    out.push_str(&rule);
    out.push_str("\nV20 BACKTEST SUMMARY\n");
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!(
        "Instruments: {} simulated, {} skipped\n",
        report.instruments.len(),
        report.failures.len()
    ));
    if report.has_synthetic {
        out.push_str("Data: SYNTHETIC (not real market data)\n");
    }

    let c = &report.metrics.completed;
    out.push_str("\nCompleted trades\n");
    if c.trade_count == 0 {
        out.push_str("  none\n");
    } else {
        out.push_str(&format!("  Trades:            {}\n", c.trade_count));
        out.push_str(&format!("  Winners:           {}\n", c.winning_trades));
        out.push_str(&format!("  Win rate:          {:.2}%\n", c.win_rate * 100.0));
        out.push_str(&format!("  Total profit:      {:.2}\n", c.total_profit));
        out.push_str(&format!("  Total investment:  {:.2}\n", c.total_investment));
        out.push_str(&format!("  ROI:               {:.2}%\n", c.roi * 100.0));
        out.push_str(&format!("  Avg bars held:     {:.1}\n", c.avg_bars_held));
        if report.metrics.by_category.len() > 1 {
            for (label, m) in &report.metrics.by_category {
                out.push_str(&format!(
                    "    {label:<10} {} trades, profit {:.2}, ROI {:.2}%\n",
                    m.trade_count,
                    m.total_profit,
                    m.roi * 100.0
                ));
            }
        }
    }

    let o = &report.metrics.open;
    out.push_str("\nOpen trades\n");
    match o.as_of {
        Some(as_of) if o.open_count > 0 => {
            out.push_str(&format!("  Open positions:    {}\n", o.open_count));
            out.push_str(&format!("  Capital deployed:  {:.2}\n", o.total_investment));
            out.push_str(&format!(
                "  Unrealized P/L:    {:.2} (as of {as_of})\n",
                o.total_unrealized_pnl
            ));
        }
        _ => out.push_str("  none\n"),
    }

    if !report.failures.is_empty() {
        out.push_str("\nSkipped\n");
        for f in &report.failures {
            match &f.ticker {
                Some(ticker) => out.push_str(&format!("  {} [{}]: {}\n", ticker, f.list, f.reason)),
                None => out.push_str(&format!("  list {}: {}\n", f.list, f.reason)),
            }
        }
    }

    out.push_str(&format!("\nRun ID: {}\n", report.run_id));
    out.push_str(&rule);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BacktestConfig;
    use crate::metrics::SummaryMetrics;
    use crate::runner::InstrumentFailure;
    use chrono::NaiveDate;
    use v20lab_core::SourceCategory;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn completed() -> CompletedTrade {
        CompletedTrade {
            instrument: "RELIANCE".into(),
            source_category: SourceCategory::V40,
            entry_bar: 3,
            entry_date: d(3),
            entry_price: 97.3,
            exit_bar: 8,
            exit_date: d(8),
            exit_price: 120.15,
            share_count: 1027,
            investment: 1027.0 * 97.3,
            sale_value: 1027.0 * 120.15,
            profit: 1027.0 * (120.15 - 97.3),
            profit_pct: (120.15 - 97.3) / 97.3 * 100.0,
            setup_start: d(1),
            setup_end: d(2),
        }
    }

    fn open() -> OpenTrade {
        OpenTrade {
            instrument: "TCS".into(),
            source_category: SourceCategory::V200,
            entry_bar: 2,
            entry_date: d(2),
            entry_price: 100.0,
            target_exit_price: 130.0,
            share_count: 1000,
            investment: 100_000.0,
            last_known_date: d(9),
            last_price: 104.457,
            unrealized_pnl: 4457.0,
            unrealized_pnl_pct: 4.457,
            setup_start: d(1),
            setup_end: d(1),
        }
    }

    fn report(completed: Vec<CompletedTrade>, open: Vec<OpenTrade>) -> BacktestReport {
        let config = BacktestConfig::default();
        BacktestReport {
            schema_version: SCHEMA_VERSION,
            run_id: config.run_id(),
            metrics: SummaryMetrics::compute(&completed, &open),
            config,
            completed,
            open,
            instruments: Vec::new(),
            failures: Vec::new(),
            dataset_hash: String::new(),
            has_synthetic: false,
        }
    }

    #[test]
    fn completed_csv_headers_and_rounding() {
        let csv = export_completed_csv(&[completed()]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Stock,Source File,Entry Date,Exit Date,Entry Price,Exit Price,Investment,\
             Sale Value,Profit,Profit %,Setup Start,Setup End,Shares"
        );
        let row: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(row[0], "RELIANCE");
        assert_eq!(row[1], "V40");
        assert_eq!(row[2], "2024-05-03");
        assert_eq!(row[4], "97.3");
        assert_eq!(row[6], "99927.10");
        assert_eq!(row[9], "23.48");
        assert_eq!(row[12], "1027");
    }

    #[test]
    fn open_csv_has_status_column() {
        let csv = export_open_csv(&[open()]).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("Stock,Source File,Status,"));
        let row: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(row[1], "V200");
        assert_eq!(row[2], "Open");
        assert_eq!(row[5], "130");
        assert_eq!(row[8], "104.46");
        assert_eq!(row[10], "4.46");
    }

    #[test]
    fn json_roundtrip_and_version_gate() {
        let r = report(vec![completed()], vec![open()]);
        let json = export_json(&r).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.run_id, r.run_id);
        assert_eq!(back.completed.len(), 1);
        assert_eq!(back.completed[0].instrument, "RELIANCE");
        assert_eq!(back.completed[0].exit_date, d(8));
        assert_eq!(back.open[0].source_category, SourceCategory::V200);
        assert_eq!(back.metrics.open.as_of, Some(d(9)));

        let newer = json.replacen(
            &format!("\"schema_version\": {SCHEMA_VERSION}"),
            &format!("\"schema_version\": {}", SCHEMA_VERSION + 1),
            1,
        );
        assert!(import_json(&newer).is_err());
    }

    #[test]
    fn empty_collections_write_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let r = report(vec![completed()], Vec::new());
        let written = write_results(&r, dir.path(), &OutputConfig::default()).unwrap();
        assert_eq!(written, vec![dir.path().join("completed_trades_summary_v20.csv")]);
        assert!(!dir.path().join("open_trades_summary_v20.csv").exists());
    }

    #[test]
    fn json_report_written_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputConfig {
            write_json_report: true,
            ..OutputConfig::default()
        };
        let r = report(Vec::new(), vec![open()]);
        let written = write_results(&r, dir.path(), &output).unwrap();
        assert_eq!(written.len(), 2);
        let loaded = load_report(&dir.path().join(REPORT_FILE)).unwrap();
        assert_eq!(loaded.open.len(), 1);
        assert_eq!(loaded.open[0].share_count, 1000);
    }

    #[test]
    fn summary_mentions_metrics_and_failures() {
        let mut r = report(vec![completed()], vec![open()]);
        r.failures.push(InstrumentFailure {
            list: "v40_token.csv".into(),
            ticker: Some("GONE".into()),
            reason: "no data".into(),
        });
        let text = format_summary(&r);
        assert!(text.contains("V20 BACKTEST SUMMARY"));
        assert!(text.contains("Win rate:          100.00%"));
        assert!(text.contains("as of 2024-05-09"));
        assert!(text.contains("GONE [v40_token.csv]: no data"));
    }

    #[test]
    fn summary_without_trades() {
        let text = format_summary(&report(Vec::new(), Vec::new()));
        assert_eq!(text.matches("  none").count(), 2);
    }
}
