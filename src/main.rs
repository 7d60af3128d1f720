//! Moving-average crossover backtest CLI
//!
//! Usage:
//!   macross --symbol AAPL --data-dir data
//!   macross --symbol AAPL --fast 20 --slow 50 --range 2y --json
//!   macross --symbol AAPL --candles --range 3mo --json

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use macross::prelude::*;
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "macross")]
#[command(about = "Backtest a moving-average crossover strategy on daily candles")]
struct Cli {
    /// Instrument symbol (e.g., AAPL); read from <DATA_DIR>/<SYMBOL>.json
    #[arg(short, long)]
    symbol: String,

    /// Fast moving-average length [default: 10]
    #[arg(short, long)]
    fast: Option<i64>,

    /// Slow moving-average length [default: 30]
    #[arg(short = 'S', long)]
    slow: Option<i64>,

    /// Starting capital [default: 100000]
    #[arg(short, long)]
    capital: Option<f64>,

    /// Fee per leg in basis points [default: 5]
    #[arg(long)]
    fee_bps: Option<f64>,

    /// Slippage per leg in basis points [default: 5]
    #[arg(long)]
    slippage_bps: Option<f64>,

    /// Directory holding the candle files
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Lookback from the latest candle (5d, 2wk, 6mo, 1y, ytd, max) [default: 1y, 6mo with --candles]
    #[arg(short, long)]
    range: Option<String>,

    /// Candle interval
    #[arg(short, long, default_value = DEFAULT_INTERVAL)]
    interval: String,

    /// Print the candles instead of running a backtest
    #[arg(long, conflicts_with = "chart")]
    candles: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Write a chart of the run (.svg or .png)
    #[arg(long)]
    chart: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                println!("{}", json!({ "error": format!("{e:#}") }));
            } else {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    if cli.candles {
        return market(cli);
    }

    let config = normalize_config(PartialConfig {
        symbol: Some(cli.symbol.clone()),
        fast_length: cli.fast,
        slow_length: cli.slow,
        initial_capital: cli.capital,
        fee_bps: cli.fee_bps,
        slippage_bps: cli.slippage_bps,
    })?;
    let range = RangeSpec::parse_or(cli.range.as_deref().unwrap_or_default(), DEFAULT_BACKTEST_RANGE)?;

    let provider = JsonDirectory::new(&cli.data_dir);
    let candles = provider
        .fetch(config.symbol(), range, &cli.interval)
        .with_context(|| format!("Unable to load candles from {}", provider.path(config.symbol()).display()))?;

    let result = Backtest::new(candles, config)?.run();

    if let Some(path) = &cli.chart {
        draw(&result, path)?;
    }

    if cli.json {
        println!("{}", json!({ "data": result }));
    } else {
        print_report(&result);
    }
    Ok(())
}

fn market(cli: &Cli) -> Result<()> {
    let provider = JsonDirectory::new(&cli.data_dir);
    let candles = market_candles(
        &provider,
        &cli.symbol,
        cli.range.as_deref().unwrap_or_default(),
        &cli.interval,
    )
    .with_context(|| format!("Unable to load candles from {}", provider.path(&cli.symbol).display()))?;

    if cli.json {
        println!("{}", json!({ "data": candles }));
        return Ok(());
    }

    println!("{:<12} {:>12} {:>12} {:>12} {:>12} {:>14}", "Date", "Open", "High", "Low", "Close", "Volume");
    for candle in &candles {
        println!(
            "{:<12} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>14.2}",
            candle.date().to_string(),
            candle.open(),
            candle.high(),
            candle.low(),
            candle.close(),
            candle.volume(),
        );
    }
    Ok(())
}

#[cfg(feature = "draws")]
fn draw(result: &BacktestResult, path: &std::path::Path) -> Result<()> {
    Draw::with_result(result)
        .with_options(
            DrawOptions::default()
                .show_trades(true)
                .draw_output(DrawOutput::from_path(path)),
        )
        .plot()
        .with_context(|| format!("Unable to draw {}", path.display()))
}

#[cfg(not(feature = "draws"))]
fn draw(_result: &BacktestResult, _path: &std::path::Path) -> Result<()> {
    anyhow::bail!("Charts require the `draws` feature")
}

fn print_report(result: &BacktestResult) {
    println!("{result}");

    if result.trades().is_empty() {
        println!("\nNo trades.");
        return;
    }

    println!("\n{:<12} {:<12} {:>12} {:>12} {:>12} {:>9}  Exit", "Entry", "Exit", "Buy", "Sell", "Profit", "Return");
    for trade in result.trades() {
        println!(
            "{:<12} {:<12} {:>12.4} {:>12.4} {:>12.2} {:>8.2}%  {:?}",
            trade.entry_date().to_string(),
            trade.exit_date().to_string(),
            trade.entry_price(),
            trade.exit_price(),
            trade.profit(),
            trade.return_pct(),
            trade.exit_reason(),
        );
    }
}
