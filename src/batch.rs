//! Independent backtests in parallel.
//!
//! Each job carries its own candles and configuration; runs share nothing, so the
//! results are the same as running the jobs one after another.

use crate::config::StrategyConfig;
use crate::engine::{Candle, run_backtest};
use crate::errors::Result;
use crate::metrics::BacktestResult;

use rayon::prelude::*;
use tracing::info;

/// Runs every `(candles, config)` job on the rayon thread pool.
///
/// # Returns
/// One result per job, in the order of `jobs`. A failing job does not stop the others.
pub fn run_batch<D>(jobs: &[(D, StrategyConfig)]) -> Vec<Result<BacktestResult>>
where
    D: AsRef<[Candle]> + Sync,
{
    info!(jobs = jobs.len(), threads = rayon::current_num_threads(), "Running batch");
    jobs.par_iter()
        .map(|(candles, config)| run_backtest(candles.as_ref(), config))
        .collect()
}
