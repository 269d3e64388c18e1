//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::backtest_simulator::BacktestSimulator;
use crate::adapters::csv_feed::CsvBarFeed;
use crate::adapters::event_sinks::{CsvTradeLog, FanoutSink, TracingEventSink};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::polling_feed::PollingCsvFeed;
use crate::domain::config::{RunConfig, RunMode, StrategyConfig};
use crate::domain::config_validation::{build_run_config, build_strategy_config};
use crate::domain::error::TraderError;
use crate::domain::runner::{CancelToken, RunOutcome, RunReport, Runner};
use crate::ports::market_data_port::MarketDataPort;

#[derive(Parser, Debug)]
#[command(name = "cointrader", about = "Crypto strategy runner and backtester")]
pub struct Cli {
    /// trace, debug, info, warn or error
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay historical bars through the backtest simulator
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Bar CSV: timestamp,open,high,low,close,volume
        #[arg(short, long)]
        data: PathBuf,
        /// Write fills to this CSV file
        #[arg(long)]
        trades: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Live-mode loop over a growing bar CSV, filled by the simulator
    Paper {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long, default_value_t = 1000)]
        poll_ms: u64,
        /// Stop after this many consecutive polls without a new bar
        #[arg(long, default_value_t = 60)]
        idle_polls: usize,
        #[arg(long)]
        trades: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(&cli.log_level);

    let result = match cli.command {
        Command::Backtest {
            config,
            data,
            trades,
            symbol,
        } => run_backtest(&config, &data, trades.as_deref(), symbol.as_deref()),
        Command::Paper {
            config,
            data,
            poll_ms,
            idle_polls,
            trades,
        } => run_paper(
            &config,
            &data,
            Duration::from_millis(poll_ms),
            idle_polls,
            trades.as_deref(),
        ),
        Command::Validate { config } => return run_validate(&config),
    };

    match result {
        Ok(report) => {
            print_summary(&report);
            match &report.outcome {
                RunOutcome::Halted { reason } => (reason).into(),
                RunOutcome::Completed | RunOutcome::Cancelled => ExitCode::SUCCESS,
            }
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A second init (tests calling `run` repeatedly) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn load_configs(path: &Path) -> Result<(RunConfig, StrategyConfig), TraderError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    let run = build_run_config(&adapter)?;
    let strategy = build_strategy_config(&adapter)?;
    Ok((run, strategy))
}

fn event_sink(trades: Option<&Path>) -> Result<FanoutSink, TraderError> {
    let mut sink = FanoutSink::new().with(TracingEventSink);
    if let Some(path) = trades {
        sink = sink.with(CsvTradeLog::create(path)?);
    }
    Ok(sink)
}

fn execute<F: MarketDataPort>(
    run: RunConfig,
    strategy: &StrategyConfig,
    feed: F,
    trades: Option<&Path>,
    cancel: CancelToken,
) -> Result<RunReport, TraderError> {
    let simulator = BacktestSimulator::from_run_config(&run);
    let sink = event_sink(trades)?;
    let runner = Runner::new(run, strategy, feed, simulator, sink)?.with_cancel_token(cancel);
    Ok(runner.run())
}

pub fn run_backtest(
    config_path: &Path,
    data_path: &Path,
    trades: Option<&Path>,
    symbol: Option<&str>,
) -> Result<RunReport, TraderError> {
    eprintln!("Loading config from {}", config_path.display());
    let (mut run, strategy) = load_configs(config_path)?;
    run.mode = RunMode::Backtest;
    if let Some(symbol) = symbol {
        run.symbol = symbol.to_string();
    }

    let feed = CsvBarFeed::from_path(data_path)?;
    eprintln!(
        "Backtesting {} ({}, {}) over {} bars, warm-up {}",
        run.symbol,
        strategy.kind,
        run.interval,
        feed.len(),
        strategy.warmup_len()
    );
    execute(run, &strategy, feed, trades, CancelToken::new())
}

pub fn run_paper(
    config_path: &Path,
    data_path: &Path,
    poll_interval: Duration,
    idle_polls: usize,
    trades: Option<&Path>,
) -> Result<RunReport, TraderError> {
    let cancel = CancelToken::new();
    cancel_on_ctrl_c(cancel.clone());
    run_paper_until(config_path, data_path, poll_interval, idle_polls, trades, cancel)
}

/// Paper run that stops when `cancel` is set, the feed goes idle, or a
/// fatal error halts it.
pub fn run_paper_until(
    config_path: &Path,
    data_path: &Path,
    poll_interval: Duration,
    idle_polls: usize,
    trades: Option<&Path>,
    cancel: CancelToken,
) -> Result<RunReport, TraderError> {
    eprintln!("Loading config from {}", config_path.display());
    let (mut run, strategy) = load_configs(config_path)?;
    run.mode = RunMode::Live;

    let feed = PollingCsvFeed::new(data_path, poll_interval, idle_polls.max(1))
        .with_cancel_token(cancel.clone());
    eprintln!(
        "Paper trading {} ({}, {}) from {}",
        run.symbol,
        strategy.kind,
        run.interval,
        data_path.display()
    );
    execute(run, &strategy, feed, trades, cancel)
}

/// Trips `cancel` on Ctrl-C from a background signal thread.
fn cancel_on_ctrl_c(cancel: CancelToken) {
    let spawned = thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!(error = %e, "signal runtime unavailable, Ctrl-C will not stop the run cleanly");
                    return;
                }
            };
            runtime.block_on(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("shutdown signal received, stopping once no order is pending");
                        cancel.cancel();
                    }
                    Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
                }
            });
        });
    if let Err(e) = spawned {
        warn!(error = %e, "failed to spawn signal thread");
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    match load_configs(config_path) {
        Ok((run, strategy)) => {
            eprintln!("Symbol:    {}", run.symbol);
            eprintln!("Interval:  {}", run.interval);
            eprintln!("Strategy:  {}", strategy.kind);
            eprintln!(
                "Risk:      stop {:.2}% / take-profit {:.2}%",
                strategy.stop_loss_pct * 100.0,
                strategy.take_profit_pct * 100.0
            );
            eprintln!("Warm-up:   {} bars", strategy.warmup_len());
            eprintln!("\nConfiguration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn print_summary(report: &RunReport) {
    let m = &report.metrics;
    eprintln!("\n=== {} ===", report.symbol);
    match &report.outcome {
        RunOutcome::Completed => eprintln!("Outcome:          completed"),
        RunOutcome::Cancelled => eprintln!("Outcome:          cancelled"),
        RunOutcome::Halted { reason } => eprintln!("Outcome:          HALTED: {}", reason),
    }
    eprintln!("Bars processed:   {}", report.bars_processed);
    if let Some(ts) = report.last_timestamp {
        eprintln!("Last bar:         {}", ts);
    }
    eprintln!("Final state:      {}", report.final_state);
    eprintln!("Final equity:     {:.2}", m.final_equity);
    eprintln!("Total Return:     {:.2}%", m.total_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", m.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", m.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", m.total_trades());
    eprintln!("Win Rate:         {:.1}%", m.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", m.profit_factor);
    eprintln!("Total Fees:       {:.2}", m.total_fees);
}
