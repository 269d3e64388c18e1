#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use cointrader::adapters::backtest_simulator::BacktestSimulator;
use cointrader::adapters::csv_feed::CsvBarFeed;
use cointrader::adapters::event_sinks::RecordingSink;
pub use cointrader::domain::bar::{Bar, Interval};
use cointrader::domain::config::{GapPolicy, RunConfig, RunMode, StrategyConfig, StrategyKind};
use cointrader::domain::error::TraderError;
use cointrader::domain::event::EngineEvent;
use cointrader::domain::order::{Fill, OrderIntent};
use cointrader::domain::position::PositionState;
use cointrader::domain::runner::{CancelToken, RunReport, Runner};
use cointrader::ports::event_sink::EventSink;
use cointrader::ports::execution_port::ExecutionPort;

pub fn ts(i: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
        + Duration::minutes(15 * i)
}

pub fn bar(i: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
    Bar {
        timestamp: ts(i),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Closes 100, 101, 99, 98, 97, 96, 95 with a volume spike on the last bar:
/// a mean-reversion entry fires on bar 6.
pub fn mean_reversion_scenario() -> Vec<Bar> {
    let closes = [100.0, 101.0, 99.0, 98.0, 97.0];
    let mut bars: Vec<Bar> = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| bar(i as i64, c, c + 0.5, c - 0.5, c, 1000.0))
        .collect();
    bars.push(bar(5, 96.5, 96.5, 96.0, 96.0, 1000.0));
    bars.push(bar(6, 95.8, 96.0, 93.0, 95.0, 2000.0));
    bars
}

/// Scenario plus recovery: fill at bar 7's open, exit signal on bar 8, exit fill at bar 9.
pub fn round_trip_bars() -> Vec<Bar> {
    let mut bars = mean_reversion_scenario();
    bars.push(bar(7, 95.2, 95.8, 94.8, 95.4, 1000.0));
    bars.push(bar(8, 95.5, 97.0, 95.3, 96.8, 1000.0));
    bars.push(bar(9, 96.9, 97.2, 96.5, 97.0, 1000.0));
    bars
}

pub fn small_config(kind: StrategyKind) -> StrategyConfig {
    StrategyConfig {
        rsi_period: 3,
        macd_fast: 2,
        macd_slow: 3,
        macd_signal: 2,
        bollinger_period: 3,
        bollinger_stddev: 1.0,
        stochastic_k: 3,
        stochastic_d: 2,
        volume_lookback: 3,
        volume_multiplier: 1.2,
        ..StrategyConfig::for_kind(kind)
    }
}

pub fn run_config(mode: RunMode) -> RunConfig {
    RunConfig {
        mode,
        interval: Interval::Minute15,
        initial_equity: 1_000_000.0,
        fee_rate: 0.0005,
        slippage_pct: 0.0,
        on_data_gap: match mode {
            RunMode::Backtest => GapPolicy::Fail,
            RunMode::Live => GapPolicy::Skip,
        },
        ..RunConfig::default()
    }
}

/// Run `bars` through a fresh runner with the simulator and a recording sink.
pub fn run_bars(
    bars: Vec<Bar>,
    run: RunConfig,
    strategy: &StrategyConfig,
) -> (RunReport, RecordingSink) {
    let mut sink = RecordingSink::new();
    let simulator = BacktestSimulator::from_run_config(&run);
    let report = Runner::new(run, strategy, CsvBarFeed::from_bars(bars), simulator, &mut sink)
        .unwrap()
        .run();
    (report, sink)
}

/// Simulator wrapper that records every submission and can fail chosen ones.
pub struct ScriptedExecution {
    inner: BacktestSimulator,
    fail_on: Vec<usize>,
    pub submissions: Vec<(OrderIntent, Bar)>,
}

impl ScriptedExecution {
    pub fn new(run: &RunConfig) -> Self {
        ScriptedExecution {
            inner: BacktestSimulator::from_run_config(run),
            fail_on: Vec::new(),
            submissions: Vec::new(),
        }
    }

    /// Fail the n-th submission (0-based).
    pub fn failing_on(mut self, n: usize) -> Self {
        self.fail_on.push(n);
        self
    }
}

impl ExecutionPort for ScriptedExecution {
    fn submit(&mut self, intent: &OrderIntent, bar: &Bar) -> Result<Fill, TraderError> {
        let n = self.submissions.len();
        self.submissions.push((intent.clone(), *bar));
        if self.fail_on.contains(&n) {
            return Err(TraderError::ExecutionFailure {
                symbol: intent.symbol.clone(),
                reason: "exchange rejected order".into(),
            });
        }
        self.inner.submit(intent, bar)
    }

    fn available_cash(&self) -> f64 {
        self.inner.available_cash()
    }
}

/// Records events and trips the cancel token once a position starts entering.
pub struct CancelOnEntry {
    pub token: CancelToken,
    pub recorded: RecordingSink,
}

impl EventSink for CancelOnEntry {
    fn emit(&mut self, event: &EngineEvent) {
        if let EngineEvent::StateTransition { transition, .. } = event {
            if transition.to == PositionState::Entering {
                self.token.cancel();
            }
        }
        self.recorded.emit(event);
    }
}

/// Deterministic pseudo-random walk, enough swings to trigger trades.
pub fn random_walk(steps: &[(f64, f64)]) -> Vec<Bar> {
    let mut close = 100.0_f64;
    steps
        .iter()
        .enumerate()
        .map(|(i, &(change, volume))| {
            let open = close;
            close = (close + change).max(1.0);
            let high = open.max(close) + change.abs() * 0.3 + 0.1;
            let low = (open.min(close) - change.abs() * 0.3 - 0.1).max(0.5);
            bar(i as i64, open, high, low, close, volume)
        })
        .collect()
}

pub fn bars_csv(bars: &[Bar]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    out
}
