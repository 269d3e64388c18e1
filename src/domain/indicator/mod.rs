//! Streaming indicator engine.
//!
//! Every indicator is an incremental accumulator updated once per bar, so the
//! per-bar cost does not grow with history length. [`IndicatorEngine`] owns
//! one accumulator of each kind for a single symbol and turns each new bar
//! into an [`IndicatorSnapshot`]. [`compute_snapshot`] answers the batch
//! question ("snapshot at index i of this history") by replaying the same
//! engine, so live and backtest paths share one implementation.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rolling;
pub mod rsi;
pub mod stochastic;
pub mod volume;

use chrono::NaiveDateTime;

use crate::domain::bar::Bar;
use crate::domain::config::StrategyConfig;
use crate::domain::error::TraderError;

use bollinger::Bollinger;
use macd::Macd;
use rsi::Rsi;
use stochastic::Stochastic;
use volume::VolumeAverage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdValue {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
    pub prev_histogram: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerValue {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub bandwidth: f64,
    pub prev_middle: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticValue {
    pub k: f64,
    pub d: f64,
    pub prev_k: Option<f64>,
    pub prev_d: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeStat {
    pub current: f64,
    pub average: f64,
    pub confirmed: bool,
}

/// Indicator values keyed to one bar. A `None` field is undefined.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub rsi: Option<f64>,
    pub macd: Option<MacdValue>,
    pub bollinger: Option<BollingerValue>,
    pub stochastic: Option<StochasticValue>,
    pub volume: Option<VolumeStat>,
}

impl IndicatorSnapshot {
    pub fn is_complete(&self) -> bool {
        self.rsi.is_some()
            && self.macd.is_some()
            && self.bollinger.is_some()
            && self.stochastic.is_some()
            && self.volume.is_some()
    }

    pub fn volume_confirmed(&self) -> bool {
        self.volume.is_some_and(|v| v.confirmed)
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    warmup_len: usize,
    bars_seen: usize,
    rsi: Rsi,
    macd: Macd,
    bollinger: Bollinger,
    stochastic: Stochastic,
    volume: VolumeAverage,
}

impl IndicatorEngine {
    pub fn new(config: &StrategyConfig) -> Self {
        IndicatorEngine {
            warmup_len: config.warmup_len(),
            bars_seen: 0,
            rsi: Rsi::new(config.rsi_period),
            macd: Macd::new(config.macd_fast, config.macd_slow, config.macd_signal),
            bollinger: Bollinger::new(config.bollinger_period, config.bollinger_stddev),
            stochastic: Stochastic::new(config.stochastic_k, config.stochastic_d),
            volume: VolumeAverage::new(config.volume_lookback, config.volume_multiplier),
        }
    }

    pub fn warmup_len(&self) -> usize {
        self.warmup_len
    }

    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }

    pub fn is_warm(&self) -> bool {
        self.bars_seen >= self.warmup_len
    }

    /// Advance every accumulator by one bar and return whatever is defined.
    pub fn update(&mut self, bar: &Bar) -> IndicatorSnapshot {
        self.bars_seen += 1;
        IndicatorSnapshot {
            timestamp: bar.timestamp,
            close: bar.close,
            rsi: self.rsi.update(bar.close),
            macd: self.macd.update(bar.close),
            bollinger: self.bollinger.update(bar.close),
            stochastic: self.stochastic.update(bar),
            volume: self.volume.update(bar.volume),
        }
    }

    /// Like [`update`](Self::update), but fails with `InsufficientHistory`
    /// while the warm-up window is still open. State advances either way.
    pub fn next(&mut self, bar: &Bar) -> Result<IndicatorSnapshot, TraderError> {
        let snapshot = self.update(bar);
        if !self.is_warm() {
            return Err(TraderError::InsufficientHistory {
                have: self.bars_seen,
                need: self.warmup_len,
            });
        }
        Ok(snapshot)
    }
}

/// Snapshot for `bars[index]` given only `bars[..=index]`.
pub fn compute_snapshot(
    bars: &[Bar],
    index: usize,
    config: &StrategyConfig,
) -> Result<IndicatorSnapshot, TraderError> {
    if index >= bars.len() {
        return Err(TraderError::InsufficientHistory {
            have: bars.len(),
            need: index + 1,
        });
    }
    let mut engine = IndicatorEngine::new(config);
    for bar in &bars[..index] {
        engine.update(bar);
    }
    engine.next(&bars[index])
}
