//! Strategy and run configuration. Both are immutable for the duration of a run.

use crate::domain::bar::Interval;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Momentum,
    MeanReversion,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Momentum => write!(f, "momentum"),
            StrategyKind::MeanReversion => write!(f, "mean_reversion"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "momentum" | "1" => Ok(StrategyKind::Momentum),
            "mean_reversion" | "meanreversion" | "2" => Ok(StrategyKind::MeanReversion),
            other => Err(format!(
                "unknown strategy kind '{}', expected momentum or mean_reversion",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub kind: StrategyKind,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_stddev: f64,
    pub stochastic_k: usize,
    pub stochastic_d: usize,
    pub volume_lookback: usize,
    pub volume_multiplier: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
}

impl StrategyConfig {
    /// Defaults for `kind`; stop/take-profit levels differ per strategy.
    pub fn for_kind(kind: StrategyKind) -> Self {
        let (stop_loss_pct, take_profit_pct) = match kind {
            StrategyKind::Momentum => (0.015, 0.05),
            StrategyKind::MeanReversion => (0.012, 0.025),
        };
        StrategyConfig {
            kind,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_stddev: 2.0,
            stochastic_k: 14,
            stochastic_d: 3,
            volume_lookback: 20,
            volume_multiplier: 1.2,
            stop_loss_pct,
            take_profit_pct,
        }
    }

    /// Bars required before every indicator in the snapshot is defined.
    pub fn warmup_len(&self) -> usize {
        [
            self.rsi_period.saturating_add(1),
            self.macd_slow.saturating_add(self.macd_signal).saturating_sub(1),
            self.bollinger_period,
            self.stochastic_k.saturating_add(self.stochastic_d).saturating_sub(1),
            self.volume_lookback,
        ]
        .into_iter()
        .max()
        .unwrap_or(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Backtest,
    Live,
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "backtest" => Ok(RunMode::Backtest),
            "live" | "paper" => Ok(RunMode::Live),
            other => Err(format!("unknown mode '{}', expected backtest or live", other)),
        }
    }
}

/// What to do with a missing or out-of-order bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapPolicy {
    Fail,
    Skip,
}

impl FromStr for GapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(GapPolicy::Fail),
            "skip" => Ok(GapPolicy::Skip),
            other => Err(format!("unknown gap policy '{}', expected fail or skip", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub symbol: String,
    pub interval: Interval,
    pub mode: RunMode,
    pub initial_equity: f64,
    pub fee_rate: f64,
    pub slippage_pct: f64,
    /// Fraction of available cash committed per entry.
    pub position_size: f64,
    /// Fraction of cash risked between entry and stop; 0 disables the cap.
    pub risk_per_trade: f64,
    pub min_order_value: f64,
    pub on_data_gap: GapPolicy,
}

impl RunConfig {
    /// Backtests never skip bars, whatever the configured policy says.
    pub fn effective_gap_policy(&self) -> GapPolicy {
        match self.mode {
            RunMode::Backtest => GapPolicy::Fail,
            RunMode::Live => self.on_data_gap,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            symbol: "KRW-BTC".to_string(),
            interval: Interval::Minute15,
            mode: RunMode::Backtest,
            initial_equity: 1_000_000.0,
            fee_rate: 0.0005,
            slippage_pct: 0.0,
            position_size: 1.0,
            risk_per_trade: 0.0,
            min_order_value: 5000.0,
            on_data_gap: GapPolicy::Fail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_aliases() {
        assert_eq!("Momentum".parse::<StrategyKind>(), Ok(StrategyKind::Momentum));
        assert_eq!("mean-reversion".parse::<StrategyKind>(), Ok(StrategyKind::MeanReversion));
        assert_eq!("2".parse::<StrategyKind>(), Ok(StrategyKind::MeanReversion));
        assert!("scalping".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn per_kind_risk_defaults() {
        let m = StrategyConfig::for_kind(StrategyKind::Momentum);
        assert_eq!(m.stop_loss_pct, 0.015);
        assert_eq!(m.take_profit_pct, 0.05);

        let r = StrategyConfig::for_kind(StrategyKind::MeanReversion);
        assert_eq!(r.stop_loss_pct, 0.012);
        assert_eq!(r.take_profit_pct, 0.025);
    }

    #[test]
    fn default_warmup_is_macd_bound() {
        let c = StrategyConfig::for_kind(StrategyKind::Momentum);
        assert_eq!(c.warmup_len(), 26 + 9 - 1);
    }

    #[test]
    fn warmup_follows_longest_lookback() {
        let c = StrategyConfig {
            bollinger_period: 50,
            ..StrategyConfig::for_kind(StrategyKind::MeanReversion)
        };
        assert_eq!(c.warmup_len(), 50);

        let c = StrategyConfig {
            rsi_period: 40,
            ..StrategyConfig::for_kind(StrategyKind::MeanReversion)
        };
        assert_eq!(c.warmup_len(), 41);
    }

    #[test]
    fn backtest_always_fails_on_gaps() {
        let cfg = RunConfig {
            on_data_gap: GapPolicy::Skip,
            ..RunConfig::default()
        };
        assert_eq!(cfg.effective_gap_policy(), GapPolicy::Fail);

        let live = RunConfig {
            mode: RunMode::Live,
            ..cfg
        };
        assert_eq!(live.effective_gap_policy(), GapPolicy::Skip);
    }
}
