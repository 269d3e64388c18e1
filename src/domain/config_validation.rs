//! Configuration validation and construction.
//!
//! Everything is checked before a single bar is read. `build_*` read a
//! [`ConfigPort`], apply defaults for missing keys and validate the result.

use std::str::FromStr;

use crate::domain::config::{GapPolicy, RunConfig, RunMode, StrategyConfig, StrategyKind};
use crate::domain::error::TraderError;
use crate::ports::config_port::ConfigPort;

const RUN: &str = "run";
const STRATEGY: &str = "strategy";

/// Longest lookback accepted for any indicator period.
pub const MAX_PERIOD: usize = 10_000;

pub fn validate_run_config(config: &RunConfig) -> Result<(), TraderError> {
    if config.symbol.trim().is_empty() {
        return Err(TraderError::invalid(RUN, "symbol", "symbol must not be empty"));
    }
    positive(RUN, "initial_equity", config.initial_equity)?;
    fraction(RUN, "fee_rate", config.fee_rate)?;
    fraction(RUN, "slippage_pct", config.slippage_pct)?;
    if !(config.position_size > 0.0 && config.position_size <= 1.0) {
        return Err(TraderError::invalid(
            RUN,
            "position_size",
            "position_size must be in (0, 1]",
        ));
    }
    fraction(RUN, "risk_per_trade", config.risk_per_trade)?;
    if !(config.min_order_value >= 0.0 && config.min_order_value.is_finite()) {
        return Err(TraderError::invalid(
            RUN,
            "min_order_value",
            "min_order_value must be non-negative",
        ));
    }
    Ok(())
}

pub fn validate_strategy_config(config: &StrategyConfig) -> Result<(), TraderError> {
    period("rsi_period", config.rsi_period)?;
    period("macd_fast", config.macd_fast)?;
    period("macd_slow", config.macd_slow)?;
    period("macd_signal", config.macd_signal)?;
    if config.macd_fast >= config.macd_slow {
        return Err(TraderError::invalid(
            STRATEGY,
            "macd_fast",
            format!(
                "macd_fast ({}) must be shorter than macd_slow ({})",
                config.macd_fast, config.macd_slow
            ),
        ));
    }
    period("bollinger_period", config.bollinger_period)?;
    positive(STRATEGY, "bollinger_stddev", config.bollinger_stddev)?;
    period("stochastic_k", config.stochastic_k)?;
    period("stochastic_d", config.stochastic_d)?;
    period("volume_lookback", config.volume_lookback)?;
    positive(STRATEGY, "volume_multiplier", config.volume_multiplier)?;

    if !(config.stop_loss_pct > 0.0 && config.stop_loss_pct < 1.0) {
        return Err(TraderError::invalid(
            STRATEGY,
            "stop_loss_pct",
            "stop_loss_pct must be in (0, 1)",
        ));
    }
    positive(STRATEGY, "take_profit_pct", config.take_profit_pct)?;
    if config.stop_loss_pct >= config.take_profit_pct {
        return Err(TraderError::invalid(
            STRATEGY,
            "stop_loss_pct",
            format!(
                "stop_loss_pct ({}) must be less than take_profit_pct ({})",
                config.stop_loss_pct, config.take_profit_pct
            ),
        ));
    }
    Ok(())
}

pub fn build_run_config(config: &dyn ConfigPort) -> Result<RunConfig, TraderError> {
    let defaults = RunConfig::default();
    let symbol = config
        .get_string(RUN, "symbol")
        .ok_or_else(|| TraderError::ConfigMissing {
            section: RUN.to_string(),
            key: "symbol".to_string(),
        })?;

    let run = RunConfig {
        symbol,
        interval: parsed(config, RUN, "interval")?.unwrap_or(defaults.interval),
        mode: parsed::<RunMode>(config, RUN, "mode")?.unwrap_or(defaults.mode),
        initial_equity: config.get_double(RUN, "initial_equity", defaults.initial_equity)?,
        fee_rate: config.get_double(RUN, "fee_rate", defaults.fee_rate)?,
        slippage_pct: config.get_double(RUN, "slippage_pct", defaults.slippage_pct)?,
        position_size: config.get_double(RUN, "position_size", defaults.position_size)?,
        risk_per_trade: config.get_double(RUN, "risk_per_trade", defaults.risk_per_trade)?,
        min_order_value: config.get_double(RUN, "min_order_value", defaults.min_order_value)?,
        on_data_gap: parsed::<GapPolicy>(config, RUN, "on_data_gap")?
            .unwrap_or(defaults.on_data_gap),
    };
    validate_run_config(&run)?;
    Ok(run)
}

pub fn build_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, TraderError> {
    let kind: StrategyKind =
        parsed(config, STRATEGY, "kind")?.ok_or_else(|| TraderError::ConfigMissing {
            section: STRATEGY.to_string(),
            key: "kind".to_string(),
        })?;
    let d = StrategyConfig::for_kind(kind);

    let strategy = StrategyConfig {
        kind,
        rsi_period: config.get_uint(STRATEGY, "rsi_period", d.rsi_period)?,
        macd_fast: config.get_uint(STRATEGY, "macd_fast", d.macd_fast)?,
        macd_slow: config.get_uint(STRATEGY, "macd_slow", d.macd_slow)?,
        macd_signal: config.get_uint(STRATEGY, "macd_signal", d.macd_signal)?,
        bollinger_period: config.get_uint(STRATEGY, "bollinger_period", d.bollinger_period)?,
        bollinger_stddev: config.get_double(STRATEGY, "bollinger_stddev", d.bollinger_stddev)?,
        stochastic_k: config.get_uint(STRATEGY, "stochastic_k", d.stochastic_k)?,
        stochastic_d: config.get_uint(STRATEGY, "stochastic_d", d.stochastic_d)?,
        volume_lookback: config.get_uint(STRATEGY, "volume_lookback", d.volume_lookback)?,
        volume_multiplier: config.get_double(STRATEGY, "volume_multiplier", d.volume_multiplier)?,
        stop_loss_pct: config.get_double(STRATEGY, "stop_loss_pct", d.stop_loss_pct)?,
        take_profit_pct: config.get_double(STRATEGY, "take_profit_pct", d.take_profit_pct)?,
    };
    validate_strategy_config(&strategy)?;
    Ok(strategy)
}

fn parsed<T>(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<T>, TraderError>
where
    T: FromStr<Err = String>,
{
    config
        .get_string(section, key)
        .map(|raw| raw.parse::<T>().map_err(|e| TraderError::invalid(section, key, e)))
        .transpose()
}

fn period(key: &str, value: usize) -> Result<(), TraderError> {
    if value == 0 || value > MAX_PERIOD {
        return Err(TraderError::invalid(
            STRATEGY,
            key,
            format!("{} must be between 1 and {}, got {}", key, MAX_PERIOD, value),
        ));
    }
    Ok(())
}

fn positive(section: &str, key: &str, value: f64) -> Result<(), TraderError> {
    if !(value > 0.0 && value.is_finite()) {
        return Err(TraderError::invalid(
            section,
            key,
            format!("{} must be positive", key),
        ));
    }
    Ok(())
}

fn fraction(section: &str, key: &str, value: f64) -> Result<(), TraderError> {
    if !(0.0..1.0).contains(&value) {
        return Err(TraderError::invalid(
            section,
            key,
            format!("{} must be in [0, 1)", key),
        ));
    }
    Ok(())
}
