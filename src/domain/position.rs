//! Per-symbol position value, owned by the runner.

use chrono::NaiveDateTime;
use std::fmt;

use crate::domain::order::OrderReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Flat,
    /// Buy intent emitted, awaiting fill.
    Entering,
    Open,
    /// Sell intent emitted, awaiting fill.
    Exiting,
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionState::Flat => write!(f, "Flat"),
            PositionState::Entering => write!(f, "Entering"),
            PositionState::Open => write!(f, "Open"),
            PositionState::Exiting => write!(f, "Exiting"),
        }
    }
}

/// Spot markets only allow long positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Long,
}

/// Invariants: `quantity == 0` exactly when the position holds nothing
/// (Flat or Entering); while held, `stop_loss_price < entry_price < take_profit_price`.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub state: PositionState,
    pub side: Side,
    pub entry_price: f64,
    pub entry_time: Option<NaiveDateTime>,
    pub quantity: f64,
    pub stop_loss_price: f64,
    pub take_profit_price: f64,
    pub entry_fee: f64,
}

impl Position {
    pub fn flat(symbol: &str) -> Self {
        Position {
            symbol: symbol.to_string(),
            state: PositionState::Flat,
            side: Side::Long,
            entry_price: 0.0,
            entry_time: None,
            quantity: 0.0,
            stop_loss_price: 0.0,
            take_profit_price: 0.0,
            entry_fee: 0.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.state == PositionState::Flat
    }

    pub fn is_open(&self) -> bool {
        self.state == PositionState::Open
    }

    /// Entering or Exiting: an intent is outstanding.
    pub fn is_pending(&self) -> bool {
        matches!(
            self.state,
            PositionState::Entering | PositionState::Exiting
        )
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    pub fn should_stop_loss(&self, low: f64) -> bool {
        low <= self.stop_loss_price
    }

    pub fn should_take_profit(&self, high: f64) -> bool {
        high >= self.take_profit_price
    }

    pub(crate) fn reset(&mut self) {
        *self = Position::flat(&self.symbol);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub symbol: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub fees: f64,
    pub pnl: f64,
    pub exit_reason: OrderReason,
}
