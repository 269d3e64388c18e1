//! Order intents and fills exchanged with the execution adapter.

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderReason {
    Entry,
    StopLoss,
    TakeProfit,
    SignalExit,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

impl fmt::Display for OrderReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderReason::Entry => write!(f, "ENTRY"),
            OrderReason::StopLoss => write!(f, "STOP_LOSS"),
            OrderReason::TakeProfit => write!(f, "TAKE_PROFIT"),
            OrderReason::SignalExit => write!(f, "SIGNAL_EXIT"),
        }
    }
}

/// An order the state machine wants executed. Consumed exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub reason: OrderReason,
    /// Timestamp of the bar whose close produced this intent.
    pub raised_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub price: f64,
    pub quantity: f64,
    pub timestamp: NaiveDateTime,
    pub fee_rate: f64,
}

impl Fill {
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }

    /// quantity × price × fee_rate
    pub fn fee(&self) -> f64 {
        self.notional() * self.fee_rate
    }
}
