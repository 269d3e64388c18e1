//! Simulated execution against historical bars.
//!
//! Every intent fills at the open of the bar it is submitted with, never at
//! that bar's high, low or close, and never on the bar that raised it.
//!
//! - buy:  open × (1 + slippage)
//! - sell: open × (1 − slippage)
//! - fee:  quantity × price × fee_rate, paid in quote currency
//!
//! The simulator also owns the account: cash and the base-asset holding.

use tracing::debug;

use crate::domain::bar::Bar;
use crate::domain::config::RunConfig;
use crate::domain::error::TraderError;
use crate::domain::order::{Fill, OrderIntent, OrderSide};
use crate::ports::execution_port::ExecutionPort;

const QTY_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSimulator {
    cash: f64,
    holding: f64,
    fee_rate: f64,
    slippage_pct: f64,
}

impl BacktestSimulator {
    pub fn new(initial_cash: f64, fee_rate: f64, slippage_pct: f64) -> Self {
        BacktestSimulator {
            cash: initial_cash,
            holding: 0.0,
            fee_rate,
            slippage_pct,
        }
    }

    pub fn from_run_config(config: &RunConfig) -> Self {
        Self::new(config.initial_equity, config.fee_rate, config.slippage_pct)
    }

    pub fn holding(&self) -> f64 {
        self.holding
    }

    fn reject(intent: &OrderIntent, reason: String) -> TraderError {
        TraderError::ExecutionFailure {
            symbol: intent.symbol.clone(),
            reason,
        }
    }

    fn buy(&mut self, intent: &OrderIntent, bar: &Bar) -> Result<Fill, TraderError> {
        let price = bar.open * (1.0 + self.slippage_pct);
        let affordable = self.cash / (price * (1.0 + self.fee_rate));
        let quantity = intent.quantity.min(affordable);
        if quantity <= QTY_EPSILON {
            return Err(Self::reject(
                intent,
                format!("insufficient cash {:.2} to buy at {:.4}", self.cash, price),
            ));
        }
        if quantity < intent.quantity {
            debug!(requested = intent.quantity, filled = quantity, "buy trimmed to available cash");
        }

        let fill = Fill {
            price,
            quantity,
            timestamp: bar.timestamp,
            fee_rate: self.fee_rate,
        };
        self.cash = (self.cash - fill.notional() - fill.fee()).max(0.0);
        self.holding += quantity;
        Ok(fill)
    }

    fn sell(&mut self, intent: &OrderIntent, bar: &Bar) -> Result<Fill, TraderError> {
        if intent.quantity > self.holding + QTY_EPSILON {
            return Err(Self::reject(
                intent,
                format!(
                    "sell of {} exceeds holding of {}",
                    intent.quantity, self.holding
                ),
            ));
        }
        let fill = Fill {
            price: bar.open * (1.0 - self.slippage_pct),
            quantity: intent.quantity,
            timestamp: bar.timestamp,
            fee_rate: self.fee_rate,
        };
        self.cash += fill.notional() - fill.fee();
        self.holding = (self.holding - intent.quantity).max(0.0);
        Ok(fill)
    }
}

impl ExecutionPort for BacktestSimulator {
    fn submit(&mut self, intent: &OrderIntent, bar: &Bar) -> Result<Fill, TraderError> {
        if bar.timestamp <= intent.raised_at {
            return Err(Self::reject(
                intent,
                format!(
                    "fill bar {} does not follow decision bar {}",
                    bar.timestamp, intent.raised_at
                ),
            ));
        }
        if !(bar.open > 0.0 && bar.open.is_finite()) {
            return Err(Self::reject(intent, format!("unusable open price {}", bar.open)));
        }

        match intent.side {
            OrderSide::Buy => self.buy(intent, bar),
            OrderSide::Sell => self.sell(intent, bar),
        }
    }

    fn available_cash(&self) -> f64 {
        self.cash
    }
}
