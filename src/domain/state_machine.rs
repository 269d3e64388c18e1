//! Position & order state machine.
//!
//! ```text
//! Flat --enter--> Entering --fill--> Open --risk/exit--> Exiting --fill--> Flat
//!          ^          |                ^                     |
//!          +-failure--+                +------failure--------+
//! ```
//!
//! Stop-loss and take-profit are checked on every bar before strategy
//! evaluation. When one bar's range crosses both levels, stop-loss wins:
//! a bar does not reveal its intrabar path, so the loss is assumed.

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::domain::bar::Bar;
use crate::domain::config::StrategyConfig;
use crate::domain::error::TraderError;
use crate::domain::order::{Fill, OrderIntent, OrderReason, OrderSide};
use crate::domain::position::{ClosedTrade, Position, PositionState};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub from: PositionState,
    pub to: PositionState,
    pub reason: TransitionReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionReason {
    /// An intent was emitted.
    Intent(OrderReason),
    /// The pending intent was filled.
    Filled(OrderReason),
    /// The adapter failed to fill; state rolled back.
    Rejected(OrderReason),
    /// The pending intent was withdrawn without a fill.
    Cancelled(OrderReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FillOutcome {
    Opened(Transition),
    Closed(Transition, ClosedTrade),
}

impl FillOutcome {
    pub fn transition(&self) -> Transition {
        match self {
            FillOutcome::Opened(t) | FillOutcome::Closed(t, _) => *t,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionMachine {
    stop_loss_pct: f64,
    take_profit_pct: f64,
}

impl PositionMachine {
    pub fn new(config: &StrategyConfig) -> Self {
        PositionMachine {
            stop_loss_pct: config.stop_loss_pct,
            take_profit_pct: config.take_profit_pct,
        }
    }

    /// Flat → Entering. Returns `None` unless the position is Flat, so a
    /// second entry can never be stacked on a held position.
    pub fn request_entry(
        &self,
        position: &mut Position,
        quantity: f64,
        at: NaiveDateTime,
    ) -> Option<(OrderIntent, Transition)> {
        if !position.is_flat() {
            debug!(symbol = %position.symbol, state = %position.state, "entry ignored, position not flat");
            return None;
        }
        let intent = OrderIntent {
            symbol: position.symbol.clone(),
            side: OrderSide::Buy,
            quantity,
            reason: OrderReason::Entry,
            raised_at: at,
        };
        Some((intent, self.shift(position, PositionState::Entering, TransitionReason::Intent(OrderReason::Entry))))
    }

    /// Open → Exiting on a stop-loss or take-profit touch within `bar`.
    pub fn check_risk(
        &self,
        position: &mut Position,
        bar: &Bar,
    ) -> Option<(OrderIntent, Transition)> {
        if !position.is_open() {
            return None;
        }
        let reason = if position.should_stop_loss(bar.low) {
            OrderReason::StopLoss
        } else if position.should_take_profit(bar.high) {
            OrderReason::TakeProfit
        } else {
            return None;
        };
        Some(self.exit(position, reason, bar.timestamp))
    }

    /// Open → Exiting on a strategy exit signal.
    pub fn request_exit(
        &self,
        position: &mut Position,
        at: NaiveDateTime,
    ) -> Option<(OrderIntent, Transition)> {
        if !position.is_open() {
            return None;
        }
        Some(self.exit(position, OrderReason::SignalExit, at))
    }

    fn exit(
        &self,
        position: &mut Position,
        reason: OrderReason,
        at: NaiveDateTime,
    ) -> (OrderIntent, Transition) {
        let intent = OrderIntent {
            symbol: position.symbol.clone(),
            side: OrderSide::Sell,
            quantity: position.quantity,
            reason,
            raised_at: at,
        };
        (intent, self.shift(position, PositionState::Exiting, TransitionReason::Intent(reason)))
    }

    /// Entering → Open or Exiting → Flat.
    pub fn on_fill(
        &self,
        position: &mut Position,
        intent: &OrderIntent,
        fill: &Fill,
    ) -> Result<FillOutcome, TraderError> {
        match (position.state, intent.side) {
            (PositionState::Entering, OrderSide::Buy) => {
                position.entry_price = fill.price;
                position.entry_time = Some(fill.timestamp);
                position.quantity = fill.quantity;
                position.entry_fee = fill.fee();
                position.stop_loss_price = fill.price * (1.0 - self.stop_loss_pct);
                position.take_profit_price = fill.price * (1.0 + self.take_profit_pct);
                let t = self.shift(position, PositionState::Open, TransitionReason::Filled(intent.reason));
                info!(
                    symbol = %position.symbol,
                    price = fill.price,
                    quantity = fill.quantity,
                    stop = position.stop_loss_price,
                    target = position.take_profit_price,
                    "position opened"
                );
                Ok(FillOutcome::Opened(t))
            }
            (PositionState::Exiting, OrderSide::Sell) => {
                let exit_fee = fill.fee();
                let fees = position.entry_fee + exit_fee;
                let pnl = (fill.price - position.entry_price) * position.quantity - fees;
                let trade = ClosedTrade {
                    symbol: position.symbol.clone(),
                    quantity: position.quantity,
                    entry_price: position.entry_price,
                    exit_price: fill.price,
                    entry_time: position.entry_time.unwrap_or(intent.raised_at),
                    exit_time: fill.timestamp,
                    fees,
                    pnl,
                    exit_reason: intent.reason,
                };
                let t = self.shift(position, PositionState::Flat, TransitionReason::Filled(intent.reason));
                position.reset();
                info!(symbol = %trade.symbol, pnl, reason = %intent.reason, "position closed");
                Ok(FillOutcome::Closed(t, trade))
            }
            (state, side) => Err(TraderError::ExecutionFailure {
                symbol: position.symbol.clone(),
                reason: format!("unexpected {} fill while {}", side, state),
            }),
        }
    }

    /// Adapter failed to fill: Entering → Flat, Exiting → Open.
    pub fn on_failure(&self, position: &mut Position, intent: &OrderIntent) -> Option<Transition> {
        let back = self.rollback_target(position)?;
        warn!(symbol = %position.symbol, reason = %intent.reason, "fill failed, rolling back to {}", back);
        Some(self.shift(position, back, TransitionReason::Rejected(intent.reason)))
    }

    /// Withdraw the pending intent without a fill.
    pub fn cancel(&self, position: &mut Position, intent: &OrderIntent) -> Option<Transition> {
        let back = self.rollback_target(position)?;
        Some(self.shift(position, back, TransitionReason::Cancelled(intent.reason)))
    }

    fn rollback_target(&self, position: &Position) -> Option<PositionState> {
        match position.state {
            PositionState::Entering => Some(PositionState::Flat),
            PositionState::Exiting => Some(PositionState::Open),
            PositionState::Flat | PositionState::Open => None,
        }
    }

    fn shift(&self, position: &mut Position, to: PositionState, reason: TransitionReason) -> Transition {
        let from = position.state;
        position.state = to;
        debug!(symbol = %position.symbol, %from, %to, ?reason, "state transition");
        Transition { from, to, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::StrategyKind;
    use chrono::NaiveDate;

    fn ts(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, minute, 0)
            .unwrap()
    }

    fn machine(stop: f64, target: f64) -> PositionMachine {
        PositionMachine::new(&StrategyConfig {
            stop_loss_pct: stop,
            take_profit_pct: target,
            ..StrategyConfig::for_kind(StrategyKind::MeanReversion)
        })
    }

    fn bar(minute: u32, high: f64, low: f64) -> Bar {
        Bar {
            timestamp: ts(minute),
            open: (high + low) / 2.0,
            high,
            low,
            close: (high + low) / 2.0,
            volume: 1.0,
        }
    }

    fn fill(price: f64, quantity: f64, minute: u32) -> Fill {
        Fill {
            price,
            quantity,
            timestamp: ts(minute),
            fee_rate: 0.001,
        }
    }

    fn opened(m: &PositionMachine, entry: f64) -> Position {
        let mut pos = Position::flat("KRW-BTC");
        let (intent, _) = m.request_entry(&mut pos, 1.0, ts(0)).unwrap();
        m.on_fill(&mut pos, &intent, &fill(entry, 1.0, 1)).unwrap();
        pos
    }

    #[test]
    fn entry_emits_buy_and_moves_to_entering() {
        let m = machine(0.05, 0.10);
        let mut pos = Position::flat("KRW-BTC");
        let (intent, t) = m.request_entry(&mut pos, 0.5, ts(0)).unwrap();
        assert_eq!(intent.side, OrderSide::Buy);
        assert_eq!(intent.reason, OrderReason::Entry);
        assert_eq!(intent.quantity, 0.5);
        assert_eq!((t.from, t.to), (PositionState::Flat, PositionState::Entering));
        assert_eq!(pos.quantity, 0.0);
    }

    #[test]
    fn entry_fill_sets_levels() {
        let m = machine(0.05, 0.10);
        let pos = opened(&m, 100.0);
        assert!(pos.is_open());
        assert!((pos.stop_loss_price - 95.0).abs() < 1e-9);
        assert!((pos.take_profit_price - 110.0).abs() < 1e-9);
        assert!(pos.stop_loss_price < pos.entry_price && pos.entry_price < pos.take_profit_price);
        assert!((pos.entry_fee - 0.1).abs() < 1e-12);
    }

    #[test]
    fn no_second_entry_while_held() {
        let m = machine(0.05, 0.10);
        let mut pos = opened(&m, 100.0);
        assert!(m.request_entry(&mut pos, 1.0, ts(2)).is_none());
        assert!(pos.is_open());

        let mut entering = Position::flat("KRW-BTC");
        m.request_entry(&mut entering, 1.0, ts(0)).unwrap();
        assert!(m.request_entry(&mut entering, 1.0, ts(1)).is_none());
    }

    #[test]
    fn stop_loss_on_low_touch() {
        let m = machine(0.05, 0.10);
        let mut pos = opened(&m, 100.0);
        let (intent, t) = m.check_risk(&mut pos, &bar(2, 99.0, 94.0)).unwrap();
        assert_eq!(intent.side, OrderSide::Sell);
        assert_eq!(intent.reason, OrderReason::StopLoss);
        assert_eq!((t.from, t.to), (PositionState::Open, PositionState::Exiting));
    }

    #[test]
    fn take_profit_on_high_touch() {
        let m = machine(0.05, 0.10);
        let mut pos = opened(&m, 100.0);
        let (intent, _) = m.check_risk(&mut pos, &bar(2, 111.0, 101.0)).unwrap();
        assert_eq!(intent.reason, OrderReason::TakeProfit);
    }

    #[test]
    fn stop_loss_wins_when_bar_straddles_both() {
        let m = machine(0.05, 0.10);
        let mut pos = opened(&m, 100.0);
        let (intent, _) = m.check_risk(&mut pos, &bar(2, 120.0, 80.0)).unwrap();
        assert_eq!(intent.reason, OrderReason::StopLoss);
    }

    #[test]
    fn quiet_bar_keeps_position_open() {
        let m = machine(0.05, 0.10);
        let mut pos = opened(&m, 100.0);
        assert!(m.check_risk(&mut pos, &bar(2, 105.0, 97.0)).is_none());
        assert!(pos.is_open());
    }

    #[test]
    fn exit_fill_realizes_pnl_net_of_fees() {
        let m = machine(0.05, 0.10);
        let mut pos = opened(&m, 100.0);
        let (intent, _) = m.request_exit(&mut pos, ts(3)).unwrap();
        assert_eq!(intent.reason, OrderReason::SignalExit);
        let outcome = m.on_fill(&mut pos, &intent, &fill(104.0, 1.0, 4)).unwrap();
        match outcome {
            FillOutcome::Closed(t, trade) => {
                assert_eq!((t.from, t.to), (PositionState::Exiting, PositionState::Flat));
                let expected = 4.0 - 0.1 - 0.104;
                assert!((trade.pnl - expected).abs() < 1e-9);
                assert_eq!(trade.exit_reason, OrderReason::SignalExit);
            }
            other => panic!("expected close, got {:?}", other),
        }
        assert_eq!(pos, Position::flat("KRW-BTC"));
    }

    #[test]
    fn failure_rolls_back() {
        let m = machine(0.05, 0.10);
        let mut pos = Position::flat("KRW-BTC");
        let (intent, _) = m.request_entry(&mut pos, 1.0, ts(0)).unwrap();
        let t = m.on_failure(&mut pos, &intent).unwrap();
        assert_eq!(t.to, PositionState::Flat);
        assert_eq!(t.reason, TransitionReason::Rejected(OrderReason::Entry));

        let mut pos = opened(&m, 100.0);
        let (intent, _) = m.check_risk(&mut pos, &bar(2, 99.0, 90.0)).unwrap();
        let t = m.on_failure(&mut pos, &intent).unwrap();
        assert_eq!((t.from, t.to), (PositionState::Exiting, PositionState::Open));
        assert_eq!(pos.quantity, 1.0);
    }

    #[test]
    fn fill_in_wrong_state_is_rejected() {
        let m = machine(0.05, 0.10);
        let mut pos = Position::flat("KRW-BTC");
        let intent = OrderIntent {
            symbol: "KRW-BTC".into(),
            side: OrderSide::Sell,
            quantity: 1.0,
            reason: OrderReason::SignalExit,
            raised_at: ts(0),
        };
        let err = m.on_fill(&mut pos, &intent, &fill(100.0, 1.0, 1)).unwrap_err();
        assert!(matches!(err, TraderError::ExecutionFailure { .. }));
        assert!(pos.is_flat());
    }

    #[test]
    fn cancel_without_pending_intent_is_noop() {
        let m = machine(0.05, 0.10);
        let mut pos = opened(&m, 100.0);
        let intent = OrderIntent {
            symbol: "KRW-BTC".into(),
            side: OrderSide::Sell,
            quantity: 1.0,
            reason: OrderReason::SignalExit,
            raised_at: ts(0),
        };
        assert!(m.cancel(&mut pos, &intent).is_none());
        assert!(pos.is_open());
    }
}
