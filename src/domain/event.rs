//! Structured events emitted by the runner. Sinks decide how to log or persist them.

use chrono::NaiveDateTime;

use crate::domain::order::{Fill, OrderIntent};
use crate::domain::position::{ClosedTrade, PositionState};
use crate::domain::state_machine::Transition;
use crate::domain::strategy::Decision;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    BarProcessed {
        timestamp: NaiveDateTime,
        close: f64,
        state: PositionState,
        /// False while indicators are still warming up.
        evaluated: bool,
    },
    DecisionMade {
        timestamp: NaiveDateTime,
        decision: Decision,
    },
    StateTransition {
        timestamp: NaiveDateTime,
        transition: Transition,
    },
    Fill {
        intent: OrderIntent,
        fill: Fill,
    },
    PnLRealized {
        trade: ClosedTrade,
    },
    ExecutionFailed {
        timestamp: NaiveDateTime,
        intent: OrderIntent,
        reason: String,
    },
    BarSkipped {
        timestamp: NaiveDateTime,
        reason: String,
    },
}

impl EngineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::BarProcessed { .. } => "bar_processed",
            EngineEvent::DecisionMade { .. } => "decision_made",
            EngineEvent::StateTransition { .. } => "state_transition",
            EngineEvent::Fill { .. } => "fill",
            EngineEvent::PnLRealized { .. } => "pnl_realized",
            EngineEvent::ExecutionFailed { .. } => "execution_failed",
            EngineEvent::BarSkipped { .. } => "bar_skipped",
        }
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        match self {
            EngineEvent::BarProcessed { timestamp, .. }
            | EngineEvent::DecisionMade { timestamp, .. }
            | EngineEvent::StateTransition { timestamp, .. }
            | EngineEvent::ExecutionFailed { timestamp, .. }
            | EngineEvent::BarSkipped { timestamp, .. } => *timestamp,
            EngineEvent::Fill { fill, .. } => fill.timestamp,
            EngineEvent::PnLRealized { trade } => trade.exit_time,
        }
    }
}
