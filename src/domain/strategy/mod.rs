//! Strategy evaluation.
//!
//! A [`Strategy`] is chosen once from [`StrategyConfig::kind`] and then
//! evaluated per bar. Evaluation is a pure function of the snapshot and the
//! position state: no I/O, no mutation, so a replay of the same bars yields
//! the same decisions.

pub mod mean_reversion;
pub mod momentum;

use std::fmt;

use crate::domain::config::{StrategyConfig, StrategyKind};
use crate::domain::indicator::IndicatorSnapshot;
use crate::domain::position::{Position, PositionState};

pub use mean_reversion::MeanReversion;
pub use momentum::Momentum;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Enter,
    ExitSignal,
    Hold,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Enter => write!(f, "enter"),
            Decision::ExitSignal => write!(f, "exit"),
            Decision::Hold => write!(f, "hold"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    Momentum(Momentum),
    MeanReversion(MeanReversion),
}

impl Strategy {
    pub fn from_config(config: &StrategyConfig) -> Self {
        match config.kind {
            StrategyKind::Momentum => Strategy::Momentum(Momentum),
            StrategyKind::MeanReversion => Strategy::MeanReversion(MeanReversion),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Momentum(_) => StrategyKind::Momentum,
            Strategy::MeanReversion(_) => StrategyKind::MeanReversion,
        }
    }

    /// Enter is only returned while Flat and ExitSignal only while Open.
    /// Pending states and incomplete snapshots always Hold.
    pub fn evaluate(&self, snapshot: &IndicatorSnapshot, position: &Position) -> Decision {
        if !snapshot.is_complete() {
            return Decision::Hold;
        }
        match position.state {
            PositionState::Flat => {
                let enter = match self {
                    Strategy::Momentum(s) => s.should_enter(snapshot),
                    Strategy::MeanReversion(s) => s.should_enter(snapshot),
                };
                if enter { Decision::Enter } else { Decision::Hold }
            }
            PositionState::Open => {
                let exit = match self {
                    Strategy::Momentum(s) => s.should_exit(snapshot),
                    Strategy::MeanReversion(s) => s.should_exit(snapshot),
                };
                if exit { Decision::ExitSignal } else { Decision::Hold }
            }
            PositionState::Entering | PositionState::Exiting => Decision::Hold,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::neutral;
    use super::*;

    #[test]
    fn selected_from_config() {
        let s = Strategy::from_config(&StrategyConfig::for_kind(StrategyKind::MeanReversion));
        assert_eq!(s.kind(), StrategyKind::MeanReversion);
        let s = Strategy::from_config(&StrategyConfig::for_kind(StrategyKind::Momentum));
        assert_eq!(s.kind(), StrategyKind::Momentum);
    }

    #[test]
    fn incomplete_snapshot_holds() {
        let mut snap = neutral();
        snap.rsi = None;
        let s = Strategy::Momentum(Momentum);
        assert_eq!(s.evaluate(&snap, &Position::flat("KRW-BTC")), Decision::Hold);
    }

    #[test]
    fn pending_states_hold() {
        let mut snap = neutral();
        snap.rsi = Some(95.0);
        let s = Strategy::Momentum(Momentum);
        for state in [PositionState::Entering, PositionState::Exiting] {
            let pos = Position {
                state,
                ..Position::flat("KRW-BTC")
            };
            assert_eq!(s.evaluate(&snap, &pos), Decision::Hold);
        }
    }

    #[test]
    fn exit_only_when_open() {
        let mut snap = neutral();
        snap.rsi = Some(95.0);
        let s = Strategy::Momentum(Momentum);
        assert_eq!(s.evaluate(&snap, &Position::flat("KRW-BTC")), Decision::Hold);
        let open = Position {
            state: PositionState::Open,
            quantity: 1.0,
            ..Position::flat("KRW-BTC")
        };
        assert_eq!(s.evaluate(&snap, &open), Decision::ExitSignal);
    }
}
