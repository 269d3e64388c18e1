//! The per-symbol run loop.
//!
//! For every bar, in order:
//!
//! 1. reject or log an out-of-order bar or a gap, per the gap policy
//! 2. submit the intent raised on the previous bar, filling at this bar's open
//! 3. advance the indicator engine
//! 4. while Open, check stop-loss / take-profit against this bar's range
//! 5. once warmed up and with nothing pending, evaluate the strategy
//! 6. mark equity at the close
//!
//! Intents raised in steps 4 and 5 are held until the next bar, so a fill
//! never sees the bar that produced its decision.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDateTime;
use tracing::{debug, error, info, warn};

use crate::domain::bar::Bar;
use crate::domain::config::{GapPolicy, RunConfig, StrategyConfig};
use crate::domain::config_validation::{validate_run_config, validate_strategy_config};
use crate::domain::error::TraderError;
use crate::domain::event::EngineEvent;
use crate::domain::indicator::IndicatorEngine;
use crate::domain::metrics::{EquityPoint, Metrics};
use crate::domain::order::OrderIntent;
use crate::domain::position::{ClosedTrade, Position, PositionState};
use crate::domain::sizing::position_quantity;
use crate::domain::state_machine::{FillOutcome, PositionMachine, Transition};
use crate::domain::strategy::{Decision, Strategy};
use crate::ports::event_sink::EventSink;
use crate::ports::execution_port::ExecutionPort;
use crate::ports::market_data_port::MarketDataPort;

/// Shared stop flag. Cloning hands out another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    /// The feed ran out.
    Completed,
    Cancelled,
    /// A fatal error stopped the run; the report holds the last consistent state.
    Halted { reason: TraderError },
}

impl RunOutcome {
    pub fn is_halted(&self) -> bool {
        matches!(self, RunOutcome::Halted { .. })
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub symbol: String,
    pub outcome: RunOutcome,
    pub final_state: PositionState,
    pub position: Position,
    pub last_timestamp: Option<NaiveDateTime>,
    pub bars_processed: usize,
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: Metrics,
}

enum BarCheck {
    Process,
    Skip,
}

pub struct Runner<F, X, S> {
    run_config: RunConfig,
    engine: IndicatorEngine,
    strategy: Strategy,
    machine: PositionMachine,
    stop_loss_pct: f64,
    position: Position,
    feed: F,
    execution: X,
    sink: S,
    cancel: CancelToken,
    pending: Option<OrderIntent>,
    last_bar: Option<Bar>,
    bars_processed: usize,
    closed_trades: Vec<ClosedTrade>,
    equity_curve: Vec<EquityPoint>,
}

impl<F, X, S> Runner<F, X, S>
where
    F: MarketDataPort,
    X: ExecutionPort,
    S: EventSink,
{
    /// Validates both configs before anything is read from the feed.
    pub fn new(
        run_config: RunConfig,
        strategy_config: &StrategyConfig,
        feed: F,
        execution: X,
        sink: S,
    ) -> Result<Self, TraderError> {
        validate_run_config(&run_config)?;
        validate_strategy_config(strategy_config)?;

        Ok(Runner {
            engine: IndicatorEngine::new(strategy_config),
            strategy: Strategy::from_config(strategy_config),
            machine: PositionMachine::new(strategy_config),
            stop_loss_pct: strategy_config.stop_loss_pct,
            position: Position::flat(&run_config.symbol),
            run_config,
            feed,
            execution,
            sink,
            cancel: CancelToken::new(),
            pending: None,
            last_bar: None,
            bars_processed: 0,
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
        })
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn run(mut self) -> RunReport {
        info!(
            symbol = %self.run_config.symbol,
            mode = ?self.run_config.mode,
            strategy = %self.strategy.kind(),
            warmup = self.engine.warmup_len(),
            "run started"
        );

        let mut outcome = match self.drive() {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(symbol = %self.run_config.symbol, error = %e, "run halted");
                self.cancel_pending();
                RunOutcome::Halted { reason: e }
            }
        };

        if let Err(e) = self.sink.flush() {
            error!(error = %e, "event sink failed to flush");
            if !outcome.is_halted() {
                outcome = RunOutcome::Halted { reason: e };
            }
        }

        self.into_report(outcome)
    }

    fn drive(&mut self) -> Result<RunOutcome, TraderError> {
        loop {
            if self.cancel.is_cancelled() && self.pending.is_none() {
                info!(symbol = %self.run_config.symbol, "run cancelled");
                return Ok(RunOutcome::Cancelled);
            }

            let Some(bar) = self.feed.next_bar()? else {
                self.cancel_pending();
                return Ok(if self.cancel.is_cancelled() {
                    RunOutcome::Cancelled
                } else {
                    RunOutcome::Completed
                });
            };

            self.process_bar(&bar)?;
        }
    }

    fn process_bar(&mut self, bar: &Bar) -> Result<(), TraderError> {
        if let BarCheck::Skip = self.check_sequence(bar)? {
            return Ok(());
        }

        if let Some(intent) = self.pending.take() {
            self.execute(&intent, bar)?;
        }

        let snapshot = self.engine.next(bar);
        let evaluated = snapshot.is_ok() && !self.cancel.is_cancelled();

        if !self.cancel.is_cancelled() {
            if let Some((intent, transition)) = self.machine.check_risk(&mut self.position, bar) {
                self.transition(bar.timestamp, transition);
                self.pending = Some(intent);
            }

            if self.pending.is_none() {
                if let Ok(snapshot) = &snapshot {
                    let decision = self.strategy.evaluate(snapshot, &self.position);
                    self.sink.emit(&EngineEvent::DecisionMade {
                        timestamp: bar.timestamp,
                        decision,
                    });
                    self.act(decision, bar);
                }
            }
        }

        let equity = self.execution.available_cash() + self.position.market_value(bar.close);
        self.equity_curve.push(EquityPoint {
            timestamp: bar.timestamp,
            equity,
        });
        self.sink.emit(&EngineEvent::BarProcessed {
            timestamp: bar.timestamp,
            close: bar.close,
            state: self.position.state,
            evaluated,
        });
        self.bars_processed += 1;
        self.last_bar = Some(*bar);
        Ok(())
    }

    fn check_sequence(&mut self, bar: &Bar) -> Result<BarCheck, TraderError> {
        let Some(prev) = self.last_bar else {
            return Ok(BarCheck::Process);
        };
        let policy = self.run_config.effective_gap_policy();
        let symbol = &self.run_config.symbol;

        if bar.timestamp <= prev.timestamp {
            let err = TraderError::OutOfOrder {
                symbol: symbol.clone(),
                previous: prev.timestamp,
                current: bar.timestamp,
            };
            return match policy {
                GapPolicy::Fail => Err(err),
                GapPolicy::Skip => {
                    warn!(%symbol, previous = %prev.timestamp, current = %bar.timestamp, "dropping out-of-order bar");
                    self.sink.emit(&EngineEvent::BarSkipped {
                        timestamp: bar.timestamp,
                        reason: err.to_string(),
                    });
                    Ok(BarCheck::Skip)
                }
            };
        }

        if bar.timestamp - prev.timestamp != self.run_config.interval.duration() {
            let err = TraderError::DataGap {
                symbol: symbol.clone(),
                previous: prev.timestamp,
                current: bar.timestamp,
            };
            match policy {
                GapPolicy::Fail => return Err(err),
                GapPolicy::Skip => warn!(%symbol, previous = %prev.timestamp, current = %bar.timestamp, "gap in bar feed"),
            }
        }
        Ok(BarCheck::Process)
    }

    fn execute(&mut self, intent: &OrderIntent, bar: &Bar) -> Result<(), TraderError> {
        match self.execution.submit(intent, bar) {
            Ok(fill) => {
                self.sink.emit(&EngineEvent::Fill {
                    intent: intent.clone(),
                    fill,
                });
                match self.machine.on_fill(&mut self.position, intent, &fill)? {
                    FillOutcome::Opened(t) => self.transition(fill.timestamp, t),
                    FillOutcome::Closed(t, trade) => {
                        self.transition(fill.timestamp, t);
                        self.sink.emit(&EngineEvent::PnLRealized {
                            trade: trade.clone(),
                        });
                        self.closed_trades.push(trade);
                    }
                }
            }
            Err(e) => {
                warn!(symbol = %intent.symbol, side = %intent.side, error = %e, "order not filled");
                self.sink.emit(&EngineEvent::ExecutionFailed {
                    timestamp: bar.timestamp,
                    intent: intent.clone(),
                    reason: e.to_string(),
                });
                if let Some(t) = self.machine.on_failure(&mut self.position, intent) {
                    self.transition(bar.timestamp, t);
                }
            }
        }
        Ok(())
    }

    fn act(&mut self, decision: Decision, bar: &Bar) {
        let raised = match decision {
            Decision::Hold => None,
            Decision::Enter => {
                let cash = self.execution.available_cash();
                match position_quantity(cash, bar.close, self.stop_loss_pct, &self.run_config) {
                    Some(quantity) => {
                        self.machine
                            .request_entry(&mut self.position, quantity, bar.timestamp)
                    }
                    None => {
                        info!(symbol = %self.run_config.symbol, cash, price = bar.close, "entry skipped, order below minimum");
                        None
                    }
                }
            }
            Decision::ExitSignal => self.machine.request_exit(&mut self.position, bar.timestamp),
        };

        if let Some((intent, transition)) = raised {
            debug!(symbol = %intent.symbol, side = %intent.side, quantity = intent.quantity, "intent raised");
            self.transition(bar.timestamp, transition);
            self.pending = Some(intent);
        }
    }

    fn cancel_pending(&mut self) {
        let Some(intent) = self.pending.take() else {
            return;
        };
        info!(symbol = %intent.symbol, reason = %intent.reason, "run ended with a pending order, cancelling");
        if let Some(t) = self.machine.cancel(&mut self.position, &intent) {
            let at = self.last_bar.map(|b| b.timestamp).unwrap_or(intent.raised_at);
            self.transition(at, t);
        }
    }

    fn transition(&mut self, timestamp: NaiveDateTime, transition: Transition) {
        self.sink.emit(&EngineEvent::StateTransition {
            timestamp,
            transition,
        });
    }

    fn into_report(self, outcome: RunOutcome) -> RunReport {
        let metrics = Metrics::compute(
            self.run_config.initial_equity,
            &self.equity_curve,
            &self.closed_trades,
            self.run_config.interval,
        );
        info!(
            symbol = %self.run_config.symbol,
            bars = self.bars_processed,
            trades = self.closed_trades.len(),
            state = %self.position.state,
            total_return = metrics.total_return,
            "run finished"
        );
        RunReport {
            symbol: self.run_config.symbol,
            outcome,
            final_state: self.position.state,
            last_timestamp: self.last_bar.map(|b| b.timestamp),
            bars_processed: self.bars_processed,
            closed_trades: self.closed_trades,
            equity_curve: self.equity_curve,
            metrics,
            position: self.position,
        }
    }
}
