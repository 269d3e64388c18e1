//! Event sink adapters.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::error::TraderError;
use crate::domain::event::EngineEvent;
use crate::domain::order::OrderSide;
use crate::domain::state_machine::Transition;
use crate::ports::event_sink::EventSink;

/// Logs every event through `tracing`. Per-bar noise goes to debug.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::BarProcessed {
                timestamp,
                close,
                state,
                evaluated,
            } => debug!(%timestamp, close, %state, evaluated, "bar processed"),
            EngineEvent::DecisionMade {
                timestamp,
                decision,
            } => debug!(%timestamp, %decision, "decision"),
            EngineEvent::StateTransition {
                timestamp,
                transition,
            } => info!(%timestamp, from = %transition.from, to = %transition.to, reason = ?transition.reason, "transition"),
            EngineEvent::Fill { intent, fill } => info!(
                timestamp = %fill.timestamp,
                side = %intent.side,
                reason = %intent.reason,
                price = fill.price,
                quantity = fill.quantity,
                fee = fill.fee(),
                "fill"
            ),
            EngineEvent::PnLRealized { trade } => info!(
                symbol = %trade.symbol,
                entry = trade.entry_price,
                exit = trade.exit_price,
                pnl = trade.pnl,
                reason = %trade.exit_reason,
                "trade closed"
            ),
            EngineEvent::ExecutionFailed {
                timestamp,
                intent,
                reason,
            } => warn!(%timestamp, side = %intent.side, %reason, "execution failed"),
            EngineEvent::BarSkipped { timestamp, reason } => {
                warn!(%timestamp, %reason, "bar skipped")
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub events: Vec<EngineEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transitions(&self) -> Vec<Transition> {
        self.events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::StateTransition { transition, .. } => Some(*transition),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.iter().filter(|e| e.name() == name).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &EngineEvent) {
        self.events.push(event.clone());
    }
}

/// Broadcasts to several sinks; flush reports the first failure.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl EventSink for FanoutSink {
    fn emit(&mut self, event: &EngineEvent) {
        for sink in &mut self.sinks {
            sink.emit(event);
        }
    }

    fn flush(&mut self) -> Result<(), TraderError> {
        let mut first = Ok(());
        for sink in &mut self.sinks {
            if let Err(e) = sink.flush() {
                if first.is_ok() {
                    first = Err(e);
                }
            }
        }
        first
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct TradeRow {
    timestamp: String,
    action: &'static str,
    price: f64,
    quantity: f64,
    fee: f64,
    reason: String,
    realized_pnl: Option<f64>,
}

fn format_ts(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Appends one CSV row per fill. Sell rows carry the realized PnL.
pub struct CsvTradeLog<W: Write> {
    writer: csv::Writer<W>,
    pending_sell: Option<TradeRow>,
    error: Option<TraderError>,
}

impl CsvTradeLog<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, TraderError> {
        let file = File::create(path)?;
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> CsvTradeLog<W> {
    pub fn from_writer(writer: W) -> Self {
        CsvTradeLog {
            writer: csv::Writer::from_writer(writer),
            pending_sell: None,
            error: None,
        }
    }

    pub fn into_inner(mut self) -> Result<W, TraderError> {
        self.flush()?;
        self.writer
            .into_inner()
            .map_err(|e| TraderError::Io(e.into_error()))
    }

    fn write(&mut self, row: &TradeRow) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.writer.serialize(row) {
            warn!(error = %e, "trade log write failed");
            self.error = Some(TraderError::Io(e.into()));
        }
    }
}

impl<W: Write> EventSink for CsvTradeLog<W> {
    fn emit(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::Fill { intent, fill } => {
                let row = TradeRow {
                    timestamp: format_ts(fill.timestamp),
                    action: match intent.side {
                        OrderSide::Buy => "buy",
                        OrderSide::Sell => "sell",
                    },
                    price: fill.price,
                    quantity: fill.quantity,
                    fee: fill.fee(),
                    reason: intent.reason.to_string(),
                    realized_pnl: None,
                };
                match intent.side {
                    OrderSide::Buy => self.write(&row),
                    OrderSide::Sell => self.pending_sell = Some(row),
                }
            }
            EngineEvent::PnLRealized { trade } => {
                if let Some(mut row) = self.pending_sell.take() {
                    row.realized_pnl = Some(trade.pnl);
                    self.write(&row);
                }
            }
            _ => {}
        }
    }

    fn flush(&mut self) -> Result<(), TraderError> {
        if let Some(row) = self.pending_sell.take() {
            self.write(&row);
        }
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.writer.flush()?;
        Ok(())
    }
}
