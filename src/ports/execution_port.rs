//! Execution adapter port.

use crate::domain::bar::Bar;
use crate::domain::error::TraderError;
use crate::domain::order::{Fill, OrderIntent};

/// Consumes order intents. The runner submits each intent exactly once, on
/// the bar after the one that raised it; a failure is never retried.
pub trait ExecutionPort {
    fn submit(&mut self, intent: &OrderIntent, bar: &Bar) -> Result<Fill, TraderError>;

    /// Quote balance available for new entries.
    fn available_cash(&self) -> f64;
}

impl<T: ExecutionPort + ?Sized> ExecutionPort for &mut T {
    fn submit(&mut self, intent: &OrderIntent, bar: &Bar) -> Result<Fill, TraderError> {
        (**self).submit(intent, bar)
    }

    fn available_cash(&self) -> f64 {
        (**self).available_cash()
    }
}
