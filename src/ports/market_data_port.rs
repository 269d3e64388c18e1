//! Market data port.

use crate::domain::bar::Bar;
use crate::domain::error::TraderError;

/// An ordered source of closed bars for one symbol.
///
/// Historical feeds are finite and return `Ok(None)` when exhausted. Live
/// feeds block until the next bar closes and only return `Ok(None)` once
/// they are shut down.
pub trait MarketDataPort {
    fn next_bar(&mut self) -> Result<Option<Bar>, TraderError>;

    /// Restart from the first bar. Feeds that cannot restart return an error.
    fn rewind(&mut self) -> Result<(), TraderError> {
        Err(TraderError::Data {
            reason: "feed cannot be rewound".to_string(),
        })
    }
}

impl<T: MarketDataPort + ?Sized> MarketDataPort for Box<T> {
    fn next_bar(&mut self) -> Result<Option<Bar>, TraderError> {
        (**self).next_bar()
    }

    fn rewind(&mut self) -> Result<(), TraderError> {
        (**self).rewind()
    }
}
