//! Report/log sink port.

use crate::domain::error::TraderError;
use crate::domain::event::EngineEvent;

pub trait EventSink {
    fn emit(&mut self, event: &EngineEvent);

    /// Called once when the run ends. Sinks that buffer or write to disk
    /// surface any deferred error here.
    fn flush(&mut self) -> Result<(), TraderError> {
        Ok(())
    }
}

impl<T: EventSink + ?Sized> EventSink for &mut T {
    fn emit(&mut self, event: &EngineEvent) {
        (**self).emit(event)
    }

    fn flush(&mut self) -> Result<(), TraderError> {
        (**self).flush()
    }
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn emit(&mut self, event: &EngineEvent) {
        (**self).emit(event)
    }

    fn flush(&mut self) -> Result<(), TraderError> {
        (**self).flush()
    }
}
