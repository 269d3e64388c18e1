//! Port traits: the seams between the engine and the outside world.

pub mod config_port;
pub mod event_sink;
pub mod execution_port;
pub mod market_data_port;
