//! Concrete adapter implementations for ports.

pub mod backtest_simulator;
pub mod csv_feed;
pub mod event_sinks;
pub mod file_config_adapter;
pub mod polling_feed;
