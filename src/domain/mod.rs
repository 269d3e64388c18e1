//! Core domain types and logic.

pub mod bar;
pub mod config;
pub mod config_validation;
pub mod error;
pub mod event;
pub mod indicator;
pub mod metrics;
pub mod order;
pub mod position;
pub mod runner;
pub mod sizing;
pub mod state_machine;
pub mod strategy;
