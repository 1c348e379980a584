//! Core domain types and logic. No I/O happens below this module.

pub mod aggregator;
pub mod backtest;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod indicator_helpers;
pub mod market_condition;
pub mod ohlcv;
pub mod position;
pub mod report;
pub mod risk;
pub mod scan;
pub mod signal;
pub mod sizing;
pub mod snapshot;
pub mod universe;
