//! Core domain types and logic.

pub mod bar;
pub mod signal;
pub mod position;
pub mod returns;
pub mod metrics;
pub mod trade;
pub mod report;
pub mod strategy;
pub mod backtest;
pub mod error;
