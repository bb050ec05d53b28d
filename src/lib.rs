//! TON ledger: transaction export and staking reward estimation.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod address;
pub mod api;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod holdings;
pub mod staking;
pub mod types;
