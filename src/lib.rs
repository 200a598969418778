//! Storage dispatch scheduling.
//!
//! Builds a time-indexed linear program that decides how much stored energy to
//! sell at every step of a known price curve, hands it to an LP backend and
//! turns the solution into an ordered dispatch report.

pub mod cli;
pub mod config;
pub mod domain;
pub mod optimizer;
pub mod tables;
pub mod telemetry;
