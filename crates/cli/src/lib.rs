//! VOXA CLI
//!
//! Operator commands for the VOXA bridge: service status checks, starting
//! agents and following their tasks.

pub mod client;
pub mod commands;
pub mod output;
