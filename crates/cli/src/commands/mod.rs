//! CLI Commands

pub mod agent;
pub mod status;
pub mod task;
