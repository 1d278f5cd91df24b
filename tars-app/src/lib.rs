//! TARS command-line orchestrator: wires configuration, a model provider and
//! the built-in actions into a round driver and runs one task.

pub mod commands;
pub mod config;
pub mod notify;
pub mod report;
