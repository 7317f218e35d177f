//! Subcommand implementations

pub mod alerts;
pub mod system;
pub mod transactions;
