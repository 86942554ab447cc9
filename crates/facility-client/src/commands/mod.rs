//! Subcommand implementations.

pub mod config;
pub mod reservation;
pub mod server;
