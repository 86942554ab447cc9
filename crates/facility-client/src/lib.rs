//! CLI, retrying invocation client, output rendering
//!
//! This crate provides the `facility` command-line interface. Requests go
//! through [`InvocationClient`], which resends a datagram with the same
//! sequence number until the server answers or the attempt budget is spent.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod invoker;
pub mod output;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
pub use invoker::InvocationClient;
