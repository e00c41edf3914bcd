//! Tooling
//!
//! Command-line front end for the notebook store.

pub mod cli;

pub use cli::{Cli, CliContext, Commands, OutputFormat};
