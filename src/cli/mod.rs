// src/cli/mod.rs
//! Command-line interface definitions

/// Clap derive definitions of the subcommands
pub mod commands;

pub use commands::{
    Action, BenchmarkOptions, Commands, ConfigOptions, HashOptions, StartOptions,
};
